//! Two-pass code generation for template kernels.
//!
//! A template kernel is generated from a text template that calls back into a
//! [`TemplateKernel`] while it is being expanded. Parts of the output that
//! depend on state only known once the whole template has run (the kernel
//! signature, the output store epilogue) are emitted as placeholder tokens and
//! filled in by render hooks afterwards.
//!
//! # Architecture
//!
//! - **Regions**: independent code fragments with save/restore discipline ([`region`])
//! - **Hooks**: placeholder token -> generator, and staged resolution ([`hooks`])
//! - **Kernel**: the context a template talks to ([`kernel`])
//! - **Templates**: minijinja-backed template expansion ([`template`])
//! - **Wrapper**: host-side call emission ([`wrapper`], [`args`])
//!
//! # Usage
//!
//! ```ignore
//! use kiln_codegen::{JinjaTemplate, TemplateKernel, WrapperCode};
//!
//! let kernel = TemplateKernel::new("add_kernel", inputs, Some(output));
//! let template = JinjaTemplate::new("add", "{{ def_kernel('x', 'y') }}\n    {{ store_output(['i'], 'x[i] + y[i]') }}\n");
//! let code = kernel.finalize(kernel.render(&template, Default::default())?)?;
//!
//! let mut wrapper = WrapperCode::new();
//! kernel.emit_call_site("add_kernel", None, &mut wrapper)?;
//! ```

pub mod args;
pub mod buffer;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod kernel;
pub mod region;
pub mod template;
pub mod wrapper;

#[cfg(test)]
pub mod test;

pub use args::{ArgBinder, ArgDefs, ArgType, BufferMap, KernelArgs, TensorArgBinder};
pub use buffer::IndentedBuffer;
pub use config::CodegenConfig;
pub use descriptor::{Dims, KernelBuffer, Layout, StaticBuffer, TensorDescriptor};
pub use error::*;
pub use hooks::{Hook, HookRegistry, PartialRender};
pub use kernel::{KernelState, LaunchConfig, TemplateKernel};
pub use region::{ActiveRegion, RegionGuard, RegionHost, RegionId, RegionState, RegionStore};
pub use template::{Bindings, JinjaTemplate, KernelTemplate};
pub use wrapper::{KernelCall, WrapperCode, WrapperCodegen};

// Re-export external types for convenience
pub use kiln_dtype::{DType, DeviceSpec};
