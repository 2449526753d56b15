//! Host-side wrapper code emission.

use crate::args::ArgType;
use crate::buffer::IndentedBuffer;
use crate::Result;

/// Emits the statement that invokes a generated kernel from the host program.
pub trait WrapperCodegen {
    /// `grid_launch` is set for kernels launched over a thread grid; plain
    /// function-call kernels are emitted without launch parameters.
    fn generate_kernel_call(
        &mut self,
        kernel_name: &str,
        call_args: &[String],
        grid_launch: bool,
        arg_types: &[ArgType],
    ) -> Result<()>;
}

/// One emitted kernel invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelCall {
    pub kernel_name: String,
    pub call_args: Vec<String>,
    pub grid_launch: bool,
    pub arg_types: Vec<ArgType>,
}

/// Python wrapper: writes call statements into a buffer and records them.
#[derive(Debug, Default)]
pub struct WrapperCode {
    code: IndentedBuffer,
    calls: Vec<KernelCall>,
}

impl WrapperCode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &IndentedBuffer {
        &self.code
    }

    pub fn code_mut(&mut self) -> &mut IndentedBuffer {
        &mut self.code
    }

    pub fn calls(&self) -> &[KernelCall] {
        &self.calls
    }
}

impl WrapperCodegen for WrapperCode {
    fn generate_kernel_call(
        &mut self,
        kernel_name: &str,
        call_args: &[String],
        grid_launch: bool,
        arg_types: &[ArgType],
    ) -> Result<()> {
        let args = call_args.join(", ");
        if grid_launch {
            self.code.writeline(format!("{kernel_name}.run({args}, grid=grid, stream=stream)"));
        } else {
            self.code.writeline(format!("{kernel_name}({args})"));
        }

        tracing::debug!(kernel.name = kernel_name, args = call_args.len(), grid_launch, "emitted kernel call");
        self.calls.push(KernelCall {
            kernel_name: kernel_name.to_string(),
            call_args: call_args.to_vec(),
            grid_launch,
            arg_types: arg_types.to_vec(),
        });
        Ok(())
    }
}
