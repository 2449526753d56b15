//! Kernel templates and the Jinja-backed implementation.
//!
//! A template receives the kernel context and a set of bindings and returns
//! pass-1 code. Template-side calls such as `def_kernel(...)` and
//! `store_output(...)` reach the [`TemplateKernel`] and leave placeholder
//! tokens in the text.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::{Rest, Value};
use minijinja::{Environment, ErrorKind};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::kernel::TemplateKernel;

/// Named values made available to a template.
pub type Bindings = BTreeMap<String, Value>;

/// Pass-1 renderer for one kernel template.
pub trait KernelTemplate {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn render(&self, kernel: &TemplateKernel, bindings: Bindings) -> Result<String>;
}

/// Template source rendered with minijinja.
///
/// Besides the caller's bindings, the template sees `kernel_name`,
/// `input_nodes` and `output_node`, plus these functions (trailing arguments
/// are optional and positional):
///
/// * `def_kernel(argname, ...)`
/// * `store_output(indices, val, mask, indent_width)`
/// * `describe(buffer, alias)` - a [`TensorDescriptor`](crate::TensorDescriptor) as a map
/// * `tensor_from_dlpack(buffer, target)`
/// * `split_and_set_ranges(ranges)`
#[derive(Debug, Clone)]
pub struct JinjaTemplate {
    name: String,
    source: Arc<str>,
    trim_blocks: bool,
}

impl JinjaTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        Self { name: name.into(), source: source.into(), trim_blocks: false }
    }

    /// Drop the first newline after a block tag.
    pub fn trim_blocks(mut self, yes: bool) -> Self {
        self.trim_blocks = yes;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn environment(&self, kernel: &TemplateKernel, fault: &FaultSlot) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(self.trim_blocks);

        let (k, slot) = (kernel.clone(), Arc::clone(fault));
        env.add_function("def_kernel", move |argnames: Rest<String>| {
            k.def_kernel(&argnames.0).map_err(|err| stash(&slot, err))
        });

        let (k, slot) = (kernel.clone(), Arc::clone(fault));
        env.add_function(
            "store_output",
            move |indices: Vec<Value>, val: String, mask: Option<String>, indent_width: Option<usize>| {
                let indices: Vec<String> = indices.iter().map(Value::to_string).collect();
                k.store_output(&indices, &val, mask.as_deref(), indent_width).map_err(|err| stash(&slot, err))
            },
        );

        let (k, slot) = (kernel.clone(), Arc::clone(fault));
        env.add_function("describe", move |buffer: String, alias: Option<String>| {
            let alias = alias.unwrap_or_else(|| buffer.clone());
            k.describe_buffer(&buffer, &alias).map(|desc| Value::from_serialize(&desc)).map_err(|err| stash(&slot, err))
        });

        env.add_function("tensor_from_dlpack", |buffer: String, target: String| {
            TemplateKernel::tensor_conversion_code(&buffer, &target)
        });
        env.add_function("split_and_set_ranges", |ranges: Value| ranges);

        env
    }
}

impl KernelTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    /// Errors raised by the kernel from inside a template function are
    /// returned as they are; only engine failures become `Error::Template`.
    fn render(&self, kernel: &TemplateKernel, bindings: Bindings) -> Result<String> {
        let fault = FaultSlot::default();
        let env = self.environment(kernel, &fault);

        let mut ctx = bindings;
        ctx.insert("kernel_name".to_string(), Value::from(kernel.kernel_name()));
        ctx.insert("input_nodes".to_string(), Value::from(kernel.input_names()));
        ctx.insert("output_node".to_string(), Value::from(kernel.output_buffer_name()));

        match env.render_str(&self.source, &ctx) {
            Ok(code) => Ok(code),
            Err(source) => Err(fault.lock().take().unwrap_or(Error::Template { source })),
        }
    }
}

/// First kernel error raised by a template function during one render.
type FaultSlot = Arc<Mutex<Option<Error>>>;

fn stash(slot: &FaultSlot, err: Error) -> minijinja::Error {
    let engine = minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string());
    slot.lock().get_or_insert(err);
    engine
}
