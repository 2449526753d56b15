//! Argument table and host-side argument binding.

use std::fmt;

/// Insertion-ordered buffer name -> call symbol map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferMap {
    entries: Vec<(String, String)>,
}

impl BufferMap {
    /// Bind `buffer` to `symbol`. Rebinding keeps the original position.
    pub fn insert(&mut self, buffer: impl Into<String>, symbol: impl Into<String>) {
        let buffer = buffer.into();
        let symbol = symbol.into();
        match self.entries.iter_mut().find(|(name, _)| *name == buffer) {
            Some((_, bound)) => *bound = symbol,
            None => self.entries.push((buffer, symbol)),
        }
    }

    pub fn get(&self, buffer: &str) -> Option<&str> {
        self.entries.iter().find(|(name, _)| name == buffer).map(|(_, symbol)| symbol.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(buffer, symbol)| (buffer.as_str(), symbol.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which compiler buffer each kernel parameter symbol refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelArgs {
    pub input_buffers: BufferMap,
    pub output_buffers: BufferMap,
}

impl KernelArgs {
    pub fn is_empty(&self) -> bool {
        self.input_buffers.is_empty() && self.output_buffers.is_empty()
    }
}

/// Declared type of a host-side call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ArgType {
    /// Device tensor passed by reference.
    Tensor,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tensor => f.write_str("torch.Tensor"),
        }
    }
}

/// Parameter and call argument lists derived from an argument table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgDefs {
    /// Parameter names inside the kernel definition.
    pub param_defs: Vec<String>,
    /// Buffer names passed at the call site.
    pub call_args: Vec<String>,
    /// Kernel parameter each call argument binds to.
    pub call_arg_names: Vec<String>,
    pub arg_types: Vec<ArgType>,
}

/// Turns an argument table into host-side call arguments.
pub trait ArgBinder {
    fn argdefs(&self, args: &KernelArgs) -> ArgDefs;
}

/// Binds every buffer as a tensor argument: inputs first, then outputs.
///
/// A buffer that is both read and written is passed once.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorArgBinder;

impl ArgBinder for TensorArgBinder {
    fn argdefs(&self, args: &KernelArgs) -> ArgDefs {
        let mut defs = ArgDefs::default();
        for (buffer, symbol) in args.input_buffers.iter().chain(args.output_buffers.iter()) {
            if defs.call_args.iter().any(|arg| arg == buffer) {
                continue;
            }
            defs.param_defs.push(symbol.to_string());
            defs.call_args.push(buffer.to_string());
            defs.call_arg_names.push(symbol.to_string());
            defs.arg_types.push(ArgType::Tensor);
        }
        defs
    }
}
