//! Template kernel context.
//!
//! [`TemplateKernel`] is the object a kernel template talks to while it is
//! being expanded, and the object the surrounding compiler uses to render the
//! template and emit the host-side call.
//!
//! # Two passes
//!
//! ```text
//! template ── render ──> code with <DEF_KERNEL>, <STORE_OUTPUT>, ...
//!                               │
//!          partial_render / finalize (hooks read the regions)
//!                               ▼
//!                        final kernel source
//! ```
//!
//! The state lives behind `Arc<Mutex<_>>` because template functions and
//! hooks must be `Send + Sync + 'static`. Hooks only hold a weak reference,
//! and they are always invoked with the lock released.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use bon::bon;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::args::{ArgBinder, ArgType, KernelArgs, TensorArgBinder};
use crate::buffer::IndentedBuffer;
use crate::config::CodegenConfig;
use crate::descriptor::{KernelBuffer, TensorDescriptor, describe};
use crate::error::{Result, UnknownBufferSnafu};
use crate::hooks::{HookRegistry, PartialRender};
use crate::region::{RegionHost, RegionId, RegionState, RegionStore};
use crate::template::{Bindings, KernelTemplate};
use crate::wrapper::WrapperCodegen;

/// Grid and block dimensions requested by the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchConfig {
    pub grid: Option<SmallVec<[usize; 3]>>,
    pub block: Option<SmallVec<[usize; 3]>>,
}

/// Mutable state of one template kernel.
///
/// The `active` region state is the single rendering surface; every region
/// swaps its own state in while it is entered.
pub struct KernelState {
    kernel_name: String,
    input_nodes: Vec<Arc<dyn KernelBuffer>>,
    output_node: Option<Arc<dyn KernelBuffer>>,
    config: CodegenConfig,

    active: RegionState,
    regions: RegionStore,
    hooks: HookRegistry,
    args: KernelArgs,

    named_input_nodes: HashMap<String, Arc<dyn KernelBuffer>>,
    tensors: HashMap<String, TensorDescriptor>,
    launch: LaunchConfig,
    extra_args: Vec<(String, String)>,
    prologue_fused_inputs: BTreeSet<String>,
    prologue_fused_inputs_preserve_zero: BTreeSet<String>,
}

impl RegionHost for KernelState {
    fn region_parts(&mut self) -> (&mut RegionStore, &mut RegionState) {
        (&mut self.regions, &mut self.active)
    }
}

impl KernelState {
    pub fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    /// State of the region currently entered (or the root state).
    pub fn active(&self) -> &RegionState {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut RegionState {
        &mut self.active
    }

    pub fn body_mut(&mut self) -> &mut IndentedBuffer {
        &mut self.active.body
    }

    pub fn regions(&self) -> &RegionStore {
        &self.regions
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn args(&self) -> &KernelArgs {
        &self.args
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Alias argument names to inputs by position and bind the output symbol.
    fn bind_signature(&mut self, argnames: &[&str]) {
        for (i, (name, node)) in argnames.iter().zip(&self.input_nodes).enumerate() {
            self.named_input_nodes.insert(name.to_string(), Arc::clone(node));
            let buffer = node.name().unwrap_or_else(|| format!("input_{i}"));
            self.args.input_buffers.insert(buffer, *name);
        }

        if let Some(output) = &self.output_node {
            let buffer = output.name().unwrap_or_else(|| "out".to_string());
            self.args.output_buffers.insert(buffer, self.config.output_name.clone());
        }
    }

    /// One tensor argument per input and output buffer, used when the
    /// template never declared a signature.
    fn positional_call_args(&self) -> (Vec<String>, Vec<ArgType>) {
        let mut call_args: Vec<String> = self
            .input_nodes
            .iter()
            .enumerate()
            .map(|(i, node)| node.name().unwrap_or_else(|| format!("arg{i}")))
            .collect();
        if let Some(output) = &self.output_node {
            call_args.push(output.name().unwrap_or_else(|| "out".to_string()));
        }
        let arg_types = vec![ArgType::Tensor; call_args.len()];
        (call_args, arg_types)
    }

    fn find_buffer(&self, name: &str) -> Option<Arc<dyn KernelBuffer>> {
        if let Some(node) = self.named_input_nodes.get(name) {
            return Some(Arc::clone(node));
        }
        if let Some(node) = self.input_nodes.iter().find(|node| node.name().as_deref() == Some(name)) {
            return Some(Arc::clone(node));
        }
        self.output_node
            .as_ref()
            .filter(|node| name == self.config.output_name || node.name().as_deref() == Some(name))
            .map(Arc::clone)
    }
}

/// Handle to the context of one template kernel. Cloning shares the state.
#[derive(Clone)]
pub struct TemplateKernel {
    state: Arc<Mutex<KernelState>>,
}

impl fmt::Debug for TemplateKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TemplateKernel")
            .field("kernel_name", &state.kernel_name)
            .field("inputs", &state.input_nodes.len())
            .field("regions", &state.regions.len())
            .field("hooks", &state.hooks)
            .finish()
    }
}

#[bon]
impl TemplateKernel {
    /// Create a template kernel with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(into)] kernel_name: String,
        #[builder(default)] input_nodes: Vec<Arc<dyn KernelBuffer>>,
        output_node: Option<Arc<dyn KernelBuffer>>,
        #[builder(default)] config: CodegenConfig,
    ) -> Self {
        Self::with_config(kernel_name, input_nodes, output_node, config)
    }
}

impl TemplateKernel {
    pub fn new(
        kernel_name: impl Into<String>,
        input_nodes: Vec<Arc<dyn KernelBuffer>>,
        output_node: Option<Arc<dyn KernelBuffer>>,
    ) -> Self {
        Self::with_config(kernel_name, input_nodes, output_node, CodegenConfig::default())
    }

    pub fn with_config(
        kernel_name: impl Into<String>,
        input_nodes: Vec<Arc<dyn KernelBuffer>>,
        output_node: Option<Arc<dyn KernelBuffer>>,
        config: CodegenConfig,
    ) -> Self {
        let named_input_nodes = input_nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name().unwrap_or_else(|| format!("input_{i}")), Arc::clone(node)))
            .collect();

        let state = KernelState {
            kernel_name: kernel_name.into(),
            input_nodes,
            output_node,
            config,
            active: RegionState::default(),
            regions: RegionStore::new(),
            hooks: HookRegistry::new(),
            args: KernelArgs::default(),
            named_input_nodes,
            tensors: HashMap::new(),
            launch: LaunchConfig::default(),
            extra_args: Vec::new(),
            prologue_fused_inputs: BTreeSet::new(),
            prologue_fused_inputs_preserve_zero: BTreeSet::new(),
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Run `f` with exclusive access to the kernel state.
    ///
    /// Must not resolve placeholders from inside `f`: hooks lock the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut KernelState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn kernel_name(&self) -> String {
        self.state.lock().kernel_name.clone()
    }

    /// Names of the input buffers, synthetic (`input_{i}`) for unnamed ones.
    pub fn input_names(&self) -> Vec<String> {
        let state = self.state.lock();
        state.input_nodes.iter().enumerate().map(|(i, node)| node.name().unwrap_or_else(|| format!("input_{i}"))).collect()
    }

    pub fn output_buffer_name(&self) -> Option<String> {
        let state = self.state.lock();
        state.output_node.as_ref().map(|node| node.name().unwrap_or_else(|| "out".to_string()))
    }

    pub fn args(&self) -> KernelArgs {
        self.state.lock().args.clone()
    }

    pub fn active_region(&self) -> RegionState {
        self.state.lock().active.clone()
    }

    pub fn region(&self, id: &RegionId) -> Option<RegionState> {
        self.state.lock().regions.get(id).cloned()
    }

    pub fn named_input(&self, name: &str) -> Option<Arc<dyn KernelBuffer>> {
        self.state.lock().named_input_nodes.get(name).cloned()
    }

    // ------------------------------------------------------------------------
    // Template-facing operations
    // ------------------------------------------------------------------------

    /// Define the kernel signature; returns the `<DEF_KERNEL>` placeholder.
    ///
    /// Binds `argnames` to the input buffers by position and the configured
    /// output symbol to the output buffer. Fails with `DuplicateHook` when the
    /// signature was already defined.
    pub fn def_kernel<S: AsRef<str>>(&self, argnames: &[S]) -> Result<String> {
        let id = RegionId::DefKernel;
        let argnames: Vec<&str> = argnames.iter().map(AsRef::as_ref).collect();

        let mut state = self.state.lock();
        state.hooks.ensure_vacant(&id)?;
        state.bind_signature(&argnames);

        let kernel_name = state.kernel_name.clone();
        state.with_region(id.clone(), |state| {
            let body = state.body_mut();
            body.writeline(format!("# CuTe DSL kernel: {kernel_name}"));
            if argnames.is_empty() {
                body.writeline(format!("def {kernel_name}():"));
            } else {
                let args = argnames.join(", ");
                body.writeline(format!("# Arguments: {args}"));
                body.writeline(format!("def {kernel_name}({args}):"));
            }
        });

        state.hooks.register(id.clone(), region_hook(Arc::downgrade(&self.state), id.clone(), 0))?;
        tracing::debug!(kernel.name = %kernel_name, args = argnames.len(), "defined kernel signature");
        Ok(id.token().into_owned())
    }

    /// Record the output store; returns the `<STORE_OUTPUT>` placeholder.
    ///
    /// Continuation lines of the resolved epilogue are indented by
    /// `indent_width` spaces (configured default when `None`).
    pub fn store_output<S: AsRef<str>>(
        &self,
        indices: &[S],
        val: &str,
        mask: Option<&str>,
        indent_width: Option<usize>,
    ) -> Result<String> {
        let id = RegionId::StoreOutput;

        let mut state = self.state.lock();
        state.hooks.ensure_vacant(&id)?;
        let indent_width = indent_width.unwrap_or(state.config.indent_width);

        state.with_region(id.clone(), |state| {
            let active = state.active_mut();
            active.mask = mask.map(str::to_string);
            active.out = Some(val.to_string());
            active.indices = Some(indices.iter().map(|index| index.as_ref().to_string()).collect());

            active.body.writeline(format!("# Store output: {val}"));
            if let Some(mask) = mask.filter(|mask| !mask.is_empty()) {
                active.body.writeline(format!("# Mask: {mask}"));
            }
        });

        state.hooks.register(id.clone(), region_hook(Arc::downgrade(&self.state), id.clone(), indent_width))?;
        tracing::debug!(kernel.name = %state.kernel_name, val, mask, "recorded output store");
        Ok(id.token().into_owned())
    }

    /// Ranges are used as given; this kernel kind does no range splitting.
    pub fn split_and_set_ranges<T>(&self, ranges: T) -> T {
        ranges
    }

    /// Describe `buffer` as `name` and remember the descriptor under `name`.
    pub fn describe(&self, buffer: &dyn KernelBuffer, name: &str) -> Result<TensorDescriptor> {
        let desc = describe(buffer, name)?;
        self.state.lock().tensors.insert(name.to_string(), desc.clone());
        Ok(desc)
    }

    /// Describe the buffer known to this kernel as `buffer_name`.
    ///
    /// Looks at argument aliases, buffer names, and the output symbol.
    pub fn describe_buffer(&self, buffer_name: &str, name: &str) -> Result<TensorDescriptor> {
        let buffer = self.state.lock().find_buffer(buffer_name);
        match buffer {
            Some(buffer) => self.describe(buffer.as_ref(), name),
            None => UnknownBufferSnafu { name: buffer_name }.fail(),
        }
    }

    pub fn descriptor(&self, name: &str) -> Option<TensorDescriptor> {
        self.state.lock().tensors.get(name).cloned()
    }

    /// Code converting a host tensor into a CuTe tensor.
    pub fn tensor_conversion_code(buffer_name: &str, target_name: &str) -> String {
        format!("{target_name} = cute.tensor_from_dlpack({buffer_name})")
    }

    pub fn configure_kernel_launch(&self, grid: &[usize], block: Option<&[usize]>) {
        let mut state = self.state.lock();
        state.launch.grid = Some(SmallVec::from_slice(grid));
        if let Some(block) = block {
            state.launch.block = Some(SmallVec::from_slice(block));
        }
    }

    pub fn launch_config(&self) -> LaunchConfig {
        self.state.lock().launch.clone()
    }

    /// Append an extra named argument for kernel execution.
    pub fn add_kernel_arg(&self, name: impl Into<String>, value: impl fmt::Display) {
        self.state.lock().extra_args.push((name.into(), value.to_string()));
    }

    pub fn kernel_args(&self) -> Vec<(String, String)> {
        self.state.lock().extra_args.clone()
    }

    /// Mark an input whose producer was fused into this kernel's prologue.
    pub fn mark_prologue_fused(&self, buffer_name: impl Into<String>, preserve_zero: bool) {
        let buffer_name = buffer_name.into();
        let mut state = self.state.lock();
        if preserve_zero {
            state.prologue_fused_inputs_preserve_zero.insert(buffer_name.clone());
        }
        state.prologue_fused_inputs.insert(buffer_name);
    }

    pub fn prologue_fused_inputs(&self) -> Vec<String> {
        self.state.lock().prologue_fused_inputs.iter().cloned().collect()
    }

    pub fn prologue_fused_inputs_preserve_zero(&self) -> Vec<String> {
        self.state.lock().prologue_fused_inputs_preserve_zero.iter().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Compiler-facing operations
    // ------------------------------------------------------------------------

    /// Expand `template` (pass 1). Placeholders are returned unresolved.
    #[tracing::instrument(skip_all, fields(kernel.name = %self.kernel_name(), template = template.name()))]
    pub fn render(&self, template: &dyn KernelTemplate, bindings: Bindings) -> Result<String> {
        self.state.lock().config.validate()?;
        let code = template.render(self, bindings)?;
        tracing::debug!(len = code.len(), hooks = self.state.lock().hooks.len(), "rendered kernel template");
        Ok(code)
    }

    /// Pair pass-1 `code` with this kernel's hooks for staged resolution.
    ///
    /// Built-in placeholders and the tokens of every created region count as
    /// expected: they must not survive final assembly in strict mode.
    pub fn partial_render(&self, code: impl Into<String>) -> PartialRender {
        let state = self.state.lock();
        let expected: Vec<RegionId> = [RegionId::DefKernel, RegionId::StoreOutput]
            .into_iter()
            .chain(state.regions.ids().cloned())
            .collect();
        PartialRender::new(code, state.hooks.clone()).expect(expected).strict(state.config.strict_placeholders)
    }

    /// Substitute every registered placeholder in `code`.
    pub fn resolve(&self, code: &str) -> String {
        let hooks = self.state.lock().hooks.clone();
        hooks.resolve_all(code)
    }

    /// Run pass 2 over `code` and check nothing was left unresolved.
    pub fn finalize(&self, code: impl Into<String>) -> Result<String> {
        self.partial_render(code).finalize_all()
    }

    /// Emit the host-side invocation of this kernel as `name`.
    pub fn emit_call_site(
        &self,
        name: &str,
        node: Option<&dyn KernelBuffer>,
        wrapper: &mut dyn WrapperCodegen,
    ) -> Result<()> {
        self.emit_call_site_with(name, node, &TensorArgBinder, wrapper)
    }

    /// Like [`emit_call_site`](Self::emit_call_site) with a custom binder.
    ///
    /// The argument table is used once the signature has been defined;
    /// before that every buffer becomes one positional tensor argument.
    #[tracing::instrument(skip_all, fields(kernel.name = name))]
    pub fn emit_call_site_with(
        &self,
        name: &str,
        node: Option<&dyn KernelBuffer>,
        binder: &dyn ArgBinder,
        wrapper: &mut dyn WrapperCodegen,
    ) -> Result<()> {
        let (call_args, arg_types) = {
            let state = self.state.lock();
            if state.args.is_empty() {
                state.positional_call_args()
            } else {
                let defs = binder.argdefs(&state.args);
                (defs.call_args, defs.arg_types)
            }
        };

        tracing::debug!(node = ?node.and_then(|node| node.name()), args = ?call_args, "emitting kernel call site");
        wrapper.generate_kernel_call(name, &call_args, false, &arg_types)
    }

    /// Bytes moved by the kernel. Not modelled; always zero.
    pub fn estimate_kernel_num_bytes(&self) -> f64 {
        0.0
    }

    /// Imports for a standalone benchmark module. Not supported; always empty.
    pub fn imports_for_benchmark_kernel(&self) -> String {
        String::new()
    }

    /// Benchmark harness code. Not supported; always empty.
    pub fn codegen_kernel_benchmark(&self, _num_gb: f64) -> IndentedBuffer {
        IndentedBuffer::new()
    }
}

/// Hook returning the trimmed body of region `id`, continuation lines
/// indented by `indent_width`.
fn region_hook(
    state: Weak<Mutex<KernelState>>,
    id: RegionId,
    indent_width: usize,
) -> impl Fn() -> String + Send + Sync + 'static {
    move || {
        let Some(state) = state.upgrade() else {
            return String::new();
        };
        let state = state.lock();
        state.regions.get(&id).map(|region| indent_continuation(&region.body.trimmed(), indent_width)).unwrap_or_default()
    }
}

fn indent_continuation(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let prefix = " ".repeat(width);
    text.lines()
        .enumerate()
        .map(|(i, line)| if i == 0 || line.trim().is_empty() { line.to_string() } else { format!("{prefix}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}
