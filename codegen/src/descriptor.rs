//! Buffers handed to a template kernel and their flat descriptors.

use std::fmt;

use kiln_dtype::{DType, DeviceSpec};
use serde::{Serialize, Serializer};
use smallvec::SmallVec;

use crate::Result;

pub type Dims = SmallVec<[usize; 4]>;

/// Memory layout of a buffer as reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub size: Dims,
    /// Absent while the layout is still flexible.
    pub stride: Option<Dims>,
    pub dtype: DType,
    pub device: DeviceSpec,
}

impl Layout {
    /// Layout whose strides are not decided yet.
    pub fn flexible(size: &[usize], dtype: DType, device: DeviceSpec) -> Self {
        Self { size: Dims::from_slice(size), stride: None, dtype, device }
    }

    /// Row-major layout.
    pub fn contiguous(size: &[usize], dtype: DType, device: DeviceSpec) -> Self {
        let size = Dims::from_slice(size);
        let mut stride: Dims = smallvec::smallvec![1; size.len()];
        for i in (0..size.len().saturating_sub(1)).rev() {
            stride[i] = stride[i + 1] * size[i + 1];
        }
        Self { size, stride: Some(stride), dtype, device }
    }

    pub fn numel(&self) -> usize {
        self.size.iter().product()
    }
}

/// A compiler buffer as seen by a template kernel.
///
/// `layout` is an external accessor; its faults surface as
/// [`Error::Accessor`](crate::Error::Accessor) and are propagated untouched.
pub trait KernelBuffer: fmt::Debug + Send + Sync {
    /// Name of the buffer in the enclosing program, if it has one.
    fn name(&self) -> Option<String>;

    fn layout(&self) -> Result<Layout>;
}

/// In-memory buffer with a fixed name and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticBuffer {
    name: Option<String>,
    layout: Layout,
}

impl StaticBuffer {
    pub fn new(name: impl Into<String>, layout: Layout) -> Self {
        Self { name: Some(name.into()), layout }
    }

    pub fn anonymous(layout: Layout) -> Self {
        Self { name: None, layout }
    }
}

impl KernelBuffer for StaticBuffer {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn layout(&self) -> Result<Layout> {
        Ok(self.layout.clone())
    }
}

/// Flat, immutable description of a buffer for template consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorDescriptor {
    pub name: String,
    pub shape: Dims,
    pub stride: Option<Dims>,
    #[serde(serialize_with = "serialize_display")]
    pub dtype: DType,
    #[serde(serialize_with = "serialize_display")]
    pub device: DeviceSpec,
}

impl TensorDescriptor {
    pub fn from_layout(name: impl Into<String>, layout: Layout) -> Self {
        let Layout { size, stride, dtype, device } = layout;
        Self { name: name.into(), shape: size, stride, dtype, device }
    }
}

/// Describe `buffer` under the name `name` used in generated code.
pub fn describe(buffer: &dyn KernelBuffer, name: &str) -> Result<TensorDescriptor> {
    let layout = buffer.layout()?;
    Ok(TensorDescriptor::from_layout(name, layout))
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
