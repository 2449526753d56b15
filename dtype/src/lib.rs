//! Element types and devices for kiln tensor descriptors.
//!
//! Templates only ever see a buffer's element type and placement as flat
//! values, so this crate keeps both small: [`DType`] enumerates the scalar
//! element types a kernel buffer can hold, [`DeviceSpec`] names where it lives.

pub mod device;
pub mod error;


pub use device::DeviceSpec;
pub use error::{Error, Result};

/// Scalar element type of a kernel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    Bool,

    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,

    Float16,
    BFloat16,
    Float32,
    Float64,
}

impl DType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// Name of the type on the host side (`torch.float32`).
    pub const fn torch_name(&self) -> &'static str {
        match self {
            Self::Bool => "torch.bool",
            Self::Int8 => "torch.int8",
            Self::UInt8 => "torch.uint8",
            Self::Int16 => "torch.int16",
            Self::UInt16 => "torch.uint16",
            Self::Int32 => "torch.int32",
            Self::UInt32 => "torch.uint32",
            Self::Int64 => "torch.int64",
            Self::UInt64 => "torch.uint64",
            Self::Float16 => "torch.float16",
            Self::BFloat16 => "torch.bfloat16",
            Self::Float32 => "torch.float32",
            Self::Float64 => "torch.float64",
        }
    }

    /// Name of the type inside CuTe DSL kernels (`cutlass.Float32`).
    pub const fn cute_name(&self) -> &'static str {
        match self {
            Self::Bool => "cutlass.Boolean",
            Self::Int8 => "cutlass.Int8",
            Self::UInt8 => "cutlass.Uint8",
            Self::Int16 => "cutlass.Int16",
            Self::UInt16 => "cutlass.Uint16",
            Self::Int32 => "cutlass.Int32",
            Self::UInt32 => "cutlass.Uint32",
            Self::Int64 => "cutlass.Int64",
            Self::UInt64 => "cutlass.Uint64",
            Self::Float16 => "cutlass.Float16",
            Self::BFloat16 => "cutlass.BFloat16",
            Self::Float32 => "cutlass.Float32",
            Self::Float64 => "cutlass.Float64",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.torch_name())
    }
}
