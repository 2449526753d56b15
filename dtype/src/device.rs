use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidDeviceSnafu, Result};

/// Device a buffer is placed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda {
        device_id: usize,
    },
    Metal {
        device_id: usize,
    },
}

impl DeviceSpec {
    /// Parse a device string.
    ///
    /// - "cpu" -> `DeviceSpec::Cpu`
    /// - "cuda:1" -> `DeviceSpec::Cuda { device_id: 1 }`
    /// - "cuda" / "gpu" -> `DeviceSpec::Cuda { device_id: 0 }`
    /// - "mps" / "metal:0" -> `DeviceSpec::Metal { device_id: 0 }`
    pub fn parse(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        let (kind, index) = match lowered.split_once(':') {
            Some((kind, index)) => (kind, Some(index)),
            None => (lowered.as_str(), None),
        };

        let device_id = match index {
            Some(index) => index.parse().map_err(|_| Error::InvalidDevice { device: s.to_string() })?,
            None => 0,
        };

        match kind {
            "cpu" if index.is_none() => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda { device_id }),
            "metal" | "mps" => Ok(Self::Metal { device_id }),
            _ => InvalidDeviceSnafu { device: s }.fail(),
        }
    }

    pub const fn is_gpu(&self) -> bool {
        !matches!(self, Self::Cpu)
    }
}

impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda { device_id } => write!(f, "cuda:{device_id}"),
            Self::Metal { device_id } => write!(f, "mps:{device_id}"),
        }
    }
}
