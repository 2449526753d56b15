//! Error types for template kernel code generation.

use snafu::Snafu;

use crate::region::RegionId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while generating one template kernel.
///
/// All of these are contract violations by the template or the pipeline
/// driving it. They abort generation of the affected kernel only.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A region was explicitly created twice.
    #[snafu(display("region {region} already exists"))]
    DuplicateRegion { region: RegionId },

    /// A placeholder token was registered twice.
    #[snafu(display("render hook for {token} already registered"))]
    DuplicateHook { token: String },

    /// A placeholder survived final assembly without a hook to produce it.
    #[snafu(display("placeholder {token} left unresolved"))]
    UnresolvedPlaceholder { token: String },

    /// The template asked for a buffer the kernel does not own.
    #[snafu(display("unknown buffer '{name}'"))]
    UnknownBuffer { name: String },

    /// Fault raised by an external buffer or layout accessor.
    #[snafu(display("{source}"))]
    Accessor { source: Box<dyn std::error::Error + Send + Sync> },

    /// The template engine failed while expanding the kernel template.
    #[snafu(display("template rendering failed: {source}"))]
    Template { source: minijinja::Error },

    /// Invalid configuration or parameters.
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },
}

impl Error {
    /// Wrap an external accessor fault without reinterpreting it.
    pub fn accessor(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Accessor { source: Box::new(source) }
    }
}
