//! Code generation configuration.
//!
//! Supports both explicit configuration through a bon builder and
//! environment variable fallbacks.

use bon::bon;

use crate::error::{InvalidConfigSnafu, Result};

/// Configuration shared by every template kernel of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Symbol bound to the kernel's output buffer by `def_kernel`.
    pub output_name: String,
    /// Default indentation applied to store-output epilogue continuation lines.
    pub indent_width: usize,
    /// Fail final assembly when a known placeholder is left in the code.
    pub strict_placeholders: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self { output_name: "output".to_string(), indent_width: 0, strict_placeholders: true }
    }
}

#[bon]
impl CodegenConfig {
    /// Create a configuration with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(into, default = String::from("output"))] output_name: String,
        #[builder(default = 0)] indent_width: usize,
        #[builder(default = true)] strict_placeholders: bool,
    ) -> Self {
        Self { output_name, indent_width, strict_placeholders }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KILN_OUTPUT_NAME` - Output buffer symbol (default: `output`)
    /// * `KILN_INDENT` - Epilogue continuation indentation (default: 0)
    /// * `KILN_LENIENT_PLACEHOLDERS` - Leave unresolved placeholders in place if set
    pub fn from_env() -> Self {
        let output_name = std::env::var("KILN_OUTPUT_NAME").unwrap_or_else(|_| "output".to_string());
        let indent_width = std::env::var("KILN_INDENT").ok().and_then(|s| s.parse().ok()).unwrap_or(0);
        let strict_placeholders = std::env::var("KILN_LENIENT_PLACEHOLDERS").is_err();

        Self { output_name, indent_width, strict_placeholders }
    }

    /// Check that the output symbol can be used as a parameter name.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.output_name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return InvalidConfigSnafu { reason: format!("output name '{}' is not an identifier", self.output_name) }
                .fail();
        }
        Ok(())
    }
}
