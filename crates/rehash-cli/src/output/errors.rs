//! Error message formatting with actionable suggestions.

use std::error::Error;

use rehash_core::error::RehashError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    /// Format an error with its suggestion and cause chain
    pub fn format_error(&self, error: &RehashError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        output
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> ErrorFormatter {
        ErrorFormatter {
            colors: ColorSupport::disabled(),
        }
    }

    #[test]
    fn test_format_includes_cause_and_help() {
        let err = RehashError::io(
            "Failed to open input".to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let text = plain().format_error(&err);

        assert!(text.starts_with("error: IO error: Failed to open input\n"));
        assert!(text.contains("caused by: no such file\n"));
    }

    #[test]
    fn test_format_config_error_has_help() {
        let err = RehashError::ConfigValidation {
            field: "target.algorithm".to_string(),
            reason: "unsupported".to_string(),
        };
        let text = plain().format_error(&err);
        assert!(text.contains("help: "));
    }
}
