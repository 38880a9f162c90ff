use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type LinkResult<T> = Result<T, LinkError>;

/// Failure class of a run; each class owns one process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkErrorCategory {
    /// Out-of-range or malformed settings and tables, caught before the loop.
    ConfigurationError,
    IoSystemError,
    /// The orientation fit had too few, or only collinear, indexed peaks.
    DegenerateFitError,
    InternalError,
}

impl LinkErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ConfigurationError => 2,
            Self::IoSystemError => 3,
            Self::DegenerateFitError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ConfigurationError => "ConfigurationError",
            Self::IoSystemError => "IoSystemError",
            Self::DegenerateFitError => "DegenerateFitError",
            Self::InternalError => "InternalError",
        }
    }
}

impl Display for LinkErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error surfaced by every fallible operation of a linking run.
///
/// `code` is a stable dotted identifier such as `INPUT.QTOLERANCE` or
/// `RUN.DEGENERATE_FIT`; configuration errors use the offending field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} [{code}] {message}")]
pub struct LinkError {
    category: LinkErrorCategory,
    code: &'static str,
    message: String,
}

impl LinkError {
    pub fn new(
        category: LinkErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn configuration(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LinkErrorCategory::ConfigurationError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LinkErrorCategory::IoSystemError, code, message)
    }

    pub fn degenerate_fit(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LinkErrorCategory::DegenerateFitError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(LinkErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> LinkErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// `ERROR: [CODE] message`, the first stderr line of a failed run.
    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkError, LinkErrorCategory};

    #[test]
    fn every_category_has_its_own_nonzero_exit_code() {
        let categories = [
            LinkErrorCategory::ConfigurationError,
            LinkErrorCategory::IoSystemError,
            LinkErrorCategory::DegenerateFitError,
            LinkErrorCategory::InternalError,
        ];
        let codes: Vec<i32> = categories
            .iter()
            .map(|category| category.exit_code())
            .collect();
        assert_eq!(codes, [2, 3, 4, 5]);
    }

    #[test]
    fn configuration_error_renders_field_code() {
        let error = LinkError::configuration(
            "INPUT.QDECREMENT",
            "QDecrement must lie in [0, 1], got 1.5",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.QDECREMENT] QDecrement must lie in [0, 1], got 1.5"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 2");
        assert_eq!(
            error.to_string(),
            "ConfigurationError [INPUT.QDECREMENT] QDecrement must lie in [0, 1], got 1.5"
        );
    }

    #[test]
    fn degenerate_fit_exits_with_four() {
        let error = LinkError::degenerate_fit("RUN.DEGENERATE_FIT", "1 indexed peak");
        assert_eq!(error.category().to_string(), "DegenerateFitError");
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 4");
    }
}
