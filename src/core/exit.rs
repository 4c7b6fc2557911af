//! Process exit codes.

/// Exit status of a `kiln` process.
///
/// Configuration and execution failures are distinct so that scripts can
/// tell "nothing ran" from "something ran and failed midway".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Normal = 0,
    CommandLineError = 1,
    ConfigurationError = 2,
    ExecutionError = 3,
    UnhandledError = 4,
}

impl ExitCode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExitCode::Normal.code(), 0);
        assert_eq!(ExitCode::CommandLineError.code(), 1);
        assert_eq!(ExitCode::ConfigurationError.code(), 2);
        assert_eq!(ExitCode::ExecutionError.code(), 3);
        assert_eq!(ExitCode::UnhandledError.code(), 4);
        assert!(ExitCode::Normal.is_success());
        assert!(!ExitCode::ExecutionError.is_success());
    }
}
