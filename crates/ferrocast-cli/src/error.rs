use ferrocast_core::CoreError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ferrocast_core::ValidationError),

    #[error(transparent)]
    Analysis(#[from] ferrocast_core::AnalysisError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("strict mode failed: warnings={warning_count}")]
    StrictModeViolation { warning_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(error) => Self::Validation(error),
            CoreError::Analysis(error) => Self::Analysis(error),
            CoreError::Config(message) => Self::Config(message),
            CoreError::Serialization(error) => Self::Serialization(error),
            CoreError::Io(error) => Self::Io(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Analysis(_) => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_core_errors_to_exit_codes() {
        let config: CliError = CoreError::Config(String::from("bad")).into();
        assert_eq!(config.exit_code(), 2);

        let analysis: CliError =
            CoreError::Analysis(ferrocast_core::AnalysisError::NoOverlappingDates).into();
        assert_eq!(analysis.exit_code(), 3);

        let io: CliError = CoreError::Io(std::io::Error::other("disk")).into();
        assert_eq!(io.exit_code(), 10);
        assert_eq!(CliError::StrictModeViolation { warning_count: 1 }.exit_code(), 5);
    }
}
