//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Store(_) => exitcode::IOERR,
                InfraError::Application(app) => application_exit_code(app),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    if e.is_integrity_failure() {
        return exitcode::DATAERR;
    }
    match e {
        ApplicationError::NodeNotFound(_) | ApplicationError::ParentNotFound { .. } => {
            exitcode::NOINPUT
        }
        ApplicationError::RootAlreadyExists(_)
        | ApplicationError::InvalidParent { .. }
        | ApplicationError::InvalidTitle => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::Storage { .. } => exitcode::IOERR,
        ApplicationError::LayoutFailed { source, .. } => application_exit_code(source),
        ApplicationError::Domain(DomainError::InvalidLayoutConfig(_)) => exitcode::CONFIG,
        ApplicationError::Domain(_) => exitcode::SOFTWARE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MindmapId, NodeId};
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationError::NodeNotFound(NodeId(1)), exitcode::NOINPUT)]
    #[case(ApplicationError::InvalidTitle, exitcode::DATAERR)]
    #[case(ApplicationError::Config { message: "x".into() }, exitcode::CONFIG)]
    #[case(
        ApplicationError::layout_failed(MindmapId(1), DomainError::CycleDetected(NodeId(2)).into()),
        exitcode::DATAERR
    )]
    #[case(
        ApplicationError::layout_failed(MindmapId(1), ApplicationError::NodeNotFound(NodeId(2))),
        exitcode::NOINPUT
    )]
    #[case(
        ApplicationError::layout_failed(
            MindmapId(1),
            DomainError::InvalidLayoutConfig("base_radius must be positive".into()).into()
        ),
        exitcode::CONFIG
    )]
    fn given_application_error_when_mapping_then_sysexits_code(
        #[case] err: ApplicationError,
        #[case] expected: i32,
    ) {
        assert_eq!(CliError::from(err).exit_code(), expected);
    }

    #[test]
    fn given_usage_error_when_mapping_then_usage_code() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), exitcode::USAGE);
    }
}
