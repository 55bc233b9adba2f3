use std::time::Duration;

use crate::engine::EngineError;

#[derive(thiserror::Error, Debug)]
pub enum LaunchError {
    #[error("failed to run image; could not connect to the engine")]
    Connect(#[source] EngineError),
    #[error("failed to run image; pull of {reference} failed")]
    Pull {
        reference: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to run image; could not write pull progress")]
    Progress(#[source] std::io::Error),
    #[error("failed to run image; create failed")]
    Create(#[source] EngineError),
    #[error("failed to run image; start of {id} failed")]
    Start {
        id: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to run image; inspect of {id} failed")]
    Inspect {
        id: String,
        #[source]
        source: EngineError,
    },
    #[error("failed to run image; {operation} did not finish within {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("failed to stop running image {id}")]
    Stop {
        id: String,
        #[source]
        source: EngineError,
    },
}

impl LaunchError {
    /// The engine error underneath, if the engine is what failed
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            LaunchError::Connect(source)
            | LaunchError::Pull { source, .. }
            | LaunchError::Create(source)
            | LaunchError::Start { source, .. }
            | LaunchError::Inspect { source, .. }
            | LaunchError::Stop { source, .. } => Some(source),
            LaunchError::Progress(_) | LaunchError::Timeout { .. } => None,
        }
    }
}
