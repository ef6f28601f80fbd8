//! Error taxonomy shared by the services, the HTTP server, and the CLI.
//!
//! Every failure a mode operation can produce is a [`ScoutError`]. The HTTP
//! layer maps each variant to a status code with [`ScoutError::status_code`];
//! the CLI prints the `Display` form.
//!
//! | Variant | HTTP |
//! |---------|------|
//! | [`InvalidInput`](ScoutError::InvalidInput) | 400 |
//! | [`NoAnswer`](ScoutError::NoAnswer) | 404 |
//! | [`ConfigurationMissing`](ScoutError::ConfigurationMissing) | 500 |
//! | [`Upstream`](ScoutError::Upstream) | 500 |
//! | [`Schema`](ScoutError::Schema) | 500 |
//! | [`CreateFailed`](ScoutError::CreateFailed) | 500 |
//! | [`PollFailed`](ScoutError::PollFailed) | 500 |
//! | [`TaskFailed`](ScoutError::TaskFailed) | 500 |
//! | [`Cancelled`](ScoutError::Cancelled) | 503 |
//! | [`TimedOut`](ScoutError::TimedOut) | 504 |

use axum::http::StatusCode;

/// Message returned when the answer endpoint produces no text.
pub const NO_ANSWER_MESSAGE: &str =
    "Unable to generate an answer. Please try a different question.";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoutError {
    /// The caller supplied an empty or malformed request.
    #[error("{0}")]
    InvalidInput(String),

    /// No Exa API key was present in the environment at startup.
    #[error("Exa API key not configured")]
    ConfigurationMissing,

    /// Transport failure or non-2xx response from the Exa API.
    #[error("{0}")]
    Upstream(String),

    /// The Exa API answered with a payload we could not decode.
    #[error("unexpected response from Exa API: {0}")]
    Schema(String),

    /// The answer endpoint returned empty or whitespace-only text.
    #[error("{}", NO_ANSWER_MESSAGE)]
    NoAnswer,

    /// Creating a research task failed or yielded no task id.
    #[error("{0}")]
    CreateFailed(String),

    /// A status request for a research task failed.
    #[error("{0}")]
    PollFailed(String),

    /// The research task reached the remote `failed` state.
    #[error("Research task failed")]
    TaskFailed { task_id: String },

    /// The poll budget ran out before the task reached a terminal state.
    #[error("Research task timed out")]
    TimedOut { task_id: String, attempts: u32 },

    /// The poll loop was aborted by its cancellation token.
    #[error("Research task cancelled")]
    Cancelled,
}

impl ScoutError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScoutError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScoutError::NoAnswer => StatusCode::NOT_FOUND,
            ScoutError::ConfigurationMissing
            | ScoutError::Upstream(_)
            | ScoutError::Schema(_)
            | ScoutError::CreateFailed(_)
            | ScoutError::PollFailed(_)
            | ScoutError::TaskFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ScoutError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ScoutError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Research outcome tag carried next to the message in error bodies.
    pub fn research_status(&self) -> Option<&'static str> {
        match self {
            ScoutError::TaskFailed { .. } => Some("failed"),
            ScoutError::TimedOut { .. } => Some("timeout"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ScoutError::InvalidInput("Query is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ScoutError::NoAnswer.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ScoutError::ConfigurationMissing.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScoutError::TimedOut {
                task_id: "t".into(),
                attempts: 60
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_messages_pass_through() {
        let err = ScoutError::Upstream("Exa API error: 401 Unauthorized: bad key".into());
        assert_eq!(err.to_string(), "Exa API error: 401 Unauthorized: bad key");
        assert_eq!(
            ScoutError::ConfigurationMissing.to_string(),
            "Exa API key not configured"
        );
        assert_eq!(ScoutError::NoAnswer.to_string(), NO_ANSWER_MESSAGE);
    }

    #[test]
    fn test_research_status_tags() {
        let failed = ScoutError::TaskFailed {
            task_id: "r1".into(),
        };
        assert_eq!(failed.research_status(), Some("failed"));
        assert_eq!(failed.to_string(), "Research task failed");
        assert_eq!(ScoutError::Cancelled.research_status(), None);
    }
}
