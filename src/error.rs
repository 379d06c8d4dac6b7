use thiserror::Error;

/// Failure taxonomy for the trading pipeline.
///
/// Every variant is recoverable: a failure short-circuits the current
/// symbol's cycle and the scheduler moves on to the next symbol.
#[derive(Debug, Error)]
pub enum BotError {
    /// Network or HTTP-level failure, including body decode errors
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Locally detected bad input: unknown interval, short history, zero balance
    #[error("validation failure: {0}")]
    Validation(String),

    /// Exchange answered with a non-success status
    #[error("exchange rejected request ({status}): {message}")]
    Rejection { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display_includes_status_and_body() {
        let err = BotError::Rejection {
            status: 400,
            message: "insufficient balance".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("insufficient balance"));
    }

    #[test]
    fn test_validation_display() {
        let err = BotError::Validation("unsupported interval: 2h".to_string());
        assert!(err.to_string().contains("unsupported interval"));
    }
}
