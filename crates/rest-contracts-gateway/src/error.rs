//! Gateway adapter errors.

use thiserror::Error;

/// Failures outside a handler's control.
///
/// Handler and request errors never surface here; they become error
/// responses.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The event document could not be parsed.
    #[error("Invalid gateway event: {0}")]
    InvalidEvent(#[source] serde_json::Error),

    /// The response could not be serialized.
    #[error("Failed to serialize gateway response: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_event_message() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = GatewayError::InvalidEvent(source);
        assert!(err.to_string().starts_with("Invalid gateway event:"));
    }
}
