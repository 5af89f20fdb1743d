//! Handshake bookkeeping: which in-flight ids belong to `signin` / `use`.
//!
//! Replies to these ids flip the readiness flags and are never handed to a
//! caller.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use surrealkit_protocol::Method;

/// One step of the post-connect handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStep {
    /// `signin`; acknowledged with an empty string.
    Signin,
    /// `use`; acknowledged with `null`.
    Use,
}

impl HandshakeStep {
    pub fn method(&self) -> Method {
        match self {
            HandshakeStep::Signin => Method::Signin,
            HandshakeStep::Use => Method::Use,
        }
    }

    /// Returns whether `result` has the success shape designated for this step.
    pub fn is_expected_ack(&self, result: &Value) -> bool {
        match self {
            HandshakeStep::Signin => result.as_str() == Some(""),
            HandshakeStep::Use => result.is_null(),
        }
    }
}

/// Ids of handshake requests that have been sent but not yet answered.
#[derive(Debug, Default)]
pub struct HandshakeTracker {
    in_flight: Mutex<HashMap<String, HandshakeStep>>,
}

impl HandshakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` carries `step`.
    pub fn begin(&self, id: &str, step: HandshakeStep) {
        self.in_flight.lock().insert(id.to_string(), step);
    }

    /// Consumes the step for `id`.
    pub fn finish(&self, id: &str) -> Option<HandshakeStep> {
        self.in_flight.lock().remove(id)
    }

    /// Forgets every in-flight step (the socket they were sent on is gone).
    pub fn reset(&self) {
        self.in_flight.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expected_ack_shapes() {
        assert!(HandshakeStep::Signin.is_expected_ack(&json!("")));
        assert!(!HandshakeStep::Signin.is_expected_ack(&Value::Null));
        assert!(!HandshakeStep::Signin.is_expected_ack(&json!("token")));

        assert!(HandshakeStep::Use.is_expected_ack(&Value::Null));
        assert!(!HandshakeStep::Use.is_expected_ack(&json!("")));
    }

    #[test]
    fn test_methods() {
        assert_eq!(HandshakeStep::Signin.method(), Method::Signin);
        assert_eq!(HandshakeStep::Use.method(), Method::Use);
    }

    #[test]
    fn test_tracker_lifecycle() {
        let tracker = HandshakeTracker::new();
        tracker.begin("0", HandshakeStep::Signin);
        tracker.begin("1", HandshakeStep::Use);

        assert_eq!(tracker.finish("0"), Some(HandshakeStep::Signin));
        assert_eq!(tracker.finish("0"), None);
        assert_eq!(tracker.finish("2"), None);

        tracker.reset();
        assert_eq!(tracker.finish("1"), None);
    }
}
