//! Endpoint/channel construction configuration
//!
//! Grounded in the teacher's `src/message_router/config.rs` (`RouterConfig`):
//! a small, validated, `Default`-able struct built from domain primitives
//! rather than raw scalars, covering the knobs `SPEC_FULL.md` §6 names.

use serde::{Deserialize, Serialize};

use crate::domain_types::{HandlerPanicPolicy, QueueCapacity};

/// Configuration shared by every channel an [`crate::endpoint::Endpoint`]
/// creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommsConfig {
    queue_capacity: QueueCapacity,
    handler_panic_policy: HandlerPanicPolicy,
}

impl CommsConfig {
    /// Builds a config from explicit values.
    #[must_use]
    pub fn new(queue_capacity: QueueCapacity, handler_panic_policy: HandlerPanicPolicy) -> Self {
        Self {
            queue_capacity,
            handler_panic_policy,
        }
    }

    /// The bound every channel created under this config enforces.
    #[must_use]
    pub fn queue_capacity(&self) -> QueueCapacity {
        self.queue_capacity
    }

    /// The handler-panic policy every channel created under this config
    /// enforces.
    #[must_use]
    pub fn handler_panic_policy(&self) -> HandlerPanicPolicy {
        self.handler_panic_policy
    }
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: QueueCapacity::default(),
            handler_panic_policy: HandlerPanicPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = CommsConfig::default();
        assert_eq!(config.queue_capacity().as_usize(), 1024);
        assert_eq!(config.handler_panic_policy(), HandlerPanicPolicy::Continue);
    }

    #[test]
    fn explicit_values_are_preserved() {
        let config = CommsConfig::new(
            QueueCapacity::try_new(8).unwrap(),
            HandlerPanicPolicy::Propagate,
        );
        assert_eq!(config.queue_capacity().as_usize(), 8);
        assert_eq!(config.handler_panic_policy(), HandlerPanicPolicy::Propagate);
    }
}
