//! Error taxonomy for the communication fabric
//!
//! Names the failure kinds of `SPEC_FULL.md` §7 so call sites and tests can
//! match on them. The hot path (`Channel::send`, `Endpoint::send`,
//! `Endpoint::broadcast`) keeps the boolean return the spec calls for; a
//! `CommsError` variant is attached only to the structured log record
//! (see [`crate::logging`]), never returned from those calls. Fallible setup
//! operations that aren't on the hot path return `Result<T, CommsError>`
//! directly.

use thiserror::Error;

use crate::domain_types::{AgentId, ChannelId};

/// Failure kinds for the fabric, per `SPEC_FULL.md` §7.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommsError {
    /// A validator rule refused the message.
    #[error("validation rejected message: {reason}")]
    ValidationReject {
        /// Human-readable reason supplied by the rejecting rule.
        reason: String,
    },

    /// The channel's queue was full at enqueue time.
    #[error("channel {channel} queue is full")]
    BackpressureDrop {
        /// The channel whose queue was full.
        channel: ChannelId,
    },

    /// `send`/`broadcast` referenced a channel the endpoint does not own.
    #[error("unknown channel: {channel}")]
    UnknownChannel {
        /// The channel identifier that was not found.
        channel: ChannelId,
    },

    /// Send was attempted against a channel that is not `Running`, or an
    /// endpoint that has not been started.
    #[error("channel {channel} is not running")]
    LifecycleMisuse {
        /// The channel that was not in a running state.
        channel: ChannelId,
    },

    /// A user-supplied handler panicked while processing a message.
    #[error("handler for channel {channel} panicked: {detail}")]
    HandlerFault {
        /// The channel whose handler panicked.
        channel: ChannelId,
        /// The panic payload, stringified where possible.
        detail: String,
    },

    /// A user-supplied validator panicked while evaluating a message.
    ///
    /// Treated as a [`Self::ValidationReject`] with reason `"validator
    /// fault"` for the purposes of the send-path boolean return.
    #[error("validator for agent {agent} panicked: {detail}")]
    ValidatorFault {
        /// The agent the validator was evaluating on behalf of.
        agent: AgentId,
        /// The panic payload, stringified where possible.
        detail: String,
    },
}
