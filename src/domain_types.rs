//! Domain primitives for the communication fabric
//!
//! Strongly-typed wrappers around the opaque string identifiers and small
//! configuration scalars used throughout the crate, following the
//! newtype-over-primitive style used across this codebase's domain modeling.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Unique identifier for an agent.
///
/// Opaque beyond equality. The empty string is a valid `AgentId` and is used
/// by several call sites (most notably [`crate::validation`]) to mean
/// "unset" or "no specific agent" rather than an error condition, so this
/// type intentionally carries no length validation.
#[nutype(
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        From,
        Into,
        AsRef
    ),
    default = ""
)]
pub struct AgentId(String);

/// Unique identifier for a channel.
///
/// Same empty-is-valid convention as [`AgentId`].
#[nutype(
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        From,
        Into,
        AsRef
    ),
    default = ""
)]
pub struct ChannelId(String);

/// Unique identifier for a server (a grouping of channels an agent can
/// subscribe to).
///
/// Same empty-is-valid convention as [`AgentId`].
#[nutype(
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        From,
        Into,
        AsRef
    ),
    default = ""
)]
pub struct ServerId(String);

/// Unique identifier for a message.
///
/// Generated by [`crate::identity::new_message_id`] when a [`crate::message::Message`]
/// is constructed without one. Empty only transiently, before assignment.
#[nutype(
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        From,
        Into,
        AsRef
    ),
    default = ""
)]
pub struct MessageId(String);

/// The kind of content a [`crate::message::Message`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Free-form human- or agent-readable text.
    Text,
    /// A directive the receiver is expected to act on.
    Command,
    /// A reply to an earlier message, usually correlated via `reply_to`.
    Response,
    /// A status update with no expected reply.
    Status,
    /// An error report.
    Error,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

/// Bound on a channel's message queue.
///
/// Enforces the backpressure contract of `SPEC_FULL.md` §5: once a channel's
/// queue holds `QueueCapacity` messages, further sends are dropped rather
/// than blocking the caller.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 1_000_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 1024
)]
pub struct QueueCapacity(usize);

impl QueueCapacity {
    /// Returns the capacity as a plain `usize` for use with queue containers.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Policy for what happens when a handler invocation panics.
///
/// See `SPEC_FULL.md` §10.3. `Continue` (the default) matches the reference
/// behavior of catching and logging the fault so the worker keeps running;
/// `Propagate` re-raises after logging, which is useful in tests that want
/// a panicking handler to fail the test rather than be silently contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerPanicPolicy {
    /// Log the fault and keep the worker running (default).
    Continue,
    /// Log the fault, then resume unwinding.
    Propagate,
}

impl Default for HandlerPanicPolicy {
    fn default() -> Self {
        Self::Continue
    }
}
