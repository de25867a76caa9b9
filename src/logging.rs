//! Structured log events for the fabric
//!
//! `SPEC_FULL.md` §6 calls for "every validation rejection, every handler
//! exception, every start/stop transition emits one structured record with
//! fields `{event, channel, agent, reason?}`. Log sink is pluggable." That
//! pluggability is exactly what `tracing`'s subscriber mechanism provides
//! (`SPEC_FULL.md` §10.2), so these helpers are thin wrappers over
//! `tracing` macros rather than a bespoke sink trait — this crate never
//! installs a subscriber itself, matching the teacher's convention of
//! calling `tracing_subscriber::fmt()....init()` only from a binary's
//! `main`.

use crate::domain_types::{AgentId, ChannelId};

/// Logs a rejected message, whether refused at pre-send or pre-deliver.
pub fn validation_reject(channel: &ChannelId, agent: &AgentId, reason: &str) {
    tracing::warn!(event = "validation_reject", %channel, %agent, %reason, "message rejected");
}

/// Logs a message dropped because a channel's queue was full.
pub fn backpressure_drop(channel: &ChannelId) {
    tracing::warn!(event = "backpressure_drop", %channel, "channel queue full, message dropped");
}

/// Logs a send/broadcast aimed at a channel the endpoint does not own.
pub fn unknown_channel(channel: &ChannelId) {
    tracing::warn!(event = "unknown_channel", %channel, "send to unknown channel");
}

/// Logs a send against a channel or endpoint that is not running.
pub fn lifecycle_misuse(channel: &ChannelId) {
    tracing::warn!(event = "lifecycle_misuse", %channel, "send to non-running channel");
}

/// Logs a handler panic, caught at the worker boundary.
pub fn handler_fault(channel: &ChannelId, detail: &str) {
    tracing::error!(event = "handler_fault", %channel, %detail, "handler panicked");
}

/// Logs a validator panic, treated as a validation reject.
pub fn validator_fault(agent: &AgentId, detail: &str) {
    tracing::error!(event = "validator_fault", %agent, %detail, "validator panicked");
}

/// Logs a channel or endpoint lifecycle transition (start/stop).
pub fn lifecycle_transition(event: &str, channel: &ChannelId) {
    tracing::info!(event = %event, %channel, "channel lifecycle transition");
}

/// Logs an endpoint-level lifecycle transition (no specific channel).
pub fn endpoint_lifecycle_transition(event: &str, agent: &AgentId) {
    tracing::info!(event = %event, %agent, "endpoint lifecycle transition");
}
