//! The `Message` value type
//!
//! Grounded in `elizaos::Message` (`include/elizaos/agentcomms.hpp`,
//! `cpp/agentcomms/src/agentcomms.cpp`): an immutable record identifying a
//! sender, an optional receiver, the channel/server it travels over, a
//! payload, free-form metadata, and an optional reply correlation id.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::domain_types::{AgentId, ChannelId, MessageId, MessageKind, ServerId};
use crate::identity::new_message_id;

/// An immutable message travelling through the fabric.
///
/// Constructed via [`Message::new`] or [`MessageBuilder`]; once built, a
/// `Message` is never mutated in place — [`Message::with_metadata`] returns
/// a new value. An empty `receiver` means "broadcast within channel"; an
/// empty `server` means "no server scoping".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    kind: MessageKind,
    sender: AgentId,
    receiver: AgentId,
    channel: ChannelId,
    server: ServerId,
    payload: String,
    metadata: HashMap<String, String>,
    #[serde(with = "system_time_millis")]
    timestamp: SystemTime,
    reply_to: MessageId,
}

impl Message {
    /// Builds a message, assigning a fresh [`MessageId`] when `id` is empty
    /// and stamping `timestamp` with the current wall clock.
    #[must_use]
    pub fn new(
        id: MessageId,
        kind: MessageKind,
        sender: AgentId,
        receiver: AgentId,
        channel: ChannelId,
        payload: impl Into<String>,
    ) -> Self {
        let id = if id.as_ref().is_empty() {
            new_message_id()
        } else {
            id
        };

        Self {
            id,
            kind,
            sender,
            receiver,
            channel,
            server: ServerId::default(),
            payload: payload.into(),
            metadata: HashMap::new(),
            timestamp: SystemTime::now(),
            reply_to: MessageId::default(),
        }
    }

    /// Starts building a message with explicit control over every field,
    /// including the optional `server` and `reply_to`.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// The message's unique identifier. Never empty after construction.
    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// The kind of content this message carries.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The agent that sent this message.
    #[must_use]
    pub fn sender(&self) -> &AgentId {
        &self.sender
    }

    /// The intended receiver, or an empty `AgentId` for "broadcast within
    /// channel".
    #[must_use]
    pub fn receiver(&self) -> &AgentId {
        &self.receiver
    }

    /// The channel this message was sent on.
    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// The server this message is scoped to, if any.
    #[must_use]
    pub fn server(&self) -> &ServerId {
        &self.server
    }

    /// The message body.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The wall-clock time this message was constructed.
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// The id of the message this one replies to, if any.
    #[must_use]
    pub fn reply_to(&self) -> &MessageId {
        &self.reply_to
    }

    /// Returns the value for `key`, or an empty string if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.metadata.get(key).map_or("", String::as_str)
    }

    /// Returns whether `key` is present in this message's metadata.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    /// Sets a metadata key, returning a new `Message`. No key is reserved by
    /// the fabric.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Builder for [`Message`] covering fields [`Message::new`] defaults away
/// (`server`, `reply_to`, a pre-populated metadata map).
#[derive(Debug, Default)]
pub struct MessageBuilder {
    id: MessageId,
    kind: MessageKind,
    sender: AgentId,
    receiver: AgentId,
    channel: ChannelId,
    server: ServerId,
    payload: String,
    metadata: HashMap<String, String>,
    reply_to: MessageId,
}

impl MessageBuilder {
    /// Sets the message id; if left empty, one is generated on [`Self::build`].
    #[must_use]
    pub fn id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    /// Sets the message kind.
    #[must_use]
    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn sender(mut self, sender: AgentId) -> Self {
        self.sender = sender;
        self
    }

    /// Sets the receiver (empty ⇒ broadcast within channel).
    #[must_use]
    pub fn receiver(mut self, receiver: AgentId) -> Self {
        self.receiver = receiver;
        self
    }

    /// Sets the channel.
    #[must_use]
    pub fn channel(mut self, channel: ChannelId) -> Self {
        self.channel = channel;
        self
    }

    /// Sets the server scope.
    #[must_use]
    pub fn server(mut self, server: ServerId) -> Self {
        self.server = server;
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Sets the reply-to correlation id.
    #[must_use]
    pub fn reply_to(mut self, reply_to: MessageId) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Finalizes the message, assigning a fresh id if none was set.
    #[must_use]
    pub fn build(self) -> Message {
        let id = if self.id.as_ref().is_empty() {
            new_message_id()
        } else {
            self.id
        };

        Message {
            id,
            kind: self.kind,
            sender: self.sender,
            receiver: self.receiver,
            channel: self.channel,
            server: self.server,
            payload: self.payload,
            metadata: self.metadata,
            timestamp: SystemTime::now(),
            reply_to: self.reply_to,
        }
    }
}

mod system_time_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(time: &SystemTime, ser: S) -> Result<S::Ok, S::Error> {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        (millis as u64).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<SystemTime, D::Error> {
        let millis = u64::deserialize(de)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_replaced_with_a_fresh_one() {
        let msg = Message::new(
            MessageId::default(),
            MessageKind::Text,
            AgentId::from("a".to_string()),
            AgentId::from("b".to_string()),
            ChannelId::from("c".to_string()),
            "hi",
        );
        assert!(!msg.id().as_ref().is_empty());
    }

    #[test]
    fn explicit_id_is_preserved() {
        let id = MessageId::from("custom".to_string());
        let msg = Message::new(
            id.clone(),
            MessageKind::Text,
            AgentId::default(),
            AgentId::default(),
            ChannelId::default(),
            "hi",
        );
        assert_eq!(msg.id(), &id);
    }

    #[test]
    fn metadata_round_trips() {
        let msg = Message::builder()
            .sender(AgentId::from("a".to_string()))
            .channel(ChannelId::from("c".to_string()))
            .payload("hi")
            .metadata("source_id", "orig_12345")
            .metadata("priority", "high")
            .build();

        assert_eq!(msg.get("source_id"), "orig_12345");
        assert_eq!(msg.get("priority"), "high");
        assert!(msg.has("source_id"));
        assert!(!msg.has("missing"));
        assert_eq!(msg.get("missing"), "");
    }

    #[test]
    fn with_metadata_does_not_mutate_the_original() {
        let base = Message::builder().payload("x").build();
        let tagged = base.clone().with_metadata("k", "v");
        assert!(!base.has("k"));
        assert!(tagged.has("k"));
    }

    /// A transport receives opaque bytes and must parse them into a
    /// `Message` (§4.7); JSON is the simplest wire encoding to round-trip.
    #[test]
    fn round_trips_through_json() {
        let original = Message::builder()
            .sender(AgentId::from("a".to_string()))
            .receiver(AgentId::from("b".to_string()))
            .channel(ChannelId::from("c".to_string()))
            .payload("hi")
            .metadata("priority", "high")
            .build();

        let bytes = serde_json::to_vec(&original).unwrap();
        let parsed: Message = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed, original);
    }
}
