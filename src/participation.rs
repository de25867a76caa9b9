//! Per-agent channel membership and server subscription tracking
//!
//! Grounded in `AgentParticipation` and `AgentComms::participations_` in
//! `cpp/agentcomms/src/agentcomms.cpp`. Writes go exclusively through
//! [`crate::endpoint::Endpoint`], which keeps a channel's own participant set
//! and this registry in agreement (`SPEC_FULL.md` §9 "participation is
//! authoritative in two places"); this type itself never talks to a
//! `Channel`.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::domain_types::{AgentId, ChannelId, ServerId};

/// One agent's channel memberships and server subscriptions.
#[derive(Debug, Clone, Default)]
struct Participation {
    channels: HashSet<ChannelId>,
    servers: HashSet<ServerId>,
}

/// A concurrent map from agent to [`Participation`] record.
///
/// Every operation is idempotent; reads against an agent with no record
/// behave as if the record existed and were empty, per
/// `SPEC_FULL.md` §4.4.
#[derive(Debug, Default)]
pub struct ParticipationRegistry {
    records: DashMap<AgentId, Participation>,
}

impl ParticipationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `channel` to `agent`'s memberships. Idempotent.
    pub fn add_channel(&self, agent: &AgentId, channel: &ChannelId) {
        self.records
            .entry(agent.clone())
            .or_default()
            .channels
            .insert(channel.clone());
    }

    /// Removes `channel` from `agent`'s memberships. Idempotent; a no-op if
    /// the agent has no record or was not a member.
    pub fn remove_channel(&self, agent: &AgentId, channel: &ChannelId) {
        if let Some(mut record) = self.records.get_mut(agent) {
            record.channels.remove(channel);
        }
    }

    /// Subscribes `agent` to `server`. Idempotent.
    pub fn add_server(&self, agent: &AgentId, server: &ServerId) {
        self.records
            .entry(agent.clone())
            .or_default()
            .servers
            .insert(server.clone());
    }

    /// Unsubscribes `agent` from `server`. Idempotent; a no-op if the agent
    /// has no record or was not subscribed.
    pub fn remove_server(&self, agent: &AgentId, server: &ServerId) {
        if let Some(mut record) = self.records.get_mut(agent) {
            record.servers.remove(server);
        }
    }

    /// Returns whether `agent` is a member of `channel`.
    #[must_use]
    pub fn is_in_channel(&self, agent: &AgentId, channel: &ChannelId) -> bool {
        self.records
            .get(agent)
            .is_some_and(|record| record.channels.contains(channel))
    }

    /// Returns whether `agent` is subscribed to `server`.
    #[must_use]
    pub fn is_subscribed(&self, agent: &AgentId, server: &ServerId) -> bool {
        self.records
            .get(agent)
            .is_some_and(|record| record.servers.contains(server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(s: &str) -> AgentId {
        AgentId::from(s.to_string())
    }

    fn channel(s: &str) -> ChannelId {
        ChannelId::from(s.to_string())
    }

    fn server(s: &str) -> ServerId {
        ServerId::from(s.to_string())
    }

    #[test]
    fn missing_agent_reads_as_empty() {
        let registry = ParticipationRegistry::new();
        assert!(!registry.is_in_channel(&agent("ghost"), &channel("c")));
        assert!(!registry.is_subscribed(&agent("ghost"), &server("s")));
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let registry = ParticipationRegistry::new();
        let a = agent("a");
        let c = channel("c");

        registry.add_channel(&a, &c);
        registry.add_channel(&a, &c);
        assert!(registry.is_in_channel(&a, &c));

        registry.remove_channel(&a, &c);
        registry.remove_channel(&a, &c);
        assert!(!registry.is_in_channel(&a, &c));
    }

    #[test]
    fn channels_and_servers_are_independent() {
        let registry = ParticipationRegistry::new();
        let a = agent("a");
        registry.add_server(&a, &server("s"));
        assert!(registry.is_subscribed(&a, &server("s")));
        assert!(!registry.is_in_channel(&a, &channel("s")));
    }
}
