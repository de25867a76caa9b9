//! The per-agent facade: `AgentComms`
//!
//! Grounded in the `AgentComms` class of `cpp/agentcomms/src/agentcomms.cpp`:
//! owns every channel the agent cares about, the agent's participation
//! registry, and the global handler/validator inherited by new channels.
//! `SPEC_FULL.md` §9 turns the reference's process-wide singleton into an
//! explicit, constructed collaborator — there is no file-scope mutable
//! state here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::channel::{Channel, Handler};
use crate::config::CommsConfig;
use crate::domain_types::{AgentId, ChannelId, ServerId};
use crate::identity::agent_scoped_id;
use crate::logging;
use crate::message::Message;
use crate::participation::ParticipationRegistry;
use crate::validation::{default_validator, ValidationResult, Validator};

/// A per-agent communication endpoint.
///
/// Owns the channels it creates, the participation registry for every agent
/// it tracks membership for (not only its own owner — `SPEC_FULL.md` §3
/// notes a coordinator endpoint may track participation on behalf of
/// children it supervises), and the global handler/validator inherited by
/// channels created after they are set.
pub struct Endpoint {
    owner: Arc<Mutex<AgentId>>,
    config: CommsConfig,
    channels: DashMap<ChannelId, Arc<Channel>>,
    participations: Arc<ParticipationRegistry>,
    global_handler: Mutex<Option<Handler>>,
    global_validator: Mutex<Option<Validator>>,
    started: AtomicBool,
}

impl Endpoint {
    /// Creates a new, stopped endpoint owned by `owner`.
    #[must_use]
    pub fn new(owner: AgentId, config: CommsConfig) -> Arc<Self> {
        Arc::new(Self {
            owner: Arc::new(Mutex::new(owner)),
            config,
            channels: DashMap::new(),
            participations: Arc::new(ParticipationRegistry::new()),
            global_handler: Mutex::new(None),
            global_validator: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }

    /// The endpoint's current owner.
    #[must_use]
    pub fn owner(&self) -> AgentId {
        self.owner.lock().unwrap().clone()
    }

    /// Sets the endpoint's owner. Last-writer-wins; every channel created by
    /// this endpoint shares the same owner cell, so the change is visible to
    /// pre-deliver validation immediately, with no per-channel update.
    pub fn set_owner(&self, owner: AgentId) {
        *self.owner.lock().unwrap() = owner;
    }

    /// Whether `start()` has been called (and `stop()` has not since).
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Creates (or returns the existing) channel named `channel`, scoped to
    /// `server`. The new channel inherits the current global handler and
    /// validator, and is started immediately if the endpoint is running.
    pub fn create_channel(&self, channel: ChannelId, server: ServerId) -> Arc<Channel> {
        if let Some(existing) = self.channels.get(&channel) {
            return Arc::clone(&existing);
        }

        let new_channel = Channel::new(
            channel.clone(),
            server,
            Arc::clone(&self.owner),
            self.config.queue_capacity(),
            self.config.handler_panic_policy(),
        );

        if let Some(handler) = self.global_handler.lock().unwrap().clone() {
            new_channel.set_handler(handler);
        }
        if let Some(validator) = self.global_validator.lock().unwrap().clone() {
            new_channel.set_validator(validator);
        } else {
            new_channel.set_validator(default_validator());
        }

        if self.is_started() {
            new_channel.start();
        }

        self.channels.insert(channel, Arc::clone(&new_channel));
        new_channel
    }

    /// Returns the channel named `channel`, if this endpoint owns one.
    #[must_use]
    pub fn get_channel(&self, channel: &ChannelId) -> Option<Arc<Channel>> {
        self.channels.get(channel).map(|entry| Arc::clone(&entry))
    }

    /// Stops and drops the channel named `channel`. A no-op if the endpoint
    /// does not own it.
    pub fn remove_channel(&self, channel: &ChannelId) {
        if let Some((_, removed)) = self.channels.remove(channel) {
            removed.stop();
        }
    }

    /// Validates (unless `validate` is false) from the owner's perspective,
    /// then enqueues `message` on `channel`.
    ///
    /// Returns `false` if the channel is unknown, if pre-send validation
    /// rejects, or if the channel itself refuses the send (not running, or
    /// full).
    pub fn send(&self, channel: &ChannelId, message: Message, validate: bool) -> bool {
        let Some(target) = self.get_channel(channel) else {
            logging::unknown_channel(channel);
            return false;
        };

        if validate && !self.pre_send_accept(&message) {
            return false;
        }

        target.send(message, false)
    }

    /// Validates once from the owner's perspective, then fans `message` out
    /// to every channel this endpoint owns with `validate = false`.
    ///
    /// Matches the reference `AgentComms::broadcastMessage`: a single
    /// pre-send check, never revalidated per channel.
    pub fn broadcast(&self, message: Message, validate: bool) {
        if validate && !self.pre_send_accept(&message) {
            return;
        }

        for entry in &self.channels {
            entry.value().send(message.clone(), false);
        }
    }

    fn pre_send_accept(&self, message: &Message) -> bool {
        let owner = self.owner();
        let validator = self
            .global_validator
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(default_validator);

        match validator.evaluate(message, &owner) {
            ValidationResult::Accept => true,
            ValidationResult::Reject { reason } => {
                logging::validation_reject(message.channel(), &owner, &reason);
                false
            }
        }
    }

    /// Adds `agent` as a participant of `channel`, updating both the
    /// channel's own participant set and this endpoint's participation
    /// registry. Returns `false` if the channel is unknown.
    pub fn add_channel_participant(&self, channel: &ChannelId, agent: &AgentId) -> bool {
        let Some(target) = self.get_channel(channel) else {
            return false;
        };
        target.add_participant(agent.clone());
        self.participations.add_channel(agent, channel);
        true
    }

    /// Removes `agent` as a participant of `channel` in both places.
    /// Returns `false` if the channel is unknown.
    pub fn remove_channel_participant(&self, channel: &ChannelId, agent: &AgentId) -> bool {
        let Some(target) = self.get_channel(channel) else {
            return false;
        };
        target.remove_participant(agent);
        self.participations.remove_channel(agent, channel);
        true
    }

    /// Returns whether `agent` participates in `channel`, consulting the
    /// participation registry (authoritative and agreeing with the
    /// channel's own set by construction).
    #[must_use]
    pub fn is_channel_participant(&self, channel: &ChannelId, agent: &AgentId) -> bool {
        self.participations.is_in_channel(agent, channel)
    }

    /// Subscribes `agent` (defaulting to this endpoint's owner) to `server`.
    pub fn subscribe_to_server(&self, server: &ServerId, agent: Option<&AgentId>) {
        let agent = agent.cloned().unwrap_or_else(|| self.owner());
        self.participations.add_server(&agent, server);
    }

    /// Unsubscribes `agent` (defaulting to this endpoint's owner) from
    /// `server`.
    pub fn unsubscribe_from_server(&self, server: &ServerId, agent: Option<&AgentId>) {
        let agent = agent.cloned().unwrap_or_else(|| self.owner());
        self.participations.remove_server(&agent, server);
    }

    /// Returns whether `agent` (defaulting to this endpoint's owner) is
    /// subscribed to `server`.
    #[must_use]
    pub fn is_subscribed_to_server(&self, server: &ServerId, agent: Option<&AgentId>) -> bool {
        let agent = agent.cloned().unwrap_or_else(|| self.owner());
        self.participations.is_subscribed(&agent, server)
    }

    /// Returns this endpoint's participation registry, so callers can wire
    /// [`crate::validation::subscribed`] to it (the `subscribed(endpoint)`
    /// rule of `SPEC_FULL.md` §4.3 needs the endpoint's own registry, not an
    /// unrelated one).
    #[must_use]
    pub fn participations(&self) -> Arc<ParticipationRegistry> {
        Arc::clone(&self.participations)
    }

    /// Sets the global handler, propagating it to every channel this
    /// endpoint currently owns as well as every channel created afterwards.
    pub fn set_global_handler(&self, handler: Handler) {
        *self.global_handler.lock().unwrap() = Some(Arc::clone(&handler));
        for entry in &self.channels {
            entry.value().set_handler(Arc::clone(&handler));
        }
    }

    /// Sets the global validator, propagating it the same way as
    /// [`Self::set_global_handler`].
    pub fn set_global_validator(&self, validator: Validator) {
        *self.global_validator.lock().unwrap() = Some(validator.clone());
        for entry in &self.channels {
            entry.value().set_validator(validator.clone());
        }
    }

    /// Derives an agent-scoped identifier for `resource`, using this
    /// endpoint's owner. Shortcut for [`crate::identity::agent_scoped_id`].
    #[must_use]
    pub fn agent_scoped_id(&self, resource: &str) -> String {
        agent_scoped_id(&self.owner(), resource)
    }

    /// Starts the endpoint: marks it running and starts every channel it
    /// owns. Idempotent.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
        for entry in &self.channels {
            entry.value().start();
        }
        logging::endpoint_lifecycle_transition("endpoint_started", &self.owner());
    }

    /// Stops the endpoint: stops every channel it owns and marks it no
    /// longer running. Idempotent; channel shutdown is terminal per
    /// instance.
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        for entry in &self.channels {
            entry.value().stop();
        }
        logging::endpoint_lifecycle_transition("endpoint_stopped", &self.owner());
    }

    /// Lists the identifiers of every channel this endpoint owns, regardless
    /// of lifecycle state.
    #[must_use]
    pub fn active_channels(&self) -> Vec<ChannelId> {
        self.channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
