//! Bounded FIFO channel with a dedicated worker thread
//!
//! Grounded in `CommChannel` (`include/elizaos/agentcomms.hpp`,
//! `cpp/agentcomms/src/agentcomms.cpp`), which pairs a `std::queue` guarded
//! by a `std::mutex`/`std::condition_variable` with a single
//! `std::thread` worker. `SPEC_FULL.md` §5 keeps that concurrency model
//! explicitly ("parallel threads … condition variable"), so this module
//! uses `std::thread`/`std::sync::{Mutex, Condvar}` rather than the
//! `tokio`-async style used elsewhere in this codebase's router — see
//! `DESIGN.md` for why that substitution was made.

use std::collections::{HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::domain_types::{AgentId, ChannelId, HandlerPanicPolicy, QueueCapacity, ServerId};
use crate::logging;
use crate::message::Message;
use crate::validation::{ValidationResult, Validator};

/// A message handler: called once per accepted message, on the channel's
/// worker thread.
pub type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

/// A channel's lifecycle state (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Created, never started.
    Idle,
    /// Has exactly one worker consuming the queue.
    Running,
    /// `stop()` has been requested; worker is winding down.
    Stopping,
    /// Terminal. No worker. A new `Channel` instance is required to reuse
    /// this id.
    Stopped,
}

struct Core {
    queue: VecDeque<Message>,
    state: ChannelState,
}

/// A named, bounded FIFO queue with its own worker, participant set,
/// validator, and handler.
///
/// Always held behind `Arc` so the worker thread and the owning
/// [`crate::endpoint::Endpoint`] can share it; construct with [`Channel::new`].
pub struct Channel {
    id: ChannelId,
    server: ServerId,
    owner: Arc<Mutex<AgentId>>,
    capacity: QueueCapacity,
    panic_policy: HandlerPanicPolicy,
    core: Mutex<Core>,
    not_empty: Condvar,
    participants: Mutex<HashSet<AgentId>>,
    handler: Mutex<Option<Handler>>,
    validator: Mutex<Option<Validator>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    /// Creates a new, `Idle` channel.
    ///
    /// `owner` is a handle shared with the owning endpoint so that a later
    /// `Endpoint::set_owner` is visible to the pre-deliver validation
    /// check without the endpoint having to walk every channel it owns.
    #[must_use]
    pub fn new(
        id: ChannelId,
        server: ServerId,
        owner: Arc<Mutex<AgentId>>,
        capacity: QueueCapacity,
        panic_policy: HandlerPanicPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            server,
            owner,
            capacity,
            panic_policy,
            core: Mutex::new(Core {
                queue: VecDeque::new(),
                state: ChannelState::Idle,
            }),
            not_empty: Condvar::new(),
            participants: Mutex::new(HashSet::new()),
            handler: Mutex::new(None),
            validator: Mutex::new(None),
            worker: Mutex::new(None),
        })
    }

    /// The channel's identifier.
    #[must_use]
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// The server this channel is scoped to, if any.
    #[must_use]
    pub fn server(&self) -> &ServerId {
        &self.server
    }

    /// Whether the channel currently has a running worker.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.core.lock().unwrap().state, ChannelState::Running)
    }

    /// Replaces the channel's handler. Takes effect for the next delivery.
    pub fn set_handler(&self, handler: Handler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    /// Replaces the channel's validator. Takes effect for the next
    /// delivery and the next pre-enqueue structural check.
    pub fn set_validator(&self, validator: Validator) {
        *self.validator.lock().unwrap() = Some(validator);
    }

    /// Adds `agent` as a participant.
    pub fn add_participant(&self, agent: AgentId) {
        self.participants.lock().unwrap().insert(agent);
    }

    /// Removes `agent` as a participant.
    pub fn remove_participant(&self, agent: &AgentId) {
        self.participants.lock().unwrap().remove(agent);
    }

    /// Returns whether `agent` is a participant.
    #[must_use]
    pub fn is_participant(&self, agent: &AgentId) -> bool {
        self.participants.lock().unwrap().contains(agent)
    }

    /// Lists current participants.
    #[must_use]
    pub fn participants(&self) -> Vec<AgentId> {
        self.participants.lock().unwrap().iter().cloned().collect()
    }

    /// Starts the channel's worker. Idempotent; a no-op once the channel
    /// has left `Idle` (including after `stop()` — reactivation requires a
    /// new instance).
    pub fn start(self: &Arc<Self>) {
        {
            let mut core = self.core.lock().unwrap();
            if !matches!(core.state, ChannelState::Idle) {
                return;
            }
            core.state = ChannelState::Running;
        }
        logging::lifecycle_transition("channel_started", &self.id);

        let worker_channel = Arc::clone(self);
        let handle = thread::spawn(move || worker_channel.run());
        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Stops the channel. Idempotent. Wakes the worker, lets the in-flight
    /// handler (if any) finish, then discards anything left in the queue.
    /// Terminal: blocks until the worker thread has exited.
    pub fn stop(&self) {
        {
            let mut core = self.core.lock().unwrap();
            match core.state {
                ChannelState::Idle => {
                    core.state = ChannelState::Stopped;
                    logging::lifecycle_transition("channel_stopped", &self.id);
                    return;
                }
                ChannelState::Running => {
                    core.state = ChannelState::Stopping;
                }
                ChannelState::Stopping | ChannelState::Stopped => return,
            }
        }
        self.not_empty.notify_all();

        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
        logging::lifecycle_transition("channel_stopped", &self.id);
    }

    /// Enqueues `message` for delivery.
    ///
    /// Returns `false` without enqueuing if the channel is not `Running`,
    /// if `validate` is set and the channel validator rejects the message
    /// (run with `active_agent = ""`, a structural pre-enqueue check), or
    /// if the queue is already at capacity. Never blocks.
    pub fn send(&self, message: Message, validate: bool) -> bool {
        if !self.is_active() {
            logging::lifecycle_misuse(&self.id);
            return false;
        }

        if validate {
            let validator = self.validator.lock().unwrap().clone();
            if let Some(validator) = validator {
                let active_agent = AgentId::default();
                match evaluate_guarded(&validator, &message, &active_agent) {
                    ValidationResult::Reject { reason } => {
                        logging::validation_reject(&self.id, &active_agent, &reason);
                        return false;
                    }
                    ValidationResult::Accept => {}
                }
            }
        }

        let mut core = self.core.lock().unwrap();
        if !matches!(core.state, ChannelState::Running) {
            drop(core);
            logging::lifecycle_misuse(&self.id);
            return false;
        }
        if core.queue.len() >= self.capacity.as_usize() {
            drop(core);
            logging::backpressure_drop(&self.id);
            return false;
        }
        core.queue.push_back(message);
        drop(core);
        self.not_empty.notify_one();
        true
    }

    fn run(self: Arc<Self>) {
        let mut propagated_fault = None;

        loop {
            let next = {
                let mut core = self.core.lock().unwrap();
                loop {
                    if let Some(message) = core.queue.pop_front() {
                        break Some(message);
                    }
                    if !matches!(core.state, ChannelState::Running) {
                        break None;
                    }
                    core = self.not_empty.wait(core).unwrap();
                }
            };

            match next {
                Some(message) => {
                    // `deliver` itself resumes unwinding on
                    // `HandlerPanicPolicy::Propagate`; catch it here so the
                    // state cleanup below always runs, then re-raise once
                    // the channel is correctly marked `Stopped`.
                    if let Err(payload) =
                        catch_unwind(AssertUnwindSafe(|| self.deliver(message)))
                    {
                        propagated_fault = Some(payload);
                        break;
                    }
                }
                None => break,
            }
        }

        let mut core = self.core.lock().unwrap();
        core.queue.clear();
        core.state = ChannelState::Stopped;
        drop(core);

        if let Some(payload) = propagated_fault {
            std::panic::resume_unwind(payload);
        }
    }

    fn deliver(&self, message: Message) {
        let owner = self.owner.lock().unwrap().clone();

        let validator = self.validator.lock().unwrap().clone();
        if let Some(validator) = validator {
            match evaluate_guarded(&validator, &message, &owner) {
                ValidationResult::Reject { reason } => {
                    logging::validation_reject(&self.id, &owner, &reason);
                    return;
                }
                ValidationResult::Accept => {}
            }
        }

        let handler = self.handler.lock().unwrap().clone();
        let Some(handler) = handler else { return };

        let outcome = catch_unwind(AssertUnwindSafe(|| handler(&message)));
        if let Err(payload) = outcome {
            let detail = panic_detail(&payload);
            logging::handler_fault(&self.id, &detail);
            if matches!(self.panic_policy, HandlerPanicPolicy::Propagate) {
                std::panic::resume_unwind(payload);
            }
        }
    }
}

/// Evaluates a validator, converting a panic into a
/// [`ValidationResult::Reject`] with reason `"validator fault"`
/// (`SPEC_FULL.md` §7 `ValidatorFault`).
fn evaluate_guarded(validator: &Validator, message: &Message, agent: &AgentId) -> ValidationResult {
    match catch_unwind(AssertUnwindSafe(|| validator.evaluate(message, agent))) {
        Ok(result) => result,
        Err(payload) => {
            logging::validator_fault(agent, &panic_detail(&payload));
            ValidationResult::Reject {
                reason: "validator fault".to_string(),
            }
        }
    }
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::MessageKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn owner_cell(agent: &str) -> Arc<Mutex<AgentId>> {
        Arc::new(Mutex::new(AgentId::from(agent.to_string())))
    }

    fn msg(sender: &str, channel: &str, payload: &str) -> Message {
        Message::new(
            Default::default(),
            MessageKind::Text,
            AgentId::from(sender.to_string()),
            AgentId::default(),
            ChannelId::from(channel.to_string()),
            payload,
        )
    }

    #[test]
    fn send_before_start_is_rejected() {
        let channel = Channel::new(
            ChannelId::from("c".to_string()),
            ServerId::default(),
            owner_cell("owner"),
            QueueCapacity::default(),
            HandlerPanicPolicy::Continue,
        );
        assert!(!channel.send(msg("a", "c", "hi"), false));
    }

    #[test]
    fn fifo_delivery_preserves_order() {
        let channel = Channel::new(
            ChannelId::from("c".to_string()),
            ServerId::default(),
            owner_cell("owner"),
            QueueCapacity::default(),
            HandlerPanicPolicy::Continue,
        );

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        channel.set_handler(Arc::new(move |m: &Message| {
            received_clone.lock().unwrap().push(m.payload().to_string());
        }));
        channel.start();

        for i in 0..5 {
            assert!(channel.send(msg("a", "c", &format!("m{i}")), false));
        }

        wait_until(|| received.lock().unwrap().len() == 5);
        let got = received.lock().unwrap().clone();
        assert_eq!(got, vec!["m0", "m1", "m2", "m3", "m4"]);

        channel.stop();
    }

    #[test]
    fn backpressure_drops_when_full() {
        let channel = Channel::new(
            ChannelId::from("c".to_string()),
            ServerId::default(),
            owner_cell("owner"),
            QueueCapacity::try_new(2).unwrap(),
            HandlerPanicPolicy::Continue,
        );

        let release = Arc::new(std::sync::Barrier::new(2));
        let release_clone = Arc::clone(&release);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        channel.set_handler(Arc::new(move |_: &Message| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            release_clone.wait();
        }));
        channel.start();

        // First send is picked up by the worker immediately and blocks on
        // the barrier, so the queue itself holds at most `capacity` after
        // that. Two more sends fill the bounded queue; the fourth must drop.
        assert!(channel.send(msg("a", "c", "m0"), false));
        std::thread::sleep(Duration::from_millis(20)); // let the worker dequeue m0
        assert!(channel.send(msg("a", "c", "m1"), false));
        assert!(channel.send(msg("a", "c", "m2"), false));
        assert!(!channel.send(msg("a", "c", "m3"), false));

        release.wait(); // let m0's handler finish
        channel.stop();
    }

    #[test]
    fn handler_panic_is_contained_and_next_message_still_delivered() {
        let channel = Channel::new(
            ChannelId::from("c".to_string()),
            ServerId::default(),
            owner_cell("owner"),
            QueueCapacity::default(),
            HandlerPanicPolicy::Continue,
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        channel.set_handler(Arc::new(move |m: &Message| {
            if m.payload() == "boom" {
                panic!("handler fault");
            }
            seen_clone.lock().unwrap().push(m.payload().to_string());
        }));
        channel.start();

        assert!(channel.send(msg("a", "c", "boom"), false));
        assert!(channel.send(msg("a", "c", "after"), false));

        wait_until(|| seen.lock().unwrap().len() == 1);
        assert_eq!(seen.lock().unwrap()[0], "after");

        channel.stop();
    }

    #[test]
    fn propagate_policy_still_leaves_the_channel_correctly_stopped() {
        let channel = Channel::new(
            ChannelId::from("c".to_string()),
            ServerId::default(),
            owner_cell("owner"),
            QueueCapacity::default(),
            HandlerPanicPolicy::Propagate,
        );

        channel.set_handler(Arc::new(|_: &Message| panic!("handler fault")));
        channel.start();

        assert!(channel.send(msg("a", "c", "boom"), false));

        wait_until(|| !channel.is_active());

        // The worker thread unwound instead of looping, but the channel's
        // own state must still land on `Stopped`, not be left `Running`
        // with no live worker.
        assert!(!channel.send(msg("a", "c", "late"), false));
        channel.stop();
    }

    #[test]
    fn stop_discards_pending_and_prevents_further_delivery() {
        let channel = Channel::new(
            ChannelId::from("c".to_string()),
            ServerId::default(),
            owner_cell("owner"),
            QueueCapacity::default(),
            HandlerPanicPolicy::Continue,
        );

        let gate = Arc::new(std::sync::Barrier::new(2));
        let gate_clone = Arc::clone(&gate);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        channel.set_handler(Arc::new(move |_: &Message| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            gate_clone.wait();
        }));
        channel.start();

        assert!(channel.send(msg("a", "c", "in-flight"), false));
        std::thread::sleep(Duration::from_millis(20));
        assert!(channel.send(msg("a", "c", "queued"), false));

        let stopper = {
            let channel = Arc::clone(&channel);
            std::thread::spawn(move || channel.stop())
        };
        std::thread::sleep(Duration::from_millis(20));
        gate.wait(); // release the in-flight handler so stop() can complete
        stopper.join().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!channel.send(msg("a", "c", "late"), false));
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not met in time");
    }
}
