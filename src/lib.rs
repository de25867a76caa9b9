//! # agentcomms - an in-memory inter-agent communication fabric
//!
//! This crate gives a set of agents a per-agent [`endpoint::Endpoint`], named
//! [`channel::Channel`]s with their own bounded queue and worker thread,
//! per-agent participation/subscription ACLs, and a composable
//! [`validation::Validator`] pipeline that decides whether a message may be
//! enqueued or delivered.
//!
//! ## Architecture
//!
//! A sender calls [`endpoint::Endpoint::send`]. The endpoint applies its
//! validator with the sender as the active agent, then hands the message to
//! the named channel. The channel enqueues it; its worker thread dequeues,
//! re-applies the validator with the endpoint's owner as the active agent
//! (the receiving perspective), and on accept invokes the handler.
//! [`endpoint::Endpoint::broadcast`] validates once and fans the message out
//! to every channel the endpoint owns.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use agentcomms::channel::Handler;
//! use agentcomms::config::CommsConfig;
//! use agentcomms::domain_types::{AgentId, ChannelId, MessageKind, ServerId};
//! use agentcomms::endpoint::Endpoint;
//! use agentcomms::message::Message;
//!
//! let endpoint = Endpoint::new(AgentId::from("receiver".to_string()), CommsConfig::default());
//! let channel = ChannelId::from("greetings".to_string());
//! endpoint.create_channel(channel.clone(), ServerId::default());
//! endpoint.add_channel_participant(&channel, &AgentId::from("receiver".to_string()));
//!
//! let received: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&received);
//! let handler: Handler = Arc::new(move |m: &Message| sink.lock().unwrap().push(m.clone()));
//! endpoint.set_global_handler(handler);
//! endpoint.start();
//!
//! let message = Message::new(
//!     Default::default(),
//!     MessageKind::Text,
//!     AgentId::from("sender".to_string()),
//!     AgentId::from("receiver".to_string()),
//!     channel.clone(),
//!     "hello",
//! );
//! assert!(endpoint.send(&channel, message, true));
//! endpoint.stop();
//! ```

pub mod channel;
pub mod config;
pub mod domain_types;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod logging;
pub mod message;
pub mod participation;
pub mod transport;
pub mod validation;

pub use channel::{Channel, ChannelState, Handler};
pub use config::CommsConfig;
pub use domain_types::{
    AgentId, ChannelId, HandlerPanicPolicy, MessageId, MessageKind, QueueCapacity, ServerId,
};
pub use endpoint::Endpoint;
pub use error::CommsError;
pub use identity::{agent_scoped_id, new_message_id};
pub use message::{Message, MessageBuilder};
pub use participation::ParticipationRegistry;
pub use transport::{LoopbackTransport, ReceiveHandler, Transport};
pub use validation::{
    default_validator, not_self, participant, subscribed, targeted, well_formed, ValidationResult,
    Validator,
};
