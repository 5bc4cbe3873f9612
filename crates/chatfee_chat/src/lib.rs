//! # chatfee_chat - Chat sessions for ChatFee
//!
//! This crate holds everything between a user action and the assistant
//! backend:
//! - Multiple independent chat sessions, most recent first
//! - Optimistic sends: the user's message appears before the reply is known
//! - A fixed assistant error message when the backend fails
//! - A durable mirror of every session, rewritten after each change
//! - Hooks for voice capture and reading replies aloud
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────────┐     ┌─────────────────┐
//! │   ChatManager   │────▶│ DeliveryController │────▶│ DeliveryClient  │
//! └────────┬────────┘     └─────────┬──────────┘     └─────────────────┘
//!          │                        │
//!          ▼                        ▼
//! ┌─────────────────┐     ┌────────────────────┐
//! │ SyncedSessions  │────▶│  PersistentStore   │
//! │ (repository)    │     │  chats / theme     │
//! └─────────────────┘     └────────────────────┘
//!          ▲
//!          │ input buffer, reply listeners
//! ┌─────────────────┐
//! │InteractionBridge│
//! └─────────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod controller;
pub mod delivery;
pub mod error;
pub mod llm;
pub mod mock;
pub mod persistence;
pub mod repository;
pub mod session;
pub mod synced;
pub mod types;

pub use bridge::{InteractionBridge, ReplyListener, SpeechPlayback, SpeechSynthesizer, VoiceCapture};
pub use config::{ChatConfig, Provider};
pub use controller::{DeliveryController, DeliveryOutcome, DeliveryState, PendingReplies};
pub use delivery::{ChatReply, ChatRequest, DeliveryClient, HttpDelivery, RetryPolicy};
pub use error::{ChatError, ChatResult};
pub use llm::CompletionDelivery;
pub use mock::{MockDelivery, MockResponse};
pub use persistence::{FileBackend, MemoryBackend, PersistentStore, StorageBackend};
pub use repository::SessionRepository;
pub use session::ChatManager;
pub use synced::SyncedSessions;
pub use types::*;
