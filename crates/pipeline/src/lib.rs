//! The Concierge request pipeline.
//!
//! Leaves first:
//!
//! 1. [`temporal`] — wall clock + operating calendar → status text
//! 2. [`prompt`] — nested knowledge documents → system prompt text
//! 3. [`decision`] — does this utterance need live web data, and with which query?
//! 4. [`search_context`] — search results → augmentation text
//! 5. [`assembler`] — everything above → the ordered message sequence
//!
//! [`ChatPipeline`] runs one chat request through all of them against an
//! immutable [`KnowledgeBase`] snapshot.

pub mod assembler;
pub mod chat;
pub mod decision;
pub mod knowledge;
pub mod prompt;
pub mod search_context;
pub mod temporal;

pub use assembler::{AssemblyInput, assemble};
pub use chat::{ChatInput, ChatMode, ChatOutcome, ChatPipeline, SearchMetadata, SearchSource};
pub use decision::{Decision, Exclusion, ScoringResult, SearchQuery};
pub use knowledge::{KnowledgeBase, KnowledgeStore};
pub use prompt::{RenderedPrompt, render};
pub use temporal::{Season, ServiceStatus, TemporalContext};
