//! Conversational job-post creation.
//!
//! A session accumulates a [`draft::JobPostDraft`] over several chat turns
//! ([`agent::SlotFillingAgent`]). Publishing needs an explicit confirmation
//! ([`completion::CompletionGate`]) and a draft that survives
//! [`normalize::NormalizationPipeline`].

pub mod agent;
pub mod completion;
pub mod draft;
pub mod extraction;
pub mod handlers;
pub mod llm;
pub mod normalize;
pub mod prompts;
pub mod redis_store;
pub mod session;
pub mod submission;
