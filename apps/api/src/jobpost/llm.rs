//! LLM seam for the job-post conversation.
//!
//! `AppState` carries an `Arc<dyn DraftAssistant>`; the production implementation
//! is [`LlmClient`], tests plug in scripted or failing assistants.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::jobpost::draft::{Assignment, JobPostDraft, Slot};
use crate::jobpost::extraction::assignments_from_json;
use crate::jobpost::prompts::{
    ENHANCE_PROMPT_TEMPLATE, ENHANCE_SYSTEM, EXTRACT_PROMPT_TEMPLATE, EXTRACT_SYSTEM,
};
use crate::llm_client::{LlmClient, LlmError};

/// Rewritten copy returned by an enhancement request. Either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Enhancement {
    #[serde(default)]
    pub rewritten_description: Option<String>,
    #[serde(default)]
    pub rewritten_responsibilities: Option<String>,
}

impl Enhancement {
    pub fn is_empty(&self) -> bool {
        blank(&self.rewritten_description) && blank(&self.rewritten_responsibilities)
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

#[async_trait]
pub trait DraftAssistant: Send + Sync {
    /// Structured extraction of field updates from one utterance.
    async fn extract(
        &self,
        draft: &JobPostDraft,
        utterance: &str,
        focus: Slot,
    ) -> Result<Vec<Assignment>, LlmError>;

    /// Rewrites description/responsibilities.
    async fn enhance(&self, draft: &JobPostDraft, request: &str) -> Result<Enhancement, LlmError>;
}

#[async_trait]
impl DraftAssistant for LlmClient {
    async fn extract(
        &self,
        draft: &JobPostDraft,
        utterance: &str,
        focus: Slot,
    ) -> Result<Vec<Assignment>, LlmError> {
        let prompt = EXTRACT_PROMPT_TEMPLATE
            .replace("{draft}", &draft_json(draft)?)
            .replace("{focus}", focus.name())
            .replace("{utterance}", utterance);
        let value: Value = self.call_json(&prompt, EXTRACT_SYSTEM).await?;
        Ok(assignments_from_json(&value))
    }

    async fn enhance(&self, draft: &JobPostDraft, request: &str) -> Result<Enhancement, LlmError> {
        let prompt = ENHANCE_PROMPT_TEMPLATE
            .replace("{draft}", &draft_json(draft)?)
            .replace("{request}", request);
        self.call_json::<Enhancement>(&prompt, ENHANCE_SYSTEM).await
    }
}

fn draft_json(draft: &JobPostDraft) -> Result<String, LlmError> {
    serde_json::to_string_pretty(draft).map_err(LlmError::Parse)
}
