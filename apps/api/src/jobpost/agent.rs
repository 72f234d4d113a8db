//! Runs one job-post conversation turn end to end.
//!
//! Order of work inside a turn:
//!   deterministic extraction → enhancement (if requested and the message carries
//!   no slot data) or LLM fallback for the in-focus slot → merge → completion gate
//!   → (normalize → submit) or next question.
//!
//! The LLM is best-effort throughout. A failed or slow call is logged and the turn
//! carries on with whatever the keyword matchers found.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobpost::completion::{
    is_bare_confirmation, is_confirmation, is_enhancement_request, is_reset_request,
    CompletionGate, GateDecision,
};
use crate::jobpost::draft::{JobPostDraft, MergeReport, Slot, REQUIRED_SLOTS};
use crate::jobpost::extraction::{extract_assignments, TurnAssignments};
use crate::jobpost::llm::DraftAssistant;
use crate::jobpost::normalize::{NormalizationPipeline, ValidationErrors};
use crate::jobpost::session::{
    parse_session_id, CompletionOutcome, ConversationSession, LeaseGuard, SessionLocks,
    SessionStore, TurnInProgress,
};
use crate::jobpost::submission::{
    JobPostSubmitter, SubmissionError, SubmissionRequest, SubmissionResponse,
};

/// One inbound chat message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: String,
    pub utterance: String,
    pub company_id: String,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResponse {
    pub session_id: Uuid,
    pub response_text: String,
    pub is_complete: bool,
    pub draft: JobPostDraft,
    pub missing_fields: Vec<&'static str>,
    pub turn_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CompletionOutcome>,
}

impl TurnResponse {
    fn from_session(session: &ConversationSession, response_text: String) -> Self {
        Self {
            session_id: session.session_id,
            response_text,
            is_complete: session.is_complete,
            draft: session.draft.clone(),
            missing_fields: session.draft.missing_required_fields(),
            turn_count: session.turn_count,
            outcome: session.outcome.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AgentTimeouts {
    pub llm: Duration,
    pub submission: Duration,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            llm: Duration::from_secs(20),
            submission: Duration::from_secs(20),
        }
    }
}

pub struct SlotFillingAgent {
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
    assistant: Arc<dyn DraftAssistant>,
    submitter: Arc<dyn JobPostSubmitter>,
    gate: CompletionGate,
    pipeline: NormalizationPipeline,
    timeouts: AgentTimeouts,
}

impl SlotFillingAgent {
    pub fn new(
        store: Arc<dyn SessionStore>,
        assistant: Arc<dyn DraftAssistant>,
        submitter: Arc<dyn JobPostSubmitter>,
        pipeline: NormalizationPipeline,
        timeouts: AgentTimeouts,
    ) -> Self {
        Self {
            store,
            locks: SessionLocks::new(),
            assistant,
            submitter,
            gate: CompletionGate,
            pipeline,
            timeouts,
        }
    }

    pub fn pipeline(&self) -> &NormalizationPipeline {
        &self.pipeline
    }

    /// Processes one utterance. Only one turn per session runs at a time; a
    /// concurrent second turn gets `AppError::Conflict`.
    pub async fn ingest(&self, request: TurnRequest) -> Result<TurnResponse, AppError> {
        let session_id = parse_session_id(&request.session_id).ok_or_else(|| {
            AppError::Validation(format!(
                "session_id '{}' is not a valid UUID v4",
                request.session_id
            ))
        })?;
        let company_id = request.company_id.trim();
        if company_id.is_empty() {
            return Err(AppError::Validation("company_id is required".to_string()));
        }

        let _turn = self
            .locks
            .try_acquire(session_id)
            .map_err(|e| AppError::Conflict(e.to_string()))?;
        let lease = self.claim_lease(session_id).await?;

        let result = self.ingest_leased(session_id, company_id, &request).await;
        lease.release().await;
        result
    }

    async fn ingest_leased(
        &self,
        session_id: Uuid,
        company_id: &str,
        request: &TurnRequest,
    ) -> Result<TurnResponse, AppError> {
        let mut session = match self.store.load(session_id).await? {
            Some(existing) => {
                if existing.company_id != company_id {
                    return Err(AppError::Validation(format!(
                        "session {session_id} belongs to a different company"
                    )));
                }
                existing
            }
            None => ConversationSession::new(
                session_id,
                company_id.to_string(),
                clean_optional(request.company_name.as_deref()),
            ),
        };

        let utterance = request.utterance.trim();
        if utterance.is_empty() {
            if session.is_complete {
                return Err(AppError::Validation(
                    "utterance must not be empty for a completed job post".to_string(),
                ));
            }
            // No-op: nothing persisted, no turn consumed.
            let text = next_question(&session.draft);
            return Ok(TurnResponse::from_session(&session, text));
        }

        session.record_turn();
        let text = self.run_turn(&mut session, utterance).await;
        self.store.save(&session).await?;

        info!(
            "Session {} turn {} complete={} missing={:?} (turns in flight: {})",
            session.session_id,
            session.turn_count,
            session.is_complete,
            session.draft.missing_required_fields(),
            self.locks.active()
        );
        Ok(TurnResponse::from_session(&session, text))
    }

    pub async fn get_session(&self, raw_id: &str) -> Result<ConversationSession, AppError> {
        let session_id = parse_id(raw_id)?;
        self.store
            .load(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
    }

    /// Deletes a session. Refused while a turn for it is running.
    pub async fn delete_session(&self, raw_id: &str) -> Result<(), AppError> {
        let session_id = parse_id(raw_id)?;
        let _turn = self
            .locks
            .try_acquire(session_id)
            .map_err(|e| AppError::Conflict(e.to_string()))?;
        let lease = self.claim_lease(session_id).await?;
        let result = self.store.delete(session_id).await;
        lease.release().await;
        result?;
        info!("Deleted session {session_id}");
        Ok(())
    }

    /// Cross-process half of the turn lock; `SessionLocks` is the in-process half.
    async fn claim_lease(&self, session_id: Uuid) -> Result<LeaseGuard, AppError> {
        let lease = self
            .store
            .claim_turn(session_id)
            .await?
            .ok_or_else(|| AppError::Conflict(TurnInProgress(session_id).to_string()))?;
        Ok(LeaseGuard::new(Arc::clone(&self.store), lease))
    }

    async fn run_turn(&self, session: &mut ConversationSession, utterance: &str) -> String {
        if session.is_complete {
            if is_confirmation(utterance) {
                let prior = session
                    .outcome
                    .as_ref()
                    .map(|o| o.message().to_string())
                    .unwrap_or_default();
                return format!("This job post was already completed. {prior}")
                    .trim_end()
                    .to_string();
            }
            info!(
                "Session {} received a new message after completion, starting a fresh draft",
                session.session_id
            );
            session.restart();
        }

        if is_reset_request(utterance) {
            session.restart();
            return format!("Starting a fresh job post. {}", next_question(&session.draft));
        }

        let mut preface = Vec::new();

        let keywords = self.keyword_assignments(&session.draft, utterance);

        // "improve it" is an enhancement request; "responsibilities: improve CI"
        // is slot data and goes through extraction.
        let enhanced = if keywords.is_empty()
            && is_enhancement_request(utterance)
            && session.draft.title.is_some()
        {
            self.enhance(&mut session.draft, utterance).await
        } else {
            false
        };

        if enhanced {
            preface.push("I've polished the description and responsibilities.".to_string());
        } else {
            let assignments = self
                .llm_fallback(&session.draft, utterance, keywords)
                .await;
            if assignments.is_empty() {
                debug!("Session {}: nothing extracted from turn", session.session_id);
            }
            let report = session.draft.merge(assignments.into_vec());
            preface.extend(describe_merge(&report));
        }

        let reply = match self.gate.evaluate(&session.draft, utterance) {
            GateDecision::Finalize => self.finalize(session).await,
            GateDecision::MissingFields { missing } => format!(
                "I can't publish yet. Still missing: {}. {}",
                missing.join(", "),
                next_question(&session.draft)
            ),
            GateDecision::Continue => next_question(&session.draft),
        };

        preface.push(reply);
        preface.join(" ")
    }

    async fn enhance(&self, draft: &mut JobPostDraft, utterance: &str) -> bool {
        match tokio::time::timeout(self.timeouts.llm, self.assistant.enhance(draft, utterance))
            .await
        {
            Ok(Ok(enhancement)) if !enhancement.is_empty() => {
                if let Some(description) = non_blank(enhancement.rewritten_description) {
                    draft.description = Some(description);
                }
                if let Some(responsibilities) = non_blank(enhancement.rewritten_responsibilities) {
                    draft.responsibilities = Some(responsibilities);
                }
                true
            }
            Ok(Ok(_)) => {
                warn!("Enhancement returned no usable text; falling back to extraction");
                false
            }
            Ok(Err(e)) => {
                warn!("Enhancement degraded: {e}");
                false
            }
            Err(_) => {
                warn!(
                    "Enhancement timed out after {}s",
                    self.timeouts.llm.as_secs()
                );
                false
            }
        }
    }

    /// Step 1: the keyword matchers. A panic degrades to "nothing found".
    fn keyword_assignments(&self, draft: &JobPostDraft, utterance: &str) -> TurnAssignments {
        match catch_unwind(AssertUnwindSafe(|| extract_assignments(utterance, draft))) {
            Ok(turn) => turn,
            Err(_) => {
                error!("Keyword extraction panicked; continuing without it");
                TurnAssignments::default()
            }
        }
    }

    /// Step 2: the LLM for the in-focus slot, if the matchers left it empty.
    async fn llm_fallback(
        &self,
        draft: &JobPostDraft,
        utterance: &str,
        mut turn: TurnAssignments,
    ) -> TurnAssignments {
        if is_bare_confirmation(utterance) {
            return turn;
        }
        let Some(focus) = draft.next_focus() else {
            return turn;
        };
        if turn.contains(focus) {
            return turn;
        }

        match tokio::time::timeout(
            self.timeouts.llm,
            self.assistant.extract(draft, utterance, focus),
        )
        .await
        {
            Ok(Ok(suggested)) => {
                for assignment in suggested {
                    let slot = assignment.slot();
                    // Never let the model rewrite something the user already settled.
                    if slot == Slot::Skills || !draft.is_filled(slot) {
                        turn.offer(assignment);
                    }
                }
            }
            Ok(Err(e)) => warn!("LLM extraction degraded (focus {}): {e}", focus.name()),
            Err(_) => warn!(
                "LLM extraction timed out after {}s (focus {})",
                self.timeouts.llm.as_secs(),
                focus.name()
            ),
        }

        turn
    }

    /// Normalizes and submits. Validation failures keep the conversation open;
    /// anything after a valid payload closes it.
    async fn finalize(&self, session: &mut ConversationSession) -> String {
        let normalized = catch_unwind(AssertUnwindSafe(|| {
            self.pipeline.transform_draft(&session.draft)
        }));

        let payload = match normalized {
            Ok(Ok(payload)) => payload,
            Ok(Err(violations)) => return describe_violations(&violations),
            Err(_) => {
                error!("Normalization panicked for session {}", session.session_id);
                let outcome = unpublished("internal error while preparing the job post".to_string());
                let text = outcome.message().to_string();
                session.complete(outcome);
                return text;
            }
        };

        let title = payload.title.clone();
        let request = SubmissionRequest {
            payload,
            company_id: session.company_id.clone(),
            company_name: session.company_name.clone(),
        };

        let result = match tokio::time::timeout(
            self.timeouts.submission,
            self.submitter.submit(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SubmissionError::Timeout(self.timeouts.submission.as_secs())),
        };

        let outcome = submission_outcome(&title, result);
        match &outcome {
            CompletionOutcome::Published { resource_id, .. } => {
                info!("Session {} published job {resource_id}", session.session_id)
            }
            CompletionOutcome::Unpublished { reason, .. } => {
                error!("Session {} submission failed: {reason}", session.session_id)
            }
        }
        let text = outcome.message().to_string();
        session.complete(outcome);
        text
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    parse_session_id(raw)
        .ok_or_else(|| AppError::Validation(format!("session_id '{raw}' is not a valid UUID v4")))
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn submission_outcome(
    title: &str,
    result: Result<SubmissionResponse, SubmissionError>,
) -> CompletionOutcome {
    match result {
        Ok(SubmissionResponse {
            success: true,
            resource_id: Some(resource_id),
            ..
        }) => CompletionOutcome::Published {
            message: format!("Your job post \"{title}\" is published (id {resource_id})."),
            resource_id,
        },
        Ok(SubmissionResponse {
            success: true,
            resource_id: None,
            ..
        }) => unpublished("the backend accepted the job post but returned no id".to_string()),
        Ok(response) => {
            let reason = if response.validation_errors.is_empty() {
                "the backend rejected the job post".to_string()
            } else {
                response.validation_errors.join("; ")
            };
            unpublished(reason)
        }
        Err(e) => unpublished(e.to_string()),
    }
}

fn unpublished(reason: String) -> CompletionOutcome {
    CompletionOutcome::Unpublished {
        message: format!("Publishing failed, so the job post is saved as unpublished. Reason: {reason}"),
        reason,
    }
}

fn describe_violations(violations: &ValidationErrors) -> String {
    let lines: Vec<String> = violations
        .violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect();
    format!(
        "I couldn't finalize the job post. Please fix the following: {}.",
        lines.join("; ")
    )
}

fn describe_merge(report: &MergeReport) -> Vec<String> {
    let mut parts = Vec::new();
    if !report.applied.is_empty() {
        let names: Vec<&str> = report.applied.iter().map(|s| s.name()).collect();
        parts.push(format!("Got it, updated {}.", names.join(", ")));
    }
    for rejected in &report.rejected {
        parts.push(format!(
            "I couldn't use \"{}\" for {}: {}.",
            rejected.value,
            rejected.slot.name(),
            rejected.reason
        ));
    }
    parts
}

/// Next prompt for the user: the first missing required field, or a request for
/// explicit confirmation once everything required is present.
pub fn next_question(draft: &JobPostDraft) -> String {
    let next_required = REQUIRED_SLOTS.iter().copied().find(|s| !draft.is_filled(*s));
    match next_required {
        Some(slot) => question_for(slot, draft).to_string(),
        None => {
            let mut text = format!(
                "Here is the job post so far:\n{}\nReply \"confirm\" to publish it, or tell me what to change.",
                draft.summary()
            );
            if !draft.is_filled(Slot::WorkType) {
                text.push_str(" You can also tell me whether it is remote, on-site or hybrid.");
            }
            text
        }
    }
}

fn question_for(slot: Slot, draft: &JobPostDraft) -> &'static str {
    match slot {
        Slot::Title => "What job title are you hiring for?",
        Slot::Responsibilities => "What will this person be responsible for?",
        Slot::ExperienceLevel => {
            "What experience level is this role: entry level, mid level, senior, lead or executive?"
        }
        Slot::Location => "Where is the job located?",
        Slot::Salary => match (draft.salary_min, draft.salary_max) {
            (Some(_), None) => "What is the maximum salary for this role?",
            (None, Some(_)) => "What is the minimum salary for this role?",
            _ => "What salary range are you offering? For example \"1200 to 1800 JOD\".",
        },
        Slot::WorkType => "Is this role remote, on-site or hybrid?",
        _ => "Anything else you'd like to add?",
    }
}
