//! Decides when a conversation may move from collecting to submitting.
//!
//! Finalization needs BOTH an explicit, non-negated confirmation phrase and every
//! required field. A complete draft alone never finalizes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::jobpost::draft::JobPostDraft;

static CONFIRM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(confirm(?:ed)?|publish(?:\s+it)?|finali[sz]e|looks\s+(?:perfect|good|great)|ready\s+to\s+post)\b",
    )
    .expect("confirmation pattern")
});

static NEGATED_CONFIRM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:don'?t|do\s+not|not|never|no\s+need\s+to)\s+(?:\w+\s+)?(?:confirm|publish|finali[sz]e|post)\b|\bnot\s+ready\s+to\s+post\b|\bnot\s+looks?\s+good\b",
    )
    .expect("negated confirmation pattern")
});

/// Words that may surround a confirmation without carrying slot data.
static CONFIRM_FILLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(yes|yeah|yep|ok|okay|sure|please|it|now|the|job|post|all|everything|thanks|thank\s+you|go\s+ahead)\b")
        .expect("confirmation filler pattern")
});

static ENHANCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(enhance|improve|make\s+it\s+better|make\s+it\s+more|polish|rewrite|refine)\b")
        .expect("enhancement pattern")
});

static RESET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:reset|start\s+over|start\s+again|new\s+job\s+post)\b")
        .expect("reset pattern")
});

/// True if the utterance contains a confirmation phrase that is not negated.
pub fn is_confirmation(utterance: &str) -> bool {
    CONFIRM_RE.is_match(utterance) && !NEGATED_CONFIRM_RE.is_match(utterance)
}

/// A confirmation with nothing else worth extracting, e.g. "ok, publish it please".
pub fn is_bare_confirmation(utterance: &str) -> bool {
    if !is_confirmation(utterance) {
        return false;
    }
    let stripped = CONFIRM_RE.replace_all(utterance, " ");
    let stripped = CONFIRM_FILLER_RE.replace_all(&stripped, " ");
    !stripped.chars().any(|c| c.is_alphanumeric())
}

pub fn is_enhancement_request(utterance: &str) -> bool {
    ENHANCE_RE.is_match(utterance)
}

pub fn is_reset_request(utterance: &str) -> bool {
    RESET_RE.is_match(utterance)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Confirmed and complete; hand off to normalization.
    Finalize,
    /// Confirmed, but these external fields are still missing.
    MissingFields { missing: Vec<&'static str> },
    /// No confirmation this turn; keep collecting.
    Continue,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionGate;

impl CompletionGate {
    pub fn check(&self, draft: &JobPostDraft, utterance: &str) -> bool {
        matches!(self.evaluate(draft, utterance), GateDecision::Finalize)
    }

    pub fn evaluate(&self, draft: &JobPostDraft, utterance: &str) -> GateDecision {
        if !is_confirmation(utterance) {
            return GateDecision::Continue;
        }
        let missing = draft.missing_required_fields();
        if missing.is_empty() {
            GateDecision::Finalize
        } else {
            GateDecision::MissingFields { missing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobpost::draft::Assignment;

    fn complete_draft() -> JobPostDraft {
        let mut draft = JobPostDraft::default();
        draft.merge(vec![
            Assignment::Title("Data Analyst".to_string()),
            Assignment::Responsibilities("Build dashboards".to_string()),
            Assignment::ExperienceLevel("mid".to_string()),
            Assignment::Location("Amman".to_string()),
            Assignment::Salary {
                min: Some(900),
                max: Some(1200),
            },
        ]);
        draft
    }

    #[test]
    fn test_confirmation_keywords() {
        for phrase in [
            "confirm",
            "Publish it",
            "please finalize",
            "finalise",
            "looks perfect!",
            "Looks good to me",
            "ready to post",
        ] {
            assert!(is_confirmation(phrase), "{phrase}");
        }
        assert!(!is_confirmation("what happens next?"));
    }

    #[test]
    fn test_negated_confirmation_is_not_confirmation() {
        assert!(!is_confirmation("don't publish yet"));
        assert!(!is_confirmation("do not confirm, I need to check salary"));
        assert!(!is_confirmation("not ready to post"));
    }

    #[test]
    fn test_bare_confirmation() {
        assert!(is_bare_confirmation("confirm"));
        assert!(is_bare_confirmation("Yes, publish it please!"));
        assert!(!is_bare_confirmation("looks good, but location is Irbid"));
    }

    #[test]
    fn test_completeness_alone_never_finalizes() {
        let gate = CompletionGate;
        assert!(!gate.check(&complete_draft(), "great, thanks"));
        assert_eq!(
            gate.evaluate(&complete_draft(), "great, thanks"),
            GateDecision::Continue
        );
    }

    #[test]
    fn test_confirm_with_complete_draft_finalizes() {
        assert!(CompletionGate.check(&complete_draft(), "confirm"));
    }

    #[test]
    fn test_confirm_with_missing_fields_lists_them() {
        let mut draft = complete_draft();
        draft.location = None;
        assert_eq!(
            CompletionGate.evaluate(&draft, "confirm"),
            GateDecision::MissingFields {
                missing: vec!["location"]
            }
        );
        assert!(!CompletionGate.check(&draft, "confirm"));
    }

    #[test]
    fn test_enhance_and_reset_triggers() {
        assert!(is_enhancement_request("can you enhance it?"));
        assert!(is_enhancement_request("make it better"));
        assert!(!is_enhancement_request("remote, Amman"));
        assert!(is_reset_request("start over please"));
        assert!(!is_reset_request("we can reset expectations later"));
    }
}
