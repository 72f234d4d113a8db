//! The typed, accumulating state of one job-post conversation.
//!
//! The draft never carries a `department` field: the external schema rejects it,
//! and the struct simply has nowhere to put one. Enum-valued slots only hold
//! canonical members; free-text descriptors go through [`ExperienceLevel::from_descriptor`]
//! and [`WorkType::from_descriptor`] before they are stored.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Enums + synonym tables
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceLevel {
    EntryLevel,
    MidLevel,
    Senior,
    Lead,
    Executive,
}

/// Recognized experience descriptors, keyed by their normalized form
/// (lowercase, `-`/`_` folded to spaces, single-spaced, no trailing dot).
pub const EXPERIENCE_SYNONYMS: &[(&str, ExperienceLevel)] = &[
    ("entry level", ExperienceLevel::EntryLevel),
    ("entry", ExperienceLevel::EntryLevel),
    ("junior", ExperienceLevel::EntryLevel),
    ("jr", ExperienceLevel::EntryLevel),
    ("graduate", ExperienceLevel::EntryLevel),
    ("fresh graduate", ExperienceLevel::EntryLevel),
    ("intern", ExperienceLevel::EntryLevel),
    ("internship", ExperienceLevel::EntryLevel),
    ("beginner", ExperienceLevel::EntryLevel),
    ("mid level", ExperienceLevel::MidLevel),
    ("mid", ExperienceLevel::MidLevel),
    ("midlevel", ExperienceLevel::MidLevel),
    ("intermediate", ExperienceLevel::MidLevel),
    ("senior", ExperienceLevel::Senior),
    ("sr", ExperienceLevel::Senior),
    ("senior level", ExperienceLevel::Senior),
    ("senior dev", ExperienceLevel::Senior),
    ("senior developer", ExperienceLevel::Senior),
    ("senior engineer", ExperienceLevel::Senior),
    ("lead", ExperienceLevel::Lead),
    ("team lead", ExperienceLevel::Lead),
    ("tech lead", ExperienceLevel::Lead),
    ("technical lead", ExperienceLevel::Lead),
    ("principal", ExperienceLevel::Lead),
    ("executive", ExperienceLevel::Executive),
    ("director", ExperienceLevel::Executive),
    ("head of", ExperienceLevel::Executive),
    ("vp", ExperienceLevel::Executive),
    ("vice president", ExperienceLevel::Executive),
    ("c level", ExperienceLevel::Executive),
    ("chief", ExperienceLevel::Executive),
];

impl ExperienceLevel {
    /// Maps a free-text descriptor to its canonical level. `None` means the text
    /// is not in the synonym table; callers must report it, never default it.
    pub fn from_descriptor(raw: &str) -> Option<Self> {
        let key = normalize_descriptor(raw);
        EXPERIENCE_SYNONYMS
            .iter()
            .find(|(synonym, _)| *synonym == key)
            .map(|(_, level)| *level)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::EntryLevel => "entry level",
            ExperienceLevel::MidLevel => "mid level",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Lead => "lead",
            ExperienceLevel::Executive => "executive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkType {
    Remote,
    OnSite,
    Hybrid,
}

pub const WORK_TYPE_SYNONYMS: &[(&str, WorkType)] = &[
    ("remote", WorkType::Remote),
    ("fully remote", WorkType::Remote),
    ("remote first", WorkType::Remote),
    ("work from home", WorkType::Remote),
    ("wfh", WorkType::Remote),
    ("hybrid", WorkType::Hybrid),
    ("partially remote", WorkType::Hybrid),
    ("on site", WorkType::OnSite),
    ("onsite", WorkType::OnSite),
    ("in office", WorkType::OnSite),
    ("office", WorkType::OnSite),
    ("on premises", WorkType::OnSite),
    ("in person", WorkType::OnSite),
];

impl WorkType {
    pub fn from_descriptor(raw: &str) -> Option<Self> {
        let key = normalize_descriptor(raw);
        WORK_TYPE_SYNONYMS
            .iter()
            .find(|(synonym, _)| *synonym == key)
            .map(|(_, work_type)| *work_type)
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkType::Remote => "remote",
            WorkType::OnSite => "on-site",
            WorkType::Hybrid => "hybrid",
        }
    }
}

/// Folds a descriptor to the key space of the synonym tables.
/// `"Mid-Level"`, `"MID_LEVEL"` and `"mid level"` all become `"mid level"`.
pub fn normalize_descriptor(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('.')
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Slots + assignments
// ────────────────────────────────────────────────────────────────────────────

/// One named field of the draft. `Salary` covers both bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Title,
    Description,
    Requirements,
    Responsibilities,
    Benefits,
    Skills,
    ExperienceLevel,
    Location,
    WorkType,
    Salary,
    Currency,
    EnableAiInterview,
    IsFeatured,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Title => "title",
            Slot::Description => "description",
            Slot::Requirements => "requirements",
            Slot::Responsibilities => "responsibilities",
            Slot::Benefits => "benefits",
            Slot::Skills => "skills",
            Slot::ExperienceLevel => "experienceLevel",
            Slot::Location => "location",
            Slot::WorkType => "workType",
            Slot::Salary => "salary",
            Slot::Currency => "currency",
            Slot::EnableAiInterview => "enableAiInterview",
            Slot::IsFeatured => "isFeatured",
        }
    }
}

/// The order in which unfilled slots are asked about (and targeted by the LLM fallback).
pub const FOCUS_ORDER: &[Slot] = &[
    Slot::Title,
    Slot::Responsibilities,
    Slot::ExperienceLevel,
    Slot::Location,
    Slot::Salary,
    Slot::WorkType,
];

/// Slots that must be filled before a confirmation can finalize the draft.
pub const REQUIRED_SLOTS: &[Slot] = &[
    Slot::Title,
    Slot::Responsibilities,
    Slot::ExperienceLevel,
    Slot::Location,
    Slot::Salary,
];

/// A single proposed field update. Enum slots carry raw descriptors; they are
/// normalized when merged.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Title(String),
    Description(String),
    Requirements(String),
    Responsibilities(String),
    Benefits(String),
    Skills(Vec<String>),
    ExperienceLevel(String),
    Location(String),
    WorkType(String),
    Salary { min: Option<i64>, max: Option<i64> },
    Currency(String),
    EnableAiInterview(bool),
    IsFeatured(bool),
}

impl Assignment {
    pub fn slot(&self) -> Slot {
        match self {
            Assignment::Title(_) => Slot::Title,
            Assignment::Description(_) => Slot::Description,
            Assignment::Requirements(_) => Slot::Requirements,
            Assignment::Responsibilities(_) => Slot::Responsibilities,
            Assignment::Benefits(_) => Slot::Benefits,
            Assignment::Skills(_) => Slot::Skills,
            Assignment::ExperienceLevel(_) => Slot::ExperienceLevel,
            Assignment::Location(_) => Slot::Location,
            Assignment::WorkType(_) => Slot::WorkType,
            Assignment::Salary { .. } => Slot::Salary,
            Assignment::Currency(_) => Slot::Currency,
            Assignment::EnableAiInterview(_) => Slot::EnableAiInterview,
            Assignment::IsFeatured(_) => Slot::IsFeatured,
        }
    }
}

/// A value that could not be stored because it failed normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedValue {
    pub slot: Slot,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub applied: Vec<Slot>,
    pub rejected: Vec<RejectedValue>,
}

// ────────────────────────────────────────────────────────────────────────────
// JobPostDraft
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ai_interview: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
}

impl JobPostDraft {
    pub fn is_filled(&self, slot: Slot) -> bool {
        match slot {
            Slot::Title => self.title.is_some(),
            Slot::Description => self.description.is_some(),
            Slot::Requirements => self.requirements.is_some(),
            Slot::Responsibilities => self.responsibilities.is_some(),
            Slot::Benefits => self.benefits.is_some(),
            Slot::Skills => !self.skills.is_empty(),
            Slot::ExperienceLevel => self.experience_level.is_some(),
            Slot::Location => self.location.is_some(),
            Slot::WorkType => self.work_type.is_some(),
            Slot::Salary => self.salary_min.is_some() && self.salary_max.is_some(),
            Slot::Currency => self.currency.is_some(),
            Slot::EnableAiInterview => self.enable_ai_interview.is_some(),
            Slot::IsFeatured => self.is_featured.is_some(),
        }
    }

    /// First unfilled slot in [`FOCUS_ORDER`].
    pub fn next_focus(&self) -> Option<Slot> {
        FOCUS_ORDER.iter().copied().find(|s| !self.is_filled(*s))
    }

    /// External field names of every missing required value, in focus order.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for slot in REQUIRED_SLOTS {
            match slot {
                Slot::Salary => {
                    if self.salary_min.is_none() {
                        missing.push("salaryMin");
                    }
                    if self.salary_max.is_none() {
                        missing.push("salaryMax");
                    }
                }
                other if !self.is_filled(*other) => missing.push(other.name()),
                _ => {}
            }
        }
        missing
    }

    pub fn has_required_fields(&self) -> bool {
        self.missing_required_fields().is_empty()
    }

    /// Applies assignments in order. Text slots are replaced, skills are unioned,
    /// enum descriptors are normalized (unrecognized ones are rejected, not stored).
    pub fn merge(&mut self, assignments: Vec<Assignment>) -> MergeReport {
        let mut report = MergeReport::default();

        for assignment in assignments {
            let slot = assignment.slot();
            let applied = match assignment {
                Assignment::Title(v) => set_text(&mut self.title, v),
                Assignment::Description(v) => set_text(&mut self.description, v),
                Assignment::Requirements(v) => set_text(&mut self.requirements, v),
                Assignment::Responsibilities(v) => set_text(&mut self.responsibilities, v),
                Assignment::Benefits(v) => set_text(&mut self.benefits, v),
                Assignment::Location(v) => set_text(&mut self.location, v),
                Assignment::Skills(items) => self.union_skills(items),
                Assignment::ExperienceLevel(raw) => match ExperienceLevel::from_descriptor(&raw) {
                    Some(level) => {
                        self.experience_level = Some(level);
                        true
                    }
                    None => {
                        report.rejected.push(RejectedValue {
                            slot,
                            value: raw,
                            reason: "not a recognized experience level".to_string(),
                        });
                        false
                    }
                },
                Assignment::WorkType(raw) => match WorkType::from_descriptor(&raw) {
                    Some(work_type) => {
                        self.work_type = Some(work_type);
                        true
                    }
                    None => {
                        report.rejected.push(RejectedValue {
                            slot,
                            value: raw,
                            reason: "not a recognized work type".to_string(),
                        });
                        false
                    }
                },
                Assignment::Salary { min, max } => {
                    if let Some(min) = min {
                        self.salary_min = Some(min);
                    }
                    if let Some(max) = max {
                        self.salary_max = Some(max);
                    }
                    min.is_some() || max.is_some()
                }
                Assignment::Currency(code) => {
                    let code = code.trim().to_uppercase();
                    if code.is_empty() {
                        false
                    } else {
                        self.currency = Some(code);
                        true
                    }
                }
                Assignment::EnableAiInterview(flag) => {
                    self.enable_ai_interview = Some(flag);
                    true
                }
                Assignment::IsFeatured(flag) => {
                    self.is_featured = Some(flag);
                    true
                }
            };

            if applied && !report.applied.contains(&slot) {
                report.applied.push(slot);
            }
        }

        report
    }

    /// Case-insensitive union preserving first-seen casing and order.
    /// Returns true if anything new was added.
    fn union_skills(&mut self, items: Vec<String>) -> bool {
        let mut added = false;
        for item in items {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let exists = self.skills.iter().any(|s| s.eq_ignore_ascii_case(item));
            if !exists {
                self.skills.push(item.to_string());
                added = true;
            }
        }
        added
    }

    /// Multi-line human summary used in confirmation prompts.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(title) = &self.title {
            lines.push(format!("• Title: {title}"));
        }
        if let Some(level) = &self.experience_level {
            lines.push(format!("• Experience level: {}", level.label()));
        }
        if let Some(location) = &self.location {
            lines.push(format!("• Location: {location}"));
        }
        if let Some(work_type) = &self.work_type {
            lines.push(format!("• Work type: {}", work_type.label()));
        }
        match (self.salary_min, self.salary_max) {
            (Some(min), Some(max)) => lines.push(format!(
                "• Salary: {min} – {max} {}",
                self.currency.as_deref().unwrap_or("")
            )),
            (Some(min), None) => lines.push(format!("• Salary: from {min}")),
            (None, Some(max)) => lines.push(format!("• Salary: up to {max}")),
            (None, None) => {}
        }
        if let Some(responsibilities) = &self.responsibilities {
            lines.push(format!("• Responsibilities: {responsibilities}"));
        }
        if let Some(requirements) = &self.requirements {
            lines.push(format!("• Requirements: {requirements}"));
        }
        if !self.skills.is_empty() {
            lines.push(format!("• Skills: {}", self.skills.join(", ")));
        }
        if let Some(benefits) = &self.benefits {
            lines.push(format!("• Benefits: {benefits}"));
        }
        lines
            .into_iter()
            .map(|l| l.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn set_text(field: &mut Option<String>, value: String) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    *field = Some(value.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_synonyms_map_to_canonical() {
        assert_eq!(
            ExperienceLevel::from_descriptor("Mid-Level"),
            Some(ExperienceLevel::MidLevel)
        );
        assert_eq!(
            ExperienceLevel::from_descriptor("MID_LEVEL"),
            Some(ExperienceLevel::MidLevel)
        );
        assert_eq!(
            ExperienceLevel::from_descriptor("Sr."),
            Some(ExperienceLevel::Senior)
        );
        assert_eq!(
            ExperienceLevel::from_descriptor("senior dev"),
            Some(ExperienceLevel::Senior)
        );
        assert_eq!(ExperienceLevel::from_descriptor("guru"), None);
    }

    #[test]
    fn test_every_synonym_resolves() {
        for (synonym, level) in EXPERIENCE_SYNONYMS {
            assert_eq!(ExperienceLevel::from_descriptor(synonym), Some(*level));
        }
        for (synonym, work_type) in WORK_TYPE_SYNONYMS {
            assert_eq!(WorkType::from_descriptor(synonym), Some(*work_type));
        }
    }

    #[test]
    fn test_work_type_spellings() {
        assert_eq!(WorkType::from_descriptor("On-Site"), Some(WorkType::OnSite));
        assert_eq!(WorkType::from_descriptor("ON_SITE"), Some(WorkType::OnSite));
        assert_eq!(WorkType::from_descriptor("in office"), Some(WorkType::OnSite));
        assert_eq!(WorkType::from_descriptor("REMOTE"), Some(WorkType::Remote));
        assert_eq!(WorkType::from_descriptor("sometimes"), None);
    }

    #[test]
    fn test_skills_union_is_case_insensitive_and_ordered() {
        let mut draft = JobPostDraft::default();
        draft.merge(vec![Assignment::Skills(vec![
            "Rust".to_string(),
            "SQL".to_string(),
        ])]);
        draft.merge(vec![Assignment::Skills(vec![
            "rust".to_string(),
            "Docker".to_string(),
            "sql".to_string(),
        ])]);
        assert_eq!(draft.skills, vec!["Rust", "SQL", "Docker"]);
    }

    #[test]
    fn test_skills_never_shrink() {
        let mut draft = JobPostDraft::default();
        draft.merge(vec![Assignment::Skills(vec!["Go".to_string()])]);
        draft.merge(vec![Assignment::Skills(vec![])]);
        draft.merge(vec![Assignment::Title("Backend Engineer".to_string())]);
        assert_eq!(draft.skills, vec!["Go"]);
    }

    #[test]
    fn test_unrecognized_enum_is_rejected_not_stored() {
        let mut draft = JobPostDraft::default();
        let report = draft.merge(vec![Assignment::ExperienceLevel("wizard".to_string())]);
        assert!(draft.experience_level.is_none());
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].slot, Slot::ExperienceLevel);
        assert!(report.applied.is_empty());
    }

    #[test]
    fn test_salary_partial_merge_keeps_other_bound() {
        let mut draft = JobPostDraft::default();
        draft.merge(vec![Assignment::Salary {
            min: Some(1000),
            max: Some(2000),
        }]);
        draft.merge(vec![Assignment::Salary {
            min: None,
            max: Some(2500),
        }]);
        assert_eq!(draft.salary_min, Some(1000));
        assert_eq!(draft.salary_max, Some(2500));
    }

    #[test]
    fn test_missing_required_fields_in_focus_order() {
        let mut draft = JobPostDraft::default();
        draft.merge(vec![
            Assignment::Title("Accountant".to_string()),
            Assignment::Salary {
                min: Some(500),
                max: None,
            },
        ]);
        assert_eq!(
            draft.missing_required_fields(),
            vec!["responsibilities", "experienceLevel", "location", "salaryMax"]
        );
        assert_eq!(draft.next_focus(), Some(Slot::Responsibilities));
    }

    #[test]
    fn test_draft_serializes_camel_case_without_department() {
        let mut draft = JobPostDraft::default();
        draft.merge(vec![
            Assignment::ExperienceLevel("senior".to_string()),
            Assignment::WorkType("on-site".to_string()),
        ]);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["experienceLevel"], "SENIOR");
        assert_eq!(json["workType"], "ON_SITE");
        assert!(json.get("department").is_none());
    }
}
