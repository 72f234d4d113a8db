//! The last step before a draft crosses into the
//! external job-post schema.
//!
//! Works on the untyped draft document so it can also guard drafts that did not
//! come from [`JobPostDraft`]. Every rule runs; all violations are reported together.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::jobpost::draft::{ExperienceLevel, JobPostDraft, WorkType};

/// Keys the external schema accepts. Anything else is dropped.
const KNOWN_FIELDS: &[&str] = &[
    "title",
    "description",
    "requirements",
    "responsibilities",
    "benefits",
    "skills",
    "experienceLevel",
    "location",
    "workType",
    "salaryMin",
    "salaryMax",
    "currency",
    "enableAiInterview",
    "isFeatured",
];

/// Validated job post in the external submission schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    pub responsibilities: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    pub skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,
    pub salary_min: i64,
    pub salary_max: i64,
    pub currency: String,
    pub enable_ai_interview: bool,
    pub is_featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Every rule failure found in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", lines.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone)]
pub struct NormalizationPipeline {
    fallback_currency: String,
}

impl NormalizationPipeline {
    pub fn new(fallback_currency: impl Into<String>) -> Self {
        Self {
            fallback_currency: fallback_currency.into().trim().to_uppercase(),
        }
    }

    /// Normalizes a typed draft by running it through the document pipeline.
    pub fn transform_draft(&self, draft: &JobPostDraft) -> Result<JobPostPayload, ValidationErrors> {
        match serde_json::to_value(draft) {
            Ok(document) => self.transform(&document),
            Err(e) => {
                let mut errors = ValidationErrors::default();
                errors.push("draft", format!("could not be serialized: {e}"));
                Err(errors)
            }
        }
    }

    /// Transforms a draft document into a payload, or reports every violated rule.
    pub fn transform(&self, document: &Value) -> Result<JobPostPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let Some(object) = document.as_object() else {
            errors.push("draft", "must be a JSON object");
            return Err(errors);
        };

        let fields = strip_unknown_fields(object);

        let title = required_text(&fields, "title", &mut errors);
        let responsibilities = required_text(&fields, "responsibilities", &mut errors);
        let location = required_text(&fields, "location", &mut errors);
        let description = optional_text(&fields, "description", &mut errors);
        let requirements = optional_text(&fields, "requirements", &mut errors);
        let benefits = optional_text(&fields, "benefits", &mut errors);
        let skills = skills_list(&fields, &mut errors);

        let experience_level = match fields.get("experienceLevel") {
            None | Some(Value::Null) => {
                errors.push("experienceLevel", "is required");
                None
            }
            Some(Value::String(s)) => {
                let level = ExperienceLevel::from_descriptor(s);
                if level.is_none() {
                    errors.push(
                        "experienceLevel",
                        format!("unrecognized value '{s}' (expected entry level, mid level, senior, lead or executive)"),
                    );
                }
                level
            }
            Some(other) => {
                errors.push("experienceLevel", format!("unrecognized value '{other}'"));
                None
            }
        };

        let work_type = match fields.get("workType") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let work_type = WorkType::from_descriptor(s);
                if work_type.is_none() {
                    errors.push(
                        "workType",
                        format!("unrecognized value '{s}' (expected remote, hybrid or on-site)"),
                    );
                }
                work_type
            }
            Some(other) => {
                errors.push("workType", format!("unrecognized value '{other}'"));
                None
            }
        };

        let salary_min = salary_field(&fields, "salaryMin", &mut errors);
        let salary_max = salary_field(&fields, "salaryMax", &mut errors);
        if let (Some(min), Some(max)) = (salary_min, salary_max) {
            if min > max {
                errors.push(
                    "salary",
                    format!("salaryMin ({min}) must not exceed salaryMax ({max})"),
                );
            }
        }

        let currency = match fields.get("currency") {
            None | Some(Value::Null) => Some(self.fallback_currency.clone()),
            Some(Value::String(s)) if is_currency_code(s.trim()) => Some(s.trim().to_uppercase()),
            Some(other) => {
                errors.push(
                    "currency",
                    format!("'{}' is not a 3-letter currency code", display_value(other)),
                );
                None
            }
        };

        let enable_ai_interview = flag_field(&fields, "enableAiInterview", &mut errors);
        let is_featured = flag_field(&fields, "isFeatured", &mut errors);

        if !errors.is_empty() {
            debug!("Draft normalization failed: {errors}");
            return Err(errors);
        }

        match (
            title,
            responsibilities,
            location,
            experience_level,
            salary_min,
            salary_max,
            currency,
        ) {
            (
                Some(title),
                Some(responsibilities),
                Some(location),
                Some(experience_level),
                Some(salary_min),
                Some(salary_max),
                Some(currency),
            ) => Ok(JobPostPayload {
                title,
                description,
                requirements,
                responsibilities,
                benefits,
                skills,
                experience_level,
                location,
                work_type,
                salary_min,
                salary_max,
                currency,
                enable_ai_interview,
                is_featured,
            }),
            _ => {
                errors.push("draft", "incomplete after normalization");
                Err(errors)
            }
        }
    }
}

/// Drops `department` (any spelling) and every key outside the external schema.
fn strip_unknown_fields(object: &Map<String, Value>) -> Map<String, Value> {
    let mut kept = Map::new();
    for (key, value) in object {
        if is_department_key(key) {
            warn!("Stripping forbidden '{key}' field from job post draft");
            continue;
        }
        if let Some(known) = KNOWN_FIELDS.iter().find(|k| k.eq_ignore_ascii_case(key)) {
            kept.insert((*known).to_string(), value.clone());
        } else {
            debug!("Dropping unknown job post field '{key}'");
        }
    }
    kept
}

fn is_department_key(key: &str) -> bool {
    let folded: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    folded.starts_with("department") || folded == "dept" || folded.starts_with("deptname")
}

fn required_text(fields: &Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Option<String> {
    let value = optional_text(fields, key, errors);
    if value.is_none() && !errors.mentions(key) {
        errors.push(key, "is required");
    }
    value
}

fn optional_text(fields: &Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Option<String> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(_) => {
            errors.push(key, "must be text");
            None
        }
    }
}

fn skills_list(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Vec<String> {
    let raw: Vec<String> = match fields.get("skills") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.split(',').map(|p| p.to_string()).collect(),
        Some(Value::Array(items)) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    other => errors.push("skills", format!("'{other}' is not a skill name")),
                }
            }
            out
        }
        Some(_) => {
            errors.push("skills", "must be a list of skill names");
            Vec::new()
        }
    };

    let mut skills: Vec<String> = Vec::new();
    for skill in raw {
        let skill = skill.trim();
        if !skill.is_empty() && !skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            skills.push(skill.to_string());
        }
    }
    skills
}

fn salary_field(fields: &Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> Option<i64> {
    match fields.get(key) {
        None | Some(Value::Null) => {
            errors.push(key, "is required");
            None
        }
        Some(value) => match coerce_salary(value) {
            Some(n) if n < 0 => {
                errors.push(key, format!("must not be negative (got {n})"));
                None
            }
            Some(n) => Some(n),
            None => {
                errors.push(
                    key,
                    format!("'{}' is not a numeric amount", display_value(value)),
                );
                None
            }
        },
    }
}

/// Coerces a salary value to an integer by truncation.
/// Accepts integers, floats, and numeric text with `,`/`_`/space separators.
pub fn coerce_salary(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }
        _ => None,
    }
}

fn flag_field(fields: &Map<String, Value>, key: &str, errors: &mut ValidationErrors) -> bool {
    match fields.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => true,
            "false" | "no" => false,
            _ => {
                errors.push(key, format!("'{s}' is not a boolean"));
                false
            }
        },
        Some(other) => {
            errors.push(key, format!("'{other}' is not a boolean"));
            false
        }
    }
}

fn is_currency_code(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
