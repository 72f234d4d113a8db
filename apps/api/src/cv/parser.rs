use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cv::prompts::{CV_PARSE_PROMPT_TEMPLATE, CV_PARSER_ROLE};
use crate::llm_client::prompts::json_system;
use crate::llm_client::{LlmClient, LlmError};

/// CVs longer than this are cut before prompting.
const MAX_CV_CHARS: usize = 20_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedCv {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<f32>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ParsedCv {
    /// Trims strings, drops blanks and de-duplicates skills case-insensitively.
    fn tidy(mut self) -> Self {
        for field in [
            &mut self.full_name,
            &mut self.email,
            &mut self.phone,
            &mut self.current_title,
            &mut self.summary,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }

        let mut skills: Vec<String> = Vec::new();
        for skill in self.skills.drain(..) {
            let skill = skill.trim();
            if !skill.is_empty() && !skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                skills.push(skill.to_string());
            }
        }
        self.skills = skills;

        self.years_of_experience = self.years_of_experience.filter(|y| y.is_finite() && *y >= 0.0);
        self
    }
}

#[async_trait]
pub trait CvParser: Send + Sync {
    async fn parse_cv(&self, text: &str) -> Result<ParsedCv, LlmError>;
}

#[async_trait]
impl CvParser for LlmClient {
    async fn parse_cv(&self, text: &str) -> Result<ParsedCv, LlmError> {
        let prompt = CV_PARSE_PROMPT_TEMPLATE.replace("{cv_text}", truncate_chars(text, MAX_CV_CHARS));
        let parsed: ParsedCv = self.call_json(&prompt, &json_system(CV_PARSER_ROLE)).await?;
        Ok(parsed.tidy())
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
