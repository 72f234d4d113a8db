//! Interview context: who is being interviewed, for what, and the instructions
//! the voice agent should follow.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::backend_client::{BackendClient, BackendError};
use crate::interview::prompts::{GENERIC_INTERVIEWER_TEMPLATE, INTERVIEWER_TEMPLATE};
use crate::interview::room::{resolve_application_id, RoomParseError};

const APPLICATION_QUERY: &str = r#"
query Application($id: ID!) {
  application(id: $id) {
    id
    candidate { name }
    job {
      title
      description
      requirements
      company { name }
    }
    cvSummary
    language
  }
}"#;

const DEFAULT_LANGUAGE: &str = "English";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern"));

/// The slice of an application the interviewer needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetails {
    pub id: String,
    pub candidate_name: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub job_description: Option<String>,
    pub requirements: Option<String>,
    pub cv_summary: Option<String>,
    pub language: Option<String>,
}

#[async_trait]
pub trait ApplicationDirectory: Send + Sync {
    async fn application(&self, application_id: &str) -> Result<Option<ApplicationDetails>, BackendError>;
}

#[derive(Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Deserialize)]
struct JobNode {
    title: Option<String>,
    description: Option<String>,
    requirements: Option<String>,
    company: Option<Named>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationNode {
    id: String,
    candidate: Option<Named>,
    job: Option<JobNode>,
    cv_summary: Option<String>,
    language: Option<String>,
}

#[derive(Deserialize)]
struct ApplicationData {
    application: Option<ApplicationNode>,
}

impl From<ApplicationNode> for ApplicationDetails {
    fn from(node: ApplicationNode) -> Self {
        let job = node.job;
        Self {
            id: node.id,
            candidate_name: node.candidate.and_then(|c| c.name),
            job_title: job.as_ref().and_then(|j| j.title.clone()),
            company_name: job
                .as_ref()
                .and_then(|j| j.company.as_ref())
                .and_then(|c| c.name.clone()),
            job_description: job.as_ref().and_then(|j| j.description.clone()),
            requirements: job.and_then(|j| j.requirements),
            cv_summary: node.cv_summary,
            language: node.language,
        }
    }
}

#[async_trait]
impl ApplicationDirectory for BackendClient {
    async fn application(&self, application_id: &str) -> Result<Option<ApplicationDetails>, BackendError> {
        let data: ApplicationData = self
            .query(APPLICATION_QUERY, &json!({ "id": application_id }))
            .await?;
        Ok(data.application.map(ApplicationDetails::from))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewContext {
    pub application_id: String,
    /// False when the application could not be loaded and the generic script is used.
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationDetails>,
    pub instructions: String,
}

pub struct InterviewContextResolver {
    directory: Arc<dyn ApplicationDirectory>,
}

impl InterviewContextResolver {
    pub fn new(directory: Arc<dyn ApplicationDirectory>) -> Self {
        Self { directory }
    }

    /// Fails only when no application id can be found at all. A failed lookup
    /// degrades to the generic interview script.
    pub async fn resolve(
        &self,
        room: &str,
        metadata: Option<&str>,
    ) -> Result<InterviewContext, RoomParseError> {
        let application_id = resolve_application_id(room, metadata)?;

        let application = match self.directory.application(&application_id).await {
            Ok(Some(details)) => Some(details),
            Ok(None) => {
                warn!("Application {application_id} not found; using generic interview context");
                None
            }
            Err(e) => {
                warn!("Application lookup for {application_id} failed: {e}; using generic interview context");
                None
            }
        };

        let instructions = match &application {
            Some(details) => render_instructions(details),
            None => GENERIC_INTERVIEWER_TEMPLATE.replace("{language}", DEFAULT_LANGUAGE),
        };

        info!(
            "Interview context for room '{room}': application {application_id}, resolved={}",
            application.is_some()
        );

        Ok(InterviewContext {
            application_id,
            resolved: application.is_some(),
            application,
            instructions,
        })
    }
}

fn text_or(value: &Option<String>, fallback: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Fills every placeholder in one pass, so values that themselves contain
/// `{...}` are inserted literally.
fn render_instructions(details: &ApplicationDetails) -> String {
    PLACEHOLDER_RE
        .replace_all(INTERVIEWER_TEMPLATE, |caps: &Captures| {
            let (value, fallback) = match &caps[1] {
                "candidate_name" => (&details.candidate_name, "the candidate"),
                "job_title" => (&details.job_title, "the advertised role"),
                "company_name" => (&details.company_name, "the hiring company"),
                "job_description" => (&details.job_description, "Not provided."),
                "requirements" => (&details.requirements, "Not provided."),
                "cv_summary" => (&details.cv_summary, "No CV summary available."),
                "language" => (&details.language, DEFAULT_LANGUAGE),
                _ => return caps[0].to_string(),
            };
            text_or(value, fallback)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDirectory(Option<ApplicationDetails>);

    #[async_trait]
    impl ApplicationDirectory for FixedDirectory {
        async fn application(&self, _id: &str) -> Result<Option<ApplicationDetails>, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct DownDirectory;

    #[async_trait]
    impl ApplicationDirectory for DownDirectory {
        async fn application(&self, _id: &str) -> Result<Option<ApplicationDetails>, BackendError> {
            Err(BackendError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    fn details() -> ApplicationDetails {
        ApplicationDetails {
            id: "app-1".to_string(),
            candidate_name: Some("Lina".to_string()),
            job_title: Some("Backend Developer".to_string()),
            company_name: Some("Acme".to_string()),
            job_description: None,
            requirements: Some("3+ years of Go".to_string()),
            cv_summary: None,
            language: Some("Arabic".to_string()),
        }
    }

    #[tokio::test]
    async fn test_resolved_context_renders_details() {
        let resolver = InterviewContextResolver::new(Arc::new(FixedDirectory(Some(details()))));
        let context = resolver.resolve("interview-app1-1712345678", None).await.unwrap();

        assert!(context.resolved);
        assert_eq!(context.application_id, "app1");
        assert!(context.instructions.contains("Candidate: Lina"));
        assert!(context.instructions.contains("Role: Backend Developer"));
        assert!(context.instructions.contains("Speak in Arabic"));
        assert!(context.instructions.contains("Not provided."));
        assert!(!context.instructions.contains('{'));
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_generic() {
        let resolver = InterviewContextResolver::new(Arc::new(DownDirectory));
        let context = resolver.resolve("interview-app1", None).await.unwrap();

        assert!(!context.resolved);
        assert!(context.application.is_none());
        assert!(context.instructions.contains("could not be loaded"));
        assert!(context.instructions.contains("Speak in English"));
    }

    #[tokio::test]
    async fn test_missing_application_degrades_to_generic() {
        let resolver = InterviewContextResolver::new(Arc::new(FixedDirectory(None)));
        let context = resolver.resolve("interview-app1", None).await.unwrap();
        assert!(!context.resolved);
    }

    #[tokio::test]
    async fn test_unparseable_room_is_an_error() {
        let resolver = InterviewContextResolver::new(Arc::new(FixedDirectory(Some(details()))));
        assert!(resolver.resolve("my room!", None).await.is_err());
    }

    #[test]
    fn test_placeholder_text_in_values_is_not_expanded() {
        let mut details = details();
        details.candidate_name = Some("{job_title} {language}".to_string());
        let instructions = render_instructions(&details);
        assert!(instructions.contains("Candidate: {job_title} {language}"));
        assert!(instructions.contains("Role: Backend Developer"));
    }

    #[test]
    fn test_application_node_flattens() {
        let data: ApplicationData = serde_json::from_str(
            r#"{"application": {"id": "a1", "candidate": {"name": "Omar"},
                "job": {"title": "Nurse", "company": {"name": "Clinic"}}, "cvSummary": null}}"#,
        )
        .unwrap();
        let details = ApplicationDetails::from(data.application.unwrap());
        assert_eq!(details.candidate_name.as_deref(), Some("Omar"));
        assert_eq!(details.company_name.as_deref(), Some("Clinic"));
        assert!(details.requirements.is_none());
    }
}
