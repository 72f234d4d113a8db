//! Hands a normalized job post to the recruiting backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::backend_client::{BackendClient, BackendError};
use crate::jobpost::normalize::JobPostPayload;

const CREATE_JOB_MUTATION: &str = r#"
mutation CreateJob($input: CreateJobInput!) {
  createJob(input: $input) {
    id
    title
    status
  }
}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(flatten)]
    pub payload: JobPostPayload,
    pub company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// What the backend said about a submission it received.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub resource_id: Option<String>,
    pub validation_errors: Vec<String>,
}

impl SubmissionResponse {
    pub fn created(resource_id: impl Into<String>) -> Self {
        Self {
            success: true,
            resource_id: Some(resource_id.into()),
            validation_errors: Vec::new(),
        }
    }

    pub fn rejected(validation_errors: Vec<String>) -> Self {
        Self {
            success: false,
            resource_id: None,
            validation_errors,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Submission timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait JobPostSubmitter: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResponse, SubmissionError>;
}

#[derive(Serialize)]
struct CreateJobVariables<'a> {
    input: &'a SubmissionRequest,
}

#[derive(Deserialize)]
struct CreatedJob {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobData {
    create_job: CreatedJob,
}

#[async_trait]
impl JobPostSubmitter for BackendClient {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResponse, SubmissionError> {
        let variables = CreateJobVariables { input: request };
        match self
            .mutate::<_, CreateJobData>(CREATE_JOB_MUTATION, &variables)
            .await
        {
            Ok(data) => {
                info!(
                    "Created job {} for company {}",
                    data.create_job.id, request.company_id
                );
                Ok(SubmissionResponse::created(data.create_job.id))
            }
            // Schema-level rejections are answers, not transport failures.
            Err(BackendError::GraphQl(messages)) => Ok(SubmissionResponse::rejected(messages)),
            Err(BackendError::Api { status, message }) if (400..500).contains(&status) => {
                Ok(SubmissionResponse::rejected(vec![message]))
            }
            Err(e) => Err(SubmissionError::Backend(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use crate::jobpost::draft::{ExperienceLevel, WorkType};

    fn sample_request() -> SubmissionRequest {
        SubmissionRequest {
            payload: JobPostPayload {
                title: "Nurse".to_string(),
                description: None,
                requirements: None,
                responsibilities: "Patient care".to_string(),
                benefits: None,
                skills: vec![],
                experience_level: ExperienceLevel::MidLevel,
                location: "Amman".to_string(),
                work_type: Some(WorkType::OnSite),
                salary_min: 700,
                salary_max: 900,
                currency: "JOD".to_string(),
                enable_ai_interview: true,
                is_featured: false,
            },
            company_id: "co-1".to_string(),
            company_name: None,
        }
    }

    /// Canned GraphQL endpoint: answers every call with one status and body.
    #[derive(Clone)]
    struct StubBackend {
        status: StatusCode,
        body: String,
        hits: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<Value>>>,
    }

    async fn graphql(State(stub): State<StubBackend>, Json(request): Json<Value>) -> (StatusCode, String) {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        *stub.last_request.lock().unwrap() = Some(request);
        (stub.status, stub.body.clone())
    }

    async fn spawn_backend(status: StatusCode, body: Value) -> (BackendClient, StubBackend) {
        let stub = StubBackend {
            status,
            body: body.to_string(),
            hits: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        };
        let app = Router::new()
            .route("/graphql", post(graphql))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = BackendClient::new(
            format!("http://{addr}/graphql"),
            Some("test-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        (client, stub)
    }

    #[test]
    fn test_request_flattens_payload_with_company() {
        let json = serde_json::to_value(sample_request()).unwrap();
        assert_eq!(json["companyId"], "co-1");
        assert_eq!(json["experienceLevel"], "MID_LEVEL");
        assert_eq!(json["workType"], "ON_SITE");
        assert!(json.get("companyName").is_none());
        assert!(json.get("department").is_none());
        assert!(json.get("payload").is_none());
    }

    #[tokio::test]
    async fn test_created_job_returns_resource_id() {
        let (client, stub) = spawn_backend(
            StatusCode::OK,
            json!({"data": {"createJob": {"id": "job-7", "title": "Nurse", "status": "ACTIVE"}}}),
        )
        .await;

        let response = client.submit(&sample_request()).await.unwrap();
        assert_eq!(response, SubmissionResponse::created("job-7"));

        let sent = stub.last_request.lock().unwrap().clone().unwrap();
        assert!(sent["query"].as_str().unwrap().contains("createJob"));
        assert_eq!(sent["variables"]["input"]["companyId"], "co-1");
        assert_eq!(sent["variables"]["input"]["salaryMax"], 900);
    }

    #[tokio::test]
    async fn test_graphql_errors_are_a_rejection() {
        let (client, _stub) = spawn_backend(
            StatusCode::OK,
            json!({"data": null, "errors": [{"message": "title already used"}]}),
        )
        .await;

        let response = client.submit(&sample_request()).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.validation_errors, vec!["title already used"]);
    }

    #[tokio::test]
    async fn test_client_error_with_errors_array_is_a_rejection() {
        let (client, _stub) = spawn_backend(
            StatusCode::BAD_REQUEST,
            json!({"errors": [{"message": "salaryMax must be a number"}, {"message": "title too long"}]}),
        )
        .await;

        let response = client.submit(&sample_request()).await.unwrap();
        assert!(!response.success);
        assert!(response.resource_id.is_none());
        assert_eq!(
            response.validation_errors,
            vec!["salaryMax must be a number; title too long"]
        );
    }

    #[tokio::test]
    async fn test_server_error_is_a_submission_error_sent_once() {
        let (client, stub) =
            spawn_backend(StatusCode::SERVICE_UNAVAILABLE, json!("upstream down")).await;

        let err = client.submit(&sample_request()).await.unwrap_err();
        match err {
            SubmissionError::Backend(BackendError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert!(message.contains("upstream down"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // Mutations are never retried.
        assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_submission_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = BackendClient::new(
            format!("http://{addr}/graphql"),
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.submit(&sample_request()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Backend(BackendError::Http(_))));
    }
}
