/// Backend Client: the single point of entry for calls to the recruiting backend's
/// GraphQL API (job creation, application lookups).
///
/// Queries are retried on 429/5xx with exponential backoff. Mutations are sent
/// exactly once: a retried `createJob` could publish the same post twice.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backend returned no data")]
    EmptyData,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl BackendClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
            api_key,
        })
    }

    /// Runs a read-only GraphQL query, retrying transient failures.
    pub async fn query<V, T>(&self, query: &str, variables: &V) -> Result<T, BackendError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Backend query attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.send(query, variables).await {
                Ok(data) => return Ok(data),
                Err(e) if is_transient(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(BackendError::EmptyData))
    }

    /// Runs a GraphQL mutation once.
    pub async fn mutate<V, T>(&self, mutation: &str, variables: &V) -> Result<T, BackendError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(mutation, variables).await
    }

    async fn send<V, T>(&self, query: &str, variables: &V) -> Result<T, BackendError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&GraphQlRequest { query, variables });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // NestJS wraps GraphQL validation failures in a 400 with an `errors` array.
            let message = serde_json::from_str::<GraphQlResponse<serde_json::Value>>(&body)
                .ok()
                .filter(|r| !r.errors.is_empty())
                .map(|r| join_messages(&r.errors))
                .unwrap_or(body);
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        decode_response(&body)
    }
}

fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    let parsed: GraphQlResponse<T> = serde_json::from_str(body)?;
    if !parsed.errors.is_empty() {
        return Err(BackendError::GraphQl(
            parsed.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    debug!("Backend call succeeded");
    parsed.data.ok_or(BackendError::EmptyData)
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_transient(error: &BackendError) -> bool {
    match error {
        BackendError::Http(e) => e.is_timeout() || e.is_connect(),
        BackendError::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Created {
        id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CreateJobData {
        create_job: Created,
    }

    #[test]
    fn test_decode_data() {
        let body = r#"{"data": {"createJob": {"id": "job-42"}}}"#;
        let data: CreateJobData = decode_response(body).unwrap();
        assert_eq!(data.create_job.id, "job-42");
    }

    #[test]
    fn test_decode_errors_win_over_partial_data() {
        let body = r#"{"data": null, "errors": [{"message": "salaryMax must be a number"}, {"message": "title too long"}]}"#;
        let err = decode_response::<CreateJobData>(body).unwrap_err();
        match err {
            BackendError::GraphQl(messages) => {
                assert_eq!(messages, vec!["salaryMax must be a number", "title too long"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decode_missing_data() {
        let err = decode_response::<CreateJobData>(r#"{"data": null}"#).unwrap_err();
        assert!(matches!(err, BackendError::EmptyData));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&BackendError::Api {
            status: 503,
            message: String::new()
        }));
        assert!(!is_transient(&BackendError::Api {
            status: 400,
            message: String::new()
        }));
        assert!(!is_transient(&BackendError::GraphQl(vec![])));
    }
}
