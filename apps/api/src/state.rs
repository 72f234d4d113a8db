use std::sync::Arc;

use crate::config::Config;
use crate::cv::parser::CvParser;
use crate::interview::context::InterviewContextResolver;
use crate::jobpost::agent::SlotFillingAgent;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Job-post conversations. Owns the session store and per-session locks.
    pub agent: Arc<SlotFillingAgent>,
    pub interviews: Arc<InterviewContextResolver>,
    /// Pluggable CV parser. Default: the shared `LlmClient`.
    pub cv_parser: Arc<dyn CvParser>,
}
