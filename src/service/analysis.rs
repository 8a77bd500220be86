//! Contract Analysis Backend Interface
//!
//! The protected operation this service rate-limits is contract analysis.
//! Document extraction, AI analysis, and report storage are external
//! collaborators; the core only needs this narrow interface to hand the
//! work off once authentication and the rate gate have passed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Analysis backend errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis backend error: {0}")]
    Backend(String),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Backend(msg) => AppError::ExternalService(msg),
        }
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub filename: String,
    pub owner: String,
    pub summary: String,
    pub analyzed_at: DateTime<Utc>,
}

/// External analysis collaborator
#[async_trait]
pub trait ContractAnalyzer: Send + Sync {
    /// Analyze extracted contract text on behalf of `owner`
    async fn analyze(
        &self,
        owner: &str,
        filename: &str,
        text: &str,
    ) -> Result<AnalysisReport, AnalysisError>;
}
