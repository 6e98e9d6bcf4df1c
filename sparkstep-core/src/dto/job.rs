//! Job DTOs for the remote job API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::job::{REQUEST_KEY_LABEL, RemoteJob};
use crate::domain::key::RequestKey;

/// Body of a submit call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    pub job: Value,
    /// Deduplication id; the remote side ignores repeated submits with the same id
    pub request_id: String,
}

/// One page of a job listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsResponse {
    #[serde(default)]
    pub jobs: Vec<RemoteJob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Which jobs a listing returns by lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStateMatcher {
    #[default]
    All,
    Active,
    NonActive,
}

/// Query parameters of a job listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_state_matcher: Option<JobStateMatcher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ListJobsQuery {
    /// Jobs on `cluster_name` created by the submission with `key`
    pub fn by_request_key(cluster_name: &str, key: &RequestKey) -> Self {
        Self {
            cluster_name: Some(cluster_name.to_string()),
            job_state_matcher: Some(JobStateMatcher::All),
            filter: Some(format!("labels.{REQUEST_KEY_LABEL} = {key}")),
            ..Default::default()
        }
    }

    pub fn with_page_token(&self, token: impl Into<String>) -> Self {
        Self {
            page_token: Some(token.into()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_by_request_key() {
        let key = RequestKey::from_token("t");
        let query = ListJobsQuery::by_request_key("c1", &key);

        assert_eq!(query.cluster_name.as_deref(), Some("c1"));
        assert_eq!(
            query.filter,
            Some(format!("labels.sparkstep-request-key = {}", key.as_str()))
        );
        assert_eq!(query.with_page_token("p2").page_token.as_deref(), Some("p2"));
    }

    #[test]
    fn test_empty_listing_parses() {
        let page: ListJobsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.jobs.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
