//! Job specs and the job documents built from them
//!
//! A [`JobSpec`] is what the caller asks for. [`JobSpec::build_document`]
//! turns it into the job document sent to the remote service, folding in the
//! kind payload, payload overrides and an optional raw job document.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::job::REQUEST_KEY_LABEL;
use crate::domain::key::RequestKey;
use crate::domain::kind::JobKind;
use crate::error::SpecError;

/// Document fields that hold a job-kind payload
const KIND_FIELDS: &[&str] = &[
    "sparkJob",
    "pysparkJob",
    "hadoopJob",
    "hiveJob",
    "pigJob",
    "sparkRJob",
    "sparkSqlJob",
    "prestoJob",
    "trinoJob",
    "flinkJob",
];

/// Fields the remote service owns; dropped from raw documents
const OUTPUT_ONLY_FIELDS: &[&str] = &[
    "status",
    "statusHistory",
    "yarnApplications",
    "driverOutputResourceUri",
    "driverControlFilesUri",
    "jobUuid",
    "done",
];

/// Immutable description of a job to submit
#[derive(Debug, Clone)]
pub struct JobSpec<K> {
    pub project_id: String,
    pub region: String,
    pub cluster_name: String,
    pub kind: K,
    /// Merged into the kind payload, override wins
    pub payload_override: Option<Map<String, Value>>,
    /// Full job document; wins over derived fields except the kind payload,
    /// which is deep-merged into it
    pub raw_job: Option<Value>,
    /// Caller-supplied idempotency token; replaces the derived key
    pub correlation_token: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl<K: JobKind> JobSpec<K> {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        cluster_name: impl Into<String>,
        kind: K,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            cluster_name: cluster_name.into(),
            kind,
            payload_override: None,
            raw_job: None,
            correlation_token: None,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_payload_override(mut self, payload: Map<String, Value>) -> Self {
        self.payload_override = Some(payload);
        self
    }

    pub fn with_raw_job(mut self, job: Value) -> Self {
        self.raw_job = Some(job);
        self
    }

    pub fn with_correlation_token(mut self, token: impl Into<String>) -> Self {
        self.correlation_token = Some(token.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Checks that do not need the merged document
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.project_id.trim().is_empty() {
            return Err(SpecError::MissingField("project_id"));
        }
        if self.region.trim().is_empty() {
            return Err(SpecError::MissingField("region"));
        }
        if self.cluster_name.trim().is_empty() {
            return Err(SpecError::MissingField("cluster_name"));
        }
        if let Some(token) = &self.correlation_token
            && token.trim().is_empty()
        {
            return Err(SpecError::MissingField("correlation_token"));
        }
        if self.labels.contains_key(REQUEST_KEY_LABEL) {
            return Err(SpecError::Malformed(format!(
                "label `{REQUEST_KEY_LABEL}` is reserved"
            )));
        }
        if let Some(raw) = &self.raw_job
            && !raw.is_object()
        {
            return Err(SpecError::Malformed(
                "raw job document must be a JSON object".to_string(),
            ));
        }
        self.kind.validate()
    }

    /// Builds the job document sent on submission
    pub fn build_document(&self) -> Result<JobDocument, SpecError> {
        self.validate()?;

        let field = self.kind.field();
        let mut conflicts = Vec::new();

        let mut payload = match self.kind.fragment() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(overrides) = &self.payload_override {
            deep_merge(&mut payload, overrides, field, &mut conflicts);
        }

        let mut body = Map::new();
        body.insert(
            "reference".to_string(),
            serde_json::json!({ "projectId": self.project_id }),
        );
        body.insert(
            "placement".to_string(),
            serde_json::json!({ "clusterName": self.cluster_name }),
        );
        if !self.labels.is_empty() {
            body.insert(
                "labels".to_string(),
                serde_json::to_value(&self.labels).unwrap_or_default(),
            );
        }
        body.insert(field.to_string(), Value::Object(payload));

        if let Some(Value::Object(raw)) = &self.raw_job {
            self.check_identity(raw)?;
            if let Some(other) = KIND_FIELDS
                .iter()
                .find(|name| **name != field && raw.contains_key(**name))
            {
                return Err(SpecError::Conflict {
                    field: "job kind".to_string(),
                    explicit: field.to_string(),
                    raw: (*other).to_string(),
                });
            }

            let mut raw = raw.clone();
            for name in OUTPUT_ONLY_FIELDS {
                raw.remove(*name);
            }
            if raw
                .get("labels")
                .and_then(Value::as_object)
                .is_some_and(|labels| labels.contains_key(REQUEST_KEY_LABEL))
            {
                return Err(SpecError::Malformed(format!(
                    "label `{REQUEST_KEY_LABEL}` is reserved"
                )));
            }
            deep_merge(&mut body, &raw, "", &mut conflicts);
        }

        for path in &conflicts {
            warn!(field = %path, "raw job document overrides a derived value");
        }

        let has_driver = body
            .get(field)
            .and_then(Value::as_object)
            .is_some_and(|payload| {
                self.kind.driver_fields().iter().any(|name| {
                    payload
                        .get(*name)
                        .and_then(Value::as_str)
                        .is_some_and(|s| !s.trim().is_empty())
                })
            });
        if !has_driver {
            return Err(SpecError::MissingField("driver entry point"));
        }

        Ok(JobDocument { body, conflicts })
    }

    /// Idempotency key for this spec: the caller token when given, otherwise
    /// derived from the document
    pub fn request_key(&self, document: &JobDocument) -> Result<RequestKey, SpecError> {
        match &self.correlation_token {
            Some(token) => Ok(RequestKey::from_token(token)),
            None => RequestKey::derive(&self.project_id, &self.region, document),
        }
    }

    /// Explicit project and cluster may not be contradicted by the raw document
    fn check_identity(&self, raw: &Map<String, Value>) -> Result<(), SpecError> {
        let pairs = [
            ("reference.projectId", "reference", "projectId", &self.project_id),
            (
                "placement.clusterName",
                "placement",
                "clusterName",
                &self.cluster_name,
            ),
        ];
        for (path, outer, inner, explicit) in pairs {
            let raw_value = raw
                .get(outer)
                .and_then(|v| v.get(inner))
                .and_then(Value::as_str);
            if let Some(raw_value) = raw_value
                && raw_value != explicit.as_str()
            {
                return Err(SpecError::Conflict {
                    field: path.to_string(),
                    explicit: explicit.clone(),
                    raw: raw_value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Job document ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct JobDocument {
    body: Map<String, Value>,
    conflicts: Vec<String>,
}

impl JobDocument {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Paths where an override replaced a different derived value
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    pub fn cluster_name(&self) -> &str {
        self.body
            .get("placement")
            .and_then(|p| p.get("clusterName"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Job id fixed by the raw document, if any
    pub fn pinned_job_id(&self) -> Option<&str> {
        self.body
            .get("reference")
            .and_then(|r| r.get("jobId"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Final body: job id assigned unless pinned, request key attached as a label
    pub fn into_submission(self, job_id: &str, key: &RequestKey) -> Value {
        let mut body = self.body;

        let reference = body
            .entry("reference")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(reference) = reference {
            let pinned = reference
                .get("jobId")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.is_empty());
            if !pinned {
                reference.insert("jobId".to_string(), Value::String(job_id.to_string()));
            }
        }

        let labels = body
            .entry("labels")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(labels) = labels {
            labels.insert(
                REQUEST_KEY_LABEL.to_string(),
                Value::String(key.as_str().to_string()),
            );
        }

        Value::Object(body)
    }
}

/// Recursively merges `overlay` into `base`. Objects merge key by key; any
/// other overlay value replaces the base value, and a replaced value that
/// differed is recorded in `conflicts`.
fn deep_merge(
    base: &mut Map<String, Value>,
    overlay: &Map<String, Value>,
    path: &str,
    conflicts: &mut Vec<String>,
) {
    for (key, value) in overlay {
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming, &child, conflicts);
            }
            (Some(existing), incoming) => {
                if existing != incoming {
                    conflicts.push(child);
                }
                *existing = incoming.clone();
            }
            (None, incoming) => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}
