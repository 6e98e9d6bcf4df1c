//! Job kinds
//!
//! Every job kind the remote service runs shares the same submit/poll shape
//! and differs only in the payload it contributes to the job document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::SpecError;

/// Capability of producing a job document fragment from typed parameters
pub trait JobKind: std::fmt::Debug + Send + Sync {
    /// Field of the job document that holds this kind's payload
    fn field(&self) -> &'static str;

    /// Payload fields that name the driver entry point; at least one must be
    /// present once the payload has been merged with any override
    fn driver_fields(&self) -> &'static [&'static str];

    /// Structural checks that do not depend on overrides
    fn validate(&self) -> Result<(), SpecError>;

    /// The payload for [`JobKind::field`]
    fn fragment(&self) -> Value;
}

/// Spark job driven by a JVM main class or jar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparkJob {
    pub main_jar_file_uri: Option<String>,
    pub main_class: Option<String>,
    pub args: Vec<String>,
    pub jar_file_uris: Vec<String>,
    pub file_uris: Vec<String>,
    pub archive_uris: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

/// PySpark job driven by a python file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PySparkJob {
    pub main_python_file_uri: String,
    pub args: Vec<String>,
    pub python_file_uris: Vec<String>,
    pub jar_file_uris: Vec<String>,
    pub file_uris: Vec<String>,
    pub archive_uris: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

/// MapReduce job driven by a jar or main class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HadoopJob {
    pub main_jar_file_uri: Option<String>,
    pub main_class: Option<String>,
    pub args: Vec<String>,
    pub jar_file_uris: Vec<String>,
    pub file_uris: Vec<String>,
    pub archive_uris: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

/// Wire shape shared by all kinds
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct DriverPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    main_jar_file_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_python_file_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    args: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    python_file_uris: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jar_file_uris: Vec<&'a str>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    file_uris: &'a [String],
    #[serde(skip_serializing_if = "is_empty_slice")]
    archive_uris: &'a [String],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<&'a str, &'a str>,
}

impl DriverPayload<'_> {
    fn into_value(self) -> Value {
        // Plain strings, lists and string maps always serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn is_empty_slice(values: &&[String]) -> bool {
    values.is_empty()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn check_uris(field: &'static str, uris: &[String]) -> Result<(), SpecError> {
    if uris.iter().any(|uri| uri.trim().is_empty()) {
        return Err(SpecError::Malformed(format!("{field} contains an empty URI")));
    }
    Ok(())
}

/// JVM kinds take either a main class or a main jar. With both, the class is
/// the entry point and the jar joins the classpath.
fn jvm_payload<'a>(
    main_jar_file_uri: &'a Option<String>,
    main_class: &'a Option<String>,
    args: &'a [String],
    jar_file_uris: &'a [String],
    file_uris: &'a [String],
    archive_uris: &'a [String],
    properties: &'a BTreeMap<String, String>,
) -> Value {
    let jar = non_blank(main_jar_file_uri);
    let class = non_blank(main_class);

    let mut jars: Vec<&str> = jar_file_uris.iter().map(String::as_str).collect();
    let main_jar_file_uri = match (jar, class) {
        (Some(jar), Some(_)) => {
            jars.insert(0, jar);
            None
        }
        (jar, _) => jar,
    };

    DriverPayload {
        main_jar_file_uri,
        main_class: class,
        args,
        jar_file_uris: jars,
        file_uris,
        archive_uris,
        properties: properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect(),
        ..Default::default()
    }
    .into_value()
}

impl JobKind for SparkJob {
    fn field(&self) -> &'static str {
        "sparkJob"
    }

    fn driver_fields(&self) -> &'static [&'static str] {
        &["mainJarFileUri", "mainClass"]
    }

    fn validate(&self) -> Result<(), SpecError> {
        check_uris("jarFileUris", &self.jar_file_uris)?;
        check_uris("fileUris", &self.file_uris)?;
        check_uris("archiveUris", &self.archive_uris)
    }

    fn fragment(&self) -> Value {
        jvm_payload(
            &self.main_jar_file_uri,
            &self.main_class,
            &self.args,
            &self.jar_file_uris,
            &self.file_uris,
            &self.archive_uris,
            &self.properties,
        )
    }
}

impl JobKind for HadoopJob {
    fn field(&self) -> &'static str {
        "hadoopJob"
    }

    fn driver_fields(&self) -> &'static [&'static str] {
        &["mainJarFileUri", "mainClass"]
    }

    fn validate(&self) -> Result<(), SpecError> {
        check_uris("jarFileUris", &self.jar_file_uris)?;
        check_uris("fileUris", &self.file_uris)?;
        check_uris("archiveUris", &self.archive_uris)
    }

    fn fragment(&self) -> Value {
        jvm_payload(
            &self.main_jar_file_uri,
            &self.main_class,
            &self.args,
            &self.jar_file_uris,
            &self.file_uris,
            &self.archive_uris,
            &self.properties,
        )
    }
}

impl JobKind for PySparkJob {
    fn field(&self) -> &'static str {
        "pysparkJob"
    }

    fn driver_fields(&self) -> &'static [&'static str] {
        &["mainPythonFileUri"]
    }

    fn validate(&self) -> Result<(), SpecError> {
        check_uris("pythonFileUris", &self.python_file_uris)?;
        check_uris("jarFileUris", &self.jar_file_uris)?;
        check_uris("fileUris", &self.file_uris)?;
        check_uris("archiveUris", &self.archive_uris)
    }

    fn fragment(&self) -> Value {
        let main = self.main_python_file_uri.trim();
        DriverPayload {
            main_python_file_uri: (!main.is_empty()).then_some(main),
            args: &self.args,
            python_file_uris: &self.python_file_uris,
            jar_file_uris: self.jar_file_uris.iter().map(String::as_str).collect(),
            file_uris: &self.file_uris,
            archive_uris: &self.archive_uris,
            properties: self
                .properties
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            ..Default::default()
        }
        .into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spark_fragment_with_class_only() {
        let job = SparkJob {
            main_class: Some("org.example.Main".to_string()),
            args: vec!["1000".to_string()],
            ..Default::default()
        };

        assert_eq!(
            job.fragment(),
            json!({ "mainClass": "org.example.Main", "args": ["1000"] })
        );
    }

    #[test]
    fn test_spark_fragment_with_jar_and_class_moves_jar_to_classpath() {
        let job = SparkJob {
            main_jar_file_uri: Some("file:///a.jar".to_string()),
            main_class: Some("Main".to_string()),
            jar_file_uris: vec!["gs://libs/dep.jar".to_string()],
            ..Default::default()
        };

        assert_eq!(
            job.fragment(),
            json!({
                "mainClass": "Main",
                "jarFileUris": ["file:///a.jar", "gs://libs/dep.jar"]
            })
        );
    }

    #[test]
    fn test_spark_properties_are_included() {
        let job = SparkJob {
            main_jar_file_uri: Some("file:///a.jar".to_string()),
            properties: BTreeMap::from([(
                "spark.executor.memory".to_string(),
                "2g".to_string(),
            )]),
            ..Default::default()
        };

        let fragment = job.fragment();
        assert_eq!(fragment["mainJarFileUri"], "file:///a.jar");
        assert_eq!(fragment["properties"]["spark.executor.memory"], "2g");
    }

    #[test]
    fn test_blank_uri_rejected() {
        let job = SparkJob {
            main_class: Some("Main".to_string()),
            file_uris: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(matches!(job.validate(), Err(SpecError::Malformed(_))));
    }

    #[test]
    fn test_pyspark_fragment() {
        let job = PySparkJob {
            main_python_file_uri: "gs://bucket/main.py".to_string(),
            python_file_uris: vec!["gs://bucket/util.py".to_string()],
            ..Default::default()
        };

        assert_eq!(job.field(), "pysparkJob");
        assert_eq!(
            job.fragment(),
            json!({
                "mainPythonFileUri": "gs://bucket/main.py",
                "pythonFileUris": ["gs://bucket/util.py"]
            })
        );
    }
}
