//! Workflow records carried alongside saved images.
//!
//! The host hands the vault an arbitrary tree describing the generation
//! pipeline. It is never interpreted here, only resolved from the host's
//! hidden channels and serialized verbatim.

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, ToolsError};

/// Key that marks a mapping as a host-compatible workflow.
pub const VERSION_KEY: &str = "version";

/// Key under which the auxiliary channel carries the workflow.
pub const WORKFLOW_KEY: &str = "workflow";

/// Immutable tree value describing a generation pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum WorkflowRecord {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<WorkflowRecord>),
    Mapping(IndexMap<String, WorkflowRecord>),
    /// A host object with no JSON representation.
    Opaque { type_name: String },
}

impl Default for WorkflowRecord {
    fn default() -> Self {
        WorkflowRecord::Mapping(IndexMap::new())
    }
}

impl WorkflowRecord {
    /// Look up a key if this record is a mapping.
    pub fn get(&self, key: &str) -> Option<&WorkflowRecord> {
        match self {
            WorkflowRecord::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// True for a mapping carrying a `version` key.
    pub fn is_versioned(&self) -> bool {
        self.get(VERSION_KEY).is_some()
    }

    /// Serialize to compact JSON.
    ///
    /// Fails with [`ToolsError::Encoding`] when the tree holds an opaque host
    /// value or a non-finite float.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ToolsError::Encoding(e.to_string()))
    }

    /// Serialize to indented JSON, see [`WorkflowRecord::to_json_string`].
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ToolsError::Encoding(e.to_string()))
    }
}

impl Serialize for WorkflowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            WorkflowRecord::Null => serializer.serialize_unit(),
            WorkflowRecord::Bool(b) => serializer.serialize_bool(*b),
            WorkflowRecord::Integer(i) => serializer.serialize_i64(*i),
            WorkflowRecord::Float(f) => {
                if !f.is_finite() {
                    return Err(S::Error::custom(format!("non-finite number {}", f)));
                }
                serializer.serialize_f64(*f)
            }
            WorkflowRecord::String(s) => serializer.serialize_str(s),
            WorkflowRecord::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            WorkflowRecord::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            WorkflowRecord::Opaque { type_name } => Err(S::Error::custom(format!(
                "value of type '{}' is not serializable",
                type_name
            ))),
        }
    }
}

impl From<serde_json::Value> for WorkflowRecord {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => WorkflowRecord::Null,
            Value::Bool(b) => WorkflowRecord::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => WorkflowRecord::Integer(i),
                // u64 above i64::MAX and real numbers both land here
                None => WorkflowRecord::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => WorkflowRecord::String(s),
            Value::Array(items) => {
                WorkflowRecord::Sequence(items.into_iter().map(WorkflowRecord::from).collect())
            }
            Value::Object(entries) => WorkflowRecord::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, WorkflowRecord::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The two hidden channels through which a host may pass workflow data.
#[derive(Debug, Clone, Default)]
pub struct WorkflowChannels {
    /// Primary workflow description.
    pub prompt: Option<WorkflowRecord>,
    /// Auxiliary extra-metadata mapping, used when it carries `workflow`.
    pub extra: Option<WorkflowRecord>,
}

impl WorkflowChannels {
    pub fn new(prompt: Option<WorkflowRecord>, extra: Option<WorkflowRecord>) -> Self {
        Self { prompt, extra }
    }

    /// Pick the workflow to persist.
    ///
    /// The auxiliary channel wins when it holds a `workflow` entry; otherwise
    /// the primary channel is used if it is a versioned mapping.
    pub fn resolve(&self) -> Option<&WorkflowRecord> {
        if let Some(workflow) = self.extra.as_ref().and_then(|e| e.get(WORKFLOW_KEY)) {
            tracing::debug!("workflow taken from extra metadata channel");
            return Some(workflow);
        }
        if let Some(prompt) = self.prompt.as_ref().filter(|p| p.is_versioned()) {
            tracing::debug!("workflow taken from prompt channel");
            return Some(prompt);
        }
        tracing::warn!("no workflow provided on either hidden channel");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> WorkflowRecord {
        WorkflowRecord::from(value)
    }

    #[test]
    fn test_json_roundtrip_preserves_key_order() {
        let wf = record(json!({"version": 0.4, "nodes": [1, 2], "links": {"z": 1, "a": 2}}));
        let text = wf.to_json_string().unwrap();
        assert_eq!(text, r#"{"version":0.4,"nodes":[1,2],"links":{"z":1,"a":2}}"#);
    }

    #[test]
    fn test_opaque_value_fails_to_serialize() {
        let mut map = IndexMap::new();
        map.insert("version".to_string(), WorkflowRecord::Integer(1));
        map.insert(
            "latent".to_string(),
            WorkflowRecord::Opaque {
                type_name: "Tensor".to_string(),
            },
        );
        let err = WorkflowRecord::Mapping(map).to_json_string().unwrap_err();
        assert!(matches!(err, ToolsError::Encoding(_)));
        assert!(err.to_string().contains("Tensor"));
    }

    #[test]
    fn test_non_finite_float_fails_to_serialize() {
        let wf = WorkflowRecord::Sequence(vec![WorkflowRecord::Float(f64::INFINITY)]);
        assert!(wf.to_json_pretty().is_err());
    }

    #[test]
    fn test_deserialize_from_json_text() {
        let wf: WorkflowRecord = serde_json::from_str(r#"{"version": 1, "seed": 42}"#).unwrap();
        assert!(wf.is_versioned());
        assert_eq!(wf.get("seed"), Some(&WorkflowRecord::Integer(42)));
    }

    #[test]
    fn test_resolve_prefers_extra_workflow() {
        let channels = WorkflowChannels::new(
            Some(record(json!({"version": 1, "from": "prompt"}))),
            Some(record(json!({"workflow": {"from": "extra"}}))),
        );
        let wf = channels.resolve().unwrap();
        assert_eq!(wf.get("from"), Some(&WorkflowRecord::String("extra".into())));
    }

    #[test]
    fn test_resolve_falls_back_to_versioned_prompt() {
        let channels = WorkflowChannels::new(
            Some(record(json!({"version": 1}))),
            Some(record(json!({"other": true}))),
        );
        assert!(channels.resolve().unwrap().is_versioned());
    }

    #[test]
    fn test_resolve_ignores_unversioned_prompt() {
        let channels = WorkflowChannels::new(Some(record(json!({"nodes": []}))), None);
        assert!(channels.resolve().is_none());
        assert!(WorkflowChannels::default().resolve().is_none());
    }
}
