use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Text,
    Photo,
    HealthExport,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Text => "text",
            EntryType::Photo => "photo",
            EntryType::HealthExport => "health_export",
        }
    }

    /// Meals are anything the user ate, as opposed to activity data.
    pub fn is_meal(&self) -> bool {
        matches!(self, EntryType::Text | EntryType::Photo)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordVersion {
    #[default]
    Original,
    Updated,
}

/// One normalized logged event, persisted as a YAML document.
///
/// `entry_type` and `version` are typed; everything else lives in the
/// flattened `fields` map and varies by entry type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub entry_type: EntryType,
    #[serde(default)]
    pub version: RecordVersion,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl StructuredRecord {
    pub fn new(entry_type: EntryType) -> Self {
        Self {
            entry_type,
            version: RecordVersion::Original,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Steps carried by a health export record, zero for anything else.
    pub fn steps(&self) -> u64 {
        if self.entry_type != EntryType::HealthExport {
            return 0;
        }
        self.get("apple_health")
            .and_then(|h| h.get("steps"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_keeps_typed_and_flattened_fields() {
        let record = StructuredRecord::new(EntryType::Text).with_field("content", "rice and miso soup");
        let yaml = record.to_yaml().unwrap();
        assert!(yaml.contains("entry_type: text"));
        assert!(yaml.contains("version: original"));
        assert!(yaml.contains("content: rice and miso soup"));

        let parsed = StructuredRecord::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_missing_version_defaults_to_original() {
        let parsed = StructuredRecord::from_yaml("entry_type: photo\nfilename: a.jpg\n").unwrap();
        assert_eq!(parsed.version, RecordVersion::Original);
        assert_eq!(parsed.get_str("filename"), Some("a.jpg"));
    }

    #[test]
    fn test_unknown_entry_type_rejected() {
        assert!(StructuredRecord::from_yaml("entry_type: dance\n").is_err());
    }

    #[test]
    fn test_steps_only_for_health_exports() {
        let health = StructuredRecord::new(EntryType::HealthExport)
            .with_field("apple_health", json!({ "steps": 7200 }));
        assert_eq!(health.steps(), 7200);

        let text = StructuredRecord::new(EntryType::Text)
            .with_field("apple_health", json!({ "steps": 7200 }));
        assert_eq!(text.steps(), 0);
    }
}
