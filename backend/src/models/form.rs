//! Form kinds and form content snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kinds of record a form session can edit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    GasSafety,
    Invoice,
    ServiceChecklist,
}

impl FormType {
    pub const ALL: [FormType; 3] = [
        FormType::GasSafety,
        FormType::Invoice,
        FormType::ServiceChecklist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::GasSafety => "gas_safety",
            FormType::Invoice => "invoice",
            FormType::ServiceChecklist => "service_checklist",
        }
    }

    /// Human-readable name for notifications.
    pub fn label(&self) -> &'static str {
        match self {
            FormType::GasSafety => "gas safety certificate",
            FormType::Invoice => "invoice",
            FormType::ServiceChecklist => "service checklist",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "gas_safety" => Some(FormType::GasSafety),
            "invoice" => Some(FormType::Invoice),
            "service_checklist" => Some(FormType::ServiceChecklist),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The field values of one form at one instant.
///
/// Equality is structural. Two snapshots with the same fields compare equal
/// regardless of insertion order, because the fingerprint is produced from
/// a key-sorted map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSnapshot(Map<String, Value>);

impl FormSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a JSON value. Returns `None` unless the value is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Stable serialization used for structural comparison.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl From<Map<String, Value>> for FormSnapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_type_round_trips_through_str() {
        for form_type in FormType::ALL {
            assert_eq!(FormType::from_str(form_type.as_str()), Some(form_type));
        }
        assert_eq!(FormType::from_str("certificate"), None);
    }

    #[test]
    fn test_form_type_serializes_snake_case() {
        let value = serde_json::to_value(FormType::ServiceChecklist).unwrap();
        assert_eq!(value, json!("service_checklist"));
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a = FormSnapshot::new()
            .with_field("address", "1 High St")
            .with_field("appliances", json!([{ "make": "Worcester", "safe": true }]));
        let b = FormSnapshot::new()
            .with_field("appliances", json!([{ "safe": true, "make": "Worcester" }]))
            .with_field("address", "1 High St");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_detects_nested_change() {
        let a = FormSnapshot::new().with_field("appliances", json!([{ "safe": true }]));
        let b = FormSnapshot::new().with_field("appliances", json!([{ "safe": false }]));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_removing_added_field_restores_fingerprint() {
        let original = FormSnapshot::new().with_field("landlord", "Mr Smith");
        let mut edited = original.clone().with_field("notes", "Flue cracked");
        assert_ne!(edited.fingerprint(), original.fingerprint());

        assert_eq!(edited.remove("notes"), Some(json!("Flue cracked")));
        assert_eq!(edited.remove("notes"), None);
        assert_eq!(edited.fingerprint(), original.fingerprint());
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(FormSnapshot::from_value(json!([1, 2])).is_none());
        assert!(FormSnapshot::from_value(json!("text")).is_none());
        let snapshot = FormSnapshot::from_value(json!({ "total": 120.5 })).unwrap();
        assert_eq!(snapshot.get("total"), Some(&json!(120.5)));
    }
}
