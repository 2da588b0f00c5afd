use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Fields assigned by the write pipeline, never by API input.
/// `tenant_id` is intentionally absent: callers may send one and the stamp
/// interceptor discards it, so a forged value is inert rather than an error.
const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Operation state a record is tracked under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Select,
}

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(&'static str),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
}

/// A dynamic record representing one row of any entity table, with change
/// tracking so the write path can tell created from modified fields.
#[derive(Debug, Clone)]
pub struct Record {
    /// Original state from storage (None for CREATE operations)
    original: Option<HashMap<String, Value>>,
    /// Current field values
    fields: HashMap<String, Value>,
    /// Fields modified since original
    modified_fields: HashSet<String>,
    /// Current operation state
    operation: Operation,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    /// Create a new empty record in Create state
    pub fn new() -> Self {
        Self {
            original: None,
            fields: HashMap::new(),
            modified_fields: HashSet::new(),
            operation: Operation::Create,
        }
    }

    /// Create record from API input JSON.
    ///
    /// System fields are rejected; a caller-supplied `tenant_id` is dropped
    /// here and reassigned by the stamp interceptor before persist.
    pub fn from_json(json: Value) -> Result<Self, RecordError> {
        let mut record = Self::new();

        match json {
            Value::Object(map) => {
                for (key, value) in map {
                    if let Some(&field) = SYSTEM_FIELDS.iter().find(|&&f| f == key) {
                        return Err(RecordError::SystemFieldNotAllowed(field));
                    }
                    if key == crate::filter::TENANT_COLUMN {
                        tracing::debug!("Discarding caller-supplied tenant_id from input");
                        continue;
                    }
                    record.fields.insert(key, value);
                }
                Ok(record)
            }
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Convert JSON array to Vec<Record>
    pub fn from_json_array(json: Value) -> Result<Vec<Self>, RecordError> {
        match json {
            Value::Array(array) => {
                let mut records = Vec::with_capacity(array.len());
                for (index, item) in array.into_iter().enumerate() {
                    let record = Self::from_json(item)
                        .map_err(|e| RecordError::InvalidJson(format!("Item {}: {}", index, e)))?;
                    records.push(record);
                }
                Ok(records)
            }
            _ => Err(RecordError::InvalidJson("Expected JSON array".to_string())),
        }
    }

    /// Create record from storage row data (system fields allowed)
    pub fn from_sql_data(data: HashMap<String, Value>) -> Self {
        Self {
            original: Some(data.clone()),
            fields: data,
            modified_fields: HashSet::new(),
            operation: Operation::Select,
        }
    }

    /// Attach original data loaded from storage, moving the record into
    /// Update state so subsequent sets are tracked as modifications.
    pub fn inject(&mut self, original_data: HashMap<String, Value>) -> &mut Self {
        // Carry over untouched stored fields so the persisted row stays whole
        for (key, value) in &original_data {
            self.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for key in self.fields.keys() {
            if original_data.get(key) != self.fields.get(key) {
                self.modified_fields.insert(key.clone());
            }
        }
        self.original = Some(original_data);
        self.operation = Operation::Update;
        self
    }

    /// Get field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set field value with automatic change tracking
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();

        // System fields only move through set_system_field
        if SYSTEM_FIELDS.contains(&key.as_str()) {
            tracing::warn!("Attempted to set system field '{}' - ignoring", key);
            return self;
        }

        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }

        self.fields.insert(key, value.into());
        self
    }

    /// Set system field (write-pipeline use)
    pub fn set_system_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        let key = key.into();

        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }

        self.fields.insert(key, value.into());
        self
    }

    /// Remove field and return its value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if self.original.is_some() {
            self.modified_fields.insert(key.to_string());
        }
        self.fields.remove(key)
    }

    // ========================================
    // Standard field accessors
    // ========================================

    /// Get record ID
    pub fn id(&self) -> Option<Uuid> {
        self.get("id").and_then(|v| v.as_str()).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Set record ID (system field)
    pub fn set_id(&mut self, id: Uuid) -> &mut Self {
        self.set_system_field("id", Value::String(id.to_string()))
    }

    /// Get the stamped tenant value, if any
    pub fn tenant_id(&self) -> Option<&str> {
        self.get(crate::filter::TENANT_COLUMN).and_then(|v| v.as_str())
    }

    /// Stamp the tenant value (write-pipeline use)
    pub fn set_tenant_id(&mut self, tenant_id: &str) -> &mut Self {
        self.set_system_field(
            crate::filter::TENANT_COLUMN,
            Value::String(tenant_id.to_string()),
        )
    }

    /// Get created_at timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Touch updated_at field
    pub fn touch_updated_at(&mut self) -> &mut Self {
        self.set_system_field("updated_at", Value::String(Utc::now().to_rfc3339()))
    }

    /// Set created_at field
    pub fn touch_created_at(&mut self) -> &mut Self {
        self.set_system_field("created_at", Value::String(Utc::now().to_rfc3339()))
    }

    // ========================================
    // Change tracking
    // ========================================

    /// Check if a specific field has been changed
    pub fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (Some(original), None) => original.contains_key(key),
            (None, Some(_)) => true, // New field on create
            (None, None) => false,
        }
    }

    /// Check if record has any changes
    pub fn has_changes(&self) -> bool {
        !self.modified_fields.is_empty() || self.original.is_none()
    }

    /// Get original data (before changes)
    pub fn original(&self) -> Option<&HashMap<String, Value>> {
        self.original.as_ref()
    }

    /// Get original value for a specific field
    pub fn get_original(&self, key: &str) -> Option<&Value> {
        self.original.as_ref()?.get(key)
    }

    // ========================================
    // Serialization
    // ========================================

    /// Convert to JSON Value (all fields)
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Convert to serde_json::Map
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Convert Vec<Record> to JSON array
    pub fn to_json_array(records: &[Self]) -> Value {
        Value::Array(records.iter().map(|r| r.to_json()).collect())
    }

    // ========================================
    // Operation management
    // ========================================

    /// Get current operation state
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Set operation state
    pub fn set_operation(&mut self, operation: Operation) -> &mut Self {
        self.operation = operation;
        self
    }

    // ========================================
    // Validation helpers
    // ========================================

    /// Validate that required fields are present and not null
    pub fn validate_required_fields(&self, fields: &[&str]) -> Result<(), RecordError> {
        for &field in fields {
            match self.get(field) {
                None | Some(Value::Null) => {
                    return Err(RecordError::MissingRequiredField(field.to_string()))
                }
                Some(_) => continue,
            }
        }
        Ok(())
    }
}

// ========================================
// Conversions
// ========================================

impl From<HashMap<String, Value>> for Record {
    fn from(map: HashMap<String, Value>) -> Self {
        Self::from_sql_data(map)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_sql_data(map.into_iter().collect())
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.to_json()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Record(id: {:?}, fields: {}, changed: {})",
            self.id(),
            self.fields.len(),
            self.has_changes()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_drops_caller_supplied_tenant() {
        let record = Record::from_json(json!({"name": "widget", "tenant_id": "t2"})).unwrap();
        assert_eq!(record.tenant_id(), None);
        assert_eq!(record.get("name"), Some(&json!("widget")));
    }

    #[test]
    fn from_json_rejects_system_fields() {
        let err = Record::from_json(json!({"id": "abc"})).unwrap_err();
        assert!(matches!(err, RecordError::SystemFieldNotAllowed("id")));
    }

    #[test]
    fn set_ignores_system_fields_but_stamp_goes_through() {
        let mut record = Record::new();
        record.set("id", json!("nope"));
        assert_eq!(record.get("id"), None);
        record.set_tenant_id("t1");
        assert_eq!(record.tenant_id(), Some("t1"));
    }

    #[test]
    fn inject_moves_to_update_and_tracks_changes() {
        let mut record = Record::from_json(json!({"name": "renamed"})).unwrap();
        let original: HashMap<String, Value> = [
            ("name".to_string(), json!("widget")),
            ("qty".to_string(), json!(3)),
        ]
        .into();
        record.inject(original);
        assert_eq!(record.operation(), Operation::Update);
        assert!(record.changed("name"));
        assert!(!record.changed("qty"));
        // Untouched stored fields survive the merge
        assert_eq!(record.get("qty"), Some(&json!(3)));
    }

    #[test]
    fn create_records_always_count_as_changed() {
        let record = Record::from_json(json!({"name": "widget"})).unwrap();
        assert!(record.has_changes());
        assert_eq!(record.operation(), Operation::Create);
    }
}
