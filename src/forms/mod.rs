use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field kinds a form master can declare. Each kind carries its own
/// validation contract; the client renders the matching input widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Dropdown {
        #[serde(rename = "optionList", default)]
        options: Vec<String>,
    },
    Textarea,
    Taglist,
    Date,
}

/// One field definition from a master configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
    #[serde(rename = "quickAdd", default)]
    pub quick_add: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Master configuration driving a resource's form: an ordered list of
/// field definitions fetched from the collection's companion `*master`
/// collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormMaster {
    pub fields: Vec<FieldDef>,
}

impl FormMaster {
    /// Parse a master document's `fields` array. Returns None when the
    /// document has no usable field configuration; masters without one
    /// simply don't constrain input.
    pub fn from_doc(doc: &Map<String, Value>) -> Option<Self> {
        let fields = doc.get("fields")?;
        serde_json::from_value(Value::Object(
            [("fields".to_string(), fields.clone())].into_iter().collect(),
        ))
        .ok()
    }

    /// Validate a record body against this configuration. Violations come
    /// back as per-field messages for a 400 validation response.
    pub fn validate(&self, doc: &Map<String, Value>) -> Result<(), HashMap<String, String>> {
        let mut errors = HashMap::new();

        for field in &self.fields {
            let value = doc.get(&field.name);

            let missing = match value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(Value::Array(a)) => a.is_empty(),
                Some(_) => false,
            };

            if missing {
                if field.required {
                    errors.insert(
                        field.name.clone(),
                        format!("{} is required", field.label),
                    );
                }
                continue;
            }

            if let Some(message) = check_kind(&field.kind, value.unwrap_or(&Value::Null)) {
                errors.insert(field.name.clone(), message);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_kind(kind: &FieldKind, value: &Value) -> Option<String> {
    match kind {
        FieldKind::Text | FieldKind::Textarea => {
            if value.is_string() {
                None
            } else {
                Some("Must be text".to_string())
            }
        }
        FieldKind::Dropdown { options } => match value.as_str() {
            Some(s) if options.is_empty() || options.iter().any(|o| o.as_str() == s) => None,
            Some(s) => Some(format!("'{}' is not one of the options", s)),
            None => Some("Must be one of the options".to_string()),
        },
        FieldKind::Taglist => match value.as_array() {
            Some(items) if items.iter().all(Value::is_string) => None,
            _ => Some("Must be a list of tags".to_string()),
        },
        FieldKind::Date => match value.as_str() {
            Some(s) if parse_date(s) => None,
            _ => Some("Must be a valid date".to_string()),
        },
    }
}

fn parse_date(input: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(input).is_ok()
        || NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
}
