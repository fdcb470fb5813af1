//! Data models for the credential store.

use crate::codec::{self, ArgValue};
use crate::error::SchemaConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row identifier shared by every stored record.
pub type Id = i64;

/// A named attribute kind that entries can carry, e.g. "password".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Field {
    pub id: Id,
    pub name: String,
    /// Value is sensitive and masked on display by default
    pub is_secret: bool,
}

/// A configurable check: a registry implementation plus its arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Validator {
    pub id: Id,
    pub name: String,
    /// Registry reference, e.g. "min_length"
    pub implementation: String,
}

/// One keyword argument of a validator, stored as raw literal text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidatorArgument {
    pub id: Id,
    pub validator_id: Id,
    pub key: String,
    pub value: String,
}

impl ValidatorArgument {
    /// Decode the stored text into a typed value.
    pub fn decoded_value(&self) -> Result<ArgValue, SchemaConfigError> {
        codec::decode(&self.value)
    }

    /// Single-entry mapping `{key: decoded_value}`.
    pub fn pair_value(&self) -> Result<BTreeMap<String, ArgValue>, SchemaConfigError> {
        let mut pair = BTreeMap::new();
        pair.insert(self.key.clone(), self.decoded_value()?);
        Ok(pair)
    }
}

/// A validator together with its arguments, in stored order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidatorDefinition {
    pub validator: Validator,
    pub arguments: Vec<ValidatorArgument>,
}

/// A named schema declaring which fields entries of this type carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub id: Id,
    pub name: String,
}

/// Binding of one field to one template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateField {
    pub id: Id,
    pub template_id: Id,
    pub field_id: Id,
    pub is_required: bool,
}

/// A template binding with its field resolved, for display and requiredness checks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TemplateFieldInfo {
    pub binding: TemplateField,
    pub field: Field,
    pub validators: Vec<Validator>,
}

/// A classification label attachable to groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    /// URL-safe identifier, derived from the name once
    pub slug: String,
}

/// Hierarchical container for entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: Id,
    pub name: String,
    pub parent_id: Option<Id>,
    pub created_at: String,
    pub updated_at: String,
}

impl Group {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this group is the direct parent of another.
    pub fn is_parent_of(&self, other: &Group) -> bool {
        other.parent_id == Some(self.id)
    }
}

/// A stored credential record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: Id,
    pub name: String,
    pub group_id: Id,
    pub template_id: Id,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The value of one field on one entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntryField {
    pub id: Id,
    pub entry_id: Id,
    pub field: Field,
    pub value: String,
    pub updated_at: String,
}

impl EntryField {
    /// Whether the value should be masked; follows the field definition.
    pub fn is_secret(&self) -> bool {
        self.field.is_secret
    }

    /// Value suitable for display under the default masking policy.
    pub fn display_value(&self, reveal: bool) -> String {
        if self.is_secret() && !reveal {
            crate::utils::mask_secret(&self.value)
        } else {
            self.value.clone()
        }
    }
}

/// Input for creating an entry together with its field values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryDraft {
    pub name: String,
    pub group_id: Id,
    pub template_id: Id,
    #[serde(default)]
    pub notes: Option<String>,
    /// (field name, value) pairs in input order
    #[serde(default)]
    pub values: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(is_secret: bool) -> Field {
        Field {
            id: 1,
            name: "password".to_string(),
            is_secret,
        }
    }

    #[test]
    fn test_pair_value_is_single_entry() {
        let arg = ValidatorArgument {
            id: 1,
            validator_id: 1,
            key: "limit_value".to_string(),
            value: "8".to_string(),
        };
        let pair = arg.pair_value().unwrap();
        assert_eq!(pair.len(), 1);
        assert_eq!(pair.get("limit_value"), Some(&ArgValue::Integer(8)));
    }

    #[test]
    fn test_pair_value_keeps_empty_sentinel() {
        let arg = ValidatorArgument {
            id: 1,
            validator_id: 1,
            key: "message".to_string(),
            value: String::new(),
        };
        assert_eq!(
            arg.pair_value().unwrap().get("message"),
            Some(&ArgValue::String(String::new()))
        );
    }

    #[test]
    fn test_entry_field_secret_projection() {
        let mut entry_field = EntryField {
            id: 1,
            entry_id: 1,
            field: field(true),
            value: "hunter22".to_string(),
            updated_at: String::new(),
        };
        assert!(entry_field.is_secret());
        assert_ne!(entry_field.display_value(false), "hunter22");
        assert_eq!(entry_field.display_value(true), "hunter22");

        entry_field.field = field(false);
        assert!(!entry_field.is_secret());
        assert_eq!(entry_field.display_value(false), "hunter22");
    }

    #[test]
    fn test_group_relationships() {
        let parent = Group {
            id: 1,
            name: "personal".to_string(),
            parent_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let child = Group {
            id: 2,
            name: "banking".to_string(),
            parent_id: Some(1),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(parent.is_root());
        assert!(parent.is_parent_of(&child));
        assert!(!child.is_parent_of(&parent));
    }
}
