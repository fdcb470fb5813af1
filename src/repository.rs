//! Entry persistence gated by the validation engine.
//!
//! Every value written through [`EntryRepository`] is validated against the
//! current schema inside the same immediate transaction that stores it, so a
//! rejected value is never persisted and two writers to the same field are
//! serialized.

use crate::config::FieldPolicy;
use crate::db::Database;
use crate::engine::{ValidationEngine, ValidationFailure, ValidationOutcome};
use crate::error::{Result, VaultError};
use crate::models::{Entry, EntryDraft, EntryField, Field, Id};
use crate::schema::TemplateSchema;
use crate::validators::ValidatorRegistry;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Record whose deletion is being assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTarget {
    Field(Id),
    Template(Id),
    Group(Id),
    Entry(Id),
    Tag(Id),
}

/// Dependents removed or detached by a destructive delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionImpact {
    pub template_bindings: usize,
    pub entries: usize,
    pub entry_values: usize,
    /// Child groups that become top-level groups
    pub detached_groups: usize,
    /// Groups losing the tag
    pub untagged_groups: usize,
}

impl DeletionImpact {
    pub fn is_empty(&self) -> bool {
        *self == DeletionImpact::default()
    }
}

impl fmt::Display for DeletionImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.template_bindings, "template binding(s) deleted"),
            (self.entries, "entry(ies) deleted"),
            (self.entry_values, "field value(s) deleted"),
            (self.detached_groups, "child group(s) moved to top level"),
            (self.untagged_groups, "group(s) untagged"),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, what)| format!("{count} {what}"))
        .collect();

        if parts.is_empty() {
            write!(f, "no dependent records")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Create, update and delete entries and their field values.
pub struct EntryRepository<'a> {
    db: &'a Database,
    registry: &'a ValidatorRegistry,
    policy: FieldPolicy,
}

impl<'a> EntryRepository<'a> {
    pub fn new(db: &'a Database, registry: &'a ValidatorRegistry) -> Self {
        Self {
            db,
            registry,
            policy: FieldPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn engine(&self) -> ValidationEngine<'a> {
        ValidationEngine::new(self.db, self.registry)
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    pub fn create_entry(
        &self,
        name: &str,
        group_id: Id,
        template_id: Id,
        notes: Option<&str>,
    ) -> Result<Entry> {
        self.db.get_group(group_id)?;
        self.db.get_template(template_id)?;
        self.db.insert_entry(name, group_id, template_id, notes)
    }

    /// Persist name, group and notes changes. The template cannot change.
    pub fn update_entry(&self, entry: &Entry) -> Result<Entry> {
        let stored = self.db.get_entry(entry.id)?;
        if stored.template_id != entry.template_id {
            return Err(VaultError::Other(format!(
                "Entry '{}' cannot change template",
                stored.name
            )));
        }
        self.db.get_group(entry.group_id)?;
        self.db.update_entry(entry)
    }

    /// Delete an entry together with its field values.
    pub fn delete_entry(&self, entry_id: Id) -> Result<()> {
        self.db.delete_entry(entry_id)
    }

    /// Field values of an entry, ordered by field name.
    pub fn entry_fields(&self, entry_id: Id) -> Result<Vec<EntryField>> {
        self.db.get_entry(entry_id)?;
        self.db.entry_fields(entry_id)
    }

    // ------------------------------------------------------------------
    // Field values
    // ------------------------------------------------------------------

    /// Validate and store one field value.
    ///
    /// Returns `VaultError::Validation` with every failing validator when the
    /// value is rejected; nothing is written in that case. A misconfigured
    /// validator aborts with `VaultError::SchemaConfiguration`.
    pub fn create_or_update_entry_field(
        &self,
        entry_id: Id,
        field_id: Id,
        value: &str,
    ) -> Result<EntryField> {
        let tx = self.db.immediate_transaction()?;

        let entry = self.db.get_entry(entry_id)?;
        let field = self.db.get_field(field_id)?;
        self.check_declared(entry.template_id, &field)?;

        if let ValidationOutcome::Invalid(failures) =
            self.engine().validate(&entry, &field, value)?
        {
            warn!(
                "Rejected value for '{}' on entry '{}' ({} failure(s))",
                field.name,
                entry.name,
                failures.len()
            );
            return Err(VaultError::Validation(failures));
        }

        let stored = self.db.upsert_entry_field(entry.id, field.id, value)?;
        tx.commit()?;
        Ok(stored)
    }

    /// Same as [`create_or_update_entry_field`](Self::create_or_update_entry_field),
    /// addressing the field by name.
    pub fn set_field_value(
        &self,
        entry_id: Id,
        field_name: &str,
        value: &str,
    ) -> Result<EntryField> {
        let field = self.db.find_field(field_name)?;
        self.create_or_update_entry_field(entry_id, field.id, value)
    }

    pub fn delete_entry_field(&self, entry_id: Id, field_id: Id) -> Result<()> {
        self.db.delete_entry_field(entry_id, field_id)
    }

    /// Required fields of the entry's template that have no value yet.
    ///
    /// A blank value stored before the field became required counts as missing.
    pub fn missing_required_fields(&self, entry_id: Id) -> Result<Vec<Field>> {
        let entry = self.db.get_entry(entry_id)?;
        let present: HashSet<Id> = self
            .db
            .entry_fields(entry_id)?
            .into_iter()
            .filter(|ef| !ef.value.is_empty())
            .map(|ef| ef.field.id)
            .collect();
        Ok(TemplateSchema::new(self.db)
            .required_fields(entry.template_id)?
            .into_iter()
            .filter(|field| !present.contains(&field.id))
            .collect())
    }

    /// Create an entry with all of its values in one transaction.
    ///
    /// Failures of every field and every missing required field are reported
    /// together; nothing is stored unless all values pass.
    pub fn import_entry(&self, draft: &EntryDraft) -> Result<(Entry, Vec<EntryField>)> {
        let tx = self.db.immediate_transaction()?;

        self.db.get_group(draft.group_id)?;
        let template_id = self.db.get_template(draft.template_id)?.id;

        let mut values = Vec::with_capacity(draft.values.len());
        for (name, value) in &draft.values {
            let field = self.db.find_field(name)?;
            self.check_declared(template_id, &field)?;
            values.push((field, value.clone()));
        }

        // Empty required values are reported by the engine
        let provided: HashSet<Id> = values.iter().map(|(field, _)| field.id).collect();
        let missing: Vec<ValidationFailure> = TemplateSchema::new(self.db)
            .required_fields(template_id)?
            .into_iter()
            .filter(|field| !provided.contains(&field.id))
            .map(|field| ValidationFailure::required(&field.name))
            .collect();

        let outcome = self
            .engine()
            .validate_many(template_id, &values)?
            .merge(ValidationOutcome::from_failures(missing));
        if let ValidationOutcome::Invalid(failures) = outcome {
            warn!(
                "Rejected import of entry '{}' ({} failure(s))",
                draft.name,
                failures.len()
            );
            return Err(VaultError::Validation(failures));
        }

        let entry = self.db.insert_entry(
            &draft.name,
            draft.group_id,
            template_id,
            draft.notes.as_deref(),
        )?;
        for (field, value) in &values {
            self.db.upsert_entry_field(entry.id, field.id, value)?;
        }
        let stored = self.db.entry_fields(entry.id)?;
        tx.commit()?;

        debug!("Imported entry '{}' with {} value(s)", entry.name, stored.len());
        Ok((entry, stored))
    }

    fn check_declared(&self, template_id: Id, field: &Field) -> Result<()> {
        if self.policy == FieldPolicy::Open
            || TemplateSchema::new(self.db).is_declared(template_id, field.id)?
        {
            return Ok(());
        }
        let template = self.db.get_template(template_id)?;
        warn!(
            "Field '{}' is not declared by template '{}'",
            field.name, template.name
        );
        Err(VaultError::UndeclaredField {
            template: template.name,
            field: field.name.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Destructive schema deletes
    // ------------------------------------------------------------------

    /// What a delete would take with it, for the confirmation warning.
    pub fn deletion_impact(&self, target: DeletionTarget) -> Result<DeletionImpact> {
        let impact = match target {
            DeletionTarget::Field(id) => {
                self.db.get_field(id)?;
                DeletionImpact {
                    template_bindings: self.db.count_field_bindings(id)?,
                    entry_values: self.db.count_field_values(id)?,
                    ..Default::default()
                }
            }
            DeletionTarget::Template(id) => {
                self.db.get_template(id)?;
                DeletionImpact {
                    template_bindings: self.db.count_template_bindings(id)?,
                    entries: self.db.count_template_entries(id)?,
                    entry_values: self.db.count_template_entry_values(id)?,
                    ..Default::default()
                }
            }
            DeletionTarget::Group(id) => {
                self.db.get_group(id)?;
                DeletionImpact {
                    entries: self.db.count_group_entries(id)?,
                    entry_values: self.db.count_group_entry_values(id)?,
                    detached_groups: self.db.count_group_children(id)?,
                    ..Default::default()
                }
            }
            DeletionTarget::Entry(id) => {
                self.db.get_entry(id)?;
                DeletionImpact {
                    entry_values: self.db.entry_fields(id)?.len(),
                    ..Default::default()
                }
            }
            DeletionTarget::Tag(id) => {
                self.db.get_tag(id)?;
                DeletionImpact {
                    untagged_groups: self.db.count_tag_groups(id)?,
                    ..Default::default()
                }
            }
        };
        Ok(impact)
    }

    /// Delete a field with its template bindings and stored values.
    pub fn delete_field(&self, field_id: Id) -> Result<DeletionImpact> {
        let impact = self.deletion_impact(DeletionTarget::Field(field_id))?;
        self.db.delete_field(field_id)?;
        Ok(impact)
    }

    /// Delete a template with its bindings and every entry using it.
    pub fn delete_template(&self, template_id: Id) -> Result<DeletionImpact> {
        let impact = self.deletion_impact(DeletionTarget::Template(template_id))?;
        self.db.delete_template(template_id)?;
        Ok(impact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        db: Database,
        registry: ValidatorRegistry,
        template_id: Id,
        group_id: Id,
        password: Field,
        username: Field,
    }

    /// "Website Login" with a required password (MinLength 8) and an
    /// optional username.
    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let password = db.create_field("password", true).unwrap();
        let username = db.create_field("username", false).unwrap();
        let binding = db.bind_field(template.id, password.id, true).unwrap();
        db.bind_field(template.id, username.id, false).unwrap();
        let min = db.create_validator("MinLength", "min_length").unwrap();
        db.add_validator_argument(min.id, "limit_value", "8").unwrap();
        db.attach_validator(binding.id, min.id).unwrap();
        let group = db.insert_group("personal", None).unwrap();

        Fixture {
            db,
            registry: ValidatorRegistry::new(),
            template_id: template.id,
            group_id: group.id,
            password,
            username,
        }
    }

    #[test]
    fn test_invalid_value_is_not_persisted() {
        let fx = fixture();
        let repo = EntryRepository::new(&fx.db, &fx.registry);
        let entry = repo
            .create_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();

        let err = repo
            .create_or_update_entry_field(entry.id, fx.password.id, "abc")
            .unwrap_err();
        let failures = err.validation_failures().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures.iter().next().unwrap().validator, "MinLength");
        assert!(fx.db.entry_field(entry.id, fx.password.id).unwrap().is_none());

        let stored = repo
            .create_or_update_entry_field(entry.id, fx.password.id, "abcdefgh")
            .unwrap();
        assert_eq!(stored.value, "abcdefgh");
        assert!(stored.is_secret());
    }

    #[test]
    fn test_rejected_update_keeps_previous_value() {
        let fx = fixture();
        let repo = EntryRepository::new(&fx.db, &fx.registry);
        let entry = repo
            .create_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();
        repo.set_field_value(entry.id, "password", "correct horse").unwrap();

        assert!(repo.set_field_value(entry.id, "password", "short").is_err());
        let stored = fx.db.entry_field(entry.id, fx.password.id).unwrap().unwrap();
        assert_eq!(stored.value, "correct horse");
    }

    #[test]
    fn test_declared_only_policy() {
        let fx = fixture();
        let notes = fx.db.create_field("recovery_code", true).unwrap();
        let entry = fx
            .db
            .insert_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();

        let open = EntryRepository::new(&fx.db, &fx.registry);
        assert!(open
            .create_or_update_entry_field(entry.id, notes.id, "anything")
            .is_ok());

        let strict =
            EntryRepository::new(&fx.db, &fx.registry).with_policy(FieldPolicy::DeclaredOnly);
        assert!(matches!(
            strict.create_or_update_entry_field(entry.id, notes.id, "anything"),
            Err(VaultError::UndeclaredField { .. })
        ));
        assert!(strict
            .create_or_update_entry_field(entry.id, fx.username.id, "alice")
            .is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let fx = fixture();
        let repo = EntryRepository::new(&fx.db, &fx.registry);
        let entry = repo
            .create_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();
        assert_eq!(
            repo.missing_required_fields(entry.id).unwrap(),
            vec![fx.password.clone()]
        );
        repo.set_field_value(entry.id, "password", "abcdefgh").unwrap();
        assert!(repo.missing_required_fields(entry.id).unwrap().is_empty());
    }

    #[test]
    fn test_required_field_cannot_be_blank_on_any_path() {
        let fx = fixture();
        let repo = EntryRepository::new(&fx.db, &fx.registry);
        let entry = repo
            .create_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();

        let err = repo.set_field_value(entry.id, "password", "").unwrap_err();
        let failures: Vec<_> = err.validation_failures().unwrap().iter().cloned().collect();
        assert_eq!(failures, vec![ValidationFailure::required("password")]);
        assert_eq!(
            repo.missing_required_fields(entry.id).unwrap(),
            vec![fx.password.clone()]
        );

        let draft = EntryDraft {
            name: "Bank".to_string(),
            group_id: fx.group_id,
            template_id: fx.template_id,
            notes: None,
            values: vec![("password".to_string(), String::new())],
        };
        let err = repo.import_entry(&draft).unwrap_err();
        let failures: Vec<_> = err.validation_failures().unwrap().iter().cloned().collect();
        assert_eq!(failures, vec![ValidationFailure::required("password")]);

        // Optional fields accept an empty value
        assert!(repo.set_field_value(entry.id, "username", "").is_ok());

        // A blank stored while optional is reported once the field is required
        let binding = fx.db.template_field(fx.template_id, fx.username.id).unwrap().unwrap();
        fx.db.set_field_required(binding.id, true).unwrap();
        let missing: Vec<String> = repo
            .missing_required_fields(entry.id)
            .unwrap()
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(missing, vec!["password", "username"]);
    }

    #[test]
    fn test_import_aggregates_failures() {
        let fx = fixture();
        let email = fx.db.create_field("email", false).unwrap();
        let binding = fx.db.bind_field(fx.template_id, email.id, false).unwrap();
        let validator = fx.db.create_validator("Email", "email").unwrap();
        fx.db.attach_validator(binding.id, validator.id).unwrap();
        let repo = EntryRepository::new(&fx.db, &fx.registry);

        let draft = EntryDraft {
            name: "Bank".to_string(),
            group_id: fx.group_id,
            template_id: fx.template_id,
            notes: None,
            values: vec![
                ("email".to_string(), "not-an-address".to_string()),
                ("username".to_string(), "alice".to_string()),
            ],
        };
        let err = repo.import_entry(&draft).unwrap_err();
        let errors = err.validation_failures().unwrap().field_errors();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "password"]);
        assert!(fx.db.list_entries().unwrap().is_empty());

        let draft = EntryDraft {
            values: vec![
                ("email".to_string(), "alice@example.com".to_string()),
                ("password".to_string(), "abcdefgh".to_string()),
            ],
            ..draft
        };
        let (entry, values) = repo.import_entry(&draft).unwrap();
        assert_eq!(entry.name, "Bank");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_deletion_impact() {
        let fx = fixture();
        let repo = EntryRepository::new(&fx.db, &fx.registry);
        let entry = repo
            .create_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();
        repo.set_field_value(entry.id, "password", "abcdefgh").unwrap();
        repo.set_field_value(entry.id, "username", "alice").unwrap();

        let impact = repo
            .deletion_impact(DeletionTarget::Template(fx.template_id))
            .unwrap();
        assert_eq!(
            impact,
            DeletionImpact {
                template_bindings: 2,
                entries: 1,
                entry_values: 2,
                detached_groups: 0,
                untagged_groups: 0,
            }
        );
        assert_eq!(
            impact.to_string(),
            "2 template binding(s) deleted, 1 entry(ies) deleted, 2 field value(s) deleted"
        );

        let impact = repo.delete_field(fx.username.id).unwrap();
        assert_eq!(impact.template_bindings, 1);
        assert_eq!(impact.entry_values, 1);
        assert_eq!(repo.entry_fields(entry.id).unwrap().len(), 1);
    }

    #[test]
    fn test_update_entry_cannot_change_template() {
        let fx = fixture();
        let other = fx.db.create_template("Server").unwrap();
        let repo = EntryRepository::new(&fx.db, &fx.registry);
        let entry = repo
            .create_entry("Email", fx.group_id, fx.template_id, None)
            .unwrap();

        let renamed = repo
            .update_entry(&Entry {
                name: "Mail".to_string(),
                notes: Some("primary".to_string()),
                ..entry.clone()
            })
            .unwrap();
        assert_eq!(renamed.name, "Mail");

        assert!(repo
            .update_entry(&Entry {
                template_id: other.id,
                ..entry
            })
            .is_err());
    }
}
