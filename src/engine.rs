//! Entry field validation engine.
//!
//! Every write path (single field updates, bulk imports, the CLI) runs
//! candidate values through [`ValidationEngine`]. All validators bound to the
//! (template, field) pair run and every failure is reported, so a form can
//! show them all at once. A validator that cannot be resolved aborts the
//! check with a schema configuration error before any value is considered.

use crate::db::Database;
use crate::error::{Result, VaultError};
use crate::models::{Entry, Field, Id};
use crate::schema::TemplateSchema;
use crate::validators::{ExecutableValidator, ValidatorRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Prefix used when failures are attached to a form input.
const FORM_FAILURE_PREFIX: &str = "Validation failure";

/// Validator name reported for a required field that is missing or empty.
pub const REQUIRED_VALIDATOR: &str = "required";
const REQUIRED_MESSAGE: &str = "This field is required.";

/// One validator rejecting one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// Field the value was written to
    pub field: String,
    /// Name of the validator that rejected it
    pub validator: String,
    pub message: String,
}

impl ValidationFailure {
    /// Failure for a required field with no value.
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            validator: REQUIRED_VALIDATOR.to_string(),
            message: REQUIRED_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.message, self.validator)
    }
}

/// Aggregated failures of a rejected write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationFailures(Vec<ValidationFailure>);

impl ValidationFailures {
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self(failures)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationFailure> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<ValidationFailure> {
        self.0
    }

    /// Failures grouped by the field input they belong to.
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        for failure in &self.0 {
            errors
                .0
                .entry(failure.field.clone())
                .or_default()
                .push(failure.message.clone());
        }
        errors
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed")?;
        for failure in &self.0 {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// Failure messages keyed by field name, for rendering beside each input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Single line for a form input, e.g. "Validation failure: too short, not a URL".
    pub fn form_message(&self, field: &str) -> Option<String> {
        self.get(field)
            .map(|messages| format!("{FORM_FAILURE_PREFIX}: {}", messages.join(", ")))
    }
}

/// Result of validating a candidate value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailures),
}

impl ValidationOutcome {
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        if failures.is_empty() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::Invalid(ValidationFailures::new(failures))
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            ValidationOutcome::Valid => &[],
            ValidationOutcome::Invalid(failures) => &failures.0,
        }
    }

    /// Combine with another outcome, keeping every failure.
    pub fn merge(self, other: ValidationOutcome) -> ValidationOutcome {
        let mut failures = match self {
            ValidationOutcome::Valid => Vec::new(),
            ValidationOutcome::Invalid(failures) => failures.into_inner(),
        };
        if let ValidationOutcome::Invalid(more) = other {
            failures.extend(more.into_inner());
        }
        ValidationOutcome::from_failures(failures)
    }

    /// `Ok(())` when valid, `VaultError::Validation` otherwise.
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid(failures) => Err(VaultError::Validation(failures)),
        }
    }
}

/// Runs the validator chain for (template, field) against candidate values.
pub struct ValidationEngine<'a> {
    db: &'a Database,
    registry: &'a ValidatorRegistry,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(db: &'a Database, registry: &'a ValidatorRegistry) -> Self {
        Self { db, registry }
    }

    /// Validate a value for `field` on an existing entry.
    pub fn validate(
        &self,
        entry: &Entry,
        field: &Field,
        candidate: &str,
    ) -> Result<ValidationOutcome> {
        self.validate_for_template(entry.template_id, field, candidate)
    }

    /// Validate a value for `field` under a template, before any entry exists.
    ///
    /// An empty value for a required field fails with [`REQUIRED_VALIDATOR`]
    /// alone; the field's validators only see non-empty values.
    pub fn validate_for_template(
        &self,
        template_id: Id,
        field: &Field,
        candidate: &str,
    ) -> Result<ValidationOutcome> {
        let validators = self.resolve_chain(template_id, field)?;
        if candidate.is_empty() && self.is_required(template_id, field)? {
            return Ok(ValidationOutcome::from_failures(vec![
                ValidationFailure::required(&field.name),
            ]));
        }
        let failures = validators
            .iter()
            .filter_map(|validator| {
                validator
                    .validate(candidate)
                    .err()
                    .map(|message| ValidationFailure {
                        field: field.name.clone(),
                        validator: validator.name.clone(),
                        message,
                    })
            })
            .collect();
        Ok(ValidationOutcome::from_failures(failures))
    }

    /// Validate several field values at once; failures from all fields are kept.
    pub fn validate_many(
        &self,
        template_id: Id,
        values: &[(Field, String)],
    ) -> Result<ValidationOutcome> {
        let mut outcome = ValidationOutcome::Valid;
        for (field, value) in values {
            outcome = outcome.merge(self.validate_for_template(template_id, field, value)?);
        }
        Ok(outcome)
    }

    fn is_required(&self, template_id: Id, field: &Field) -> Result<bool> {
        Ok(TemplateSchema::new(self.db)
            .binding(template_id, field.id)?
            .is_some_and(|binding| binding.is_required))
    }

    /// Resolve every validator bound to (template, field).
    fn resolve_chain(&self, template_id: Id, field: &Field) -> Result<Vec<ExecutableValidator>> {
        let definitions = TemplateSchema::new(self.db).validators_for(template_id, field.id)?;
        definitions
            .iter()
            .map(|definition| {
                self.registry.resolve(definition).map_err(|err| {
                    warn!(
                        "Validator '{}' on field '{}' is misconfigured: {}",
                        definition.validator.name, field.name, err
                    );
                    VaultError::from(err)
                })
            })
            .collect()
    }
}
