//! Template schema lookups: which fields a template declares and which
//! validators apply to each (template, field) pair.

use crate::db::Database;
use crate::error::Result;
use crate::models::{Field, Id, TemplateField, TemplateFieldInfo, ValidatorDefinition};

/// Read-only view of the template/field/validator catalog.
pub struct TemplateSchema<'a> {
    db: &'a Database,
}

impl<'a> TemplateSchema<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The binding for (template, field), if the template declares the field.
    pub fn binding(&self, template_id: Id, field_id: Id) -> Result<Option<TemplateField>> {
        self.db.template_field(template_id, field_id)
    }

    pub fn is_declared(&self, template_id: Id, field_id: Id) -> Result<bool> {
        Ok(self.binding(template_id, field_id)?.is_some())
    }

    /// Validators bound to (template, field), in attachment order.
    ///
    /// Empty when the field is not declared by the template or has nothing
    /// attached; an undeclared field is not forbidden here.
    pub fn validators_for(
        &self,
        template_id: Id,
        field_id: Id,
    ) -> Result<Vec<ValidatorDefinition>> {
        let Some(binding) = self.binding(template_id, field_id)? else {
            return Ok(Vec::new());
        };

        self.db
            .template_field_validators(binding.id)?
            .into_iter()
            .map(|validator| {
                let arguments = self.db.validator_arguments(validator.id)?;
                Ok(ValidatorDefinition {
                    validator,
                    arguments,
                })
            })
            .collect()
    }

    /// Every binding of a template with its field and validators, in declaration order.
    pub fn fields_of(&self, template_id: Id) -> Result<Vec<TemplateFieldInfo>> {
        self.db
            .template_fields(template_id)?
            .into_iter()
            .map(|binding| {
                let field = self.db.get_field(binding.field_id)?;
                let validators = self.db.template_field_validators(binding.id)?;
                Ok(TemplateFieldInfo {
                    binding,
                    field,
                    validators,
                })
            })
            .collect()
    }

    /// Fields an entry of this template must carry.
    pub fn required_fields(&self, template_id: Id) -> Result<Vec<Field>> {
        Ok(self
            .fields_of(template_id)?
            .into_iter()
            .filter(|info| info.binding.is_required)
            .map(|info| info.field)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_field_has_no_validators() {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let field = db.create_field("pin", true).unwrap();

        let schema = TemplateSchema::new(&db);
        assert!(!schema.is_declared(template.id, field.id).unwrap());
        assert!(schema.validators_for(template.id, field.id).unwrap().is_empty());
    }

    #[test]
    fn test_validators_for_bound_field() {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let password = db.create_field("password", true).unwrap();
        let username = db.create_field("username", false).unwrap();
        let binding = db.bind_field(template.id, password.id, true).unwrap();
        db.bind_field(template.id, username.id, false).unwrap();

        let min = db.create_validator("MinLength", "min_length").unwrap();
        db.add_validator_argument(min.id, "limit_value", "8").unwrap();
        db.attach_validator(binding.id, min.id).unwrap();

        let schema = TemplateSchema::new(&db);
        let validators = schema.validators_for(template.id, password.id).unwrap();
        assert_eq!(validators.len(), 1);
        assert_eq!(validators[0].validator.name, "MinLength");
        assert_eq!(validators[0].arguments.len(), 1);

        assert!(schema.validators_for(template.id, username.id).unwrap().is_empty());

        let fields = schema.fields_of(template.id).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field.name, "password");
        assert_eq!(fields[0].validators.len(), 1);

        let required = schema.required_fields(template.id).unwrap();
        assert_eq!(required, vec![password]);
    }
}
