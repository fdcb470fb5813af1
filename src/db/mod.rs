//! SQLite-backed storage for the schema catalog and vault records.
//!
//! Methods here are plain CRUD. Validation, cycle checks and other write
//! policy live in the layers above (`repository`, `groups`).

mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use tracing::{debug, info};

use crate::error::{Result, VaultError};
use crate::models::{
    Entry, EntryField, Field, Group, Id, Tag, Template, TemplateField, Validator,
    ValidatorArgument, ValidatorDefinition,
};
use crate::utils;

pub use schema::CREATE_SCHEMA;

/// How long a writer waits for another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper
pub struct Database {
    conn: Connection,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Translate constraint failures into the vault's error taxonomy.
fn write_error(err: rusqlite::Error, kind: &'static str, name: &str) -> VaultError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return VaultError::ReferentialIntegrity(format!(
                        "{kind} '{name}' references a record that does not exist"
                    ));
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return VaultError::AlreadyExists {
                        kind,
                        name: name.to_string(),
                    };
                }
                _ => {}
            }
        }
    }
    VaultError::Database(err)
}

fn field_from_row(row: &Row) -> rusqlite::Result<Field> {
    Ok(Field {
        id: row.get(0)?,
        name: row.get(1)?,
        is_secret: row.get(2)?,
    })
}

fn validator_from_row(row: &Row) -> rusqlite::Result<Validator> {
    Ok(Validator {
        id: row.get(0)?,
        name: row.get(1)?,
        implementation: row.get(2)?,
    })
}

fn argument_from_row(row: &Row) -> rusqlite::Result<ValidatorArgument> {
    Ok(ValidatorArgument {
        id: row.get(0)?,
        validator_id: row.get(1)?,
        key: row.get(2)?,
        value: row.get(3)?,
    })
}

fn template_field_from_row(row: &Row) -> rusqlite::Result<TemplateField> {
    Ok(TemplateField {
        id: row.get(0)?,
        template_id: row.get(1)?,
        field_id: row.get(2)?,
        is_required: row.get(3)?,
    })
}

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
    })
}

fn group_from_row(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn entry_from_row(row: &Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        name: row.get(1)?,
        group_id: row.get(2)?,
        template_id: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn entry_field_from_row(row: &Row) -> rusqlite::Result<EntryField> {
    Ok(EntryField {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        value: row.get(2)?,
        updated_at: row.get(3)?,
        field: Field {
            id: row.get(4)?,
            name: row.get(5)?,
            is_secret: row.get(6)?,
        },
    })
}

const GROUP_COLUMNS: &str = "id, name, parent_id, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, name, group_id, template_id, notes, created_at, updated_at";
const ENTRY_FIELD_SELECT: &str = "SELECT ef.id, ef.entry_id, ef.value, ef.updated_at, f.id, f.name, f.is_secret
     FROM entry_fields ef JOIN fields f ON f.id = ef.field_id";

/// Exactly one match by name, or a NotFound / Ambiguous error.
fn single<T>(mut matches: Vec<T>, kind: &'static str, name: &str) -> Result<T> {
    match matches.len() {
        0 => Err(VaultError::not_found(kind, name)),
        1 => Ok(matches.remove(0)),
        count => Err(VaultError::Ambiguous {
            kind,
            name: name.to_string(),
            count,
        }),
    }
}

impl Database {
    /// Open (and create if needed) a database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self::prepare(conn)?;
        info!("Opened credential store at {}", path.display());
        Ok(db)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialise the schema; safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    /// Begin a transaction that takes the write lock immediately.
    ///
    /// Statements issued through `self` while the transaction is alive run
    /// inside it; dropping it without `commit` rolls back.
    pub fn immediate_transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn count(&self, sql: &str, id: Id) -> Result<usize> {
        let n: i64 = self.conn.query_row(sql, [id], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    pub fn create_field(&self, name: &str, is_secret: bool) -> Result<Field> {
        self.conn
            .execute(
                "INSERT INTO fields (name, is_secret) VALUES (?1, ?2)",
                params![name, is_secret],
            )
            .map_err(|e| write_error(e, "Field", name))?;
        let id = self.conn.last_insert_rowid();
        debug!("Created field: {} (secret: {})", name, is_secret);
        Ok(Field {
            id,
            name: name.to_string(),
            is_secret,
        })
    }

    pub fn get_field(&self, id: Id) -> Result<Field> {
        self.conn
            .query_row(
                "SELECT id, name, is_secret FROM fields WHERE id = ?1",
                [id],
                field_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Field", format!("#{id}")))
    }

    pub fn find_field(&self, name: &str) -> Result<Field> {
        self.conn
            .query_row(
                "SELECT id, name, is_secret FROM fields WHERE name = ?1",
                [name],
                field_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Field", name))
    }

    pub fn list_fields(&self) -> Result<Vec<Field>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, is_secret FROM fields ORDER BY name")?;
        let rows = stmt.query_map([], field_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_field_secret(&self, id: Id, is_secret: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE fields SET is_secret = ?2 WHERE id = ?1",
            params![id, is_secret],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found("Field", format!("#{id}")));
        }
        Ok(())
    }

    /// Delete a field; its template bindings and entry values go with it.
    pub fn delete_field(&self, id: Id) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM fields WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VaultError::not_found("Field", format!("#{id}")));
        }
        debug!("Deleted field id: {}", id);
        Ok(())
    }

    pub fn count_field_bindings(&self, field_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM template_fields WHERE field_id = ?1",
            field_id,
        )
    }

    pub fn count_field_values(&self, field_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM entry_fields WHERE field_id = ?1",
            field_id,
        )
    }

    // ------------------------------------------------------------------
    // Validators
    // ------------------------------------------------------------------

    pub fn create_validator(&self, name: &str, implementation: &str) -> Result<Validator> {
        let implementation = implementation.trim();
        self.conn
            .execute(
                "INSERT INTO validators (name, implementation) VALUES (?1, ?2)",
                params![name, implementation],
            )
            .map_err(|e| write_error(e, "Validator", name))?;
        let id = self.conn.last_insert_rowid();
        debug!("Created validator: {} -> {}", name, implementation);
        Ok(Validator {
            id,
            name: name.to_string(),
            implementation: implementation.to_string(),
        })
    }

    pub fn get_validator(&self, id: Id) -> Result<Validator> {
        self.conn
            .query_row(
                "SELECT id, name, implementation FROM validators WHERE id = ?1",
                [id],
                validator_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Validator", format!("#{id}")))
    }

    pub fn find_validator(&self, name: &str) -> Result<Validator> {
        self.conn
            .query_row(
                "SELECT id, name, implementation FROM validators WHERE name = ?1",
                [name],
                validator_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Validator", name))
    }

    pub fn list_validators(&self) -> Result<Vec<Validator>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, implementation FROM validators ORDER BY name")?;
        let rows = stmt.query_map([], validator_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_validator_implementation(&self, id: Id, implementation: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE validators SET implementation = ?2 WHERE id = ?1",
            params![id, implementation.trim()],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found("Validator", format!("#{id}")));
        }
        Ok(())
    }

    /// Delete a validator and its arguments; bindings to template fields are dropped.
    pub fn delete_validator(&self, id: Id) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM validators WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VaultError::not_found("Validator", format!("#{id}")));
        }
        debug!("Deleted validator id: {}", id);
        Ok(())
    }

    /// Add an argument; the key must pass the keyword validator.
    pub fn add_validator_argument(
        &self,
        validator_id: Id,
        key: &str,
        value: &str,
    ) -> Result<ValidatorArgument> {
        utils::validate_argument_key(key)?;
        self.conn
            .execute(
                "INSERT INTO validator_arguments (validator_id, key, value) VALUES (?1, ?2, ?3)",
                params![validator_id, key, value],
            )
            .map_err(|e| write_error(e, "Validator argument", key))?;
        let id = self.conn.last_insert_rowid();
        debug!("Added argument {} to validator id: {}", key, validator_id);
        Ok(ValidatorArgument {
            id,
            validator_id,
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn set_validator_argument_value(&self, argument_id: Id, value: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE validator_arguments SET value = ?2 WHERE id = ?1",
            params![argument_id, value],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(
                "Validator argument",
                format!("#{argument_id}"),
            ));
        }
        Ok(())
    }

    pub fn delete_validator_argument(&self, argument_id: Id) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM validator_arguments WHERE id = ?1",
            [argument_id],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(
                "Validator argument",
                format!("#{argument_id}"),
            ));
        }
        Ok(())
    }

    /// Arguments of a validator, ordered by key.
    pub fn validator_arguments(&self, validator_id: Id) -> Result<Vec<ValidatorArgument>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, validator_id, key, value FROM validator_arguments
             WHERE validator_id = ?1 ORDER BY key, id",
        )?;
        let rows = stmt.query_map([validator_id], argument_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn validator_definition(&self, validator_id: Id) -> Result<ValidatorDefinition> {
        Ok(ValidatorDefinition {
            validator: self.get_validator(validator_id)?,
            arguments: self.validator_arguments(validator_id)?,
        })
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    pub fn create_template(&self, name: &str) -> Result<Template> {
        self.conn
            .execute("INSERT INTO templates (name) VALUES (?1)", [name])
            .map_err(|e| write_error(e, "Template", name))?;
        let id = self.conn.last_insert_rowid();
        debug!("Created template: {}", name);
        Ok(Template {
            id,
            name: name.to_string(),
        })
    }

    pub fn get_template(&self, id: Id) -> Result<Template> {
        self.conn
            .query_row(
                "SELECT id, name FROM templates WHERE id = ?1",
                [id],
                |row| {
                    Ok(Template {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Template", format!("#{id}")))
    }

    pub fn find_template(&self, name: &str) -> Result<Template> {
        self.conn
            .query_row(
                "SELECT id, name FROM templates WHERE name = ?1",
                [name],
                |row| {
                    Ok(Template {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Template", name))
    }

    pub fn list_templates(&self) -> Result<Vec<Template>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM templates ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Template {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a template; its bindings and every entry using it go with it.
    pub fn delete_template(&self, id: Id) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VaultError::not_found("Template", format!("#{id}")));
        }
        debug!("Deleted template id: {}", id);
        Ok(())
    }

    pub fn count_template_bindings(&self, template_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM template_fields WHERE template_id = ?1",
            template_id,
        )
    }

    pub fn count_template_entries(&self, template_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM entries WHERE template_id = ?1",
            template_id,
        )
    }

    /// Field values stored on entries of a template.
    pub fn count_template_entry_values(&self, template_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM entry_fields ef JOIN entries e ON e.id = ef.entry_id
             WHERE e.template_id = ?1",
            template_id,
        )
    }

    /// Field values stored on entries filed directly in a group.
    pub fn count_group_entry_values(&self, group_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM entry_fields ef JOIN entries e ON e.id = ef.entry_id
             WHERE e.group_id = ?1",
            group_id,
        )
    }

    pub fn bind_field(
        &self,
        template_id: Id,
        field_id: Id,
        is_required: bool,
    ) -> Result<TemplateField> {
        self.conn
            .execute(
                "INSERT INTO template_fields (template_id, field_id, is_required) VALUES (?1, ?2, ?3)",
                params![template_id, field_id, is_required],
            )
            .map_err(|e| {
                write_error(
                    e,
                    "Template field",
                    &format!("template #{template_id} / field #{field_id}"),
                )
            })?;
        let id = self.conn.last_insert_rowid();
        debug!(
            "Bound field id: {} to template id: {} (required: {})",
            field_id, template_id, is_required
        );
        Ok(TemplateField {
            id,
            template_id,
            field_id,
            is_required,
        })
    }

    pub fn set_field_required(&self, template_field_id: Id, is_required: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE template_fields SET is_required = ?2 WHERE id = ?1",
            params![template_field_id, is_required],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(
                "Template field",
                format!("#{template_field_id}"),
            ));
        }
        Ok(())
    }

    pub fn unbind_field(&self, template_field_id: Id) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM template_fields WHERE id = ?1",
            [template_field_id],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(
                "Template field",
                format!("#{template_field_id}"),
            ));
        }
        Ok(())
    }

    /// The binding for (template, field), if declared.
    pub fn template_field(&self, template_id: Id, field_id: Id) -> Result<Option<TemplateField>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, template_id, field_id, is_required FROM template_fields
                 WHERE template_id = ?1 AND field_id = ?2",
                [template_id, field_id],
                template_field_from_row,
            )
            .optional()?)
    }

    /// Bindings of a template in declaration order.
    pub fn template_fields(&self, template_id: Id) -> Result<Vec<TemplateField>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, template_id, field_id, is_required FROM template_fields
             WHERE template_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([template_id], template_field_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Attach a validator to a binding; it runs after those already attached.
    pub fn attach_validator(&self, template_field_id: Id, validator_id: Id) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO template_field_validators (template_field_id, validator_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1
                                  FROM template_field_validators WHERE template_field_id = ?1))",
                [template_field_id, validator_id],
            )
            .map_err(|e| {
                write_error(
                    e,
                    "Validator binding",
                    &format!("template field #{template_field_id} / validator #{validator_id}"),
                )
            })?;
        debug!(
            "Attached validator id: {} to template field id: {}",
            validator_id, template_field_id
        );
        Ok(())
    }

    pub fn detach_validator(&self, template_field_id: Id, validator_id: Id) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM template_field_validators WHERE template_field_id = ?1 AND validator_id = ?2",
            [template_field_id, validator_id],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(
                "Validator binding",
                format!("template field #{template_field_id} / validator #{validator_id}"),
            ));
        }
        Ok(())
    }

    /// Validators attached to a binding, in attachment order.
    pub fn template_field_validators(&self, template_field_id: Id) -> Result<Vec<Validator>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.id, v.name, v.implementation FROM template_field_validators tfv
             JOIN validators v ON v.id = tfv.validator_id
             WHERE tfv.template_field_id = ?1 ORDER BY tfv.position",
        )?;
        let rows = stmt.query_map([template_field_id], validator_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Insert a tag with an already-decided slug.
    pub fn insert_tag(&self, name: &str, slug: &str) -> Result<Tag> {
        self.conn
            .execute(
                "INSERT INTO tags (name, slug) VALUES (?1, ?2)",
                params![name, slug],
            )
            .map_err(|e| write_error(e, "Tag", slug))?;
        let id = self.conn.last_insert_rowid();
        debug!("Created tag: {} ({})", name, slug);
        Ok(Tag {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    pub fn update_tag(&self, tag: &Tag) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tags SET name = ?2, slug = ?3 WHERE id = ?1",
                params![tag.id, tag.name, tag.slug],
            )
            .map_err(|e| write_error(e, "Tag", &tag.slug))?;
        if changed == 0 {
            return Err(VaultError::not_found("Tag", format!("#{}", tag.id)));
        }
        Ok(())
    }

    pub fn get_tag(&self, id: Id) -> Result<Tag> {
        self.conn
            .query_row(
                "SELECT id, name, slug FROM tags WHERE id = ?1",
                [id],
                tag_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Tag", format!("#{id}")))
    }

    pub fn find_tag_by_slug(&self, slug: &str) -> Result<Tag> {
        self.conn
            .query_row(
                "SELECT id, name, slug FROM tags WHERE slug = ?1",
                [slug],
                tag_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Tag", slug))
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, slug FROM tags ORDER BY name")?;
        let rows = stmt.query_map([], tag_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_tag(&self, id: Id) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM tags WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VaultError::not_found("Tag", format!("#{id}")));
        }
        debug!("Deleted tag id: {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub fn insert_group(&self, name: &str, parent_id: Option<Id>) -> Result<Group> {
        let timestamp = now();
        self.conn
            .execute(
                "INSERT INTO vault_groups (name, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![name, parent_id, timestamp],
            )
            .map_err(|e| write_error(e, "Group", name))?;
        let id = self.conn.last_insert_rowid();
        debug!("Created group: {} (parent: {:?})", name, parent_id);
        Ok(Group {
            id,
            name: name.to_string(),
            parent_id,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    pub fn get_group(&self, id: Id) -> Result<Group> {
        self.conn
            .query_row(
                &format!("SELECT {GROUP_COLUMNS} FROM vault_groups WHERE id = ?1"),
                [id],
                group_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Group", format!("#{id}")))
    }

    /// Look a group up by name; names are not unique, so several matches is an error.
    pub fn find_group(&self, name: &str) -> Result<Group> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM vault_groups WHERE name = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([name], group_from_row)?;
        single(rows.collect::<rusqlite::Result<Vec<_>>>()?, "Group", name)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM vault_groups ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([], group_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Direct children of a group, ordered by name.
    pub fn child_groups(&self, parent_id: Id) -> Result<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM vault_groups WHERE parent_id = ?1 ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([parent_id], group_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn root_groups(&self) -> Result<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM vault_groups WHERE parent_id IS NULL ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([], group_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_group(&self, id: Id, name: &str, parent_id: Option<Id>) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE vault_groups SET name = ?2, parent_id = ?3, updated_at = ?4 WHERE id = ?1",
                params![id, name, parent_id, now()],
            )
            .map_err(|e| write_error(e, "Group", name))?;
        if changed == 0 {
            return Err(VaultError::not_found("Group", format!("#{id}")));
        }
        debug!("Updated group id: {} (parent: {:?})", id, parent_id);
        Ok(())
    }

    /// Delete a group. Children are detached, entries in the group are deleted.
    pub fn delete_group(&self, id: Id) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM vault_groups WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VaultError::not_found("Group", format!("#{id}")));
        }
        debug!("Deleted group id: {}", id);
        Ok(())
    }

    pub fn count_group_children(&self, group_id: Id) -> Result<usize> {
        self.count(
            "SELECT COUNT(*) FROM vault_groups WHERE parent_id = ?1",
            group_id,
        )
    }

    pub fn count_tag_groups(&self, tag_id: Id) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM group_tags WHERE tag_id = ?1", tag_id)
    }

    pub fn count_group_entries(&self, group_id: Id) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM entries WHERE group_id = ?1", group_id)
    }

    pub fn add_group_tag(&self, group_id: Id, tag_id: Id) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO group_tags (group_id, tag_id) VALUES (?1, ?2)",
                [group_id, tag_id],
            )
            .map_err(|e| {
                write_error(e, "Group tag", &format!("group #{group_id} / tag #{tag_id}"))
            })?;
        Ok(())
    }

    pub fn remove_group_tag(&self, group_id: Id, tag_id: Id) -> Result<()> {
        self.conn.execute(
            "DELETE FROM group_tags WHERE group_id = ?1 AND tag_id = ?2",
            [group_id, tag_id],
        )?;
        Ok(())
    }

    /// Tags attached to a group, ordered by name.
    pub fn group_tags(&self, group_id: Id) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.slug FROM group_tags gt JOIN tags t ON t.id = gt.tag_id
             WHERE gt.group_id = ?1 ORDER BY t.name",
        )?;
        let rows = stmt.query_map([group_id], tag_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn groups_with_tag(&self, tag_id: Id) -> Result<Vec<Group>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.name, g.parent_id, g.created_at, g.updated_at
             FROM group_tags gt JOIN vault_groups g ON g.id = gt.group_id
             WHERE gt.tag_id = ?1 ORDER BY g.name, g.id",
        )?;
        let rows = stmt.query_map([tag_id], group_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    pub fn insert_entry(
        &self,
        name: &str,
        group_id: Id,
        template_id: Id,
        notes: Option<&str>,
    ) -> Result<Entry> {
        let timestamp = now();
        self.conn
            .execute(
                "INSERT INTO entries (name, group_id, template_id, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![name, group_id, template_id, notes, timestamp],
            )
            .map_err(|e| write_error(e, "Entry", name))?;
        let id = self.conn.last_insert_rowid();
        debug!("Created entry: {}", name);
        Ok(Entry {
            id,
            name: name.to_string(),
            group_id,
            template_id,
            notes: notes.map(str::to_string),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    pub fn get_entry(&self, id: Id) -> Result<Entry> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                [id],
                entry_from_row,
            )
            .optional()?
            .ok_or_else(|| VaultError::not_found("Entry", format!("#{id}")))
    }

    pub fn find_entry(&self, name: &str) -> Result<Entry> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE name = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([name], entry_from_row)?;
        single(rows.collect::<rusqlite::Result<Vec<_>>>()?, "Entry", name)
    }

    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([], entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn entries_in_group(&self, group_id: Id) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE group_id = ?1 ORDER BY name, id"
        ))?;
        let rows = stmt.query_map([group_id], entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_entry(&self, entry: &Entry) -> Result<Entry> {
        let timestamp = now();
        let changed = self
            .conn
            .execute(
                "UPDATE entries SET name = ?2, group_id = ?3, notes = ?4, updated_at = ?5 WHERE id = ?1",
                params![entry.id, entry.name, entry.group_id, entry.notes, timestamp],
            )
            .map_err(|e| write_error(e, "Entry", &entry.name))?;
        if changed == 0 {
            return Err(VaultError::not_found("Entry", format!("#{}", entry.id)));
        }
        debug!("Updated entry id: {}", entry.id);
        Ok(Entry {
            updated_at: timestamp,
            ..entry.clone()
        })
    }

    /// Delete an entry and all of its field values.
    pub fn delete_entry(&self, id: Id) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VaultError::not_found("Entry", format!("#{id}")));
        }
        debug!("Deleted entry id: {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry fields
    // ------------------------------------------------------------------

    /// Insert or replace the value of (entry, field). Callers validate first.
    pub fn upsert_entry_field(
        &self,
        entry_id: Id,
        field_id: Id,
        value: &str,
    ) -> Result<EntryField> {
        self.conn
            .execute(
                "INSERT INTO entry_fields (entry_id, field_id, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (entry_id, field_id)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![entry_id, field_id, value, now()],
            )
            .map_err(|e| {
                write_error(
                    e,
                    "Entry field",
                    &format!("entry #{entry_id} / field #{field_id}"),
                )
            })?;
        debug!("Stored field id: {} on entry id: {}", field_id, entry_id);
        self.entry_field(entry_id, field_id)?.ok_or_else(|| {
            VaultError::ReferentialIntegrity(format!(
                "entry field for entry #{entry_id} / field #{field_id} vanished after write"
            ))
        })
    }

    pub fn entry_field(&self, entry_id: Id, field_id: Id) -> Result<Option<EntryField>> {
        Ok(self
            .conn
            .query_row(
                &format!("{ENTRY_FIELD_SELECT} WHERE ef.entry_id = ?1 AND ef.field_id = ?2"),
                [entry_id, field_id],
                entry_field_from_row,
            )
            .optional()?)
    }

    /// Field values of an entry, ordered by field name.
    pub fn entry_fields(&self, entry_id: Id) -> Result<Vec<EntryField>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_FIELD_SELECT} WHERE ef.entry_id = ?1 ORDER BY f.name"
        ))?;
        let rows = stmt.query_map([entry_id], entry_field_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_entry_field(&self, entry_id: Id, field_id: Id) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM entry_fields WHERE entry_id = ?1 AND field_id = ?2",
            [entry_id, field_id],
        )?;
        if changed == 0 {
            return Err(VaultError::not_found(
                "Entry field",
                format!("entry #{entry_id} / field #{field_id}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();
        assert!(db.list_fields().unwrap().is_empty());
    }

    #[test]
    fn test_unique_names_map_to_already_exists() {
        let db = Database::open_in_memory().unwrap();
        db.create_field("password", true).unwrap();
        let err = db.create_field("password", false).unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists { kind: "Field", .. }));
    }

    #[test]
    fn test_missing_reference_is_referential_integrity_error() {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let err = db.insert_entry("Email", 42, template.id, None).unwrap_err();
        assert!(matches!(err, VaultError::ReferentialIntegrity(_)));
    }

    #[test]
    fn test_template_field_pair_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let field = db.create_field("password", true).unwrap();
        db.bind_field(template.id, field.id, true).unwrap();
        let err = db.bind_field(template.id, field.id, false).unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists { .. }));
    }

    #[test]
    fn test_argument_key_checked_on_write() {
        let db = Database::open_in_memory().unwrap();
        let validator = db.create_validator("MinLength", "min_length").unwrap();
        assert!(matches!(
            db.add_validator_argument(validator.id, "limit value", "8"),
            Err(VaultError::InvalidArgumentKey(_))
        ));
        assert!(db.validator_arguments(validator.id).unwrap().is_empty());
    }

    #[test]
    fn test_validator_attachment_order() {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let field = db.create_field("password", true).unwrap();
        let binding = db.bind_field(template.id, field.id, true).unwrap();
        let second = db.create_validator("B", "min_length").unwrap();
        let first = db.create_validator("A", "max_length").unwrap();
        db.attach_validator(binding.id, second.id).unwrap();
        db.attach_validator(binding.id, first.id).unwrap();

        let names: Vec<String> = db
            .template_field_validators(binding.id)
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_implementation_reference_is_trimmed() {
        let db = Database::open_in_memory().unwrap();
        let validator = db.create_validator("Email", "  email \n").unwrap();
        assert_eq!(validator.implementation, "email");
        assert_eq!(db.get_validator(validator.id).unwrap().implementation, "email");
    }

    #[test]
    fn test_upsert_entry_field_replaces_value() {
        let db = Database::open_in_memory().unwrap();
        let template = db.create_template("Website Login").unwrap();
        let group = db.insert_group("personal", None).unwrap();
        let entry = db.insert_entry("Email", group.id, template.id, None).unwrap();
        let field = db.create_field("username", false).unwrap();

        let first = db.upsert_entry_field(entry.id, field.id, "alice").unwrap();
        let second = db.upsert_entry_field(entry.id, field.id, "bob").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.value, "bob");
        assert_eq!(db.entry_fields(entry.id).unwrap().len(), 1);
    }

    #[test]
    fn test_find_group_reports_ambiguity() {
        let db = Database::open_in_memory().unwrap();
        let personal = db.insert_group("personal", None).unwrap();
        let work = db.insert_group("work", None).unwrap();
        db.insert_group("email", Some(personal.id)).unwrap();
        db.insert_group("email", Some(work.id)).unwrap();

        assert!(matches!(
            db.find_group("email"),
            Err(VaultError::Ambiguous { count: 2, .. })
        ));
        assert!(matches!(
            db.find_group("missing"),
            Err(VaultError::NotFound { .. })
        ));
    }
}
