//! SQLite schema for the credential store.
//!
//! Deletion rules live in the foreign keys: entries, entry fields, template
//! bindings and validator arguments cascade with their owners, while a
//! group's children are detached (`SET NULL`) rather than deleted.

/// Pragmas applied to every connection before use.
pub const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// Schema creation SQL.
pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    is_secret INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS validators (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    implementation TEXT NOT NULL
);

-- Keys are not unique here: duplicates are reported when the validator is resolved
CREATE TABLE IF NOT EXISTS validator_arguments (
    id INTEGER PRIMARY KEY,
    validator_id INTEGER NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (validator_id) REFERENCES validators(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_validator_arguments_validator ON validator_arguments(validator_id);

CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS template_fields (
    id INTEGER PRIMARY KEY,
    template_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL,
    is_required INTEGER NOT NULL DEFAULT 0,
    UNIQUE (template_id, field_id),
    FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE,
    FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS template_field_validators (
    template_field_id INTEGER NOT NULL,
    validator_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (template_field_id, validator_id),
    FOREIGN KEY (template_field_id) REFERENCES template_fields(id) ON DELETE CASCADE,
    FOREIGN KEY (validator_id) REFERENCES validators(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS vault_groups (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (parent_id) REFERENCES vault_groups(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_vault_groups_parent ON vault_groups(parent_id);

CREATE TABLE IF NOT EXISTS group_tags (
    group_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (group_id, tag_id),
    FOREIGN KEY (group_id) REFERENCES vault_groups(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    group_id INTEGER NOT NULL,
    template_id INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (group_id) REFERENCES vault_groups(id) ON DELETE CASCADE,
    FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entries_group ON entries(group_id);
CREATE INDEX IF NOT EXISTS idx_entries_template ON entries(template_id);

CREATE TABLE IF NOT EXISTS entry_fields (
    id INTEGER PRIMARY KEY,
    entry_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (entry_id, field_id),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
    FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE
);
"#;
