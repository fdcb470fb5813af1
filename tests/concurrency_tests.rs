// Concurrent writers on one database file, and schema edits racing entry writes.

use credvault::models::Id;
use credvault::{Database, EntryRepository, ValidatorRegistry};
use std::path::Path;
use std::thread;
use tempfile::TempDir;

struct Seeded {
    entry_id: Id,
    validator_id: Id,
}

/// A "Website Login" entry whose password must be at least 8 characters.
fn seed(path: &Path) -> Seeded {
    let db = Database::open(path).unwrap();
    let template = db.create_template("Website Login").unwrap();
    let password = db.create_field("password", true).unwrap();
    let binding = db.bind_field(template.id, password.id, true).unwrap();
    let validator = db.create_validator("MinLength", "min_length").unwrap();
    db.add_validator_argument(validator.id, "limit_value", "8").unwrap();
    db.attach_validator(binding.id, validator.id).unwrap();
    let group = db.insert_group("personal", None).unwrap();
    let entry = db
        .insert_entry("Email", group.id, template.id, None)
        .unwrap();
    Seeded {
        entry_id: entry.id,
        validator_id: validator.id,
    }
}

#[test]
fn test_concurrent_writers_on_same_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    let seeded = seed(&path);

    let handles: Vec<_> = (0..4)
        .map(|writer| {
            let path = path.clone();
            let entry_id = seeded.entry_id;
            thread::spawn(move || {
                let db = Database::open(&path).unwrap();
                let registry = ValidatorRegistry::new();
                let repo = EntryRepository::new(&db, &registry);
                for round in 0..10 {
                    let value = format!("writer-{writer}-round-{round}");
                    repo.set_field_value(entry_id, "password", &value).unwrap();
                    // Rejected writes interleave without leaving anything behind
                    assert!(repo.set_field_value(entry_id, "password", "short").is_err());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let db = Database::open(&path).unwrap();
    let values = db.entry_fields(seeded.entry_id).unwrap();
    assert_eq!(values.len(), 1);
    assert!(values[0].value.starts_with("writer-"));
    assert!(values[0].value.ends_with("round-9"));
}

#[test]
fn test_schema_change_applies_to_later_writes_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    let seeded = seed(&path);

    let db = Database::open(&path).unwrap();
    let registry = ValidatorRegistry::new();
    let repo = EntryRepository::new(&db, &registry);
    repo.set_field_value(seeded.entry_id, "password", "abcdefgh")
        .unwrap();

    // An administrator tightens the rule through a separate connection
    let admin = Database::open(&path).unwrap();
    let argument = admin
        .validator_arguments(seeded.validator_id)
        .unwrap()
        .remove(0);
    admin
        .set_validator_argument_value(argument.id, "12")
        .unwrap();

    // The stored value was valid when written and stays as it is
    let stored = db
        .entry_fields(seeded.entry_id)
        .unwrap()
        .remove(0);
    assert_eq!(stored.value, "abcdefgh");

    // The next write of the same value is checked against the new rule
    let err = repo
        .set_field_value(seeded.entry_id, "password", "abcdefgh")
        .unwrap_err();
    let failures = err.validation_failures().unwrap();
    assert!(failures
        .iter()
        .all(|f| f.message.contains("at least 12 characters")));
    assert!(repo
        .set_field_value(seeded.entry_id, "password", "abcdefghijkl")
        .is_ok());
}
