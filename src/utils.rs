//! Utility functions shared by the store and the CLI.

use crate::error::{KeyErrorKind, KeyValidationError, Result};
use colored::*;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Configuration file names searched for, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["credvault.toml", ".credvault.toml"];

/// Longest accepted argument key, the width of the stored key column.
const MAX_KEY_LENGTH: usize = 255;

/// Words that cannot be used as argument keys or keyword values.
///
/// Catalogs written for the original store pass these keys straight through
/// as Python keyword arguments, so the hard keywords of Python 3 are reserved.
const RESERVED_WORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Placeholder shown instead of a secret value.
const SECRET_MASK: &str = "********";

lazy_static! {
    static ref SLUG_STRIP: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref SLUG_COLLAPSE: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// Check if character may start an identifier
fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

/// Check if character may continue an identifier
fn is_identifier_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Whether `word` is reserved and cannot name an argument.
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Whether `value` is a plain identifier that is not reserved. No length limit.
pub fn is_keyword_identifier(value: &str) -> bool {
    identifier_error(value).is_none() && !is_reserved_word(value)
}

/// First reason `value` is not an identifier token.
fn identifier_error(value: &str) -> Option<KeyErrorKind> {
    if value.is_empty() {
        return Some(KeyErrorKind::Empty);
    }
    value.chars().enumerate().find_map(|(index, ch)| {
        if index == 0 && !is_identifier_start(ch) {
            Some(KeyErrorKind::InvalidStart { character: ch })
        } else if !is_identifier_char(ch) {
            Some(KeyErrorKind::InvalidCharacter {
                character: ch,
                position: index + 1,
            })
        } else {
            None
        }
    })
}

/// Validate a validator argument key: an identifier token that is not a reserved word.
pub fn validate_argument_key(key: &str) -> Result<()> {
    if let Some(kind) = identifier_error(key) {
        return Err(KeyValidationError::new(key, kind).into());
    }

    let length = key.chars().count();
    if length > MAX_KEY_LENGTH {
        return Err(KeyValidationError::new(
            key,
            KeyErrorKind::TooLong {
                length,
                maximum: MAX_KEY_LENGTH,
            },
        )
        .into());
    }

    if is_reserved_word(key) {
        return Err(KeyValidationError::new(key, KeyErrorKind::ReservedWord).into());
    }

    Ok(())
}

/// Convert a name into a URL-safe slug.
///
/// Lowercases, drops anything that is not an ASCII word character, space or
/// hyphen, collapses runs of spaces/hyphens into one hyphen and trims leading
/// and trailing hyphens and underscores.
pub fn slugify(name: &str) -> String {
    let ascii: String = name.chars().filter(|c| c.is_ascii()).collect();
    let lowered = ascii.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    let collapsed = SLUG_COLLAPSE.replace_all(stripped.trim(), "-");
    collapsed.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Mask a secret value. The mask has a fixed width so it does not leak length.
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        SECRET_MASK.to_string()
    }
}

/// One node of a tree to render.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    /// For each level from the top down to this node, whether the node on
    /// that level is the last among its siblings. Empty for roots.
    pub branch: Vec<bool>,
    pub label: String,
}

/// Format a tree structure for display.
pub fn format_tree(items: &[TreeItem]) -> Vec<String> {
    if items.is_empty() {
        return vec!["(empty)".to_string()];
    }

    items
        .iter()
        .map(|item| {
            let mut prefix = String::new();
            if let Some((last, ancestors)) = item.branch.split_last() {
                for ancestor_is_last in ancestors {
                    prefix.push_str(if *ancestor_is_last { "    " } else { "│   " });
                }
                prefix.push_str(if *last { "└── " } else { "├── " });
            }
            format!("{prefix}{}", item.label)
        })
        .collect()
}

/// Find a configuration file in the current directory or its parents.
pub fn find_config_file() -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;
    find_config_file_from(&current_dir)
}

/// Find a configuration file starting at `start` and walking up.
pub fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_FILE_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }
    None
}

/// Print an error message and exit.
pub fn error_exit(message: &str, code: i32) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), message);
    std::process::exit(code);
}

/// Print a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print a warning message.
pub fn warning(message: &str) {
    println!("{} {}", "Warning:".yellow(), message);
}
