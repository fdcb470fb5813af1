//! Validator registry.
//!
//! A validator row names an implementation by string reference and carries
//! keyword arguments. The registry maps those references onto a closed set of
//! built-in checks and binds the decoded arguments, so a catalog entry like
//! `min_length(limit_value=8)` becomes an [`ExecutableValidator`].

use crate::codec::ArgValue;
use crate::db::Database;
use crate::error::SchemaConfigError;
use crate::models::{Id, ValidatorDefinition};
use crate::utils;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// Keyword arguments after decoding.
pub type Kwargs = BTreeMap<String, ArgValue>;

/// Outcome of running one validator: `Err` carries the failure message.
pub type CheckResult = std::result::Result<(), String>;

type Constructor = fn(&mut Arguments) -> Result<Check, SchemaConfigError>;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$"
    )
    .unwrap();
    static ref URL_RE: Regex = Regex::new(
        r"(?i)^[a-z][a-z0-9.+-]*://(?:[^\s:@/]+(?::[^\s:@/]*)?@)?(?:localhost|\d{1,3}(?:\.\d{1,3}){3}|\[[0-9a-f:.]+\]|(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}\.?)(?::\d{1,5})?(?:[/?#]\S*)?$"
    )
    .unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref URL_WITHOUT_DOMAIN_RE: Regex = Regex::new(
        r"^https?://(?:[-\w.]|(?:%[\da-fA-F]{2}))+/(?:[-\w.]|(?:%[\da-fA-F]{2}))+/?$"
    )
    .unwrap();
}

const DEFAULT_URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// A built-in validator implementation.
pub struct Builtin {
    /// Canonical reference stored on validator rows
    pub reference: &'static str,
    /// Other references accepted for the same implementation
    pub aliases: &'static [&'static str],
    /// Accepted arguments, for schema editors
    pub arguments: &'static str,
    /// Keyword names the constructor binds, besides `message`
    pub keys: &'static [&'static str],
    pub description: &'static str,
    construct: Constructor,
}

const BUILTINS: &[Builtin] = &[
    Builtin {
        reference: "min_length",
        aliases: &["django.core.validators.MinLengthValidator"],
        arguments: "limit_value: int, message?: str",
        description: "value has at least limit_value characters",
        keys: &["limit_value"],
        construct: build_min_length,
    },
    Builtin {
        reference: "max_length",
        aliases: &["django.core.validators.MaxLengthValidator"],
        arguments: "limit_value: int, message?: str",
        description: "value has at most limit_value characters",
        keys: &["limit_value"],
        construct: build_max_length,
    },
    Builtin {
        reference: "min_value",
        aliases: &["django.core.validators.MinValueValidator"],
        arguments: "limit_value: number, message?: str",
        description: "value is a number >= limit_value",
        keys: &["limit_value"],
        construct: build_min_value,
    },
    Builtin {
        reference: "max_value",
        aliases: &["django.core.validators.MaxValueValidator"],
        arguments: "limit_value: number, message?: str",
        description: "value is a number <= limit_value",
        keys: &["limit_value"],
        construct: build_max_value,
    },
    Builtin {
        reference: "regex",
        aliases: &["django.core.validators.RegexValidator"],
        arguments: "regex: str, inverse_match?: bool, message?: str",
        description: "value matches (or with inverse_match, does not match) regex",
        keys: &["regex", "inverse_match"],
        construct: build_regex,
    },
    Builtin {
        reference: "email",
        aliases: &["django.core.validators.EmailValidator"],
        arguments: "message?: str",
        description: "value is an e-mail address",
        keys: &[],
        construct: build_email,
    },
    Builtin {
        reference: "url",
        aliases: &["django.core.validators.URLValidator"],
        arguments: "schemes?: list, message?: str",
        description: "value is an absolute URL with an allowed scheme",
        keys: &["schemes"],
        construct: build_url,
    },
    Builtin {
        reference: "url_without_domain",
        aliases: &["utils.validators.URLValidatorWithoutDomain"],
        arguments: "message?: str",
        description: "value is an http(s) URL with exactly one path segment",
        keys: &[],
        construct: build_url_without_domain,
    },
    Builtin {
        reference: "keyword",
        aliases: &["utils.validators.KeywordValidator"],
        arguments: "message?: str",
        description: "value is an identifier and not a reserved word",
        keys: &[],
        construct: build_keyword,
    },
    Builtin {
        reference: "choice",
        aliases: &[],
        arguments: "choices: list, message?: str",
        description: "value is one of choices",
        keys: &["choices"],
        construct: build_choice,
    },
    Builtin {
        reference: "integer",
        aliases: &["django.core.validators.integer_validator"],
        arguments: "message?: str",
        description: "value is a whole number",
        keys: &[],
        construct: build_integer,
    },
    Builtin {
        reference: "prohibit_null_characters",
        aliases: &["django.core.validators.ProhibitNullCharactersValidator"],
        arguments: "message?: str",
        description: "value contains no NUL characters",
        keys: &[],
        construct: build_prohibit_null,
    },
];

/// The runnable form of a built-in validator.
#[derive(Debug, Clone)]
pub enum Check {
    MinLength { limit: usize },
    MaxLength { limit: usize },
    MinValue { limit: f64 },
    MaxValue { limit: f64 },
    Regex { regex: Regex, inverse_match: bool },
    Email,
    Url { schemes: Vec<String> },
    UrlWithoutDomain,
    Keyword,
    Choice { choices: Vec<String> },
    Integer,
    ProhibitNullCharacters,
}

impl Check {
    /// Run the check, returning the default failure message on rejection.
    pub fn run(&self, value: &str) -> CheckResult {
        match self {
            Check::MinLength { limit } => {
                let length = value.chars().count();
                if length < *limit {
                    return Err(format!(
                        "Ensure this value has at least {limit} characters (it has {length})."
                    ));
                }
            }
            Check::MaxLength { limit } => {
                let length = value.chars().count();
                if length > *limit {
                    return Err(format!(
                        "Ensure this value has at most {limit} characters (it has {length})."
                    ));
                }
            }
            Check::MinValue { limit } => match value.trim().parse::<f64>() {
                Ok(number) if number >= *limit => {}
                Ok(_) => {
                    return Err(format!(
                        "Ensure this value is greater than or equal to {limit}."
                    ))
                }
                Err(_) => return Err("Enter a number.".to_string()),
            },
            Check::MaxValue { limit } => match value.trim().parse::<f64>() {
                Ok(number) if number <= *limit => {}
                Ok(_) => {
                    return Err(format!("Ensure this value is less than or equal to {limit}."))
                }
                Err(_) => return Err("Enter a number.".to_string()),
            },
            Check::Regex {
                regex,
                inverse_match,
            } => {
                if regex.is_match(value) == *inverse_match {
                    return Err("Enter a valid value.".to_string());
                }
            }
            Check::Email => {
                if !EMAIL_RE.is_match(value) {
                    return Err("Enter a valid email address.".to_string());
                }
            }
            Check::Url { schemes } => {
                let scheme = value
                    .split_once("://")
                    .map(|(scheme, _)| scheme.to_lowercase())
                    .unwrap_or_default();
                if !schemes.contains(&scheme) || !URL_RE.is_match(value) {
                    return Err("Enter a valid URL.".to_string());
                }
            }
            Check::UrlWithoutDomain => {
                if !URL_WITHOUT_DOMAIN_RE.is_match(value) {
                    return Err("Invalid URL".to_string());
                }
            }
            Check::Keyword => {
                if !utils::is_keyword_identifier(value) {
                    return Err("Invalid Keyword".to_string());
                }
            }
            Check::Choice { choices } => {
                if !choices.iter().any(|choice| choice == value) {
                    return Err(format!("Value {value:?} is not a valid choice."));
                }
            }
            Check::Integer => {
                if !INTEGER_RE.is_match(value) {
                    return Err("Enter a valid integer.".to_string());
                }
            }
            Check::ProhibitNullCharacters => {
                if value.contains('\0') {
                    return Err("Null characters are not allowed.".to_string());
                }
            }
        }
        Ok(())
    }
}

/// A resolved validator ready to run against candidate values.
#[derive(Debug, Clone)]
pub struct ExecutableValidator {
    pub validator_id: Id,
    pub name: String,
    pub implementation: String,
    check: Check,
    message: Option<String>,
}

impl ExecutableValidator {
    /// Run against a value; a configured `message` replaces the default one.
    pub fn validate(&self, value: &str) -> CheckResult {
        self.check
            .run(value)
            .map_err(|default| self.message.clone().unwrap_or(default))
    }

    pub fn check(&self) -> &Check {
        &self.check
    }
}

/// Keyword arguments being bound to a constructor; tracks what was consumed.
pub struct Arguments {
    validator: String,
    reference: &'static str,
    kwargs: Kwargs,
}

impl Arguments {
    fn new(validator: &str, reference: &'static str, kwargs: Kwargs) -> Self {
        Self {
            validator: validator.to_string(),
            reference,
            kwargs,
        }
    }

    fn type_error(&self, key: &str, expected: &'static str, found: &ArgValue) -> SchemaConfigError {
        SchemaConfigError::ArgumentType {
            validator: self.validator.clone(),
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    fn invalid(&self, key: &str, reason: impl Into<String>) -> SchemaConfigError {
        SchemaConfigError::InvalidArgument {
            validator: self.validator.clone(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Remove an argument; an explicit null counts as absent.
    fn take(&mut self, key: &str) -> Option<ArgValue> {
        self.kwargs.remove(key).filter(|value| !value.is_null())
    }

    fn required(&mut self, key: &str) -> Result<ArgValue, SchemaConfigError> {
        self.take(key).ok_or_else(|| SchemaConfigError::MissingArgument {
            validator: self.validator.clone(),
            key: key.to_string(),
        })
    }

    fn required_length(&mut self, key: &str) -> Result<usize, SchemaConfigError> {
        let value = self.required(key)?;
        let number = value
            .as_i64()
            .ok_or_else(|| self.type_error(key, "an integer", &value))?;
        usize::try_from(number).map_err(|_| self.invalid(key, "must not be negative"))
    }

    fn required_number(&mut self, key: &str) -> Result<f64, SchemaConfigError> {
        let value = self.required(key)?;
        value
            .as_f64()
            .ok_or_else(|| self.type_error(key, "a number", &value))
    }

    fn required_str(&mut self, key: &str) -> Result<String, SchemaConfigError> {
        let value = self.required(key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.type_error(key, "a string", &value))
    }

    fn optional_str(&mut self, key: &str) -> Result<Option<String>, SchemaConfigError> {
        match self.take(key) {
            None => Ok(None),
            Some(ArgValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.type_error(key, "a string", &other)),
        }
    }

    fn optional_bool(&mut self, key: &str) -> Result<Option<bool>, SchemaConfigError> {
        self.take(key)
            .map(|value| {
                value
                    .as_bool()
                    .ok_or_else(|| self.type_error(key, "a boolean", &value))
            })
            .transpose()
    }

    /// A list of scalars, each rendered as plain text.
    fn scalar_list(&self, key: &str, value: ArgValue) -> Result<Vec<String>, SchemaConfigError> {
        let items = value
            .as_list()
            .ok_or_else(|| self.type_error(key, "a list", &value))?;
        items
            .iter()
            .map(|item| match item {
                ArgValue::List(_) | ArgValue::Map(_) => {
                    Err(self.type_error(key, "a list of scalars", item))
                }
                scalar => Ok(scalar.to_plain_string()),
            })
            .collect()
    }

    /// Fail on the first argument outside `accepted`, before any binding.
    fn reject_unknown(&self, accepted: &[&str]) -> Result<(), SchemaConfigError> {
        match self
            .kwargs
            .keys()
            .find(|key| *key != "message" && !accepted.contains(&key.as_str()))
        {
            Some(key) => Err(SchemaConfigError::UnexpectedArgument {
                validator: self.validator.clone(),
                reference: self.reference.to_string(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fail on any argument the constructor did not consume.
    fn finish(self) -> Result<(), SchemaConfigError> {
        match self.kwargs.into_keys().next() {
            Some(key) => Err(SchemaConfigError::UnexpectedArgument {
                validator: self.validator,
                reference: self.reference.to_string(),
                key,
            }),
            None => Ok(()),
        }
    }
}

fn build_min_length(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::MinLength {
        limit: args.required_length("limit_value")?,
    })
}

fn build_max_length(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::MaxLength {
        limit: args.required_length("limit_value")?,
    })
}

fn build_min_value(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::MinValue {
        limit: args.required_number("limit_value")?,
    })
}

fn build_max_value(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::MaxValue {
        limit: args.required_number("limit_value")?,
    })
}

fn build_regex(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    let pattern = args.required_str("regex")?;
    let regex = Regex::new(&pattern).map_err(|e| args.invalid("regex", e.to_string()))?;
    let inverse_match = args.optional_bool("inverse_match")?.unwrap_or(false);
    Ok(Check::Regex {
        regex,
        inverse_match,
    })
}

fn build_email(_args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::Email)
}

fn build_url(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    let schemes = match args.take("schemes") {
        Some(value) => {
            let schemes = args.scalar_list("schemes", value)?;
            if schemes.is_empty() {
                return Err(args.invalid("schemes", "must list at least one scheme"));
            }
            schemes.into_iter().map(|s| s.to_lowercase()).collect()
        }
        None => DEFAULT_URL_SCHEMES.iter().map(|s| s.to_string()).collect(),
    };
    Ok(Check::Url { schemes })
}

fn build_url_without_domain(_args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::UrlWithoutDomain)
}

fn build_keyword(_args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::Keyword)
}

fn build_choice(args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    let value = args.required("choices")?;
    let choices = args.scalar_list("choices", value)?;
    Ok(Check::Choice { choices })
}

fn build_integer(_args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::Integer)
}

fn build_prohibit_null(_args: &mut Arguments) -> Result<Check, SchemaConfigError> {
    Ok(Check::ProhibitNullCharacters)
}

/// Lookup table from implementation reference to built-in validator.
pub struct ValidatorRegistry {
    table: HashMap<&'static str, &'static Builtin>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorRegistry {
    /// Create a registry holding every built-in implementation and alias.
    pub fn new() -> Self {
        let mut table = HashMap::new();
        for builtin in BUILTINS {
            table.insert(builtin.reference, builtin);
            for alias in builtin.aliases {
                table.insert(*alias, builtin);
            }
        }
        Self { table }
    }

    /// Built-in implementations in catalog order, for pickers.
    pub fn implementations(&self) -> &'static [Builtin] {
        BUILTINS
    }

    pub fn is_known(&self, reference: &str) -> bool {
        self.table.contains_key(reference.trim())
    }

    /// Bind a validator definition to its implementation.
    pub fn resolve(
        &self,
        definition: &ValidatorDefinition,
    ) -> Result<ExecutableValidator, SchemaConfigError> {
        let validator = &definition.validator;
        let builtin = self
            .table
            .get(validator.implementation.trim())
            .ok_or_else(|| SchemaConfigError::UnknownImplementation {
                validator: validator.name.clone(),
                reference: validator.implementation.clone(),
            })?;

        let mut kwargs = Kwargs::new();
        for argument in &definition.arguments {
            if kwargs.contains_key(&argument.key) {
                return Err(SchemaConfigError::DuplicateArgument {
                    validator: validator.name.clone(),
                    key: argument.key.clone(),
                });
            }
            kwargs.extend(argument.pair_value()?);
        }

        let mut args = Arguments::new(&validator.name, builtin.reference, kwargs);
        args.reject_unknown(builtin.keys)?;
        let message = args.optional_str("message")?.filter(|m| !m.is_empty());
        let check = (builtin.construct)(&mut args)?;
        args.finish()?;

        Ok(ExecutableValidator {
            validator_id: validator.id,
            name: validator.name.clone(),
            implementation: builtin.reference.to_string(),
            check,
            message,
        })
    }

    /// Load a validator with its arguments and resolve it.
    pub fn resolve_by_id(
        &self,
        db: &Database,
        validator_id: Id,
    ) -> crate::error::Result<ExecutableValidator> {
        let definition = db.validator_definition(validator_id)?;
        Ok(self.resolve(&definition)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Validator, ValidatorArgument};

    fn definition(implementation: &str, args: &[(&str, &str)]) -> ValidatorDefinition {
        ValidatorDefinition {
            validator: Validator {
                id: 1,
                name: "Under test".to_string(),
                implementation: implementation.to_string(),
            },
            arguments: args
                .iter()
                .enumerate()
                .map(|(i, (key, value))| ValidatorArgument {
                    id: i as Id + 1,
                    validator_id: 1,
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    fn resolve(implementation: &str, args: &[(&str, &str)]) -> ExecutableValidator {
        ValidatorRegistry::new()
            .resolve(&definition(implementation, args))
            .unwrap()
    }

    fn resolve_err(implementation: &str, args: &[(&str, &str)]) -> SchemaConfigError {
        ValidatorRegistry::new()
            .resolve(&definition(implementation, args))
            .unwrap_err()
    }

    #[test]
    fn test_min_length() {
        let v = resolve("min_length", &[("limit_value", "8")]);
        assert!(v.validate("abcdefgh").is_ok());
        let msg = v.validate("abc").unwrap_err();
        assert!(msg.contains("at least 8"));
    }

    #[test]
    fn test_aliases_resolve_to_same_implementation() {
        let v = resolve(
            "django.core.validators.MaxLengthValidator",
            &[("limit_value", "3")],
        );
        assert_eq!(v.implementation, "max_length");
        assert!(v.validate("abcd").is_err());
        assert!(v.validate("ab").is_ok());
    }

    #[test]
    fn test_custom_message_replaces_default() {
        let v = resolve(
            "min_length",
            &[("limit_value", "8"), ("message", "Too short")],
        );
        assert_eq!(v.validate("abc").unwrap_err(), "Too short");

        let v = resolve("min_length", &[("limit_value", "8"), ("message", "")]);
        assert!(v.validate("abc").unwrap_err().contains("at least 8"));
    }

    #[test]
    fn test_numeric_bounds() {
        let min = resolve("min_value", &[("limit_value", "1")]);
        let max = resolve("max_value", &[("limit_value", "65535")]);
        assert!(min.validate("22").is_ok());
        assert!(min.validate("0").is_err());
        assert_eq!(min.validate("twenty").unwrap_err(), "Enter a number.");
        assert!(max.validate("65536").is_err());
        assert!(max.validate("443").is_ok());
    }

    #[test]
    fn test_regex_and_inverse_match() {
        let v = resolve("regex", &[("regex", "'^[0-9]{4}$'")]);
        assert!(v.validate("1234").is_ok());
        assert!(v.validate("12a4").is_err());

        let v = resolve(
            "regex",
            &[("regex", "'\\s'"), ("inverse_match", "true")],
        );
        assert!(v.validate("nospace").is_ok());
        assert!(v.validate("has space").is_err());
    }

    #[test]
    fn test_email_and_urls() {
        let email = resolve("email", &[]);
        assert!(email.validate("alice@example.com").is_ok());
        assert!(email.validate("not-an-email").is_err());

        let url = resolve("url", &[]);
        assert!(url.validate("https://example.com/login").is_ok());
        assert!(url.validate("http://localhost:8080").is_ok());
        assert!(url.validate("gopher://example.com").is_err());
        assert!(url.validate("example.com").is_err());

        let ssh = resolve("url", &[("schemes", "[ssh]")]);
        assert!(ssh.validate("ssh://git@example.com").is_ok());
        assert!(ssh.validate("https://example.com").is_err());

        let short = resolve("utils.validators.URLValidatorWithoutDomain", &[]);
        assert!(short.validate("https://example.com/login").is_ok());
        assert!(short.validate("https://example.com/login/").is_ok());
        assert!(short.validate("https://example.com").is_err());
        assert!(short.validate("https://example.com/a/b").is_err());
    }

    #[test]
    fn test_keyword_choice_integer_null() {
        let keyword = resolve("keyword", &[]);
        assert!(keyword.validate("limit_value").is_ok());
        assert_eq!(keyword.validate("class").unwrap_err(), "Invalid Keyword");
        assert!(keyword.validate("fn").is_ok());

        let choice = resolve("choice", &[("choices", "[ssh, rdp, 22]")]);
        assert!(choice.validate("rdp").is_ok());
        assert!(choice.validate("22").is_ok());
        assert!(choice.validate("vnc").is_err());

        let integer = resolve("integer", &[]);
        assert!(integer.validate("-12").is_ok());
        assert!(integer.validate("1.5").is_err());
        assert!(integer.validate("+5").is_err());
        assert!(integer.validate(" 5").is_err());
        assert!(integer.validate("123456789012345678901234567890").is_ok());

        let null = resolve("prohibit_null_characters", &[]);
        assert!(null.validate("fine").is_ok());
        assert!(null.validate("bad\0value").is_err());
    }

    #[test]
    fn test_unknown_implementation() {
        let err = resolve_err("validators.DoesNotExist", &[]);
        assert!(matches!(err, SchemaConfigError::UnknownImplementation { .. }));
    }

    #[test]
    fn test_duplicate_argument_keys() {
        let err = resolve_err("min_length", &[("limit_value", "8"), ("limit_value", "9")]);
        assert_eq!(
            err,
            SchemaConfigError::DuplicateArgument {
                validator: "Under test".to_string(),
                key: "limit_value".to_string(),
            }
        );
    }

    #[test]
    fn test_argument_binding_errors() {
        assert!(matches!(
            resolve_err("min_length", &[]),
            SchemaConfigError::MissingArgument { .. }
        ));
        assert!(matches!(
            resolve_err("min_length", &[("limit_value", "eight")]),
            SchemaConfigError::ArgumentType { .. }
        ));
        assert!(matches!(
            resolve_err("min_length", &[("limit_value", "-1")]),
            SchemaConfigError::InvalidArgument { .. }
        ));
        assert!(matches!(
            resolve_err("email", &[("whitelist", "[example.com]")]),
            SchemaConfigError::UnexpectedArgument { .. }
        ));
        assert!(matches!(
            resolve_err("regex", &[("regex", "'('")]),
            SchemaConfigError::InvalidArgument { .. }
        ));
        assert!(matches!(
            resolve_err("min_length", &[("limit_value", "[8")]),
            SchemaConfigError::MalformedLiteral { .. }
        ));
    }

    #[test]
    fn test_unexpected_argument_named_before_missing_one() {
        let err = resolve_err("min_length", &[("len", "8")]);
        assert_eq!(
            err,
            SchemaConfigError::UnexpectedArgument {
                validator: "Under test".to_string(),
                reference: "min_length".to_string(),
                key: "len".to_string(),
            }
        );
        assert!(matches!(
            resolve_err("regex", &[("regex", "'x'"), ("flags", "2")]),
            SchemaConfigError::UnexpectedArgument { key, .. } if key == "flags"
        ));
    }

    #[test]
    fn test_every_builtin_is_registered() {
        let registry = ValidatorRegistry::new();
        for builtin in registry.implementations() {
            assert!(registry.is_known(builtin.reference));
            for alias in builtin.aliases {
                assert!(registry.is_known(alias));
            }
        }
        assert!(!registry.is_known("nope"));
    }
}
