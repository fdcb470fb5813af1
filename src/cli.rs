//! Command-line interface implementation.

use crate::config::{Config, FieldPolicy};
use crate::db::Database;
use crate::error::{Result, VaultError};
use crate::groups::GroupHierarchy;
use crate::models::{Entry, EntryDraft, Field, Group, Template, TemplateField};
use crate::repository::{DeletionImpact, DeletionTarget, EntryRepository};
use crate::schema::TemplateSchema;
use crate::utils::{self, success, warning};
use crate::validators::ValidatorRegistry;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use serde::Serialize;
use std::path::PathBuf;

/// Structured credential store with schema-driven validation.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short = 'c',
        long,
        global = true,
        help = "Path to configuration file (default: searches for credvault.toml)"
    )]
    pub config: Option<PathBuf>,

    /// Path to database file, overriding the configuration
    #[arg(short = 'd', long, global = true, env = "CREDVAULT_DB")]
    pub database: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long,
        global = true,
        value_enum,
        default_value = "text",
        help = "Output format"
    )]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a configuration file and create the database
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,

        /// Whether entries may carry fields their template does not declare
        #[arg(long, value_enum, default_value = "open")]
        field_policy: FieldPolicy,
    },

    /// Manage fields
    #[command(subcommand)]
    Field(FieldCommand),

    /// Manage validators
    #[command(subcommand)]
    Validator(ValidatorCommand),

    /// Manage templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Manage tags
    #[command(subcommand)]
    Tag(TagCommand),

    /// Manage groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// Manage entries
    #[command(subcommand)]
    Entry(EntryCommand),
}

#[derive(Subcommand, Debug)]
pub enum FieldCommand {
    /// Add a field
    Add {
        name: String,

        /// Mask values of this field by default
        #[arg(short, long)]
        secret: bool,
    },
    /// List fields
    List,
    /// Mark a field secret, or clear the mark with --clear
    Secret {
        name: String,

        #[arg(long)]
        clear: bool,
    },
    /// Delete a field with its bindings and stored values
    Delete {
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ValidatorCommand {
    /// Add a validator
    Add {
        name: String,

        /// Implementation reference, e.g. min_length
        implementation: String,
    },
    /// Add an argument to a validator
    Arg {
        validator: String,
        key: String,

        /// Literal value, e.g. 8, true, '[a-z]+', [http, https]
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// List validators with their arguments
    List,
    /// Resolve validators and report configuration errors
    Check {
        /// Only this validator
        name: Option<String>,
    },
    /// List the available implementations
    Kinds,
    /// Delete a validator
    Delete {
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Add a template
    Add { name: String },
    /// Declare a field on a template and attach validators to it
    Bind {
        template: String,
        field: String,

        /// Entries of this template must carry the field
        #[arg(short, long)]
        required: bool,

        /// Validator to attach (repeatable)
        #[arg(short = 'v', long = "validator")]
        validators: Vec<String>,
    },
    /// Remove a validator from a template field
    Detach {
        template: String,
        field: String,
        validator: String,
    },
    /// Stop declaring a field on a template; stored values are kept
    Unbind { template: String, field: String },
    /// Show a template's fields and validators
    Show { name: String },
    /// List templates
    List,
    /// Delete a template with every entry using it
    Delete {
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Add a tag
    Add {
        name: String,

        /// Explicit slug (default: derived from the name)
        #[arg(short, long)]
        slug: Option<String>,
    },
    /// Rename a tag; its slug is kept
    Rename { slug: String, name: String },
    /// List tags
    List,
    /// Delete a tag; tagged groups lose it
    Delete {
        slug: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Add a group
    Add {
        name: String,

        /// Parent group
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Move a group under another, or to the top level without --parent
    Move {
        name: String,

        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Rename a group
    Rename { name: String, new_name: String },
    /// Attach (or remove) a tag
    Tag {
        name: String,
        slug: String,

        #[arg(short, long)]
        remove: bool,
    },
    /// Show groups as a tree
    Tree,
    /// Delete a group; child groups move to the top level
    Delete {
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    /// Create an entry, validating all values together
    Add {
        name: String,

        #[arg(short, long)]
        group: String,

        #[arg(short, long)]
        template: String,

        #[arg(short, long)]
        notes: Option<String>,

        /// Field value as field=value (repeatable)
        #[arg(short = 's', long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
    /// Set one field value
    Set {
        entry: String,
        field: String,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Show an entry
    Show {
        name: String,

        /// Show secret values
        #[arg(short, long)]
        reveal: bool,
    },
    /// List entries
    List {
        /// Only entries in this group
        #[arg(short, long)]
        group: Option<String>,

        /// Include entries of sub-groups
        #[arg(short, long, requires = "group")]
        recursive: bool,

        /// Only entries in groups carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Delete an entry with its values
    Delete {
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Ask before a destructive delete unless `yes` was given.
fn confirm_delete(what: &str, impact: &DeletionImpact, yes: bool) -> Result<()> {
    if !impact.is_empty() {
        warning(&format!("Deleting {what} also affects: {impact}"));
    }
    if yes {
        return Ok(());
    }
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {what}?"))
        .default(false)
        .interact()
        .map_err(|e| VaultError::Other(e.to_string()))?;
    if confirmed {
        Ok(())
    } else {
        Err(VaultError::Cancelled)
    }
}

/// Template, field and their binding, looked up by name.
fn find_binding(
    s: &Session,
    template: &str,
    field: &str,
) -> Result<(Template, Field, TemplateField)> {
    let template = s.db.find_template(template)?;
    let field = s.db.find_field(field)?;
    match s.db.template_field(template.id, field.id)? {
        Some(binding) => Ok((template, field, binding)),
        None => Err(VaultError::not_found(
            "Template field",
            format!("{}.{}", template.name, field.name),
        )),
    }
}

/// Open database plus the services built on it.
struct Session {
    db: Database,
    registry: ValidatorRegistry,
    policy: FieldPolicy,
    output: OutputFormat,
}

impl Session {
    fn repository(&self) -> EntryRepository<'_> {
        EntryRepository::new(&self.db, &self.registry).with_policy(self.policy)
    }

    fn groups(&self) -> GroupHierarchy<'_> {
        GroupHierarchy::new(&self.db)
    }

    fn json(&self) -> bool {
        self.output == OutputFormat::Json
    }
}

impl Cli {
    /// Resolve the configuration for this invocation.
    ///
    /// `init` may name a configuration file that does not exist yet.
    pub fn load_config(&self) -> Result<Config> {
        match (&self.command, &self.config) {
            (Commands::Init { .. }, Some(path)) if !path.exists() => Ok(Config::default()),
            (Commands::Init { .. }, None) => Ok(Config::default()),
            _ => Config::discover(self.config.as_deref()),
        }
    }

    fn database_path(&self, config: &Config) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| config.database.clone())
    }

    fn open(&self, config: &Config) -> Result<Session> {
        let db = Database::open(&self.database_path(config))?;
        Ok(Session {
            db,
            registry: ValidatorRegistry::new(),
            policy: config.field_policy,
            output: self.output,
        })
    }

    /// Execute the CLI command.
    pub fn execute(&self, config: &Config) -> Result<()> {
        if let Commands::Init {
            force,
            field_policy,
        } = &self.command
        {
            return self.init(config, *force, *field_policy);
        }

        let session = self.open(config)?;
        match &self.command {
            Commands::Init { .. } => Ok(()),
            Commands::Field(cmd) => field_command(&session, cmd),
            Commands::Validator(cmd) => validator_command(&session, cmd),
            Commands::Template(cmd) => template_command(&session, cmd),
            Commands::Tag(cmd) => tag_command(&session, cmd),
            Commands::Group(cmd) => group_command(&session, cmd),
            Commands::Entry(cmd) => entry_command(&session, cmd),
        }
    }

    /// Write a configuration file and create the database.
    fn init(&self, config: &Config, force: bool, field_policy: FieldPolicy) -> Result<()> {
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(utils::CONFIG_FILE_NAMES[0]));

        if config_path.exists() && !force {
            return Err(VaultError::AlreadyExists {
                kind: "Configuration file",
                name: format!("{} (use --force to overwrite)", config_path.display()),
            });
        }
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let written = Config {
            database: self.database_path(config),
            field_policy,
            log_level: config.log_level.clone(),
        };
        std::fs::write(&config_path, written.to_toml()?)?;

        let db_path = match config_path.parent() {
            Some(dir) if written.database.is_relative() => dir.join(&written.database),
            _ => written.database.clone(),
        };
        Database::open(&db_path)?;

        success(&format!(
            "Initialized {} (database: {})",
            config_path.display(),
            db_path.display()
        ));
        Ok(())
    }
}

fn field_command(s: &Session, cmd: &FieldCommand) -> Result<()> {
    match cmd {
        FieldCommand::Add { name, secret } => {
            let field = s.db.create_field(name, *secret)?;
            success(&format!("Added field: {}", field.name));
        }
        FieldCommand::List => {
            let fields = s.db.list_fields()?;
            if s.json() {
                return print_json(&fields);
            }
            if fields.is_empty() {
                println!("No fields defined");
            }
            for field in fields {
                if field.is_secret {
                    println!("{} {}", field.name, "[secret]".yellow());
                } else {
                    println!("{}", field.name);
                }
            }
        }
        FieldCommand::Secret { name, clear } => {
            let field = s.db.find_field(name)?;
            s.db.set_field_secret(field.id, !clear)?;
            if *clear {
                success(&format!("{} is no longer secret", field.name));
            } else {
                success(&format!("{} is now secret", field.name));
            }
        }
        FieldCommand::Delete { name, yes } => {
            let field = s.db.find_field(name)?;
            let repo = s.repository();
            let impact = repo.deletion_impact(DeletionTarget::Field(field.id))?;
            confirm_delete(&format!("field '{}'", field.name), &impact, *yes)?;
            repo.delete_field(field.id)?;
            success(&format!("Deleted field: {}", field.name));
        }
    }
    Ok(())
}

fn validator_command(s: &Session, cmd: &ValidatorCommand) -> Result<()> {
    match cmd {
        ValidatorCommand::Add {
            name,
            implementation,
        } => {
            if !s.registry.is_known(implementation) {
                warning(&format!(
                    "'{implementation}' is not a known implementation; fields using '{name}' will refuse all writes"
                ));
            }
            let validator = s.db.create_validator(name, implementation)?;
            success(&format!("Added validator: {}", validator.name));
        }
        ValidatorCommand::Arg {
            validator,
            key,
            value,
        } => {
            let validator = s.db.find_validator(validator)?;
            s.db.add_validator_argument(validator.id, key, value)?;
            success(&format!("{}: {key} = {value}", validator.name));
            if let Err(err) = s.registry.resolve_by_id(&s.db, validator.id) {
                warning(&err.to_string());
            }
        }
        ValidatorCommand::List => {
            let definitions = s
                .db
                .list_validators()?
                .into_iter()
                .map(|v| s.db.validator_definition(v.id))
                .collect::<Result<Vec<_>>>()?;
            if s.json() {
                return print_json(&definitions);
            }
            if definitions.is_empty() {
                println!("No validators defined");
            }
            for definition in definitions {
                let arguments: Vec<String> = definition
                    .arguments
                    .iter()
                    .map(|a| format!("{}={}", a.key, a.value))
                    .collect();
                println!(
                    "{} {} {}",
                    definition.validator.name.bold(),
                    definition.validator.implementation.cyan(),
                    arguments.join(" ")
                );
            }
        }
        ValidatorCommand::Check { name } => {
            let validators = match name {
                Some(name) => vec![s.db.find_validator(name)?],
                None => s.db.list_validators()?,
            };
            let mut broken = 0;
            for validator in validators {
                match s.registry.resolve_by_id(&s.db, validator.id) {
                    Ok(resolved) => println!(
                        "{} {} ({})",
                        "✓".green(),
                        validator.name,
                        resolved.implementation
                    ),
                    Err(err) => {
                        broken += 1;
                        println!("{} {}: {}", "✗".red(), validator.name, err);
                    }
                }
            }
            if broken > 0 {
                return Err(VaultError::Other(format!(
                    "{broken} validator(s) misconfigured"
                )));
            }
        }
        ValidatorCommand::Kinds => {
            let builtins = s.registry.implementations();
            if s.json() {
                let kinds: Vec<serde_json::Value> = builtins
                    .iter()
                    .map(|b| {
                        serde_json::json!({
                            "reference": b.reference,
                            "aliases": b.aliases,
                            "arguments": b.arguments,
                            "description": b.description,
                        })
                    })
                    .collect();
                return print_json(&kinds);
            }
            for builtin in builtins {
                println!(
                    "{} ({})\n    {}",
                    builtin.reference.bold(),
                    builtin.arguments,
                    builtin.description
                );
            }
        }
        ValidatorCommand::Delete { name, yes } => {
            let validator = s.db.find_validator(name)?;
            confirm_delete(
                &format!("validator '{}'", validator.name),
                &DeletionImpact::default(),
                *yes,
            )?;
            s.db.delete_validator(validator.id)?;
            success(&format!("Deleted validator: {}", validator.name));
        }
    }
    Ok(())
}

fn template_command(s: &Session, cmd: &TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::Add { name } => {
            let template = s.db.create_template(name)?;
            success(&format!("Added template: {}", template.name));
        }
        TemplateCommand::Bind {
            template,
            field,
            required,
            validators,
        } => {
            let template = s.db.find_template(template)?;
            let field = s.db.find_field(field)?;
            let binding = match s.db.template_field(template.id, field.id)? {
                Some(binding) => {
                    s.db.set_field_required(binding.id, *required)?;
                    binding
                }
                None => s.db.bind_field(template.id, field.id, *required)?,
            };
            for name in validators {
                let validator = s.db.find_validator(name)?;
                s.db.attach_validator(binding.id, validator.id)?;
            }
            success(&format!("Bound {} to {}", field.name, template.name));
        }
        TemplateCommand::Detach {
            template,
            field,
            validator,
        } => {
            let (template, field, binding) = find_binding(s, template, field)?;
            let validator = s.db.find_validator(validator)?;
            s.db.detach_validator(binding.id, validator.id)?;
            success(&format!(
                "Detached {} from {}.{}",
                validator.name, template.name, field.name
            ));
        }
        TemplateCommand::Unbind { template, field } => {
            let (template, field, binding) = find_binding(s, template, field)?;
            s.db.unbind_field(binding.id)?;
            success(&format!("Unbound {} from {}", field.name, template.name));
        }
        TemplateCommand::Show { name } => {
            let template = s.db.find_template(name)?;
            let fields = TemplateSchema::new(&s.db).fields_of(template.id)?;
            if s.json() {
                return print_json(&serde_json::json!({
                    "template": template,
                    "fields": fields,
                }));
            }
            println!("{}", template.name.bold());
            if fields.is_empty() {
                println!("  (no fields)");
            }
            for info in fields {
                let mut flags = Vec::new();
                if info.binding.is_required {
                    flags.push("required");
                }
                if info.field.is_secret {
                    flags.push("secret");
                }
                let validators: Vec<&str> =
                    info.validators.iter().map(|v| v.name.as_str()).collect();
                println!(
                    "  {} {} {}",
                    info.field.name,
                    format!("[{}]", flags.join(", ")).dimmed(),
                    validators.join(", ").cyan()
                );
            }
        }
        TemplateCommand::List => {
            let templates = s.db.list_templates()?;
            if s.json() {
                return print_json(&templates);
            }
            for template in templates {
                println!("{}", template.name);
            }
        }
        TemplateCommand::Delete { name, yes } => {
            let template = s.db.find_template(name)?;
            let repo = s.repository();
            let impact = repo.deletion_impact(DeletionTarget::Template(template.id))?;
            confirm_delete(&format!("template '{}'", template.name), &impact, *yes)?;
            repo.delete_template(template.id)?;
            success(&format!("Deleted template: {}", template.name));
        }
    }
    Ok(())
}

fn tag_command(s: &Session, cmd: &TagCommand) -> Result<()> {
    let groups = s.groups();
    match cmd {
        TagCommand::Add { name, slug } => {
            let tag = groups.create_tag(name, slug.as_deref())?;
            success(&format!("Added tag: {} ({})", tag.name, tag.slug));
        }
        TagCommand::Rename { slug, name } => {
            let tag = s.db.find_tag_by_slug(slug)?;
            let tag = groups.rename_tag(tag.id, name)?;
            success(&format!("Renamed tag: {} ({})", tag.name, tag.slug));
        }
        TagCommand::List => {
            let tags = s.db.list_tags()?;
            if s.json() {
                return print_json(&tags);
            }
            for tag in tags {
                println!("{} {}", tag.slug.cyan(), tag.name);
            }
        }
        TagCommand::Delete { slug, yes } => {
            let tag = s.db.find_tag_by_slug(slug)?;
            let impact = s.repository().deletion_impact(DeletionTarget::Tag(tag.id))?;
            confirm_delete(&format!("tag '{}'", tag.name), &impact, *yes)?;
            groups.delete_tag(tag.id)?;
            success(&format!("Deleted tag: {} ({})", tag.name, tag.slug));
        }
    }
    Ok(())
}

fn group_command(s: &Session, cmd: &GroupCommand) -> Result<()> {
    let groups = s.groups();
    match cmd {
        GroupCommand::Add { name, parent } => {
            let parent_id = parent
                .as_deref()
                .map(|p| s.db.find_group(p).map(|g| g.id))
                .transpose()?;
            let group = groups.create_group(name, parent_id)?;
            success(&format!("Added group: {}", groups.path(group.id)?));
        }
        GroupCommand::Move { name, parent } => {
            let group = s.db.find_group(name)?;
            let parent_id = parent
                .as_deref()
                .map(|p| s.db.find_group(p).map(|g| g.id))
                .transpose()?;
            let group = groups.set_parent(group.id, parent_id)?;
            success(&format!("Moved group: {}", groups.path(group.id)?));
        }
        GroupCommand::Rename { name, new_name } => {
            let group = s.db.find_group(name)?;
            let group = groups.rename_group(group.id, new_name)?;
            success(&format!("Renamed group: {}", groups.path(group.id)?));
        }
        GroupCommand::Tag { name, slug, remove } => {
            let group = s.db.find_group(name)?;
            let tag = s.db.find_tag_by_slug(slug)?;
            if *remove {
                groups.untag_group(group.id, tag.id)?;
                success(&format!("Removed tag {} from {}", tag.name, group.name));
            } else {
                groups.tag_group(group.id, tag.id)?;
                success(&format!("Tagged {} with {}", group.name, tag.name));
            }
        }
        GroupCommand::Tree => {
            if s.json() {
                return print_json(&s.db.list_groups()?);
            }
            let items = groups.tree(|group: &Group| {
                let tags = groups.tags_display(group.id)?;
                Ok(if tags.is_empty() {
                    group.name.clone()
                } else {
                    format!("{} {}", group.name, format!("[{tags}]").dimmed())
                })
            })?;
            for line in utils::format_tree(&items) {
                println!("{line}");
            }
        }
        GroupCommand::Delete { name, yes } => {
            let group = s.db.find_group(name)?;
            let impact = s
                .repository()
                .deletion_impact(DeletionTarget::Group(group.id))?;
            confirm_delete(&format!("group '{}'", group.name), &impact, *yes)?;
            groups.delete_group(group.id)?;
            success(&format!("Deleted group: {}", group.name));
        }
    }
    Ok(())
}

fn entry_command(s: &Session, cmd: &EntryCommand) -> Result<()> {
    let repo = s.repository();
    match cmd {
        EntryCommand::Add {
            name,
            group,
            template,
            notes,
            values,
        } => {
            let draft = EntryDraft {
                name: name.clone(),
                group_id: s.db.find_group(group)?.id,
                template_id: s.db.find_template(template)?.id,
                notes: notes.clone(),
                values: values.clone(),
            };
            let (entry, stored) = repo.import_entry(&draft)?;
            success(&format!(
                "Added entry: {} ({} value(s))",
                entry.name,
                stored.len()
            ));
        }
        EntryCommand::Set {
            entry,
            field,
            value,
        } => {
            let entry = s.db.find_entry(entry)?;
            let stored = repo.set_field_value(entry.id, field, value)?;
            success(&format!("Set {} on {}", stored.field.name, entry.name));
        }
        EntryCommand::Show { name, reveal } => {
            let entry = s.db.find_entry(name)?;
            show_entry(s, &repo, &entry, *reveal)?;
        }
        EntryCommand::List {
            group,
            recursive,
            tag,
        } => {
            let groups = s.groups();
            let mut entries = match group {
                Some(group) => groups.entries_in(s.db.find_group(group)?.id, *recursive)?,
                None => s.db.list_entries()?,
            };
            if let Some(slug) = tag {
                let tagged: Vec<_> = groups.groups_tagged(slug)?.iter().map(|g| g.id).collect();
                entries.retain(|e| tagged.contains(&e.group_id));
            }
            if s.json() {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No entries found");
            }
            for entry in entries {
                let template = s.db.get_template(entry.template_id)?;
                println!(
                    "{} {} {}",
                    entry.name.bold(),
                    groups.path(entry.group_id)?.cyan(),
                    format!("({})", template.name).dimmed()
                );
            }
        }
        EntryCommand::Delete { name, yes } => {
            let entry = s.db.find_entry(name)?;
            let impact = repo.deletion_impact(DeletionTarget::Entry(entry.id))?;
            confirm_delete(&format!("entry '{}'", entry.name), &impact, *yes)?;
            repo.delete_entry(entry.id)?;
            success(&format!("Deleted entry: {}", entry.name));
        }
    }
    Ok(())
}

fn show_entry(s: &Session, repo: &EntryRepository<'_>, entry: &Entry, reveal: bool) -> Result<()> {
    let groups = s.groups();
    let template = s.db.get_template(entry.template_id)?;
    let path = groups.path(entry.group_id)?;
    let fields = repo.entry_fields(entry.id)?;
    let missing = repo.missing_required_fields(entry.id)?;

    if s.json() {
        let values: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|f| (f.field.name.clone(), f.display_value(reveal).into()))
            .collect();
        let missing: Vec<&str> = missing.iter().map(|f| f.name.as_str()).collect();
        return print_json(&serde_json::json!({
            "name": entry.name,
            "group": path,
            "template": template.name,
            "notes": entry.notes,
            "fields": values,
            "missing_required": missing,
        }));
    }

    println!("{}", entry.name.bold());
    println!("  group:    {}", path.cyan());
    println!("  template: {}", template.name);
    if let Some(notes) = &entry.notes {
        println!("  notes:    {notes}");
    }
    for field in &fields {
        println!("  {}: {}", field.field.name, field.display_value(reveal));
    }
    for field in missing {
        warning(&format!("required field '{}' has no value", field.name));
    }
    Ok(())
}
