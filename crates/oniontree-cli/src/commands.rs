//! Subcommands and their handlers.
//!
//! Every handler returns the text to print on success. Mutating commands
//! print nothing; their progress is visible with `-v`.

use crate::config::CliConfig;
use anyhow::{bail, Context as _};
use clap::{Args, Subcommand};
use oniontree_lint::Linter;
use oniontree_repo::{digest, Repository, Service, UncheckedRepository};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    /// Directory root discovery starts from.
    pub start: PathBuf,

    /// Loaded configuration.
    pub config: CliConfig,
}

impl Context {
    /// Opens the repository containing the start directory.
    fn open(&self) -> anyhow::Result<Repository> {
        let repo = Repository::open_with(&self.start, self.config.repository.open_options())?;
        debug!(root = %repo.root().display(), "using repository");
        Ok(repo)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository
    Init {
        /// Directory to initialize (default: --dir)
        dir: Option<PathBuf>,
    },
    /// Add a service
    Add(AddArgs),
    /// Modify a service
    Edit(EditArgs),
    /// Remove a service and its tags
    Remove(IdArgs),
    /// Add a service to tags
    Tag(TagArgs),
    /// Remove a service from tags
    Untag(TagArgs),
    /// Attach a public key to a service
    AddPubkey(AddPubkeyArgs),
    /// Print a service
    Show {
        #[command(flatten)]
        target: IdArgs,
        /// Print the stored bytes without decoding them
        #[arg(long)]
        raw: bool,
    },
    /// List service IDs
    List,
    /// List tags, the members of a tag, or the tags of a service
    Tags {
        /// Tag whose members to list
        #[arg(conflicts_with = "service")]
        tag: Option<String>,
        /// Service whose tags to list
        #[arg(long)]
        service: Option<String>,
    },
    /// Check services for problems
    Lint {
        /// Lint a single service (default: all)
        #[arg(long)]
        id: Option<String>,
    },
    /// Print the repository digest
    Hash,
    /// Print the whole repository as JSON
    Export {
        /// Leave out service descriptions
        #[arg(long)]
        no_description: bool,
        /// Leave out public keys
        #[arg(long)]
        no_public_keys: bool,
    },
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Service ID
    #[arg(long)]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Service ID
    #[arg(long)]
    pub id: String,
    /// Service name
    #[arg(long, default_value = "")]
    pub name: String,
    /// Service description
    #[arg(long, default_value = "")]
    pub description: String,
    /// Service URL (repeatable)
    #[arg(long = "url")]
    pub urls: Vec<String>,
    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    /// Armored public key file
    #[arg(long)]
    pub public_key: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Service ID
    #[arg(long)]
    pub id: String,
    /// New service name
    #[arg(long)]
    pub name: Option<String>,
    /// New service description
    #[arg(long)]
    pub description: Option<String>,
    /// Comma-separated URLs
    #[arg(long, value_delimiter = ',')]
    pub urls: Vec<String>,
    /// Replace the URL list instead of appending to it
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Service ID
    #[arg(long)]
    pub id: String,
    /// Comma-separated tags
    #[arg(long, value_delimiter = ',', required = true)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AddPubkeyArgs {
    /// Service ID
    #[arg(long)]
    pub id: String,
    /// Armored public key file
    #[arg(long)]
    pub file: PathBuf,
    /// Key description
    #[arg(long, default_value = "")]
    pub description: String,
}

/// Runs `command` and returns its output.
pub fn run(command: Command, ctx: &Context) -> anyhow::Result<String> {
    match command {
        Command::Init { dir } => init(ctx, dir),
        Command::Add(args) => add(ctx, args),
        Command::Edit(args) => edit(ctx, args),
        Command::Remove(IdArgs { id }) => {
            ctx.open()?.remove(&id)?;
            Ok(String::new())
        }
        Command::Tag(args) => {
            ctx.open()?.tag(&args.id, clean_list(args.tags))?;
            Ok(String::new())
        }
        Command::Untag(args) => {
            ctx.open()?.untag(&args.id, clean_list(args.tags))?;
            Ok(String::new())
        }
        Command::AddPubkey(args) => add_pubkey(ctx, args),
        Command::Show { target, raw } => show(ctx, &target.id, raw),
        Command::List => Ok(ctx.open()?.list()?.join("\n")),
        Command::Tags { tag, service } => tags(ctx, tag, service),
        Command::Lint { id } => lint(ctx, id),
        Command::Hash => Ok(digest::to_hex(&ctx.open()?.hash()?)),
        Command::Export {
            no_description,
            no_public_keys,
        } => export(ctx, no_description, no_public_keys),
    }
}

fn init(ctx: &Context, dir: Option<PathBuf>) -> anyhow::Result<String> {
    let dir = dir.unwrap_or_else(|| ctx.start.clone());
    let repo = UncheckedRepository::with_options(&dir, ctx.config.repository.open_options())
        .init()
        .with_context(|| format!("failed to initialize {}", dir.display()))?;
    Ok(format!(
        "Initialized oniontree repository in {}",
        repo.root().display()
    ))
}

fn add(ctx: &Context, args: AddArgs) -> anyhow::Result<String> {
    let repo = ctx.open()?;

    let mut service = Service::new(args.name);
    service.description = args.description;
    service.add_urls(clean_list(args.urls));
    if let Some(path) = &args.public_key {
        let mut key = read_key(path)?;
        key.description.clear();
        service.add_public_keys([key]);
    }

    repo.add(&args.id, &service)?;

    let tags = clean_list(args.tags);
    if !tags.is_empty() {
        repo.tag(&args.id, &tags)?;
    }
    Ok(String::new())
}

fn edit(ctx: &Context, args: EditArgs) -> anyhow::Result<String> {
    let repo = ctx.open()?;
    let mut service = repo.get(&args.id)?;

    if let Some(name) = args.name {
        service.name = name;
    }
    if let Some(description) = args.description {
        service.description = description;
    }
    let urls = clean_list(args.urls);
    if args.replace {
        service.set_urls(urls);
    } else {
        service.add_urls(urls);
    }

    repo.update(&args.id, &service)?;
    Ok(String::new())
}

fn add_pubkey(ctx: &Context, args: AddPubkeyArgs) -> anyhow::Result<String> {
    let repo = ctx.open()?;
    let mut service = repo.get(&args.id)?;

    let mut key = read_key(&args.file)?;
    key.description = args.description;
    service.add_public_keys([key]);

    repo.update(&args.id, &service)?;
    Ok(String::new())
}

fn show(ctx: &Context, id: &str, raw: bool) -> anyhow::Result<String> {
    let repo = ctx.open()?;
    let text = if raw {
        String::from_utf8_lossy(&repo.get_raw(id)?).into_owned()
    } else {
        serde_yaml::to_string(&repo.get(id)?)?
    };
    Ok(text.trim_end().to_string())
}

fn tags(ctx: &Context, tag: Option<String>, service: Option<String>) -> anyhow::Result<String> {
    let repo = ctx.open()?;
    let names = match (tag, service) {
        (Some(tag), _) => repo.get_tag(&tag)?.services,
        (None, Some(id)) => repo.get_service_tags(&id)?,
        (None, None) => repo.list_tags()?,
    };
    Ok(names.join("\n"))
}

fn lint(ctx: &Context, id: Option<String>) -> anyhow::Result<String> {
    let repo = ctx.open()?;
    let linter = Linter::new(ctx.config.lint).context("failed to build linter")?;
    let ids = match id {
        Some(id) => vec![id],
        None => repo.list()?,
    };

    let mut problems = Vec::new();
    for id in &ids {
        if let Err(err) = linter.lint_raw(&repo.get_raw(id)?) {
            problems.extend(err.violations.iter().map(|v| format!("{}: {}", id, v)));
        }
    }

    if !problems.is_empty() {
        bail!("{}", problems.join("\n"));
    }
    Ok(String::new())
}

fn export(ctx: &Context, no_description: bool, no_public_keys: bool) -> anyhow::Result<String> {
    let mut options = ctx.config.export;
    if no_description {
        options.include_description = false;
    }
    if no_public_keys {
        options.include_public_keys = false;
    }
    let snapshot = ctx.open()?.snapshot(&options)?;
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

fn read_key(path: &Path) -> anyhow::Result<oniontree_keys::PublicKey> {
    let block = fs::read_to_string(path)
        .with_context(|| format!("failed to read public key {}", path.display()))?;
    oniontree_keys::parse(&block)
        .with_context(|| format!("failed to parse public key {}", path.display()))
}

/// Trims list items and drops empty ones.
fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
