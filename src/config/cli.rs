use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::Domain;

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Cached content API client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the API base URL.
    #[arg(long = "api-base-url", value_name = "URL", global = true)]
    pub api_base_url: Option<String>,

    /// Bearer token for authenticated endpoints.
    #[arg(
        long = "api-token",
        env = "FOLIO_API_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub api_token: Option<String>,

    /// Override the request timeout.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS", global = true)]
    pub api_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Disable the query cache; every read goes to the API.
    #[arg(long = "no-cache", action = clap::ArgAction::SetTrue, global = true)]
    pub no_cache: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List a resource collection.
    List(ListArgs),
    /// Fetch one entity by id.
    Get(EntityArgs),
    /// Fetch one entity by slug.
    Slug(SlugArgs),
    /// Create an entity from a JSON document.
    Create(CreateArgs),
    /// Update an entity with a partial JSON document.
    Update(UpdateArgs),
    /// Delete an entity by id.
    Delete(EntityArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// articles | categories | collections
    #[arg(value_name = "DOMAIN")]
    pub domain: Domain,

    #[arg(long)]
    pub page: Option<u64>,

    #[arg(long)]
    pub limit: Option<u64>,

    /// Full-text search term.
    #[arg(long, conflicts_with_all = ["category", "tag", "author"])]
    pub search: Option<String>,

    /// Restrict to one category id.
    #[arg(long, conflicts_with_all = ["tag", "author"])]
    pub category: Option<String>,

    #[arg(long, conflicts_with = "author")]
    pub tag: Option<String>,

    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct EntityArgs {
    #[arg(value_name = "DOMAIN")]
    pub domain: Domain,

    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone)]
pub struct SlugArgs {
    #[arg(value_name = "DOMAIN")]
    pub domain: Domain,

    #[arg(value_name = "SLUG")]
    pub slug: String,
}

#[derive(Debug, Args, Clone, Default)]
pub struct PayloadArgs {
    /// Inline JSON document.
    #[arg(long, value_name = "JSON", conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the JSON document from a file.
    #[arg(long = "data-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[arg(value_name = "DOMAIN")]
    pub domain: Domain,

    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    #[arg(value_name = "DOMAIN")]
    pub domain: Domain,

    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub payload: PayloadArgs,
}
