//! Clap derive structures for the `flagwire` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use flagwire_core::FlagKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// flagwire -- evaluate and watch flags served by flagd
#[derive(Debug, Parser)]
#[command(
    name = "flagwire",
    version,
    about = "Evaluate feature flags against a flagd service",
    long_about = "Resolve feature flags over gRPC against a flagd evaluation service,\n\
        and watch the service's event stream for readiness and configuration changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FLAGWIRE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Endpoint URI: http://host:port, https://host:port or unix:///path
    #[arg(long, short = 'e', global = true)]
    pub endpoint: Option<String>,

    /// Extra CA certificate (PEM) to trust
    #[arg(long, global = true)]
    pub cert: Option<PathBuf>,

    /// Per-request deadline in milliseconds
    #[arg(long, global = true)]
    pub deadline_ms: Option<u64>,

    /// Disable the resolution cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Bare value (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a single flag
    #[command(alias = "e")]
    Eval(EvalArgs),

    /// Stream provider events until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Eval ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlagTypeArg {
    #[value(alias = "bool")]
    Boolean,
    #[value(alias = "str")]
    String,
    #[value(alias = "int")]
    Integer,
    #[value(alias = "double")]
    Float,
    #[value(alias = "structure", alias = "json")]
    Object,
}

impl From<FlagTypeArg> for FlagKind {
    fn from(arg: FlagTypeArg) -> Self {
        match arg {
            FlagTypeArg::Boolean => Self::Boolean,
            FlagTypeArg::String => Self::String,
            FlagTypeArg::Integer => Self::Integer,
            FlagTypeArg::Float => Self::Float,
            FlagTypeArg::Object => Self::Object,
        }
    }
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Flag key
    pub flag: String,

    /// Flag type to resolve
    #[arg(long, short = 't', value_enum, default_value = "boolean")]
    pub r#type: FlagTypeArg,

    /// Context attribute as KEY=VALUE (VALUE parsed as JSON when possible)
    #[arg(long = "context", short = 'c', value_name = "KEY=VALUE")]
    pub context: Vec<String>,

    /// Context as a JSON object, merged before --context attributes
    #[arg(long, value_name = "JSON")]
    pub context_json: Option<String>,

    /// Targeting key sent with the context
    #[arg(long, short = 'k')]
    pub targeting_key: Option<String>,

    /// Value to report if resolution fails (parsed per --type)
    #[arg(long, short = 'd')]
    pub default: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file + environment + flags)
    Show,
    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
