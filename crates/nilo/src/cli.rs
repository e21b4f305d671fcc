//! Clap derive structures for the `nilo` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nilo -- onboard and authorize MAB devices on a Nile tenant
#[derive(Debug, Parser)]
#[command(
    name = "nilo",
    version,
    about = "Onboard and authorize Nile network devices from the command line",
    long_about = "Browse a Nile tenant's sites, buildings and floors, review MAB devices\n\
        awaiting approval, and approve or deny them onto a network segment.\n\n\
        The inventory API key comes from the profile, or is picked from the\n\
        API keys stored for your signed-in account.",
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
    /// Tenant profile to use
    #[arg(long, short = 'p', env = "NILO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Inventory API base URL (overrides profile)
    #[arg(long, env = "NILO_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Tenant id (overrides profile)
    #[arg(long, short = 't', env = "NILO_TENANT", global = true)]
    pub tenant: Option<String>,

    /// Inventory API key (skips stored-key lookup)
    #[arg(long, env = "NILO_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NILO_OUTPUT",
        default_value = "table",
        global = true
    )]
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "NILO_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NILO_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// Show the tenant hierarchy (sites, buildings, floors)
    Tree(TreeArgs),

    /// List sites
    Sites,

    /// List buildings
    Buildings,

    /// List floors with their site and building
    Floors,

    /// List network segments
    #[command(alias = "seg")]
    Segments(SegmentsArgs),

    /// Show MAB devices grouped by building and floor
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show clients grouped by building and floor
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Approve or deny a device onto a segment
    #[command(alias = "auth")]
    Authorize(AuthorizeArgs),

    /// Manage the API keys stored for your account
    Keys(KeysArgs),

    /// Sign in, sign out and manage your account
    Account(AccountArgs),

    /// Ask the backend to resync the tenant
    Refresh,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HIERARCHY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Build the tree from the flat site/building/floor listings
    #[arg(long)]
    pub assemble: bool,
}

#[derive(Debug, Args)]
pub struct SegmentsArgs {
    /// Show segment detail (URLs, flags, scope, linked settings)
    #[arg(long)]
    pub detail: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES / CLIENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only devices awaiting approval
    #[arg(long, short = 'w')]
    pub waiting: bool,

    /// Expand every floor group
    #[arg(long, short = 'e')]
    pub expand_floors: bool,

    /// Collapse every floor group
    #[arg(long, conflicts_with = "expand_floors")]
    pub collapse_floors: bool,
}

#[derive(Debug, Args)]
pub struct ClientsArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Results per page (overrides profile)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,

    /// Window start, RFC 3339 (default: 24 hours before --end)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, RFC 3339 (default: now)
    #[arg(long)]
    pub end: Option<String>,

    /// Fetch every page
    #[arg(long, short = 'a', conflicts_with = "page")]
    pub all: bool,

    /// Expand every floor group
    #[arg(long, short = 'e')]
    pub expand_floors: bool,

    /// Collapse every floor group
    #[arg(long, conflicts_with = "expand_floors")]
    pub collapse_floors: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTHORIZE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthorizeArgs {
    /// Client record id
    #[arg(long)]
    pub id: String,

    /// Device MAC address
    #[arg(long)]
    pub mac: String,

    /// Decision: Approved or Denied
    #[arg(long)]
    pub status: String,

    /// Segment id to place the device on
    #[arg(long)]
    pub segment: String,

    /// Free-text description recorded with the decision
    #[arg(long)]
    pub description: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  KEYS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Fields shared by key create and update.
#[derive(Debug, Args)]
pub struct KeyFields {
    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Service the key belongs to (e.g. Nile)
    #[arg(long)]
    pub service: Option<String>,

    /// Service URL
    #[arg(long)]
    pub url: Option<String>,

    /// Tenant id the key is scoped to
    #[arg(long = "key-tenant")]
    pub tenant_id: Option<String>,

    /// Expiry (epoch seconds or date)
    #[arg(long)]
    pub valid_before: Option<String>,

    /// Read the key value from stdin instead of prompting
    #[arg(long)]
    pub key_stdin: bool,
}

#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    /// List stored keys
    #[command(alias = "ls")]
    List,

    /// Store a new key (prompts for the value)
    Create(KeyFields),

    /// Change a stored key
    Update {
        /// Key id
        id: String,

        #[command(flatten)]
        fields: KeyFields,

        /// Prompt for a new key value
        #[arg(long)]
        rotate: bool,
    },

    /// Delete a stored key
    #[command(alias = "rm")]
    Delete {
        /// Key id
        id: String,
    },

    /// Store a key read from a JSON document
    Import {
        /// Path to the JSON file
        file: PathBuf,

        /// Service to use when the document names none
        #[arg(long)]
        service: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACCOUNT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Register a new account
    SignUp {
        /// Username (usually an email address)
        username: String,

        /// Email attribute
        #[arg(long)]
        email: Option<String>,

        /// Display name attribute
        #[arg(long)]
        name: Option<String>,
    },

    /// Confirm a registration with the emailed code
    Confirm {
        username: String,
        code: String,
    },

    /// Sign in and remember the session
    #[command(alias = "login")]
    SignIn {
        username: String,
    },

    /// Sign out and forget the session
    #[command(alias = "logout")]
    SignOut,

    /// Show the signed-in user
    Whoami,

    /// Show the signed-in user's attributes
    Attributes,

    /// Change one attribute of the signed-in user
    SetAttribute {
        name: String,
        value: String,
    },

    /// Change the signed-in user's password
    ChangePassword,

    /// Request a password-reset code
    ForgotPassword {
        username: String,
    },

    /// Set a new password with a reset code
    ConfirmForgotPassword {
        username: String,
        code: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g. api_url, tenant_id, page_size)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's inventory API key in the system keyring
    SetSecret,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
