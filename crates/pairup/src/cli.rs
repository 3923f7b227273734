//! Clap derive structures for the `pairup` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pairup_core::ReportReason;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pairup -- anonymous one-to-one chat from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "pairup",
    version,
    about = "Meet a random stranger and chat, from the command line",
    long_about = "Client for the pairup chat-matching service.\n\n\
        Registers this device, manages its profile, and runs interactive\n\
        chat sessions over a persistent WebSocket connection.",
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
    /// API server URL (overrides the config file)
    #[arg(long, short = 's', env = "PAIRUP_SERVER", global = true)]
    pub server: Option<String>,

    /// WebSocket server URL (derived from --server when omitted)
    #[arg(long, env = "PAIRUP_WS_SERVER", global = true)]
    pub ws_server: Option<String>,

    /// Use this device identity instead of the stored one
    #[arg(long, env = "PAIRUP_DEVICE_ID", global = true, hide_env = true)]
    pub device_id: Option<String>,

    /// Path to the config file
    #[arg(long, env = "PAIRUP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

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

    /// Accept invalid TLS certificates (development servers)
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Register this device (or fetch its existing account)
    Register,

    /// Show this device's account
    #[command(alias = "whoami")]
    Me,

    /// Set nickname and bio
    Profile(ProfileArgs),

    /// Upload a selfie for verification
    Verify(VerifyArgs),

    /// Report another user
    Report(ReportArgs),

    /// Show karma score and access level
    Karma,

    /// Mark the last chat as completed without incident
    Complete,

    /// Start an interactive chat session
    Chat(ChatArgs),

    /// Show or reset the stored device identity
    Identity(IdentityArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Display name shown to chat partners
    #[arg(long, short = 'n')]
    pub nickname: String,

    /// Short bio shown to chat partners
    #[arg(long, short = 'b', default_value = "")]
    pub bio: String,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Image file (jpg, png or webp)
    pub image: PathBuf,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Device identity of the user being reported
    pub device_id: String,

    /// Report category
    #[arg(long, short = 'r', value_enum)]
    pub reason: ReasonArg,

    /// What happened
    #[arg(long, short = 'd', default_value = "")]
    pub details: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReasonArg {
    Spam,
    Harassment,
    Inappropriate,
    Underage,
    Other,
}

impl From<ReasonArg> for ReportReason {
    fn from(arg: ReasonArg) -> Self {
        match arg {
            ReasonArg::Spam => Self::Spam,
            ReasonArg::Harassment => Self::Harassment,
            ReasonArg::Inappropriate => Self::Inappropriate,
            ReasonArg::Underage => Self::Underage,
            ReasonArg::Other => Self::Other,
        }
    }
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Partner filter passed to the matcher
    #[arg(long, short = 'l', default_value = "any")]
    pub looking_for: String,
}

#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// Discard the stored identity and generate a new one
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
