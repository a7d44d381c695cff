use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "date-transform")]
#[command(about = "Reformat date and epoch fields of JSON-lines records")]
pub struct CliConfig {
    /// Path to the TOML stage configuration
    #[arg(short, long, default_value = "date-transform.toml")]
    pub config: PathBuf,

    /// JSON-lines input records (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Where rejected records go (stderr when omitted)
    #[arg(short, long)]
    pub errors: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub validate_only: bool,

    /// Abort on the first record that cannot be converted
    #[arg(long)]
    pub fail_fast: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
