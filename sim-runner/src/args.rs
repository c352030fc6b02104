use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Optional TOML settings file; flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQLite ledger path.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Seconds between price refreshes.
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// Replay a canned price series instead of fetching live data.
    #[arg(long, default_value_t = false)]
    pub replay: bool,

    /// Account id used for commands typed at this console.
    #[arg(long, default_value_t = 1)]
    pub user_id: i64,

    /// Display name for the console account.
    #[arg(long, default_value = "console")]
    pub user_name: String,
}
