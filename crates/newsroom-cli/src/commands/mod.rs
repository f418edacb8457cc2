//! Subcommand handlers and their argument structs.

pub mod delete;
pub mod pick;
pub mod run;
pub mod tts;

/// Arguments for `newsroom run`.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Only process these record IDs (default: every pending candidate)
    #[arg(long)]
    pub id: Vec<String>,

    /// Override the number of parallel workers
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Arguments for `newsroom pick`.
#[derive(clap::Args)]
pub struct PickArgs {
    /// Article URL; omit for interactive mode
    #[arg(long)]
    pub url: Option<String>,

    /// Optional title for the URL
    #[arg(long)]
    pub title: Option<String>,

    /// Importance: Interesting, Important, or Breaking
    #[arg(long, default_value = "Interesting")]
    pub importance: String,

    /// Mark the pick as trending (implied by Breaking)
    #[arg(long)]
    pub trending: bool,

    /// Optional featured image URL
    #[arg(long)]
    pub image: Option<String>,
}

/// Arguments for `newsroom delete`.
#[derive(clap::Args)]
pub struct DeleteArgs {
    /// Article URL or bare record ID
    pub target: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for `newsroom tts`.
#[derive(clap::Args)]
pub struct TtsArgs {
    /// Only process these record IDs (default: every eligible record)
    #[arg(long)]
    pub id: Vec<String>,
}
