use crate::config::session_config::SessionConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "rbsync")]
#[command(about = "Match sparse MRI slices to atlas slices by physical position")]
pub struct CliArgs {
    /// Path to the TOML session file
    #[arg(short, long, default_value = "rbsync.toml")]
    pub config: String,

    /// Enable verbose output, including one line per matched slice
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Override the slicing axis (AP, LR, SI or 0-2)
    #[arg(long)]
    pub axis: Option<String>,

    /// Override the export directory
    #[arg(long)]
    pub output: Option<String>,

    /// Override the export formats
    #[arg(long, value_delimiter = ',')]
    pub format: Vec<String>,

    /// Show the matches without writing any file
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Command-line values win over the session file.
    pub fn apply_overrides(&self, config: &mut SessionConfig) {
        if let Some(axis) = &self.axis {
            config.session.get_or_insert_with(Default::default).axis = Some(axis.clone());
            tracing::info!("🔧 Axis overridden to: {}", axis);
        }
        if let Some(output) = &self.output {
            config.export.output_path = output.clone();
            tracing::info!("🔧 Output path overridden to: {}", output);
        }
        if !self.format.is_empty() {
            config.export.formats = self.format.clone();
            tracing::info!("🔧 Export formats overridden to: {}", self.format.join(", "));
        }
    }
}
