//! Output formatting for CLI

use clap::ValueEnum;

/// Output format for the final report
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Banners, progress and failure blocks
    #[default]
    Table,
    /// A single JSON document on stdout
    Json,
}
