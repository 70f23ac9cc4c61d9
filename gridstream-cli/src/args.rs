use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gridstream_lib::config::ReanchorMode;

/// How the viewport is corrected after a row-height change
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Reanchor {
    /// Correct immediately, then once more after layout settles
    TwoPhase,
    /// Correct once
    Immediate,
}

impl From<Reanchor> for ReanchorMode {
    fn from(value: Reanchor) -> Self {
        match value {
            Reanchor::TwoPhase => ReanchorMode::TwoPhase,
            Reanchor::Immediate => ReanchorMode::Immediate,
        }
    }
}

/// Command-line arguments for gridstream
#[derive(Parser, Debug)]
#[command(version, about = "Drives a virtualized table session against a synthetic backend")]
pub struct Args {
    /// Total rows served by the synthetic backend
    #[arg(long = "rows", default_value_t = 500)]
    pub rows: usize,

    /// Rows requested per page
    #[arg(long = "page-size", default_value_t = 50)]
    pub page_size: usize,

    /// Request the next page once the rendered range ends this close to the loaded rows
    #[arg(long = "load-buffer", default_value_t = 5)]
    pub load_buffer: usize,

    /// Rows materialized beyond each edge of the viewport
    #[arg(long = "scroll-buffer", default_value_t = 5)]
    pub scroll_buffer: usize,

    /// Initial row height in pixels
    #[arg(long = "row-height", default_value_t = 20.0)]
    pub row_height: f64,

    /// Header height in pixels
    #[arg(long = "header", default_value_t = 0.0)]
    pub header: f64,

    /// Viewport height in pixels
    #[arg(long = "viewport", default_value_t = 200.0)]
    pub viewport: f64,

    /// Simulated page fetch latency in milliseconds
    #[arg(long = "latency-ms", default_value_t = 20)]
    pub latency_ms: u64,

    /// Row-height correction strategy
    #[arg(long = "reanchor", value_enum, default_value_t = Reanchor::TwoPhase)]
    pub reanchor: Reanchor,

    /// Log file
    #[arg(long = "log-file", default_value = "gridstream.log")]
    pub log_file: PathBuf,

    /// Log per-event recomputation as well
    #[arg(long = "trace", action)]
    pub trace: bool,
}
