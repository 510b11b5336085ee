mod report;
mod runner;
mod source;

pub use report::{FileReport, ScenarioReport, TestReport};
pub use runner::{run_directory, run_file, run_source, RunOptions};
pub use source::{read_lexy_file, read_lexy_files_from_dir, LEXY_EXTENSION};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LxToolError {
    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("No .lexy files under {path}.")]
    SourceEmpty { path: PathBuf },
    #[error("Engine error: {0}")]
    Engine(#[from] lx_core::LexyError),
}
