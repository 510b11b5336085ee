use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lx_core::Value;

#[derive(Debug, Parser)]
#[command(name = "lexy")]
#[command(about = "Lexy business rules compiler and scenario runner")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Run the scenarios of a file or directory.
    Test(TestArgs),
    /// Execute one function.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub(crate) struct TestArgs {
    #[arg(long = "dir", conflicts_with = "file")]
    pub(crate) dir: Option<PathBuf>,
    #[arg(long = "file")]
    pub(crate) file: Option<PathBuf>,
    /// Regular expression matched against scenario names.
    #[arg(long = "filter")]
    pub(crate) filter: Option<String>,
    #[arg(long = "json")]
    pub(crate) json: bool,
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "file")]
    pub(crate) file: PathBuf,
    #[arg(long = "function")]
    pub(crate) function: String,
    /// Parameter as `Path=Literal`, e.g. `Income=1200` or `Person.Name="Ann"`.
    #[arg(long = "value", value_parser = parse_parameter)]
    pub(crate) values: Vec<(String, Value)>,
    #[arg(long = "json")]
    pub(crate) json: bool,
}

pub(crate) fn parse_parameter(raw: &str) -> Result<(String, Value), String> {
    let (path, literal) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Path=Literal, got '{}'", raw))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(format!("missing parameter path in '{}'", raw));
    }
    Ok((path.to_string(), lx_api::parse_value(literal)))
}
