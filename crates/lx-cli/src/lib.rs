use std::ffi::OsString;

use clap::Parser;

mod cli_args;
mod error_map;
mod run_command;
mod test_command;

pub(crate) use cli_args::{Cli, Mode, RunArgs, TestArgs};
pub(crate) use error_map::emit_error;

pub const RESULT_OK: &str = "RESULT:OK";
pub const RESULT_FAILED: &str = "RESULT:FAILED";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Mode::Test(args) => test_command::run_test(args),
        Mode::Run(args) => run_command::run_function(args),
    }
}
