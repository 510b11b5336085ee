use std::path::PathBuf;

use anyhow::Context;
use lx_tool::{run_directory, run_file, RunOptions, TestReport};
use regex::Regex;
use tracing::info;

use crate::{TestArgs, RESULT_FAILED, RESULT_OK};

pub(crate) fn run_test(args: TestArgs) -> anyhow::Result<i32> {
    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --filter expression")?;
    let options = RunOptions {
        filter,
        ..RunOptions::default()
    };

    let report = match (&args.file, &args.dir) {
        (Some(file), _) => run_file(file, &options)
            .with_context(|| format!("running scenarios of {}", file.display()))?,
        (None, dir) => {
            let dir = dir.clone().unwrap_or_else(|| PathBuf::from("."));
            run_directory(&dir, &options)
                .with_context(|| format!("running scenarios under {}", dir.display()))?
        }
    };
    info!(
        scenarios = report.scenario_count(),
        failed = report.failed_count(),
        "test run finished"
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing test report")?
        );
    } else {
        emit_report(&report);
    }
    Ok(if report.passed() { 0 } else { 1 })
}

fn emit_report(report: &TestReport) {
    println!("{}", if report.passed() { RESULT_OK } else { RESULT_FAILED });
    println!("FILES:{}", report.files.len());
    println!("SCENARIOS:{}", report.scenario_count());
    println!("FAILED:{}", report.failed_count());
    for line in report.failure_lines() {
        println!("FAILURE:{}", line);
    }
    for file in &report.files {
        for scenario in file.failed_scenarios() {
            for line in &scenario.log {
                println!("LOG:{}", line);
            }
        }
    }
}
