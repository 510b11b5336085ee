use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use lx_api::{compile_source, CompilationEnvironment, CompileOptions};
use lx_core::ir::{AssignmentIr, ScenarioIr};
use lx_core::{format_sorted, render_log, FunctionResult, Library, Value};
use regex::Regex;
use tracing::{debug, info};

use crate::source::{read_lexy_file, read_lexy_files_from_dir};
use crate::{FileReport, LxToolError, ScenarioReport, TestReport};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only scenarios whose name matches are run.
    pub filter: Option<Regex>,
    pub libraries: Vec<Library>,
}

pub fn run_directory(dir: &Path, options: &RunOptions) -> Result<TestReport, LxToolError> {
    let files = read_lexy_files_from_dir(dir)?;
    let mut report = TestReport::default();
    for (file, source) in &files {
        report.files.push(run_source(file, source, options)?);
    }
    info!(
        files = report.files.len(),
        scenarios = report.scenario_count(),
        failed = report.failed_count(),
        "ran specifications"
    );
    Ok(report)
}

pub fn run_file(path: &Path, options: &RunOptions) -> Result<TestReport, LxToolError> {
    let source = read_lexy_file(path)?;
    let file = path.to_string_lossy().replace('\\', "/");
    Ok(TestReport {
        files: vec![run_source(&file, &source, options)?],
    })
}

/// Compiles one source file and evaluates its scenarios.
pub fn run_source(file: &str, source: &str, options: &RunOptions) -> Result<FileReport, LxToolError> {
    let environment = compile_source(
        file,
        source,
        CompileOptions {
            libraries: options.libraries.clone(),
        },
    )?;
    let program = environment.program();
    let diagnostics = environment.diagnostics();

    let mut failures = Vec::new();
    let expects_root_errors = program
        .scenarios()
        .any(|scenario| !scenario.expect_root_errors.is_empty());
    if !expects_root_errors {
        failures.extend(
            format_sorted(diagnostics.root_errors())
                .into_iter()
                .map(|error| format!("Unexpected root error: {}", error)),
        );
    }

    let covered = program
        .scenarios()
        .flat_map(|scenario| environment.node_and_dependencies(&scenario.name))
        .collect::<BTreeSet<_>>();
    let uncovered = diagnostics
        .errors()
        .filter(|error| error.node.as_ref().is_some_and(|node| !covered.contains(node)))
        .collect::<Vec<_>>();
    failures.extend(
        format_sorted(uncovered)
            .into_iter()
            .map(|error| format!("Error outside any scenario: {}", error)),
    );

    let scenarios = program
        .scenarios()
        .filter(|scenario| {
            options
                .filter
                .as_ref()
                .map_or(true, |filter| filter.is_match(&scenario.name))
        })
        .map(|scenario| run_scenario(&environment, scenario))
        .collect::<Vec<_>>();
    debug!(file, scenarios = scenarios.len(), "ran file");

    Ok(FileReport {
        file: file.to_string(),
        failures,
        scenarios,
    })
}

#[derive(Debug, Default)]
struct ScenarioOutcome {
    failures: Vec<String>,
    log: Vec<String>,
}

impl ScenarioOutcome {
    fn fail(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }
}

fn run_scenario(environment: &CompilationEnvironment, scenario: &ScenarioIr) -> ScenarioReport {
    let mut outcome = ScenarioOutcome::default();
    evaluate_scenario(environment, scenario, &mut outcome);
    if outcome.failures.is_empty() {
        outcome.log.clear();
    }
    debug!(scenario = %scenario.name, failures = outcome.failures.len(), "ran scenario");
    ScenarioReport {
        name: scenario.name.clone(),
        reference: scenario.reference.to_string(),
        failures: outcome.failures,
        log: outcome.log,
    }
}

fn evaluate_scenario(
    environment: &CompilationEnvironment,
    scenario: &ScenarioIr,
    outcome: &mut ScenarioOutcome,
) {
    let diagnostics = environment.diagnostics();
    if !scenario.expect_root_errors.is_empty() {
        let root_errors = format_sorted(diagnostics.root_errors());
        expect_messages("root error", &scenario.expect_root_errors, &root_errors, outcome);
    }

    let closure = environment.node_and_dependencies(&scenario.name);
    let errors = format_sorted(diagnostics.errors_for_nodes(&closure));
    if scenario.expects_validation_errors() {
        expect_messages("error", &scenario.expect_errors, &errors, outcome);
        return;
    }
    if !errors.is_empty() {
        outcome.failures.extend(errors);
        return;
    }

    let Some(function) = &scenario.function else {
        if scenario.expect_root_errors.is_empty() {
            outcome.fail("Scenario has no function to run.");
        }
        return;
    };
    let Some(executable) = environment.get_function(function) else {
        outcome.fail(format!("Function '{}' was not compiled.", function));
        return;
    };

    let run = |parameters: &[AssignmentIr]| executable.run(&parameter_values(parameters));
    if !scenario.expect_execution_errors.is_empty() {
        match run(&scenario.parameters) {
            Ok(result) => {
                outcome.log = render_log(&result.logging);
                outcome.fail("Execution should have failed but succeeded.");
            }
            Err(error) => {
                let actual = [error.to_string()];
                expect_messages(
                    "execution error",
                    &scenario.expect_execution_errors,
                    &actual,
                    outcome,
                );
            }
        }
        return;
    }

    if scenario.validation_rows.is_empty() || !scenario.results.is_empty() {
        check_run(run(&scenario.parameters), &scenario.results, "", outcome);
    }
    for row in &scenario.validation_rows {
        let prefix = format!("Validation row {}: ", row.reference);
        check_run(run(&row.parameters), &row.results, &prefix, outcome);
    }
}

fn parameter_values(parameters: &[AssignmentIr]) -> BTreeMap<String, Value> {
    parameters
        .iter()
        .map(|assignment| (assignment.path.to_string(), assignment.value.clone()))
        .collect()
}

fn check_run(
    result: Result<FunctionResult, lx_core::LexyError>,
    expected: &[AssignmentIr],
    prefix: &str,
    outcome: &mut ScenarioOutcome,
) {
    let result = match result {
        Ok(result) => result,
        Err(error) => {
            outcome.fail(format!("{}Execution failed: {}", prefix, error));
            return;
        }
    };
    for assignment in expected {
        let path = assignment.path.to_string();
        match result.get(&path) {
            Some(actual) if *actual == assignment.value => {}
            Some(actual) => outcome.fail(format!(
                "{}'{}' should be {} but is {}",
                prefix, path, assignment.value, actual
            )),
            None => outcome.fail(format!("{}'{}' has no value", prefix, path)),
        }
    }
    if !outcome.failures.is_empty() {
        outcome.log = render_log(&result.logging);
    }
}

/// Every expected message must be contained in one of the actual lines.
fn expect_messages(kind: &str, expected: &[String], actual: &[String], outcome: &mut ScenarioOutcome) {
    if actual.is_empty() {
        outcome.fail(format!("No {}s found, expected: {}", kind, expected.join(", ")));
        return;
    }
    for message in expected {
        if !actual.iter().any(|line| line.contains(message.as_str())) {
            outcome.fail(format!(
                "Expected {} not found: \"{}\". Actual: {}",
                kind,
                message,
                actual.join(" | ")
            ));
        }
    }
}

#[cfg(test)]
mod runner_tests {
    use super::*;

    fn run(source: &str) -> FileReport {
        run_source("tests.lexy", source, &RunOptions::default()).expect("run should pass")
    }

    fn failures(report: &FileReport, name: &str) -> Vec<String> {
        report
            .scenarios
            .iter()
            .find(|scenario| scenario.name == name)
            .map(|scenario| scenario.failures.clone())
            .expect("scenario should exist")
    }

    const DOUBLE: &str = "function Double
  parameters
    number Value
  results
    number Result
  Result = Value * 2
";

    #[test]
    fn parameters_and_results_are_compared() {
        let report = run(&format!(
            "{}\nscenario Passing\n  function Double\n  parameters\n    Value = 4\n  results\n    Result = 8\n\nscenario Failing\n  function Double\n  parameters\n    Value = 4\n  results\n    Result = 9\n",
            DOUBLE
        ));
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert!(failures(&report, "Passing").is_empty());
        assert_eq!(failures(&report, "Failing"), vec!["'Result' should be 9 but is 8".to_string()]);
        let failing = report
            .scenarios
            .iter()
            .find(|scenario| scenario.name == "Failing")
            .expect("failing scenario");
        assert_eq!(failing.log[0], "Execute: Double");
        assert!(!report.passed());
    }

    #[test]
    fn validation_table_rows_run_separately() {
        let report = run(&format!(
            "{}\nscenario Rows\n  function Double\n  validationTable\n    | number Value | number Result |\n    | 1 | 2 |\n    | 3 | 7 |\n",
            DOUBLE
        ));
        let failures = failures(&report, "Rows");
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("Validation row tests.lexy("));
        assert!(failures[0].ends_with("'Result' should be 7 but is 6"));
    }

    #[test]
    fn expected_errors_match_the_dependency_closure() {
        let report = run(
            "function Broken\n  results\n    number Result\n  Result = Missing\n\nscenario Expected\n  function Broken\n  expectErrors\n    \"Unknown variable name: 'Missing'.\"\n\nscenario Unexpected\n  function Broken\n",
        );
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert!(failures(&report, "Expected").is_empty());
        let unexpected = failures(&report, "Unexpected");
        assert_eq!(unexpected.len(), 1);
        assert!(unexpected[0].ends_with("ERROR - Unknown variable name: 'Missing'."));
    }

    #[test]
    fn expected_execution_errors_require_a_failing_run() {
        let report = run(&format!(
            "{}\nscenario Fails\n  function Double\n  parameters\n    Value = 1\n  expectExecutionErrors\n    \"never\"\n",
            DOUBLE
        ));
        assert_eq!(
            failures(&report, "Fails"),
            vec!["Execution should have failed but succeeded.".to_string()]
        );

        let report = run(
            "table Rates\n  | number Income | number Rate |\n  | 10 | 1 |\n\nfunction RateOf\n  parameters\n    number Income\n  results\n    number Result\n  Result = Rates.LookUp(Income, Rates.Rate)\n\nscenario TooSmall\n  function RateOf\n  parameters\n    Income = 1\n  expectExecutionErrors\n    \"EXECUTION_LOOKUP_FAILED\"\n",
        );
        assert!(report.passed(), "{:?}", report);
    }

    #[test]
    fn errors_outside_scenarios_fail_the_file() {
        let report = run("function Broken\n  results\n    number Result\n  Result = Missing\n");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].starts_with("Error outside any scenario: tests.lexy("));
    }

    #[test]
    fn filter_selects_scenarios_by_name() {
        let source = format!(
            "{}\nscenario KeepMe\n  function Double\n  results\n    Result = 0\n\nscenario SkipMe\n  function Double\n  results\n    Result = 1\n",
            DOUBLE
        );
        let options = RunOptions {
            filter: Some(Regex::new("^Keep").expect("regex")),
            ..RunOptions::default()
        };
        let report = run_source("tests.lexy", &source, &options).expect("run should pass");
        assert_eq!(report.scenarios.len(), 1);
        assert!(report.passed());
    }

    #[test]
    fn specification_samples_pass() {
        let report = run_directory(&lx_test_example::specifications_root(), &RunOptions::default())
            .expect("specifications should run");
        assert!(report.passed(), "{:#?}", report.failure_lines());
        assert!(report.scenario_count() > 10);
    }
}
