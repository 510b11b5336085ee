use super::*;
use lx_compiler::compile_program;
use lx_core::{render_log, ExecutionLogEntry};
use lx_parser::parse_declarations;

fn engine_from_source(source: &str) -> LexyEngine {
    let parsed = parse_declarations("tests.lexy", source);
    let libraries = LibraryRegistry::with_builtins().expect("builtin libraries");
    let output = compile_program(&parsed.nodes, &libraries, parsed.diagnostics).expect("compile should pass");
    assert!(
        !output.diagnostics.has_errors(),
        "{:?}",
        output.diagnostics.error_messages()
    );
    LexyEngine::new(LexyEngineOptions {
        program: output.program,
        libraries,
    })
}

fn values(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

fn run(engine: &LexyEngine, function: &str, entries: &[(&str, Value)]) -> FunctionResult {
    engine
        .run(function, &values(entries))
        .expect("run should pass")
}

fn all_entries(entries: &[ExecutionLogEntry]) -> Vec<&ExecutionLogEntry> {
    let mut all = Vec::new();
    for entry in entries {
        all.push(entry);
        all.extend(all_entries(&entry.entries));
    }
    all
}

const RATES: &str = "table Rates
  | number Search | number Value |
  | 0 | 0 |
  | 1 | 1 |

function Rate
  parameters
    number Query
  results
    number Result
  Result = Rates.LookUp(Query, Rates.Value)
";

#[test]
fn literal_result_round_trips() {
    let engine = engine_from_source("function F\n  results\n    number Result\n  Result = 777\n");
    let result = run(&engine, "F", &[]);
    assert_eq!(result.get("Result"), Some(&Value::from(777)));
    assert_eq!(result.value.len(), 1);
}

#[test]
fn omitted_parameters_keep_their_defaults() {
    let engine = engine_from_source(
        "function F\n  parameters\n    number Input = 5\n  results\n    number Result\n  Result = Input\n",
    );
    assert_eq!(run(&engine, "F", &[]).get("Result"), Some(&Value::from(5)));
    assert_eq!(
        run(&engine, "F", &[("Input", Value::from(777))]).get("Result"),
        Some(&Value::from(777))
    );
}

#[test]
fn nested_result_members_are_assigned_in_place() {
    let engine = engine_from_source(
        "type Inner\n  number First\n  string Second\n\nfunction F\n  results\n    Inner Inner\n  Inner.First = 777\n  Inner.Second = \"123\"\n",
    );
    let result = run(&engine, "F", &[]);
    assert_eq!(result.get("Inner.First"), Some(&Value::from(777)));
    assert_eq!(result.get("Inner.Second"), Some(&Value::from("123")));
}

#[test]
fn dotted_parameter_keys_expand_into_objects() {
    let engine = engine_from_source(
        "type Inner\n  number First\n  number Second = 2\n\nfunction F\n  parameters\n    Inner Values\n  results\n    number Result\n  Result = Values.First + Values.Second\n",
    );
    let result = run(&engine, "F", &[("Values.First", Value::from(40))]);
    assert_eq!(result.get("Result"), Some(&Value::from(42)));
}

#[test]
fn enum_values_render_as_tags_and_accept_tags_as_input() {
    let engine = engine_from_source(
        "enum Color\n  Red\n  Green\n\nfunction F\n  parameters\n    Color Input\n  results\n    Color Shade\n    boolean IsGreen\n  Shade = Color.Green\n  IsGreen = Input == Color.Green\n",
    );
    let result = run(&engine, "F", &[("Input", Value::from("Color.Green"))]);
    let shade = result.get("Shade").expect("shade");
    assert_eq!(shade, &Value::Enum(EnumValue::new("Color", "Green")));
    assert_eq!(shade.to_string(), "Color.Green");
    assert_eq!(result.get("IsGreen"), Some(&Value::Boolean(true)));

    let defaults = run(&engine, "F", &[]);
    assert_eq!(defaults.get("IsGreen"), Some(&Value::Boolean(false)));
}

#[test]
fn invalid_parameters_are_reported_together() {
    let engine = engine_from_source(
        "function F\n  parameters\n    number Input\n  results\n    number Result\n  Result = Input\n",
    );
    let error = engine
        .run(
            "F",
            &values(&[("Input", Value::from("text")), ("Missing", Value::from(1))]),
        )
        .expect_err("invalid parameters");
    assert_eq!(error.code, "EXECUTION_PARAMETERS_INVALID");
    assert!(error.message.contains("Unknown parameter: 'Missing'."));
    assert!(error
        .message
        .contains("Invalid parameter 'Input'. Expected 'number' but got \"text\"."));
}

#[test]
fn table_count_is_the_number_of_rows() {
    let engine = engine_from_source(
        "table Rates\n  | number Income | number Rate |\n  | 0 | 0.1 |\n  | 100 | 0.2 |\n  | 200 | 0.3 |\n\nfunction F\n  results\n    number Result\n  Result = Rates.Count\n",
    );
    assert_eq!(run(&engine, "F", &[]).get("Result"), Some(&Value::from(3)));
}

#[test]
fn lookup_past_the_last_row_returns_the_last_row() {
    let engine = engine_from_source(RATES);
    assert_eq!(
        run(&engine, "Rate", &[("Query", Value::from(2))]).get("Result"),
        Some(&Value::from(1))
    );
    assert_eq!(
        run(&engine, "Rate", &[("Query", Value::from(0))]).get("Result"),
        Some(&Value::from(0))
    );
}

#[test]
fn lookup_before_the_first_row_fails() {
    let engine = engine_from_source(RATES);
    let error = engine
        .run("Rate", &values(&[("Query", Value::from(-1))]))
        .expect_err("no preceding row");
    assert_eq!(error.code, "EXECUTION_LOOKUP_FAILED");
}

#[test]
fn logged_values_never_include_table_rows() {
    let engine = engine_from_source(RATES);
    let result = run(&engine, "Rate", &[("Query", Value::from(1))]);
    let entries = all_entries(&result.logging);
    assert!(entries
        .iter()
        .all(|entry| !entry.read_variables.contains_key("Rates")
            && !entry.write_variables.contains_key("Rates")));
    assert!(entries
        .iter()
        .any(|entry| entry.message == "Lookup 1 in table 'Rates' found row 2."));
}

#[test]
fn log_snapshots_are_taken_when_logged() {
    let engine = engine_from_source(
        "function F\n  parameters\n    number Input\n  results\n    number Result\n  Result = Input\n  Result = Result + 1\n",
    );
    let result = run(&engine, "F", &[("Input", Value::from(5))]);
    assert_eq!(result.get("Result"), Some(&Value::from(6)));
    assert_eq!(
        render_log(&result.logging),
        vec![
            "Execute: F".to_string(),
            "  Parameters {read: Input=5}".to_string(),
            "  Result = Input {read: Input=5} {write: Result=5}".to_string(),
            "  Result = Result + 1 {read: Result=5} {write: Result=6}".to_string(),
            "  Results {read: Result=6}".to_string(),
        ]
    );
}

#[test]
fn called_functions_log_under_the_calling_line() {
    let engine = engine_from_source(
        "function Sub\n  parameters\n    number Value\n  results\n    number Result\n  Result = Value * 2\n\nfunction Caller\n  results\n    number Result\n  var Out = Sub(21)\n  Result = Out.Result\n",
    );
    let result = run(&engine, "Caller", &[]);
    assert_eq!(result.get("Result"), Some(&Value::from(42)));
    let caller = &result.logging[0];
    let call_line = &caller.entries[1];
    assert_eq!(call_line.message, "var Out = Sub(21)");
    assert_eq!(call_line.entries[0].message, "Execute: Sub");
    assert_eq!(call_line.entries[0].entries[0].read_variables.get("Value"), Some(&Value::from(21)));
}

#[test]
fn spread_calls_fill_and_extract_by_name() {
    let engine = engine_from_source(
        "function Sub\n  parameters\n    number Value\n  results\n    number Result\n  Result = Value + 1\n\nfunction Caller\n  results\n    number Result\n  var Value = 41\n  Sub(...)\n",
    );
    assert_eq!(run(&engine, "Caller", &[]).get("Result"), Some(&Value::from(42)));
}

#[test]
fn taken_branch_nests_under_its_condition() {
    let engine = engine_from_source(
        "function F\n  parameters\n    number Input\n  results\n    string Result\n  if Input > 10\n    Result = \"high\"\n  elseif Input > 5\n    Result = \"medium\"\n  else\n    Result = \"low\"\n",
    );
    assert_eq!(
        run(&engine, "F", &[("Input", Value::from(20))]).get("Result"),
        Some(&Value::from("high"))
    );
    let result = run(&engine, "F", &[("Input", Value::from(7))]);
    assert_eq!(result.get("Result"), Some(&Value::from("medium")));
    let lines = render_log(&result.logging);
    assert_eq!(lines[2], "  if Input > 10 {read: Input=7}");
    assert_eq!(lines[3], "  elseif Input > 5 {read: Input=7}");
    assert_eq!(lines[4], "    Result = \"medium\" {write: Result=\"medium\"}");
    assert_eq!(
        run(&engine, "F", &[("Input", Value::from(1))]).get("Result"),
        Some(&Value::from("low"))
    );
}

#[test]
fn builtins_and_libraries_evaluate() {
    let engine = engine_from_source(
        "function F\n  results\n    number Rounded\n    number Larger\n  Rounded = ROUND(POWER(2, 3) / 3, 2)\n  Larger = Math.Max(3, 7)\n",
    );
    let result = run(&engine, "F", &[]);
    assert_eq!(result.get_number("Rounded"), Some("2.67".parse().expect("decimal")));
    assert_eq!(result.get("Larger"), Some(&Value::from(7)));
}

#[test]
fn runtime_errors_propagate_out_of_run() {
    let engine = engine_from_source(
        "function F\n  parameters\n    number Divisor\n  results\n    number Result\n  Result = 1 / Divisor\n",
    );
    let error = engine.run("F", &BTreeMap::new()).expect_err("division by zero");
    assert_eq!(error.code, "EXECUTION_ARITHMETIC_FAILED");
    let error = engine.run("Missing", &BTreeMap::new()).expect_err("unknown function");
    assert_eq!(error.code, "ENGINE_FUNCTION_NOT_FOUND");
}
