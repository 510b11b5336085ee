use super::*;
use lx_parser::parse_declarations;

fn compile(source: &str) -> CompileOutput {
    let parsed = parse_declarations("tests.lexy", source);
    let libraries = LibraryRegistry::with_builtins().expect("builtin libraries");
    compile_program(&parsed.nodes, &libraries, parsed.diagnostics).expect("compile should not fail internally")
}

fn messages(output: &CompileOutput) -> Vec<String> {
    output
        .diagnostics
        .errors()
        .map(|entry| entry.message.clone())
        .collect()
}

fn assigned_value<'a>(output: &'a CompileOutput, function: &str, index: usize) -> &'a ExpressionIr {
    let function = output.program.function(function).expect("generated function");
    match &function.body[index].kind {
        StatementIrKind::Assign { value, .. } | StatementIrKind::Declare { value, .. } => value,
        other => panic!("expected assignment, got {:?}", other),
    }
}

const RATES: &str = "table Rates
  | number Income | number Rate |
  | 0 | 0.1 |
  | 100 | 0.2 |
";

#[test]
fn literal_assignment_compiles_to_a_single_statement() {
    let output = compile("function F\n  results\n    number Result\n  Result = 777\n");
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    let function = output.program.function("F").expect("generated function");
    assert_eq!(function.class_name, "FunctionF");
    assert_eq!(function.body.len(), 1);
    assert_eq!(assigned_value(&output, "F", 0), &ExpressionIr::Literal(Value::from(777)));
    assert_eq!(function.body[0].line.text, "Result = 777");
    assert_eq!(function.body[0].writes[0].path.to_string(), "Result");
}

#[test]
fn compiling_twice_gives_identical_output() {
    let source = "function F\n  results\n    number Result\n  Result = Missing\n\nfunction G\n  results\n    number Result\n  Result = 1\n";
    let first = compile(source);
    let second = compile(source);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.program, second.program);
}

#[test]
fn unknown_variables_are_reported_on_the_owning_node() {
    let output = compile(
        "function F\n  results\n    number Result\n  Result = Missing\n\nfunction G\n  results\n    number Result\n  Result = 1\n",
    );
    assert_eq!(messages(&output), vec!["Unknown variable name: 'Missing'.".to_string()]);
    assert!(output.diagnostics.node_has_errors("F"));
    assert!(!output.diagnostics.node_has_errors("G"));
    assert!(output.program.function("F").is_none());
    assert!(output.program.function("G").is_some());
}

#[test]
fn callers_of_invalid_functions_are_not_generated() {
    let output = compile(
        "function Broken\n  results\n    number Result\n  Result = Missing\n\nfunction Caller\n  results\n    number Result\n  var Inner = Broken()\n",
    );
    assert!(!output.diagnostics.node_has_errors("Caller"));
    assert!(output.node_and_dependencies("Caller").contains("Broken"));
    assert!(output.program.function("Caller").is_none());
}

#[test]
fn assignment_types_must_match() {
    let output = compile("function F\n  results\n    number Result\n  Result = \"text\"\n");
    assert_eq!(
        messages(&output),
        vec!["Invalid expression type. Variable 'Result' is 'number' but the expression is 'string'.".to_string()]
    );
}

#[test]
fn mutual_and_self_recursion_are_circular() {
    let output = compile(
        "function A\n  results\n    number Result\n  var Other = B()\n\nfunction B\n  results\n    number Result\n  var Other = A()\n\nfunction C\n  results\n    number Result\n  var Again = C()\n\nfunction D\n  results\n    number Result\n  Result = 1\n",
    );
    let errors = messages(&output);
    for name in ["A", "B", "C"] {
        assert!(
            errors.contains(&format!("Circular reference detected in: '{}'.", name)),
            "{:?}",
            errors
        );
        assert!(output.program.function(name).is_none());
    }
    assert!(!output.diagnostics.node_has_errors("D"));
    assert!(output.program.function("D").is_some());
}

#[test]
fn duplicated_variables_are_rejected() {
    let output = compile("function F\n  parameters\n    number Value\n  results\n    number Result\n  var Value = 1\n");
    assert_eq!(messages(&output), vec!["Duplicated variable name: 'Value'.".to_string()]);
}

#[test]
fn lookup_defaults_to_the_first_column() {
    let source = format!(
        "{}\nfunction Tax\n  parameters\n    number Income\n  results\n    number Rate\n  Rate = Rates.LookUp(Income, Rates.Rate)\n",
        RATES
    );
    let output = compile(&source);
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    let ExpressionIr::LookUp(lookup) = assigned_value(&output, "Tax", 0) else {
        panic!("expected lookup");
    };
    assert_eq!(lookup.table, "Rates");
    assert_eq!(lookup.search_column, "Income");
    assert_eq!(lookup.result, LookUpResult::Column("Rate".to_string()));
    assert!(lookup.discriminator.is_none());
    assert!(output.node_and_dependencies("Tax").contains("Rates"));
}

#[test]
fn lookup_with_discriminator_searches_the_second_column() {
    let output = compile(
        "table Rates\n  | string Kind | number Income | number Rate |\n  | \"A\" | 0 | 0.1 |\n\nfunction Tax\n  parameters\n    number Income\n  results\n    number Rate\n  Rate = Rates.LookUp(\"A\", Income, Rates.Rate)\n",
    );
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    let ExpressionIr::LookUp(lookup) = assigned_value(&output, "Tax", 0) else {
        panic!("expected lookup");
    };
    assert_eq!(lookup.search_column, "Income");
    assert_eq!(
        lookup.discriminator.as_ref().map(|discriminator| discriminator.column.as_str()),
        Some("Kind")
    );
}

#[test]
fn table_cells_are_checked_against_their_column() {
    let output = compile("table Rates\n  | number Income | number Rate |\n  | 0 | \"high\" |\n");
    assert_eq!(
        messages(&output),
        vec!["Invalid value of column 'Rate'. Expected 'number' but got 'string'.".to_string()]
    );
    assert!(output.program.table("Rates").is_none());
}

#[test]
fn parameter_defaults_follow_declared_types() {
    let output = compile(
        "enum Color\n  Red\n  Green\n\ntype Inner\n  number First = 5\n  string Second\n\nfunction F\n  parameters\n    Color Shade\n    Inner Nested\n  results\n    number Result\n  Result = Nested.First\n",
    );
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    let function = output.program.function("F").expect("generated function");
    assert_eq!(function.parameters[0].default, Value::from(EnumValue::new("Color", "Red")));
    let Value::Object(nested) = &function.parameters[1].default else {
        panic!("expected object default, got {:?}", function.parameters[1].default);
    };
    assert_eq!(nested.get("First"), Some(&Value::from(5)));
    assert_eq!(nested.get("Second"), Some(&Value::from("")));
}

#[test]
fn builtin_arguments_are_type_checked() {
    let output = compile("function F\n  results\n    number Result\n  Result = INT(\"a\")\n");
    let errors = messages(&output);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with("Invalid argument 1"), "{:?}", errors);
    assert!(errors[0].contains("of 'INT'"), "{:?}", errors);
}

#[test]
fn parameter_objects_and_positional_arguments_lower_differently() {
    let output = compile(
        "function Sub\n  parameters\n    number Value\n  results\n    number Result\n  Result = Value\n\nfunction Caller\n  results\n    number Result\n  var Input = new(Sub.Parameters)\n  var First = Sub(Input)\n  var Second = Sub(2)\n",
    );
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    let ExpressionIr::Call(object) = assigned_value(&output, "Caller", 1) else {
        panic!("expected call");
    };
    assert!(matches!(object.arguments, CallArgumentsIr::Object(_)));
    let ExpressionIr::Call(positional) = assigned_value(&output, "Caller", 2) else {
        panic!("expected call");
    };
    match &positional.arguments {
        CallArgumentsIr::Positional(arguments) => assert_eq!(arguments[0].0, "Value"),
        other => panic!("expected positional arguments, got {:?}", other),
    }
}

#[test]
fn spread_calls_bind_variables_by_name() {
    let output = compile(
        "function Sub\n  parameters\n    number Value\n  results\n    number Result\n  Result = Value\n\nfunction Caller\n  results\n    number Result\n  var Value = 3\n  Sub(...)\n",
    );
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    let function = output.program.function("Caller").expect("generated function");
    match &function.body[1].kind {
        StatementIrKind::SpreadCall { call, targets } => {
            assert_eq!(call.function, "Sub");
            assert_eq!(targets[0].0, "Result");
            assert_eq!(targets[0].1.source, VariableSource::Results);
        }
        other => panic!("expected spread call, got {:?}", other),
    }
}

#[test]
fn unknown_library_functions_are_reported() {
    let output = compile("function F\n  results\n    number Result\n  Result = Math.Nothing(1)\n");
    assert_eq!(messages(&output), vec!["Unknown library function: 'Math.Nothing'.".to_string()]);
}

#[test]
fn inline_scenario_functions_are_generated_under_the_scenario_name() {
    let output = compile(
        "scenario Check\n  function\n    results\n      number Result\n    code\n      Result = 777\n  results\n    Result = 777\n",
    );
    assert!(!output.diagnostics.has_errors(), "{:?}", output.diagnostics);
    assert!(output.program.function("CheckFunction").is_some());
    let scenario = output.program.scenario("Check").expect("scenario");
    assert_eq!(scenario.function.as_deref(), Some("CheckFunction"));
    assert_eq!(scenario.results[0].value, Value::from(777));
}

#[test]
fn scenario_parameters_must_exist_on_the_function() {
    let output = compile(
        "function F\n  parameters\n    number Value\n  results\n    number Result\n  Result = Value\n\nscenario S\n  function F\n  parameters\n    Missing = 1\n",
    );
    assert_eq!(messages(&output), vec!["Unknown parameter: 'Missing'.".to_string()]);
    assert!(output.diagnostics.node_has_errors("S"));
    assert!(output.program.scenario("S").is_some());
    assert!(output.program.function("F").is_some());
}
