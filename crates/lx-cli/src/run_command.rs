use std::collections::BTreeMap;
use std::fs;

use anyhow::Context;
use lx_api::{compile_source, CompileOptions};
use lx_core::{render_log, LexyError, Value};
use tracing::debug;

use crate::{RunArgs, RESULT_OK};

fn flatten(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Object(members) => {
            for (name, member) in members {
                flatten(&format!("{}{}.", prefix, name), member, lines);
            }
        }
        other => lines.push(format!("{}={}", prefix.trim_end_matches('.'), other)),
    }
}

pub(crate) fn run_function(args: RunArgs) -> anyhow::Result<i32> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let file = args.file.to_string_lossy().replace('\\', "/");
    let environment = compile_source(&file, &source, CompileOptions::default())?;

    let function = environment.get_function(&args.function).ok_or_else(|| {
        let closure = environment.node_and_dependencies(&args.function);
        let errors = lx_core::format_sorted(environment.diagnostics().errors_for_nodes(&closure));
        LexyError::new(
            "CLI_FUNCTION_UNAVAILABLE",
            format!(
                "Function '{}' is not available.{}",
                args.function,
                errors
                    .iter()
                    .map(|error| format!("\n{}", error))
                    .collect::<String>()
            ),
        )
    })?;

    let values = args.values.into_iter().collect::<BTreeMap<_, _>>();
    debug!(function = %args.function, values = values.len(), "running function");
    let result = function.run(&values)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serializing function result")?
        );
        return Ok(0);
    }

    println!("{}", RESULT_OK);
    let mut lines = Vec::new();
    for (name, value) in &result.value {
        flatten(&format!("{}.", name), value, &mut lines);
    }
    for line in lines {
        println!("VALUE:{}", line);
    }
    for line in render_log(&result.logging) {
        println!("LOG:{}", line);
    }
    Ok(0)
}

#[cfg(test)]
mod run_command_tests {
    use super::*;

    #[test]
    fn flatten_writes_nested_members_as_paths() {
        let mut inner = BTreeMap::new();
        inner.insert("First".to_string(), Value::from(1));
        inner.insert("Second".to_string(), Value::from("two"));
        let mut lines = Vec::new();
        flatten("Inner.", &Value::Object(inner), &mut lines);
        flatten("Total.", &Value::from(3), &mut lines);
        assert_eq!(
            lines,
            vec![
                "Inner.First=1".to_string(),
                "Inner.Second=\"two\"".to_string(),
                "Total=3".to_string()
            ]
        );
    }
}
