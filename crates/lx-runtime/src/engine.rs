use std::collections::BTreeMap;

use lx_core::ir::{
    default_object, CallArgumentsIr, CompiledProgram, ExpressionIr, FieldIr, FieldType,
    FunctionCallIr, FunctionIr, LookUpIr, LookUpResult, RowIr, StatementIr, StatementKind,
    VariableReference, VariableSource,
};
use lx_core::{
    parse_date, EnumValue, FunctionResult, LexyError, LibraryRegistry, PrimitiveType, Value,
    VariablePath,
};
use tracing::{debug, trace};

use crate::execution_context::ExecutionContext;
use crate::helpers::value_path::{assign_nested_path, field_type_at};

mod builtins;
mod calls;
mod eval;
mod lookup;
mod parameters;
mod statements;

#[derive(Debug, Clone)]
pub struct LexyEngineOptions {
    pub program: CompiledProgram,
    pub libraries: LibraryRegistry,
}

/// Interprets a compiled program. Every `run` builds its own
/// `ExecutionContext`, so one engine serves any number of invocations.
#[derive(Debug, Clone)]
pub struct LexyEngine {
    program: CompiledProgram,
    libraries: LibraryRegistry,
}

/// Live variables of one function invocation.
#[derive(Debug, Default)]
struct Frame {
    parameters: BTreeMap<String, Value>,
    results: BTreeMap<String, Value>,
    code: BTreeMap<String, Value>,
}

impl Frame {
    fn variables(&self, source: VariableSource) -> &BTreeMap<String, Value> {
        match source {
            VariableSource::Parameters => &self.parameters,
            VariableSource::Results => &self.results,
            VariableSource::Code => &self.code,
        }
    }

    fn variables_mut(&mut self, source: VariableSource) -> &mut BTreeMap<String, Value> {
        match source {
            VariableSource::Parameters => &mut self.parameters,
            VariableSource::Results => &mut self.results,
            VariableSource::Code => &mut self.code,
        }
    }

    fn read(&self, reference: &VariableReference) -> Result<&Value, LexyError> {
        let path = &reference.path;
        let root = self.variables(reference.source).get(path.root());
        let value = match (root, path.child_path()) {
            (Some(root), Some(child)) => root.get_path(&child),
            (root, None) => root,
            (None, Some(_)) => None,
        };
        value.ok_or_else(|| {
            LexyError::new(
                "EXECUTION_VARIABLE_MISSING",
                format!("Variable '{}' has no value.", reference),
            )
        })
    }

    fn write(&mut self, reference: &VariableReference, value: Value) -> Result<(), LexyError> {
        let Some((root, rest)) = reference.path.segments().split_first() else {
            return Err(LexyError::new("EXECUTION_VARIABLE_MISSING", "Empty variable path."));
        };
        let variables = self.variables_mut(reference.source);
        if rest.is_empty() {
            variables.insert(root.clone(), value);
            return Ok(());
        }
        let target = variables.get_mut(root).ok_or_else(|| {
            LexyError::new(
                "EXECUTION_VARIABLE_MISSING",
                format!("Variable '{}' has no value.", root),
            )
        })?;
        assign_nested_path(target, rest, value).map_err(|message| {
            LexyError::new(
                "EXECUTION_VARIABLE_MISSING",
                format!("Can't assign '{}': {}.", reference, message),
            )
        })
    }

    /// Owned copies of the referenced values, keyed by their path.
    fn snapshot(&self, references: &[VariableReference]) -> BTreeMap<String, Value> {
        references
            .iter()
            .filter_map(|reference| {
                self.read(reference)
                    .ok()
                    .map(|value| (reference.path.to_string(), value.clone()))
            })
            .collect()
    }
}

impl LexyEngine {
    pub fn new(options: LexyEngineOptions) -> Self {
        Self {
            program: options.program,
            libraries: options.libraries,
        }
    }

    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.program.function(name).is_some()
    }

    /// Runs `function` with `values` keyed by (dotted) parameter paths.
    /// Omitted parameters keep their declared defaults.
    pub fn run(&self, function: &str, values: &BTreeMap<String, Value>) -> Result<FunctionResult, LexyError> {
        let function = self.function(function)?;
        let parameters = self.parameter_object(function, values)?;
        let mut context = ExecutionContext::new();
        let results = self.execute_function(&mut context, function, parameters)?;
        debug!(function = %function.name, entries = context.entries().len(), "run finished");
        Ok(FunctionResult {
            value: results,
            logging: context.into_entries(),
        })
    }

    fn function(&self, name: &str) -> Result<&FunctionIr, LexyError> {
        self.program.function(name).ok_or_else(|| {
            LexyError::new(
                "ENGINE_FUNCTION_NOT_FOUND",
                format!("Function \"{}\" not found.", name),
            )
        })
    }
}

#[cfg(test)]
mod tests;
