use std::collections::{BTreeMap, BTreeSet};

use lx_core::ir::{
    AssignmentIr, BinaryOperator, CallArgumentsIr, ColumnIr, ComponentKind, CompiledProgram,
    ConditionalIr, DiscriminatorIr, ElseIr, EnumIr, EnumMemberIr, ExpressionIr, FieldIr,
    FieldType, FunctionCallIr, FunctionIr, GeneratedComponent, LogLine, LookUpIr, LookUpResult,
    RowIr, ScenarioIr, StatementIr, StatementKind as StatementIrKind, TableIr, TypeIr,
    ValidationRowIr, VariableReference, VariableSource,
};
use lx_core::{
    default_primitive_value, Diagnostics, EnumValue, GeneratedType, GeneratedTypeSource,
    LexyError, LibraryRegistry, PrimitiveType, SourceReference, Value, VariablePath, VariableType,
};
use lx_parser::line_parsers::enum_ordinal;
use lx_parser::{
    flatten_assignments, AssignmentNode, BinaryExpression, ColumnDefinition, DeclarationType,
    EnumNode, ExpectedMessage, Expression, FunctionCall, FunctionCallExpression, FunctionNode,
    IdentifierExpression, LookUpCall, RootNode, ScenarioFunction, ScenarioNode, Statement,
    StatementKind, SystemFunction, TableNode, TypeDefinitionNode, ValidationTableNode,
    VariableDefinition,
};
use tracing::{debug, trace};

mod context;
mod declarations;
mod defaults;
mod dependency_graph;
mod expressions;
mod function_calls;
mod scenarios;
mod statements;
mod type_resolution;
mod verify;
mod writers;

use context::*;
pub use dependency_graph::DependencyGraph;
use expressions::Resolved;
use verify::verify_program;
use writers::{class_name, write_component};

/// Everything a compile invocation produces. Validation problems live in
/// `diagnostics`; only declarations whose dependency closure is free of
/// errors are lowered into `program`.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub program: CompiledProgram,
    pub diagnostics: Diagnostics,
    pub dependencies: DependencyGraph,
}

impl CompileOutput {
    /// Names of the declarations `node` depends on, `node` included.
    pub fn node_and_dependencies(&self, node: &str) -> BTreeSet<String> {
        self.dependencies.node_and_dependencies(node)
    }
}

#[derive(Debug)]
enum Validated {
    Component(GeneratedComponent),
    Scenario(ScenarioIr),
}

/// Validates and lowers parsed declarations. `diagnostics` carries the
/// entries already produced while parsing so nodes with parse errors are
/// excluded from generation as well.
pub fn compile_program(
    nodes: &[RootNode],
    libraries: &LibraryRegistry,
    diagnostics: Diagnostics,
) -> Result<CompileOutput, LexyError> {
    let mut context = ValidationContext::new(nodes, libraries, diagnostics);
    let components = context.components.all();
    debug!(components = components.len(), "collected declarations");

    let mut validated = Vec::new();
    for component in &components {
        context.enter_node(component.name());
        let result = match component {
            ComponentNode::Function(function) => context
                .validate_function(function)
                .map(|function| Validated::Component(GeneratedComponent::Function(function))),
            ComponentNode::Table(table) => context
                .validate_table(table)
                .map(|table| Validated::Component(GeneratedComponent::Table(table))),
            ComponentNode::Enum(enumeration) => context
                .validate_enum(enumeration)
                .map(|enumeration| Validated::Component(GeneratedComponent::Enum(enumeration))),
            ComponentNode::Type(declared) => context
                .validate_type(declared)
                .map(|declared| Validated::Component(GeneratedComponent::Type(declared))),
            ComponentNode::Scenario(scenario) => {
                Some(Validated::Scenario(context.validate_scenario(scenario)))
            }
        };
        context.leave_node(component.name());
        if let Some(result) = result {
            validated.push((component.name().to_string(), result));
        }
    }
    debug!(validated = validated.len(), "validated declarations");

    let dependencies = context.dependency_graph();
    let circular = dependencies.circular_nodes();
    for name in &circular {
        if let Some(component) = context.components.get(name) {
            context.diagnostics.fail_for_node(
                name,
                component.reference().clone(),
                format!("Circular reference detected in: '{}'.", name),
            );
        }
    }
    debug!(circular = circular.len(), "built dependency graph");

    let diagnostics = context.into_diagnostics();
    let mut program = CompiledProgram::new();
    let mut executable_scenarios = BTreeSet::new();
    for (name, validated) in validated {
        let clean = dependencies
            .node_and_dependencies(&name)
            .iter()
            .all(|node| !diagnostics.node_has_errors(node));
        match validated {
            Validated::Component(component) if clean => program.insert(write_component(component)?)?,
            Validated::Component(_) => trace!(node = %name, "skipped generation"),
            Validated::Scenario(scenario) => {
                if clean {
                    executable_scenarios.insert(name);
                }
                program.insert_scenario(scenario);
            }
        }
    }
    verify_program(&program, &executable_scenarios)?;
    debug!(
        components = program.components().count(),
        scenarios = program.scenarios().count(),
        "generated components"
    );

    Ok(CompileOutput {
        program,
        diagnostics,
        dependencies,
    })
}

#[cfg(test)]
mod tests;
