use std::collections::{BTreeMap, BTreeSet};

use lx_compiler::{compile_program, CompileOutput, DependencyGraph};
use lx_core::ir::CompiledProgram;
use lx_core::{
    Diagnostics, FunctionResult, LexyError, Library, LibraryRegistry, SourceReference, Value,
};
use lx_parser::{parse_declarations, tokenize, OperatorType, ParsedSource, RootNode, TokenKind};
use lx_runtime::{LexyEngine, LexyEngineOptions};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Registered next to the built-in `Date`, `Math` and `Number` libraries.
    pub libraries: Vec<Library>,
}

/// Result of a compilation: the diagnostics of every declaration plus an
/// engine over the declarations that validated.
#[derive(Debug, Clone)]
pub struct CompilationEnvironment {
    engine: LexyEngine,
    diagnostics: Diagnostics,
    dependencies: DependencyGraph,
}

impl CompilationEnvironment {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn program(&self) -> &CompiledProgram {
        self.engine.program()
    }

    pub fn node_and_dependencies(&self, node: &str) -> BTreeSet<String> {
        self.dependencies.node_and_dependencies(node)
    }

    /// `None` when the function is unknown or was excluded by errors.
    pub fn get_function<'a>(&'a self, name: &'a str) -> Option<ExecutableFunction<'a>> {
        self.engine.has_function(name).then_some(ExecutableFunction {
            engine: &self.engine,
            name,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutableFunction<'a> {
    engine: &'a LexyEngine,
    name: &'a str,
}

impl ExecutableFunction<'_> {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn run(&self, values: &BTreeMap<String, Value>) -> Result<FunctionResult, LexyError> {
        self.engine.run(self.name, values)
    }
}

pub fn parse_source(file: &str, source: &str) -> ParsedSource {
    parse_declarations(file, source)
}

/// Validates and lowers `nodes`. Source errors end up in the returned
/// diagnostics; only internal failures are `Err`.
pub fn compile(
    nodes: &[RootNode],
    options: CompileOptions,
) -> Result<CompilationEnvironment, LexyError> {
    compile_with_diagnostics(nodes, Diagnostics::new(), options)
}

pub fn compile_source(
    file: &str,
    source: &str,
    options: CompileOptions,
) -> Result<CompilationEnvironment, LexyError> {
    let parsed = parse_source(file, source);
    debug!(file, nodes = parsed.nodes.len(), "parsed source");
    compile_with_diagnostics(&parsed.nodes, parsed.diagnostics, options)
}

fn compile_with_diagnostics(
    nodes: &[RootNode],
    diagnostics: Diagnostics,
    options: CompileOptions,
) -> Result<CompilationEnvironment, LexyError> {
    let libraries = LibraryRegistry::with_libraries(&options.libraries)?;
    let CompileOutput {
        program,
        diagnostics,
        dependencies,
    } = compile_program(nodes, &libraries, diagnostics)?;
    Ok(CompilationEnvironment {
        engine: LexyEngine::new(LexyEngineOptions { program, libraries }),
        diagnostics,
        dependencies,
    })
}

/// Reads a command-line value: a Lexy literal (`12.5`, `-3`, `"text"`,
/// `true`, `d"2024-01-31"`); anything else is taken as plain text.
pub fn parse_value(text: &str) -> Value {
    let reference = SourceReference::new("value", 1, 1);
    let Ok(tokens) = tokenize(text.trim(), &reference) else {
        return Value::String(text.to_string());
    };
    match tokens.as_slice() {
        [token] => match &token.kind {
            TokenKind::Literal(literal) => literal.to_value(),
            _ => Value::String(text.to_string()),
        },
        [sign, token] if sign.kind == TokenKind::Operator(OperatorType::Subtraction) => {
            match &token.kind {
                TokenKind::Literal(literal) => match literal.to_value() {
                    Value::Number(number) => Value::Number(-number),
                    _ => Value::String(text.to_string()),
                },
                _ => Value::String(text.to_string()),
            }
        }
        _ => Value::String(text.to_string()),
    }
}
