use crate::*;

fn log_line(statement: &Statement) -> LogLine {
    LogLine {
        reference: statement.line.reference.clone(),
        text: statement.line.text.clone(),
    }
}

fn reads_of(expression: &ExpressionIr) -> Vec<VariableReference> {
    let mut reads = Vec::new();
    expression.collect_reads(&mut reads);
    reads
}

impl ValidationContext<'_> {
    /// Validates a code block. Invalid statements are reported and left out.
    pub(crate) fn validate_statements(&mut self, statements: &[Statement]) -> Vec<StatementIr> {
        statements
            .iter()
            .filter_map(|statement| self.validate_statement(statement))
            .collect()
    }

    fn validate_statement(&mut self, statement: &Statement) -> Option<StatementIr> {
        let reference = &statement.line.reference;
        match &statement.kind {
            StatementKind::Declaration(definition) => self.variable_declaration(statement, definition),
            StatementKind::Assignment { target, value } => {
                let target_reference = match self.resolve_identifier(target) {
                    Some(Resolved::Value {
                        ir: ExpressionIr::Variable(variable),
                        variable_type,
                    }) => Some((variable, variable_type)),
                    Some(_) => {
                        self.fail(
                            &target.reference,
                            format!("Invalid assignment. '{}' is not a variable.", target.path),
                        );
                        None
                    }
                    None => None,
                };
                let value = self.value_expression(value);
                let ((target, target_type), (value, value_type)) = (target_reference?, value?);
                if target_type != value_type {
                    self.fail(
                        reference,
                        format!(
                            "Invalid expression type. Variable '{}' is '{}' but the expression is '{}'.",
                            target, target_type, value_type
                        ),
                    );
                    return None;
                }
                Some(StatementIr {
                    line: log_line(statement),
                    reads: reads_of(&value),
                    writes: vec![target.clone()],
                    kind: StatementIrKind::Assign { target, value },
                })
            }
            StatementKind::Expression(expression) => self.call_statement(statement, expression),
            StatementKind::If {
                branches,
                otherwise,
            } => {
                let mut validated = Vec::new();
                let mut reads = Vec::new();
                for branch in branches {
                    let condition = self.value_expression(&branch.condition);
                    let body = self.in_scope(|context| context.validate_statements(&branch.body));
                    let Some((condition, condition_type)) = condition else {
                        continue;
                    };
                    if condition_type != VariableType::BOOLEAN {
                        self.fail(
                            &branch.line.reference,
                            format!(
                                "Invalid condition type. Expected 'boolean' but got '{}'.",
                                condition_type
                            ),
                        );
                        continue;
                    }
                    let branch_reads = reads_of(&condition);
                    for read in &branch_reads {
                        if !reads.contains(read) {
                            reads.push(read.clone());
                        }
                    }
                    validated.push(ConditionalIr {
                        line: LogLine {
                            reference: branch.line.reference.clone(),
                            text: branch.line.text.clone(),
                        },
                        condition,
                        reads: branch_reads,
                        body,
                    });
                }
                let otherwise = otherwise.as_ref().map(|block| ElseIr {
                    line: LogLine {
                        reference: block.line.reference.clone(),
                        text: block.line.text.clone(),
                    },
                    body: self.in_scope(|context| context.validate_statements(&block.body)),
                });
                (validated.len() == branches.len()).then(|| StatementIr {
                    line: log_line(statement),
                    reads,
                    writes: Vec::new(),
                    kind: StatementIrKind::If {
                        branches: validated,
                        otherwise,
                    },
                })
            }
        }
    }

    fn variable_declaration(
        &mut self,
        statement: &Statement,
        definition: &VariableDefinition,
    ) -> Option<StatementIr> {
        let declared = match &definition.declared_type {
            DeclarationType::Implicit => None,
            DeclarationType::Named(path) => Some(self.resolve_type(path, &definition.reference)?),
        };
        let value = match &definition.default {
            Some(expression) => Some(self.value_expression(expression)?),
            None => None,
        };

        if self.variables.contains(&definition.name) {
            self.fail(
                &definition.reference,
                format!("Duplicated variable name: '{}'.", definition.name),
            );
            return None;
        }

        let (variable_type, value) = match (declared, value) {
            (Some(declared), Some((value, actual))) if declared != actual => {
                self.fail(
                    &definition.reference,
                    format!(
                        "Invalid expression type. Variable '{}' is '{}' but the expression is '{}'.",
                        definition.name, declared, actual
                    ),
                );
                return None;
            }
            (_, Some((value, actual))) => (actual, value),
            (Some(declared), None) => {
                let value = self.default_expression(&declared);
                (declared, value)
            }
            (None, None) => {
                self.fail(
                    &definition.reference,
                    format!("Invalid variable declaration '{}'. Value expected.", definition.name),
                );
                return None;
            }
        };

        self.variables.add(
            &definition.name,
            VariableEntry {
                variable_type,
                source: VariableSource::Code,
            },
        );
        let target = VariableReference::new(VariableSource::Code, VariablePath::parse(&definition.name));
        Some(StatementIr {
            line: log_line(statement),
            reads: reads_of(&value),
            writes: vec![target],
            kind: StatementIrKind::Declare {
                name: definition.name.clone(),
                value,
            },
        })
    }

    /// Only calls can stand alone: library and user functions, `extract`
    /// and spread calls.
    fn call_statement(&mut self, statement: &Statement, expression: &Expression) -> Option<StatementIr> {
        let Expression::FunctionCall(call) = expression else {
            self.fail(
                expression.reference(),
                "Invalid expression. Only function calls can be used as a statement.",
            );
            return None;
        };

        match &call.call {
            FunctionCall::System {
                function: SystemFunction::Extract,
                argument,
            } => {
                let (value, value_type) = self.value_expression(argument)?;
                if !value_type.is_composite() {
                    self.fail(
                        argument.reference(),
                        format!(
                            "Invalid argument of 'extract'. Expected a composite value but got '{}'.",
                            value_type
                        ),
                    );
                    return None;
                }
                let targets = self.extract_targets(&value_type, &call.reference)?;
                Some(StatementIr {
                    line: log_line(statement),
                    reads: reads_of(&value),
                    writes: targets.iter().map(|(_, target)| target.clone()).collect(),
                    kind: StatementIrKind::Extract { value, targets },
                })
            }
            FunctionCall::Spread { name } => {
                let (call_ir, targets) = self.spread_call(name, &call.reference)?;
                let mut reads = Vec::new();
                if let CallArgumentsIr::Spread(sources) = &call_ir.arguments {
                    reads.extend(sources.iter().map(|(_, source)| source.clone()));
                }
                Some(StatementIr {
                    line: log_line(statement),
                    reads,
                    writes: targets.iter().map(|(_, target)| target.clone()).collect(),
                    kind: StatementIrKind::SpreadCall {
                        call: call_ir,
                        targets,
                    },
                })
            }
            FunctionCall::User { .. } | FunctionCall::Member { .. } => {
                let (value, _) = self.value_expression(expression)?;
                Some(StatementIr {
                    line: log_line(statement),
                    reads: reads_of(&value),
                    writes: Vec::new(),
                    kind: StatementIrKind::Evaluate(value),
                })
            }
            _ => {
                self.fail(
                    expression.reference(),
                    "Invalid expression. Only function calls can be used as a statement.",
                );
                None
            }
        }
    }
}
