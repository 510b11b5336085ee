use crate::*;

struct Verifier<'a> {
    program: &'a CompiledProgram,
    component: &'a GeneratedComponent,
}

impl Verifier<'_> {
    fn fail(&self, message: String) -> LexyError {
        LexyError::internal(format!("{}\n{:#?}", message, self.component))
    }

    fn function(&self, name: &str) -> Result<(), LexyError> {
        match self.program.function(name) {
            Some(_) => Ok(()),
            None => Err(self.fail(format!("Function '{}' was not generated.", name))),
        }
    }

    fn table(&self, name: &str) -> Result<(), LexyError> {
        match self.program.table(name) {
            Some(_) => Ok(()),
            None => Err(self.fail(format!("Table '{}' was not generated.", name))),
        }
    }

    fn value(&self, value: &Value) -> Result<(), LexyError> {
        match value {
            Value::Enum(enum_value) => match self.program.enumeration(&enum_value.enum_name) {
                Some(enumeration) if enumeration.contains(enum_value) => Ok(()),
                _ => Err(self.fail(format!("Enum value '{}' was not generated.", enum_value))),
            },
            Value::Object(entries) => entries.values().try_for_each(|entry| self.value(entry)),
            _ => Ok(()),
        }
    }

    fn fields(&self, fields: &[FieldIr]) -> Result<(), LexyError> {
        fields.iter().try_for_each(|field| self.value(&field.default))
    }

    fn expression(&self, expression: &ExpressionIr) -> Result<(), LexyError> {
        match expression {
            ExpressionIr::Literal(value) => self.value(value),
            ExpressionIr::Variable(_) => Ok(()),
            ExpressionIr::TableCount(table) => self.table(table),
            ExpressionIr::Binary { left, right, .. } => {
                self.expression(left)?;
                self.expression(right)
            }
            ExpressionIr::Builtin { arguments, .. } => {
                arguments.iter().try_for_each(|argument| self.expression(argument))
            }
            ExpressionIr::Library { arguments, .. } => {
                arguments.iter().try_for_each(|argument| self.expression(argument))
            }
            ExpressionIr::LookUp(lookup) => {
                let Some(table) = self.program.table(&lookup.table) else {
                    return self.table(&lookup.table);
                };
                let mut columns = vec![lookup.search_column.as_str()];
                if let Some(discriminator) = &lookup.discriminator {
                    columns.push(&discriminator.column);
                    self.expression(&discriminator.value)?;
                }
                if let LookUpResult::Column(result) = &lookup.result {
                    columns.push(result);
                }
                if let Some(missing) = columns.iter().find(|column| table.column_index(column).is_none()) {
                    return Err(self.fail(format!(
                        "Column '{}' of table '{}' was not generated.",
                        missing, lookup.table
                    )));
                }
                self.expression(&lookup.value)
            }
            ExpressionIr::New { fields, .. } | ExpressionIr::Fill { fields, .. } => self.fields(fields),
            ExpressionIr::Call(call) => self.call(call),
        }
    }

    fn call(&self, call: &FunctionCallIr) -> Result<(), LexyError> {
        self.function(&call.function)?;
        match &call.arguments {
            CallArgumentsIr::Object(expression) => self.expression(expression),
            CallArgumentsIr::Positional(arguments) => arguments
                .iter()
                .try_for_each(|(_, argument)| self.expression(argument)),
            CallArgumentsIr::Spread(_) => Ok(()),
        }
    }

    fn statements(&self, statements: &[StatementIr]) -> Result<(), LexyError> {
        for statement in statements {
            match &statement.kind {
                StatementIrKind::Declare { value, .. }
                | StatementIrKind::Assign { value, .. }
                | StatementIrKind::Extract { value, .. } => self.expression(value)?,
                StatementIrKind::Evaluate(expression) => self.expression(expression)?,
                StatementIrKind::SpreadCall { call, .. } => self.call(call)?,
                StatementIrKind::If {
                    branches,
                    otherwise,
                } => {
                    for branch in branches {
                        self.expression(&branch.condition)?;
                        self.statements(&branch.body)?;
                    }
                    if let Some(otherwise) = otherwise {
                        self.statements(&otherwise.body)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Every cross-component reference of the lowered program must resolve.
pub(crate) fn verify_program(
    program: &CompiledProgram,
    executable_scenarios: &BTreeSet<String>,
) -> Result<(), LexyError> {
    for component in program.components() {
        let verifier = Verifier { program, component };
        match component {
            GeneratedComponent::Function(function) => {
                verifier.fields(&function.parameters)?;
                verifier.fields(&function.results)?;
                verifier.statements(&function.body)?;
            }
            GeneratedComponent::Type(declared) => verifier.fields(&declared.fields)?,
            GeneratedComponent::Table(table) => {
                for row in &table.rows {
                    row.values.iter().try_for_each(|value| verifier.value(value))?;
                }
            }
            GeneratedComponent::Enum(_) => {}
        }
    }

    for name in executable_scenarios {
        let Some(scenario) = program.scenario(name) else {
            return Err(LexyError::internal(format!("Scenario '{}' was not generated.", name)));
        };
        if let Some(function) = &scenario.function {
            if program.function(function).is_none() {
                return Err(LexyError::internal(format!(
                    "Function '{}' of scenario '{}' was not generated.\n{:#?}",
                    function, name, scenario
                )));
            }
        }
    }
    Ok(())
}
