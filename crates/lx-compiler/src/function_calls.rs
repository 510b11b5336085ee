use crate::*;

impl ValidationContext<'_> {
    pub(crate) fn function_call(&mut self, call: &FunctionCallExpression) -> Option<Resolved> {
        let reference = &call.reference;
        match &call.call {
            FunctionCall::Builtin {
                function,
                arguments,
            } => {
                let mut validated = Vec::new();
                let mut valid = true;
                let signature = function
                    .argument_types()
                    .iter()
                    .zip(function.argument_names());
                for (index, (argument, (expected, argument_name))) in
                    arguments.iter().zip(signature).enumerate()
                {
                    let Some((ir, actual)) = self.value_expression(argument) else {
                        valid = false;
                        continue;
                    };
                    let expected = VariableType::Primitive(*expected);
                    if actual != expected {
                        self.fail(
                            argument.reference(),
                            format!(
                                "Invalid argument {} '{}' of '{}'. Expected '{}' but got '{}'.",
                                index + 1,
                                argument_name,
                                function.name(),
                                expected,
                                actual
                            ),
                        );
                        valid = false;
                    }
                    validated.push(ir);
                }
                valid.then(|| Resolved::Value {
                    ir: ExpressionIr::Builtin {
                        function: *function,
                        arguments: validated,
                    },
                    variable_type: VariableType::Primitive(function.return_type()),
                })
            }
            FunctionCall::System { function, argument } => match function {
                SystemFunction::New => {
                    let composite = self.composite_type_argument(*function, argument)?;
                    Some(Resolved::Value {
                        ir: ExpressionIr::New {
                            type_name: composite.to_string(),
                            fields: self.fields_of(&composite),
                        },
                        variable_type: composite,
                    })
                }
                SystemFunction::Fill => {
                    let composite = self.composite_type_argument(*function, argument)?;
                    let sources = self.fill_sources(&composite, reference)?;
                    Some(Resolved::Value {
                        ir: ExpressionIr::Fill {
                            type_name: composite.to_string(),
                            fields: self.fields_of(&composite),
                            sources,
                        },
                        variable_type: composite,
                    })
                }
                SystemFunction::Extract => {
                    self.fail(
                        reference,
                        "Invalid use of 'extract'. It can only be used as a statement.",
                    );
                    None
                }
            },
            FunctionCall::LookUp(lookup) => self.lookup_call(lookup),
            FunctionCall::Member { path, arguments } => self.library_call(path, arguments, reference),
            FunctionCall::User { name, arguments } => {
                let call = self.user_call(name, arguments, reference)?;
                Some(Resolved::Value {
                    ir: ExpressionIr::Call(Box::new(call)),
                    variable_type: VariableType::Generated(GeneratedType::function_results(
                        name.clone(),
                    )),
                })
            }
            FunctionCall::Spread { name } => {
                self.fail(
                    reference,
                    format!(
                        "Invalid use of '{}(...)'. Spread calls can only be used as a statement.",
                        name
                    ),
                );
                None
            }
        }
    }

    fn composite_type_argument(
        &mut self,
        function: SystemFunction,
        argument: &Expression,
    ) -> Option<VariableType> {
        match self.resolve_expression(argument)? {
            Resolved::TypeReference(composite) if composite.is_composite() && !is_column(&composite) => {
                Some(composite)
            }
            _ => {
                self.fail(
                    argument.reference(),
                    format!(
                        "Invalid argument of '{}'. Expected a type, 'Function.Parameters', 'Function.Results' or 'Table.Row'.",
                        function.name()
                    ),
                );
                None
            }
        }
    }

    /// Same-named variables in scope feeding the members of `composite`.
    /// Members without a variable keep their default.
    fn fill_sources(
        &mut self,
        composite: &VariableType,
        reference: &SourceReference,
    ) -> Option<Vec<(String, VariableReference)>> {
        let mut sources = Vec::new();
        let mut valid = true;
        for member in self.members_of(composite) {
            let Some(entry) = self.variables.get(&member.name).cloned() else {
                continue;
            };
            if entry.variable_type != member.member_type {
                self.fail(
                    reference,
                    format!(
                        "Invalid variable type '{}'. Expected '{}' but got '{}'.",
                        member.name, member.member_type, entry.variable_type
                    ),
                );
                valid = false;
                continue;
            }
            sources.push((member.name.clone(), entry.reference(&member.name)));
        }
        valid.then_some(sources)
    }

    /// Same-named variables receiving the members of `composite`; members
    /// without a variable declare a new one in the current scope.
    pub(crate) fn extract_targets(
        &mut self,
        composite: &VariableType,
        reference: &SourceReference,
    ) -> Option<Vec<(String, VariableReference)>> {
        let mut targets = Vec::new();
        let mut valid = true;
        for member in self.members_of(composite) {
            let entry = match self.variables.get(&member.name).cloned() {
                Some(entry) => entry,
                None => {
                    let entry = VariableEntry {
                        variable_type: member.member_type.clone(),
                        source: VariableSource::Code,
                    };
                    self.variables.add(&member.name, entry.clone());
                    entry
                }
            };
            if entry.variable_type != member.member_type {
                self.fail(
                    reference,
                    format!(
                        "Invalid variable type '{}'. Expected '{}' but got '{}'.",
                        member.name, member.member_type, entry.variable_type
                    ),
                );
                valid = false;
                continue;
            }
            targets.push((member.name.clone(), entry.reference(&member.name)));
        }
        valid.then_some(targets)
    }

    fn library_call(
        &mut self,
        path: &VariablePath,
        arguments: &[Expression],
        reference: &SourceReference,
    ) -> Option<Resolved> {
        let function = match path.segments() {
            [library, function] => self.libraries.function(library, function).cloned(),
            _ => None,
        };
        let Some(function) = function else {
            if path.len() == 2 && self.libraries.contains(path.root()) {
                self.fail(reference, format!("Unknown library function: '{}'.", path));
            } else {
                self.fail(reference, format!("Unknown function: '{}'.", path));
            }
            return None;
        };

        if arguments.len() != function.arguments.len() {
            self.fail(
                reference,
                format!(
                    "Invalid number of arguments: '{}'. Expected {} arguments but got {}.",
                    path,
                    function.arguments.len(),
                    arguments.len()
                ),
            );
            return None;
        }

        let mut validated = Vec::new();
        let mut valid = true;
        for (index, (argument, expected)) in arguments.iter().zip(&function.arguments).enumerate() {
            let Some((ir, actual)) = self.value_expression(argument) else {
                valid = false;
                continue;
            };
            if actual != VariableType::Primitive(*expected) {
                self.fail(
                    argument.reference(),
                    format!(
                        "Invalid argument {} of '{}'. Expected '{}' but got '{}'.",
                        index + 1,
                        path,
                        expected.name(),
                        actual
                    ),
                );
                valid = false;
            }
            validated.push(ir);
        }
        valid.then(|| Resolved::Value {
            ir: ExpressionIr::Library {
                library: path.root().to_string(),
                function: function.name.clone(),
                arguments: validated,
            },
            variable_type: VariableType::Primitive(function.return_type),
        })
    }

    /// `F(p)` with `p` of type `F.Parameters` passes the object as is; any
    /// other argument list maps positionally onto the parameters.
    pub(crate) fn user_call(
        &mut self,
        name: &str,
        arguments: &[Expression],
        reference: &SourceReference,
    ) -> Option<FunctionCallIr> {
        if self.components.function(name).is_none() {
            self.fail(reference, format!("Unknown function: '{}'.", name));
            return None;
        }
        self.add_dependency(name);

        let parameters_type = VariableType::Generated(GeneratedType::function_parameters(name));
        let validated = arguments
            .iter()
            .map(|argument| self.value_expression(argument))
            .collect::<Vec<_>>();
        if validated.iter().any(Option::is_none) {
            return None;
        }
        let validated = validated.into_iter().flatten().collect::<Vec<_>>();

        if let [(ir, variable_type)] = validated.as_slice() {
            if variable_type == &parameters_type {
                return Some(FunctionCallIr {
                    function: name.to_string(),
                    arguments: CallArgumentsIr::Object(ir.clone()),
                });
            }
        }

        let parameters = self.members_of(&parameters_type);
        if parameters.len() != validated.len() {
            self.fail(
                reference,
                format!(
                    "Invalid number of arguments: '{}'. Expected {} arguments but got {}.",
                    name,
                    parameters.len(),
                    validated.len()
                ),
            );
            return None;
        }

        let mut positional = Vec::new();
        let mut valid = true;
        for (index, ((ir, actual), parameter)) in validated.into_iter().zip(parameters).enumerate() {
            if actual != parameter.member_type {
                self.fail(
                    arguments[index].reference(),
                    format!(
                        "Invalid argument {} '{}' of '{}'. Expected '{}' but got '{}'.",
                        index + 1,
                        parameter.name,
                        name,
                        parameter.member_type,
                        actual
                    ),
                );
                valid = false;
                continue;
            }
            positional.push((parameter.name, ir));
        }
        valid.then(|| FunctionCallIr {
            function: name.to_string(),
            arguments: CallArgumentsIr::Positional(positional),
        })
    }

    /// `F(...)`: parameters come from same-named variables, results land in
    /// same-named variables.
    pub(crate) fn spread_call(
        &mut self,
        name: &str,
        reference: &SourceReference,
    ) -> Option<(FunctionCallIr, Vec<(String, VariableReference)>)> {
        if self.components.function(name).is_none() {
            self.fail(reference, format!("Unknown function: '{}'.", name));
            return None;
        }
        self.add_dependency(name);

        let parameters = self.fill_sources(
            &VariableType::Generated(GeneratedType::function_parameters(name)),
            reference,
        );
        let targets = self.extract_targets(
            &VariableType::Generated(GeneratedType::function_results(name)),
            reference,
        );
        Some((
            FunctionCallIr {
                function: name.to_string(),
                arguments: CallArgumentsIr::Spread(parameters?),
            },
            targets?,
        ))
    }

    fn lookup_call(&mut self, lookup: &LookUpCall) -> Option<Resolved> {
        let Some(table) = self.components.table(&lookup.table) else {
            self.fail(
                &lookup.table_reference,
                format!("Unknown table: '{}'.", lookup.table),
            );
            return None;
        };
        self.add_dependency(&lookup.table);
        let function = format!("{}.{}", lookup.table, lookup.function_name());

        let discriminator_column = match (&lookup.discriminator, &lookup.discriminator_column) {
            (None, _) => None,
            (Some(_), Some(column)) => Some(self.lookup_column(lookup, &function, column)?),
            (Some(_), None) => Some(self.default_column(lookup, table, &function, 0)?),
        };
        let search_column = match &lookup.search_column {
            Some(column) => self.lookup_column(lookup, &function, column)?,
            None => {
                let index = usize::from(lookup.discriminator.is_some());
                self.default_column(lookup, table, &function, index)?
            }
        };
        let (result, result_type) = match (&lookup.result_column, lookup.row) {
            (_, true) => (
                LookUpResult::Row,
                VariableType::Generated(GeneratedType::table_row(lookup.table.clone())),
            ),
            (Some(column), false) => {
                let (name, column_type) = self.lookup_column(lookup, &function, column)?;
                (LookUpResult::Column(name), column_type)
            }
            (None, false) => {
                self.fail(
                    &lookup.table_reference,
                    format!("Invalid '{}'. Result column expected.", function),
                );
                return None;
            }
        };

        let value = self.lookup_argument(&lookup.value, "Value", &function, &search_column.1);
        let discriminator = match (&lookup.discriminator, &discriminator_column) {
            (Some(expression), Some((column, column_type))) => Some(DiscriminatorIr {
                column: column.clone(),
                value: self.lookup_argument(expression, "Discriminator", &function, column_type)?,
            }),
            _ => None,
        };

        Some(Resolved::Value {
            ir: ExpressionIr::LookUp(Box::new(LookUpIr {
                table: lookup.table.clone(),
                search_column: search_column.0,
                value: value?,
                discriminator,
                result,
            })),
            variable_type: result_type,
        })
    }

    fn lookup_argument(
        &mut self,
        expression: &Expression,
        role: &str,
        function: &str,
        expected: &VariableType,
    ) -> Option<ExpressionIr> {
        let (ir, actual) = self.value_expression(expression)?;
        if &actual != expected {
            self.fail(
                expression.reference(),
                format!(
                    "Invalid argument '{}' of '{}'. Expected '{}' but got '{}'.",
                    role, function, expected, actual
                ),
            );
            return None;
        }
        Some(ir)
    }

    fn lookup_column(
        &mut self,
        lookup: &LookUpCall,
        function: &str,
        column: &Expression,
    ) -> Option<(String, VariableType)> {
        let resolved = self.resolve_expression(column)?;
        let column_name = match &resolved {
            Resolved::TypeReference(VariableType::Generated(generated))
                if generated.source == GeneratedTypeSource::TableColumn
                    && generated.node == lookup.table =>
            {
                generated.column.clone()
            }
            _ => None,
        };
        let Some(column_name) = column_name else {
            self.fail(
                column.reference(),
                format!(
                    "Invalid argument of '{}'. Column of table '{}' expected.",
                    function, lookup.table
                ),
            );
            return None;
        };
        let column_type = self
            .components
            .table(&lookup.table)
            .and_then(|table| table.header.iter().find(|candidate| candidate.name == column_name))
            .and_then(|definition| self.column_type(definition))?;
        Some((column_name, column_type))
    }

    fn default_column(
        &mut self,
        lookup: &LookUpCall,
        table: &TableNode,
        function: &str,
        index: usize,
    ) -> Option<(String, VariableType)> {
        let Some(column) = table.header.get(index) else {
            self.fail(
                &lookup.table_reference,
                format!(
                    "Invalid '{}'. Table '{}' has no column {}.",
                    function,
                    table.name,
                    index + 1
                ),
            );
            return None;
        };
        Some((column.name.clone(), self.column_type(column)?))
    }
}

fn is_column(variable_type: &VariableType) -> bool {
    matches!(
        variable_type,
        VariableType::Generated(GeneratedType {
            source: GeneratedTypeSource::TableColumn,
            ..
        })
    )
}
