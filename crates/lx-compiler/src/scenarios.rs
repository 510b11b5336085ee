use crate::*;

impl ValidationContext<'_> {
    /// Scenarios always lower to IR so the runner can compare expected
    /// errors even when the function under test did not validate.
    pub(crate) fn validate_scenario(&mut self, scenario: &ScenarioNode) -> ScenarioIr {
        let function = self.scenario_function(scenario);
        let (parameters, results, validation_rows) = match &function {
            Some(function) => {
                let parameters_type =
                    VariableType::Generated(GeneratedType::function_parameters(function.clone()));
                let results_type =
                    VariableType::Generated(GeneratedType::function_results(function.clone()));
                let parameters =
                    self.scenario_assignments(&scenario.parameters, &parameters_type, "parameter");
                let results = self.scenario_assignments(&scenario.results, &results_type, "result");
                let rows = match &scenario.validation_table {
                    Some(table) => self.validation_rows(table, &parameters_type, &results_type),
                    None => Vec::new(),
                };
                (parameters, results, rows)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        ScenarioIr {
            name: scenario.name.clone(),
            reference: scenario.reference.clone(),
            function,
            parameters,
            results,
            validation_rows,
            expect_errors: messages(&scenario.expect_errors),
            expect_root_errors: messages(&scenario.expect_root_errors),
            expect_execution_errors: messages(&scenario.expect_execution_errors),
        }
    }

    fn scenario_function(&mut self, scenario: &ScenarioNode) -> Option<String> {
        match &scenario.function {
            Some(ScenarioFunction::Reference { name, reference }) => {
                if self.components.function(name).is_none() {
                    self.fail(reference, format!("Unknown function: '{}'.", name));
                    return None;
                }
                self.add_dependency(name);
                Some(name.clone())
            }
            Some(ScenarioFunction::Inline(function)) => {
                self.add_dependency(&function.name);
                Some(function.name.clone())
            }
            None => {
                if scenario.expect_root_errors.is_empty() {
                    self.fail(
                        &scenario.reference,
                        format!("Invalid scenario '{}'. Function expected.", scenario.name),
                    );
                }
                None
            }
        }
    }

    fn scenario_assignments(
        &mut self,
        assignments: &[AssignmentNode],
        owner: &VariableType,
        kind: &str,
    ) -> Vec<AssignmentIr> {
        flatten_assignments(assignments)
            .into_iter()
            .filter_map(|assignment| {
                let Some(target_type) = self.path_type(owner, &assignment.path) else {
                    self.fail(
                        &assignment.reference,
                        format!("Unknown {}: '{}'.", kind, assignment.path),
                    );
                    return None;
                };
                if target_type.is_composite() {
                    self.fail(
                        &assignment.reference,
                        format!(
                            "Invalid {} '{}'. Assign the members of '{}' instead.",
                            kind, assignment.path, target_type
                        ),
                    );
                    return None;
                }
                let value = self.validate_constant(
                    &assignment.value,
                    &target_type,
                    &format!("value of {} '{}'", kind, assignment.path),
                )?;
                Some(AssignmentIr {
                    reference: assignment.reference.clone(),
                    path: assignment.path.clone(),
                    value,
                })
            })
            .collect()
    }

    /// Each header column names a parameter or a result of the function.
    fn validation_rows(
        &mut self,
        table: &ValidationTableNode,
        parameters_type: &VariableType,
        results_type: &VariableType,
    ) -> Vec<ValidationRowIr> {
        let mut columns = Vec::new();
        for column in &table.header {
            let path = VariablePath::parse(&column.name);
            let (is_parameter, member_type) = match (
                self.path_type(parameters_type, &path),
                self.path_type(results_type, &path),
            ) {
                (Some(member_type), _) => (true, member_type),
                (None, Some(member_type)) => (false, member_type),
                (None, None) => {
                    self.fail(
                        &column.reference,
                        format!("Unknown parameter or result: '{}'.", column.name),
                    );
                    return Vec::new();
                }
            };
            let declared = self.resolve_type(&column.type_path, &column.reference);
            if declared.as_ref() != Some(&member_type) {
                self.fail(
                    &column.reference,
                    format!(
                        "Invalid column type of '{}'. Expected '{}'.",
                        column.name, member_type
                    ),
                );
                return Vec::new();
            }
            columns.push((path, is_parameter, member_type));
        }

        let mut rows = Vec::new();
        for row in &table.rows {
            if row.values.len() != columns.len() {
                self.fail(
                    &row.reference,
                    format!(
                        "Invalid number of values in row. Expected {} but got {}.",
                        columns.len(),
                        row.values.len()
                    ),
                );
                continue;
            }
            let mut validated = ValidationRowIr {
                reference: row.reference.clone(),
                parameters: Vec::new(),
                results: Vec::new(),
            };
            let mut valid = true;
            for (value, (path, is_parameter, member_type)) in row.values.iter().zip(&columns) {
                let Some(constant) =
                    self.validate_constant(value, member_type, &format!("value of column '{}'", path))
                else {
                    valid = false;
                    continue;
                };
                let assignment = AssignmentIr {
                    reference: value.reference().clone(),
                    path: path.clone(),
                    value: constant,
                };
                if *is_parameter {
                    validated.parameters.push(assignment);
                } else {
                    validated.results.push(assignment);
                }
            }
            if valid {
                rows.push(validated);
            }
        }
        rows
    }
}

fn messages(expected: &[ExpectedMessage]) -> Vec<String> {
    expected.iter().map(|message| message.text.clone()).collect()
}
