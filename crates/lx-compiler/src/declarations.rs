use crate::*;

impl ValidationContext<'_> {
    pub(crate) fn validate_function(&mut self, function: &FunctionNode) -> Option<FunctionIr> {
        self.in_scope(|context| {
            let parameters = context.variable_definitions(&function.parameters, Some(VariableSource::Parameters));
            let results = context.variable_definitions(&function.results, Some(VariableSource::Results));
            let body = context.in_scope(|context| context.validate_statements(&function.code));
            Some(FunctionIr {
                name: function.name.clone(),
                class_name: class_name(ComponentKind::Function, &function.name),
                reference: function.reference.clone(),
                parameters,
                results,
                body,
            })
        })
    }

    /// Parameters, results and type members. With a `source` the members
    /// are also declared as variables of the current scope.
    fn variable_definitions(
        &mut self,
        definitions: &[VariableDefinition],
        source: Option<VariableSource>,
    ) -> Vec<FieldIr> {
        let mut names = BTreeSet::new();
        let mut fields = Vec::new();
        for definition in definitions {
            if !names.insert(definition.name.as_str()) || self.variables.contains(&definition.name) {
                self.fail(
                    &definition.reference,
                    format!("Duplicated variable name: '{}'.", definition.name),
                );
                continue;
            }
            let DeclarationType::Named(path) = &definition.declared_type else {
                self.fail(
                    &definition.reference,
                    format!("Invalid variable declaration '{}'. Type expected.", definition.name),
                );
                continue;
            };
            let Some(variable_type) = self.resolve_type(path, &definition.reference) else {
                continue;
            };
            let explicit = match &definition.default {
                Some(expression) => {
                    let value = self.validate_constant(expression, &variable_type, "default value");
                    if value.is_none() {
                        continue;
                    }
                    value
                }
                None => None,
            };

            fields.push(FieldIr {
                name: definition.name.clone(),
                field_type: self.field_type(&variable_type),
                default: explicit.unwrap_or_else(|| self.default_value(&variable_type)),
            });
            if let Some(source) = source {
                self.variables.add(
                    &definition.name,
                    VariableEntry {
                        variable_type,
                        source,
                    },
                );
            }
        }
        fields
    }

    pub(crate) fn validate_table(&mut self, table: &TableNode) -> Option<TableIr> {
        if table.header.is_empty() {
            self.fail(
                &table.reference,
                format!("Invalid table '{}'. Header expected.", table.name),
            );
            return None;
        }

        let mut names = BTreeSet::new();
        let mut columns = Vec::new();
        for column in &table.header {
            if !names.insert(column.name.as_str()) {
                self.fail(
                    &column.reference,
                    format!("Duplicated column name: '{}'.", column.name),
                );
                continue;
            }
            let Some(column_type) = self.resolve_type(&column.type_path, &column.reference) else {
                continue;
            };
            if self.column_type(column).is_none() {
                self.fail(
                    &column.reference,
                    format!(
                        "Invalid column type '{}'. Only primitive and enum types are allowed.",
                        column_type
                    ),
                );
                continue;
            }
            columns.push((column.name.clone(), column_type));
        }
        if columns.len() != table.header.len() {
            return None;
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
            let values = row
                .values
                .iter()
                .zip(&columns)
                .map(|(value, (name, column_type))| {
                    self.validate_constant(value, column_type, &format!("value of column '{}'", name))
                })
                .collect::<Vec<_>>();
            if values.iter().all(Option::is_some) {
                rows.push(RowIr {
                    reference: row.reference.clone(),
                    values: values.into_iter().flatten().collect(),
                });
            }
        }

        Some(TableIr {
            name: table.name.clone(),
            class_name: class_name(ComponentKind::Table, &table.name),
            columns: columns
                .into_iter()
                .map(|(name, column_type)| ColumnIr {
                    name,
                    column_type: self.field_type(&column_type),
                })
                .collect(),
            rows,
        })
    }

    pub(crate) fn validate_enum(&mut self, enumeration: &EnumNode) -> Option<EnumIr> {
        if enumeration.members.is_empty() {
            self.fail(
                &enumeration.reference,
                format!("Invalid enum '{}'. Members expected.", enumeration.name),
            );
            return None;
        }

        let mut names = BTreeSet::new();
        let mut members = Vec::new();
        let mut previous = None;
        for member in &enumeration.members {
            if !names.insert(member.name.as_str()) {
                self.fail(
                    &member.reference,
                    format!("Duplicated enum member: '{}'.", member.name),
                );
                continue;
            }
            let value = member.value.unwrap_or_else(|| enum_ordinal(previous));
            previous = Some(value);
            members.push(EnumMemberIr {
                name: member.name.clone(),
                value,
            });
        }

        Some(EnumIr {
            name: enumeration.name.clone(),
            class_name: class_name(ComponentKind::Enum, &enumeration.name),
            members,
        })
    }

    pub(crate) fn validate_type(&mut self, declared: &TypeDefinitionNode) -> Option<TypeIr> {
        if declared.members.is_empty() {
            self.fail(
                &declared.reference,
                format!("Invalid type '{}'. Members expected.", declared.name),
            );
            return None;
        }
        let fields = self.in_scope(|context| context.variable_definitions(&declared.members, None));
        Some(TypeIr {
            name: declared.name.clone(),
            class_name: class_name(ComponentKind::Type, &declared.name),
            fields,
        })
    }
}
