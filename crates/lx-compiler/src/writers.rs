use crate::*;

pub(crate) fn class_name(kind: ComponentKind, name: &str) -> String {
    format!("{}{}", kind.class_prefix(), name)
}

fn internal(component: &GeneratedComponent, message: String) -> LexyError {
    LexyError::internal(format!("{}\n{:#?}", message, component))
}

fn value_matches(field_type: &FieldType, value: &Value) -> bool {
    match (field_type, value) {
        (FieldType::Primitive(primitive), value) => value.matches_primitive(*primitive),
        (FieldType::Enum(name), Value::Enum(enum_value)) => &enum_value.enum_name == name,
        (FieldType::Object { fields, .. }, Value::Object(entries)) => {
            fields.len() == entries.len()
                && fields.iter().all(|field| {
                    entries
                        .get(&field.name)
                        .is_some_and(|entry| value_matches(&field.field_type, entry))
                })
        }
        _ => false,
    }
}

fn check_fields(component: &GeneratedComponent, owner: &str, fields: &[FieldIr]) -> Result<(), LexyError> {
    for field in fields {
        if !value_matches(&field.field_type, &field.default) {
            return Err(internal(
                component,
                format!(
                    "Default of '{}.{}' does not match its type '{}'.",
                    owner,
                    field.name,
                    field.field_type.name()
                ),
            ));
        }
    }
    Ok(())
}

/// Final shape checks on a validated component before it joins the
/// program. A failure here is a compiler bug, never a source error.
pub(crate) fn write_component(component: GeneratedComponent) -> Result<GeneratedComponent, LexyError> {
    match &component {
        GeneratedComponent::Function(function) => {
            check_fields(&component, &function.name, &function.parameters)?;
            check_fields(&component, &function.name, &function.results)?;
        }
        GeneratedComponent::Type(declared) => {
            check_fields(&component, &declared.name, &declared.fields)?;
        }
        GeneratedComponent::Enum(enumeration) => {
            let mut names = BTreeSet::new();
            if let Some(member) = enumeration
                .members
                .iter()
                .find(|member| !names.insert(member.name.as_str()))
            {
                return Err(internal(
                    &component,
                    format!("Duplicate member '{}' in enum '{}'.", member.name, enumeration.name),
                ));
            }
        }
        GeneratedComponent::Table(table) => {
            for row in &table.rows {
                if row.values.len() != table.columns.len() {
                    return Err(internal(
                        &component,
                        format!("Row {} of table '{}' has {} values.", row.reference, table.name, row.values.len()),
                    ));
                }
                for (column, value) in table.columns.iter().zip(&row.values) {
                    if !value_matches(&column.column_type, value) {
                        return Err(internal(
                            &component,
                            format!(
                                "Value {} of column '{}' in table '{}' does not match type '{}'.",
                                value,
                                column.name,
                                table.name,
                                column.column_type.name()
                            ),
                        ));
                    }
                }
            }
        }
    }
    trace!(component = component.class_name(), "written");
    Ok(component)
}

#[cfg(test)]
mod writers_tests {
    use super::*;

    fn table(value: Value) -> GeneratedComponent {
        GeneratedComponent::Table(TableIr {
            name: "Rates".to_string(),
            class_name: class_name(ComponentKind::Table, "Rates"),
            columns: vec![ColumnIr {
                name: "Income".to_string(),
                column_type: FieldType::Primitive(PrimitiveType::Number),
            }],
            rows: vec![RowIr {
                reference: SourceReference::new("tests.lexy", 3, 3),
                values: vec![value],
            }],
        })
    }

    #[test]
    fn class_names_carry_the_component_kind() {
        assert_eq!(class_name(ComponentKind::Function, "Tax"), "FunctionTax");
        assert_eq!(class_name(ComponentKind::Enum, "Color"), "EnumColor");
    }

    #[test]
    fn table_cells_must_match_column_types() {
        assert!(write_component(table(Value::from(10))).is_ok());
        let error = write_component(table(Value::from("ten"))).expect_err("mismatch");
        assert_eq!(error.code, "COMPILER_INTERNAL");
        assert!(error.message.contains("column 'Income'"));
        assert!(error.message.contains("TableRates"));
    }
}
