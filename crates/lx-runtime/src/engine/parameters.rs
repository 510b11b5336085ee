use super::*;

impl LexyEngine {
    /// Expands caller values into the parameter object. Every violation is
    /// collected before failing so callers see them all at once.
    pub(super) fn parameter_object(
        &self,
        function: &FunctionIr,
        values: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, LexyError> {
        let mut parameters = Value::Object(default_object(&function.parameters));
        let mut violations = Vec::new();
        for (key, value) in values {
            self.expand_value(
                &function.parameters,
                &mut parameters,
                &VariablePath::parse(key),
                value.clone(),
                &mut violations,
            );
        }
        if !violations.is_empty() {
            return Err(LexyError::new(
                "EXECUTION_PARAMETERS_INVALID",
                format!(
                    "Invalid parameters of '{}':\n{}",
                    function.name,
                    violations.join("\n")
                ),
            ));
        }
        match parameters {
            Value::Object(entries) => Ok(entries),
            _ => Ok(BTreeMap::new()),
        }
    }

    fn expand_value(
        &self,
        fields: &[FieldIr],
        target: &mut Value,
        path: &VariablePath,
        value: Value,
        violations: &mut Vec<String>,
    ) {
        let Some(field_type) = field_type_at(fields, path.segments()) else {
            violations.push(format!("Unknown parameter: '{}'.", path));
            return;
        };
        let converted = match (field_type, value) {
            (FieldType::Object { .. }, Value::Object(entries)) => {
                for (member, value) in entries {
                    let member_path = path.append(&VariablePath::parse(&member));
                    self.expand_value(fields, target, &member_path, value, violations);
                }
                return;
            }
            (FieldType::Enum(enum_name), value) => self.enum_parameter(enum_name, value),
            (FieldType::Primitive(PrimitiveType::Date), Value::String(text)) => {
                parse_date(&text).map(Value::Date).ok_or(Value::String(text))
            }
            (FieldType::Primitive(primitive), value) if value.matches_primitive(*primitive) => Ok(value),
            (_, value) => Err(value),
        };
        match converted {
            Ok(value) => {
                if let Err(message) = assign_nested_path(target, path.segments(), value) {
                    violations.push(format!("Invalid parameter '{}': {}.", path, message));
                }
            }
            Err(value) => violations.push(format!(
                "Invalid parameter '{}'. Expected '{}' but got {}.",
                path,
                field_type.name(),
                value
            )),
        }
    }

    /// Accepts enum values and their `"Enum.Member"` tags.
    fn enum_parameter(&self, enum_name: &str, value: Value) -> Result<Value, Value> {
        let candidate = match &value {
            Value::Enum(enum_value) => Some(enum_value.clone()),
            Value::String(tag) => EnumValue::parse_tag(tag),
            _ => None,
        };
        let known = candidate.filter(|candidate| {
            candidate.enum_name == enum_name
                && self
                    .program
                    .enumeration(enum_name)
                    .is_some_and(|enumeration| enumeration.contains(candidate))
        });
        known.map(Value::Enum).ok_or(value)
    }
}
