use crate::*;

impl ValidationContext<'_> {
    /// Runtime shape of a variable type. Composite types that contain
    /// themselves stop expanding at the repeated type; such declarations are
    /// reported as circular and never generated.
    pub(crate) fn field_type(&self, variable_type: &VariableType) -> FieldType {
        self.field_type_guarded(variable_type, &mut BTreeSet::new())
    }

    pub(crate) fn fields_of(&self, owner: &VariableType) -> Vec<FieldIr> {
        self.fields_guarded(owner, &mut BTreeSet::new())
    }

    pub(crate) fn default_value(&self, variable_type: &VariableType) -> Value {
        self.default_guarded(variable_type, &mut BTreeSet::new())
    }

    /// Initial value of a declared variable without an explicit value.
    pub(crate) fn default_expression(&self, variable_type: &VariableType) -> ExpressionIr {
        if variable_type.is_composite() {
            return ExpressionIr::New {
                type_name: variable_type.to_string(),
                fields: self.fields_of(variable_type),
            };
        }
        ExpressionIr::Literal(self.default_value(variable_type))
    }

    fn field_type_guarded(
        &self,
        variable_type: &VariableType,
        visiting: &mut BTreeSet<VariableType>,
    ) -> FieldType {
        match variable_type {
            VariableType::Primitive(primitive) => FieldType::Primitive(*primitive),
            VariableType::Enum(name) => FieldType::Enum(name.clone()),
            composite => FieldType::Object {
                type_name: composite.to_string(),
                fields: self.fields_guarded(composite, visiting),
            },
        }
    }

    fn fields_guarded(
        &self,
        owner: &VariableType,
        visiting: &mut BTreeSet<VariableType>,
    ) -> Vec<FieldIr> {
        if !visiting.insert(owner.clone()) {
            return Vec::new();
        }
        let fields = self
            .members_of(owner)
            .into_iter()
            .map(|member| {
                let explicit = member
                    .default
                    .and_then(|expression| self.constant_value(expression))
                    .filter(|(_, actual)| actual == &member.member_type)
                    .map(|(value, _)| value);
                FieldIr {
                    field_type: self.field_type_guarded(&member.member_type, visiting),
                    default: explicit
                        .unwrap_or_else(|| self.default_guarded(&member.member_type, visiting)),
                    name: member.name,
                }
            })
            .collect();
        visiting.remove(owner);
        fields
    }

    fn default_guarded(
        &self,
        variable_type: &VariableType,
        visiting: &mut BTreeSet<VariableType>,
    ) -> Value {
        match variable_type {
            VariableType::Primitive(primitive) => default_primitive_value(*primitive),
            VariableType::Enum(name) => {
                let first = self
                    .components
                    .enumeration(name)
                    .and_then(|node| node.members.first())
                    .map(|member| member.name.clone())
                    .unwrap_or_default();
                Value::Enum(EnumValue::new(name.clone(), first))
            }
            composite => Value::Object(
                self.fields_guarded(composite, visiting)
                    .into_iter()
                    .map(|field| (field.name, field.default))
                    .collect(),
            ),
        }
    }
}
