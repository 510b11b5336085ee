use crate::*;

/// A member of a composite type as declared in its owning node.
#[derive(Debug, Clone)]
pub(crate) struct MemberDefinition<'a> {
    pub(crate) name: String,
    pub(crate) member_type: VariableType,
    pub(crate) default: Option<&'a Expression>,
}

impl<'a> ValidationContext<'a> {
    /// Resolves a declared type name without reporting anything.
    pub(crate) fn lookup_type(&self, path: &VariablePath) -> Option<VariableType> {
        match path.segments() {
            [name] => {
                if let Some(primitive) = PrimitiveType::parse(name) {
                    return Some(VariableType::Primitive(primitive));
                }
                match self.components.get(name)? {
                    ComponentNode::Enum(_) => Some(VariableType::Enum(name.clone())),
                    ComponentNode::Type(_) => Some(VariableType::Declared(name.clone())),
                    _ => None,
                }
            }
            [node, member] => match (self.components.get(node)?, member.as_str()) {
                (ComponentNode::Function(_), "Parameters") => Some(VariableType::Generated(
                    GeneratedType::function_parameters(node.clone()),
                )),
                (ComponentNode::Function(_), "Results") => Some(VariableType::Generated(
                    GeneratedType::function_results(node.clone()),
                )),
                (ComponentNode::Table(_), "Row") => Some(VariableType::Generated(
                    GeneratedType::table_row(node.clone()),
                )),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn resolve_type(
        &mut self,
        path: &VariablePath,
        reference: &SourceReference,
    ) -> Option<VariableType> {
        match self.lookup_type(path) {
            Some(variable_type) => {
                if let Some(component) = variable_type.component_name() {
                    self.add_dependency(component);
                }
                Some(variable_type)
            }
            None => {
                self.fail(reference, format!("Unknown type: '{}'.", path));
                None
            }
        }
    }

    /// Table columns may only hold primitives and enums.
    pub(crate) fn column_type(&self, column: &ColumnDefinition) -> Option<VariableType> {
        match self.lookup_type(&column.type_path)? {
            column_type @ (VariableType::Primitive(_) | VariableType::Enum(_)) => Some(column_type),
            _ => None,
        }
    }

    fn definition_members(&self, definitions: &'a [VariableDefinition]) -> Vec<MemberDefinition<'a>> {
        definitions
            .iter()
            .filter_map(|definition| {
                let DeclarationType::Named(path) = &definition.declared_type else {
                    return None;
                };
                Some(MemberDefinition {
                    name: definition.name.clone(),
                    member_type: self.lookup_type(path)?,
                    default: definition.default.as_ref(),
                })
            })
            .collect()
    }

    /// Members of a composite type in declaration order. Members whose type
    /// does not resolve are left out; their node reports them.
    pub(crate) fn members_of(&self, owner: &VariableType) -> Vec<MemberDefinition<'a>> {
        match owner {
            VariableType::Declared(name) => self
                .components
                .declared_type(name)
                .map(|node| self.definition_members(&node.members))
                .unwrap_or_default(),
            VariableType::Generated(generated) => match generated.source {
                GeneratedTypeSource::FunctionParameters => self
                    .components
                    .function(&generated.node)
                    .map(|node| self.definition_members(&node.parameters))
                    .unwrap_or_default(),
                GeneratedTypeSource::FunctionResults => self
                    .components
                    .function(&generated.node)
                    .map(|node| self.definition_members(&node.results))
                    .unwrap_or_default(),
                GeneratedTypeSource::TableRow => self
                    .components
                    .table(&generated.node)
                    .map(|node| {
                        node.header
                            .iter()
                            .filter_map(|column| {
                                Some(MemberDefinition {
                                    name: column.name.clone(),
                                    member_type: self.column_type(column)?,
                                    default: None,
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                GeneratedTypeSource::TableColumn => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub(crate) fn member_type(&self, owner: &VariableType, member: &str) -> Option<VariableType> {
        self.members_of(owner)
            .into_iter()
            .find(|definition| definition.name == member)
            .map(|definition| definition.member_type)
    }

    /// Walks `path` member by member starting from `owner`.
    pub(crate) fn path_type(&self, owner: &VariableType, path: &VariablePath) -> Option<VariableType> {
        path.segments()
            .iter()
            .try_fold(owner.clone(), |current, segment| self.member_type(&current, segment))
    }

    /// Literals and enum members, the only values allowed for defaults,
    /// table cells and scenario assignments.
    pub(crate) fn constant_value(&self, expression: &Expression) -> Option<(Value, VariableType)> {
        match expression {
            Expression::Literal(literal) => Some((
                literal.value.to_value(),
                VariableType::Primitive(literal.value.primitive_type()),
            )),
            Expression::Identifier(identifier) => {
                let [enum_name, member] = identifier.path.segments() else {
                    return None;
                };
                let node = self.components.enumeration(enum_name)?;
                node.members
                    .iter()
                    .any(|candidate| &candidate.name == member)
                    .then(|| {
                        (
                            Value::Enum(EnumValue::new(enum_name.clone(), member.clone())),
                            VariableType::Enum(enum_name.clone()),
                        )
                    })
            }
            Expression::Parenthesized(inner, _) | Expression::Bracketed(inner, _) => {
                self.constant_value(inner)
            }
            _ => None,
        }
    }

    /// Checks a constant against `expected`; `subject` prefixes the messages.
    pub(crate) fn validate_constant(
        &mut self,
        expression: &Expression,
        expected: &VariableType,
        subject: &str,
    ) -> Option<Value> {
        let Some((value, actual)) = self.constant_value(expression) else {
            self.fail(
                expression.reference(),
                format!("Invalid {}. Constant value expected.", subject),
            );
            return None;
        };
        if let Some(component) = actual.component_name() {
            self.add_dependency(component);
        }
        if &actual != expected {
            self.fail(
                expression.reference(),
                format!(
                    "Invalid {}. Expected '{}' but got '{}'.",
                    subject, expected, actual
                ),
            );
            return None;
        }
        Some(value)
    }
}
