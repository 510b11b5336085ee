use crate::*;

/// Outcome of validating an expression: either a value with its type, or a
/// reference to a type (`Point`, `Tax.Parameters`, `Rates.Row`,
/// `Rates.Income`) usable only as an argument of `new`, `fill` and lookups.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Value {
        ir: ExpressionIr,
        variable_type: VariableType,
    },
    TypeReference(VariableType),
}

impl Resolved {
    fn value(ir: ExpressionIr, variable_type: VariableType) -> Self {
        Self::Value { ir, variable_type }
    }
}

impl ValidationContext<'_> {
    pub(crate) fn value_expression(
        &mut self,
        expression: &Expression,
    ) -> Option<(ExpressionIr, VariableType)> {
        match self.resolve_expression(expression)? {
            Resolved::Value { ir, variable_type } => Some((ir, variable_type)),
            Resolved::TypeReference(variable_type) => {
                self.fail(
                    expression.reference(),
                    format!(
                        "Invalid expression. '{}' is a type, not a value.",
                        variable_type
                    ),
                );
                None
            }
        }
    }

    pub(crate) fn resolve_expression(&mut self, expression: &Expression) -> Option<Resolved> {
        match expression {
            Expression::Literal(literal) => Some(Resolved::value(
                ExpressionIr::Literal(literal.value.to_value()),
                VariableType::Primitive(literal.value.primitive_type()),
            )),
            Expression::Identifier(identifier) => self.resolve_identifier(identifier),
            Expression::Binary(binary) => self.binary_expression(binary),
            Expression::Parenthesized(inner, _) | Expression::Bracketed(inner, _) => {
                self.resolve_expression(inner)
            }
            Expression::FunctionCall(call) => self.function_call(call),
        }
    }

    /// Root identifier first as a variable, then as a declaration name.
    pub(crate) fn resolve_identifier(&mut self, identifier: &IdentifierExpression) -> Option<Resolved> {
        let path = &identifier.path;
        let reference = &identifier.reference;

        if let Some(entry) = self.variables.get(path.root()).cloned() {
            let mut current = entry.variable_type;
            for segment in path.segments().iter().skip(1) {
                match self.member_type(&current, segment) {
                    Some(member) => current = member,
                    None => {
                        self.fail(
                            reference,
                            format!("Unknown member name: '{}' of type '{}'.", segment, current),
                        );
                        return None;
                    }
                }
            }
            return Some(Resolved::value(
                ExpressionIr::Variable(VariableReference::new(entry.source, path.clone())),
                current,
            ));
        }

        let root = path.root();
        let component = match self.components.get(root) {
            Some(ComponentNode::Scenario(_)) | None => {
                self.fail(reference, format!("Unknown variable name: '{}'.", root));
                return None;
            }
            Some(component) => component,
        };
        self.add_dependency(root);

        let member = path.segments().get(1).map(String::as_str);
        let resolved = match (component, member) {
            (_, Some(_)) if path.len() > 2 => None,
            (ComponentNode::Enum(_), None) => Some(Resolved::TypeReference(VariableType::Enum(
                root.to_string(),
            ))),
            (ComponentNode::Enum(node), Some(member)) => node
                .members
                .iter()
                .any(|candidate| candidate.name == member)
                .then(|| {
                    Resolved::value(
                        ExpressionIr::Literal(Value::Enum(EnumValue::new(root, member))),
                        VariableType::Enum(root.to_string()),
                    )
                }),
            (ComponentNode::Table(_), None) => {
                Some(Resolved::TypeReference(VariableType::Table(root.to_string())))
            }
            (ComponentNode::Table(_), Some("Count")) => Some(Resolved::value(
                ExpressionIr::TableCount(root.to_string()),
                VariableType::NUMBER,
            )),
            (ComponentNode::Table(_), Some("Row")) => Some(Resolved::TypeReference(
                VariableType::Generated(GeneratedType::table_row(root)),
            )),
            (ComponentNode::Table(node), Some(column)) => node
                .header
                .iter()
                .any(|candidate| candidate.name == column)
                .then(|| {
                    Resolved::TypeReference(VariableType::Generated(GeneratedType::table_column(
                        root, column,
                    )))
                }),
            (ComponentNode::Function(_), Some("Parameters")) => Some(Resolved::TypeReference(
                VariableType::Generated(GeneratedType::function_parameters(root)),
            )),
            (ComponentNode::Function(_), Some("Results")) => Some(Resolved::TypeReference(
                VariableType::Generated(GeneratedType::function_results(root)),
            )),
            (ComponentNode::Type(_), None) => Some(Resolved::TypeReference(
                VariableType::Declared(root.to_string()),
            )),
            _ => None,
        };
        if resolved.is_none() {
            self.fail(reference, format!("Unknown member name: '{}'.", path));
        }
        resolved
    }

    fn binary_expression(&mut self, binary: &BinaryExpression) -> Option<Resolved> {
        let left = self.value_expression(&binary.left);
        let right = self.value_expression(&binary.right);
        let ((left, left_type), (right, right_type)) = (left?, right?);

        let Some(result_type) = binary_type(binary.operator, &left_type, &right_type) else {
            self.fail(
                &binary.reference,
                format!(
                    "Invalid operand types. Operator '{}' can't be applied to '{}' and '{}'.",
                    binary.operator.symbol(),
                    left_type,
                    right_type
                ),
            );
            return None;
        };
        Some(Resolved::value(
            ExpressionIr::Binary {
                operator: binary.operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            result_type,
        ))
    }
}

fn binary_type(
    operator: BinaryOperator,
    left: &VariableType,
    right: &VariableType,
) -> Option<VariableType> {
    use BinaryOperator::*;
    use PrimitiveType::{Boolean, Date, Number, String as Text};

    let primitives = (left.primitive(), right.primitive());
    match operator {
        Add => match primitives {
            (Some(Number), Some(Number)) => Some(VariableType::NUMBER),
            (Some(Text), _) | (_, Some(Text))
                if !left.is_composite() && !right.is_composite() =>
            {
                Some(VariableType::STRING)
            }
            _ => None,
        },
        Subtract | Multiply | Divide | Modulus => {
            matches!(primitives, (Some(Number), Some(Number))).then_some(VariableType::NUMBER)
        }
        Equals | NotEquals => {
            (left == right && !left.is_composite()).then_some(VariableType::BOOLEAN)
        }
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => matches!(
            primitives,
            (Some(Number), Some(Number)) | (Some(Text), Some(Text)) | (Some(Date), Some(Date))
        )
        .then_some(VariableType::BOOLEAN),
        And | Or => {
            matches!(primitives, (Some(Boolean), Some(Boolean))).then_some(VariableType::BOOLEAN)
        }
    }
}
