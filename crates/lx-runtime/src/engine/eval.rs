use std::cmp::Ordering;

use lx_core::ir::BinaryOperator;
use lx_core::Decimal;

use super::*;

fn type_mismatch(operator: BinaryOperator, left: &Value, right: &Value) -> LexyError {
    LexyError::new(
        "EXECUTION_TYPE_MISMATCH",
        format!(
            "Operator '{}' can't be applied to {} and {}.",
            operator.symbol(),
            left,
            right
        ),
    )
}

fn arithmetic(
    operator: BinaryOperator,
    left: Decimal,
    right: Decimal,
) -> Result<Decimal, LexyError> {
    let result = match operator {
        BinaryOperator::Add => left.checked_add(right),
        BinaryOperator::Subtract => left.checked_sub(right),
        BinaryOperator::Multiply => left.checked_mul(right),
        BinaryOperator::Divide | BinaryOperator::Modulus if right.is_zero() => {
            return Err(LexyError::new(
                "EXECUTION_ARITHMETIC_FAILED",
                format!("Division by zero: {} {} {}.", left, operator.symbol(), right),
            ))
        }
        BinaryOperator::Divide => left.checked_div(right),
        BinaryOperator::Modulus => left.checked_rem(right),
        _ => None,
    };
    result.ok_or_else(|| {
        LexyError::new(
            "EXECUTION_ARITHMETIC_FAILED",
            format!("Arithmetic overflow: {} {} {}.", left, operator.symbol(), right),
        )
    })
}

fn binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, LexyError> {
    match operator {
        BinaryOperator::Add => match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(arithmetic(operator, *l, *r)?)),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", left.to_text(), right.to_text())))
            }
            _ => Err(type_mismatch(operator, &left, &right)),
        },
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulus => match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(arithmetic(operator, *l, *r)?)),
            _ => Err(type_mismatch(operator, &left, &right)),
        },
        BinaryOperator::Equals => Ok(Value::Boolean(left.compare(&right) == Some(Ordering::Equal))),
        BinaryOperator::NotEquals => Ok(Value::Boolean(left.compare(&right) != Some(Ordering::Equal))),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            let ordering = left
                .compare(&right)
                .ok_or_else(|| type_mismatch(operator, &left, &right))?;
            let result = match operator {
                BinaryOperator::LessThan => ordering.is_lt(),
                BinaryOperator::LessThanOrEqual => ordering.is_le(),
                BinaryOperator::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Boolean(result))
        }
        BinaryOperator::And | BinaryOperator::Or => Err(type_mismatch(operator, &left, &right)),
    }
}

impl LexyEngine {
    pub(super) fn evaluate(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        expression: &ExpressionIr,
    ) -> Result<Value, LexyError> {
        match expression {
            ExpressionIr::Literal(value) => Ok(value.clone()),
            ExpressionIr::Variable(reference) => frame.read(reference).cloned(),
            ExpressionIr::TableCount(table) => {
                let table = self.table(table)?;
                Ok(Value::Number(Decimal::from(table.rows.len())))
            }
            ExpressionIr::Binary {
                operator: operator @ (BinaryOperator::And | BinaryOperator::Or),
                left,
                right,
            } => {
                let left = self.condition(context, frame, left)?;
                // Right operand only runs when it decides the result.
                let short_circuit = match operator {
                    BinaryOperator::And => !left,
                    _ => left,
                };
                if short_circuit {
                    return Ok(Value::Boolean(left));
                }
                Ok(Value::Boolean(self.condition(context, frame, right)?))
            }
            ExpressionIr::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(context, frame, left)?;
                let right = self.evaluate(context, frame, right)?;
                binary(*operator, left, right)
            }
            ExpressionIr::Builtin {
                function,
                arguments,
            } => {
                let arguments = self.arguments(context, frame, arguments)?;
                builtins::call(*function, &arguments)
            }
            ExpressionIr::Library {
                library,
                function,
                arguments,
            } => {
                let arguments = self.arguments(context, frame, arguments)?;
                let callable = self
                    .libraries
                    .function(library, function)
                    .map(|function| function.callable)
                    .ok_or_else(|| {
                        LexyError::new(
                            "ENGINE_LIBRARY_FUNCTION_NOT_FOUND",
                            format!("Library function \"{}.{}\" not found.", library, function),
                        )
                    })?;
                callable(&arguments)
            }
            ExpressionIr::LookUp(lookup) => self.lookup(context, frame, lookup),
            ExpressionIr::New { fields, .. } => Ok(Value::Object(default_object(fields))),
            ExpressionIr::Fill {
                fields, sources, ..
            } => {
                let mut object = default_object(fields);
                for (member, source) in sources {
                    object.insert(member.clone(), frame.read(source)?.clone());
                }
                Ok(Value::Object(object))
            }
            ExpressionIr::Call(call) => self.call(context, frame, call),
        }
    }

    pub(super) fn condition(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        expression: &ExpressionIr,
    ) -> Result<bool, LexyError> {
        match self.evaluate(context, frame, expression)? {
            Value::Boolean(value) => Ok(value),
            other => Err(LexyError::new(
                "EXECUTION_TYPE_MISMATCH",
                format!("Condition should be a boolean but got {}.", other),
            )),
        }
    }

    fn arguments(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        arguments: &[ExpressionIr],
    ) -> Result<Vec<Value>, LexyError> {
        arguments
            .iter()
            .map(|argument| self.evaluate(context, frame, argument))
            .collect()
    }
}

#[cfg(test)]
mod eval_tests {
    use super::*;

    #[test]
    fn arithmetic_is_checked() {
        let error = binary(BinaryOperator::Divide, Value::from(1), Value::from(0)).expect_err("zero");
        assert_eq!(error.code, "EXECUTION_ARITHMETIC_FAILED");
        let error = binary(BinaryOperator::Multiply, Value::Number(Decimal::MAX), Value::from(2))
            .expect_err("overflow");
        assert!(error.message.starts_with("Arithmetic overflow"));
    }

    #[test]
    fn string_concatenation_renders_numbers_as_text() {
        assert_eq!(
            binary(BinaryOperator::Add, Value::from("Total: "), Value::from(12)).expect("concat"),
            Value::from("Total: 12")
        );
    }

    #[test]
    fn comparisons_use_decimal_ordering() {
        let half = "0.50".parse::<Decimal>().expect("decimal");
        let other = "0.5".parse::<Decimal>().expect("decimal");
        assert_eq!(
            binary(BinaryOperator::Equals, Value::Number(half), Value::Number(other)).expect("equals"),
            Value::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOperator::LessThan, Value::from(1), Value::from(2)).expect("less"),
            Value::Boolean(true)
        );
    }
}
