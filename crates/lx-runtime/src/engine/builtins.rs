use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Timelike};
use lx_core::ir::BuiltinFunction;
use lx_core::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{MathematicalOps, RoundingStrategy};

use super::*;

fn builtin_error(function: BuiltinFunction, message: impl std::fmt::Display) -> LexyError {
    LexyError::new(
        "EXECUTION_BUILTIN_FAILED",
        format!("{} failed: {}", function.name(), message),
    )
}

fn number(function: BuiltinFunction, arguments: &[Value], index: usize) -> Result<Decimal, LexyError> {
    arguments
        .get(index)
        .and_then(Value::as_number)
        .ok_or_else(|| builtin_error(function, format!("argument {} should be a number.", index + 1)))
}

fn date(function: BuiltinFunction, arguments: &[Value], index: usize) -> Result<NaiveDateTime, LexyError> {
    arguments
        .get(index)
        .and_then(Value::as_date)
        .ok_or_else(|| builtin_error(function, format!("argument {} should be a date.", index + 1)))
}

/// Whole months from `start` to `end`, truncated toward zero.
fn months_between(end: NaiveDateTime, start: NaiveDateTime) -> i64 {
    let mut months = i64::from(end.year() - start.year()) * 12 + i64::from(end.month())
        - i64::from(start.month());
    let end_rest = (end.day(), end.time());
    let start_rest = (start.day(), start.time());
    if months > 0 && end_rest < start_rest {
        months -= 1;
    } else if months < 0 && end_rest > start_rest {
        months += 1;
    }
    months
}

pub(super) fn call(function: BuiltinFunction, arguments: &[Value]) -> Result<Value, LexyError> {
    let value = match function {
        BuiltinFunction::Int => Value::Number(number(function, arguments, 0)?.floor()),
        BuiltinFunction::Abs => Value::Number(number(function, arguments, 0)?.abs()),
        BuiltinFunction::Power => {
            let base = number(function, arguments, 0)?;
            let power = number(function, arguments, 1)?;
            let result = base
                .checked_powd(power)
                .ok_or_else(|| builtin_error(function, format!("{} ^ {} is out of range.", base, power)))?;
            Value::Number(result)
        }
        BuiltinFunction::Round => {
            let value = number(function, arguments, 0)?;
            let digits = number(function, arguments, 1)?;
            let digits = digits
                .trunc()
                .to_i64()
                .and_then(|digits| u32::try_from(digits).ok())
                .ok_or_else(|| builtin_error(function, "digits should be zero or positive."))?;
            Value::Number(value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero))
        }
        BuiltinFunction::Now => Value::Date(Local::now().naive_local()),
        BuiltinFunction::Today => Value::Date(Local::now().date_naive().and_time(NaiveTime::MIN)),
        BuiltinFunction::Year => Value::from(i64::from(date(function, arguments, 0)?.year())),
        BuiltinFunction::Month => Value::from(i64::from(date(function, arguments, 0)?.month())),
        BuiltinFunction::Day => Value::from(i64::from(date(function, arguments, 0)?.day())),
        BuiltinFunction::Hour => Value::from(i64::from(date(function, arguments, 0)?.hour())),
        BuiltinFunction::Minute => Value::from(i64::from(date(function, arguments, 0)?.minute())),
        BuiltinFunction::Second => Value::from(i64::from(date(function, arguments, 0)?.second())),
        BuiltinFunction::Years
        | BuiltinFunction::Months
        | BuiltinFunction::Days
        | BuiltinFunction::Hours
        | BuiltinFunction::Minutes
        | BuiltinFunction::Seconds => {
            let end = date(function, arguments, 0)?;
            let start = date(function, arguments, 1)?;
            let elapsed = end.signed_duration_since(start);
            let difference = match function {
                BuiltinFunction::Years => months_between(end, start) / 12,
                BuiltinFunction::Months => months_between(end, start),
                BuiltinFunction::Days => elapsed.num_days(),
                BuiltinFunction::Hours => elapsed.num_hours(),
                BuiltinFunction::Minutes => elapsed.num_minutes(),
                _ => elapsed.num_seconds(),
            };
            Value::from(difference)
        }
    };
    Ok(value)
}

#[cfg(test)]
mod builtins_tests {
    use super::*;

    fn date_value(text: &str) -> Value {
        Value::Date(parse_date(text).expect("date"))
    }

    fn decimal(text: &str) -> Value {
        Value::Number(text.parse::<Decimal>().expect("decimal"))
    }

    #[test]
    fn int_floors_and_round_rounds_half_away_from_zero() {
        assert_eq!(call(BuiltinFunction::Int, &[decimal("-2.5")]).expect("int"), Value::from(-3));
        assert_eq!(
            call(BuiltinFunction::Round, &[decimal("2.345"), Value::from(2)]).expect("round"),
            decimal("2.35")
        );
        assert_eq!(
            call(BuiltinFunction::Power, &[Value::from(2), Value::from(10)]).expect("power"),
            Value::from(1024)
        );
    }

    #[test]
    fn date_parts_and_differences() {
        let start = date_value("2020-03-15T10:00:00");
        let end = date_value("2024-03-14T09:00:00");
        assert_eq!(call(BuiltinFunction::Year, &[end.clone()]).expect("year"), Value::from(2024));
        assert_eq!(
            call(BuiltinFunction::Years, &[end.clone(), start.clone()]).expect("years"),
            Value::from(3)
        );
        assert_eq!(
            call(BuiltinFunction::Months, &[end.clone(), start.clone()]).expect("months"),
            Value::from(47)
        );
        assert_eq!(
            call(BuiltinFunction::Days, &[date_value("2024-01-02"), date_value("2024-01-01")]).expect("days"),
            Value::from(1)
        );
        assert_eq!(
            call(BuiltinFunction::Months, &[start, end]).expect("negative months"),
            Value::from(-47)
        );
    }

    #[test]
    fn wrong_argument_kinds_fail() {
        let error = call(BuiltinFunction::Abs, &[Value::from("x")]).expect_err("not a number");
        assert_eq!(error.code, "EXECUTION_BUILTIN_FAILED");
        assert!(error.message.starts_with("ABS failed"));
    }
}
