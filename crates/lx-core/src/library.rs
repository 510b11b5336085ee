use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use crate::error::LexyError;
use crate::types::PrimitiveType;
use crate::value::Value;

pub type LibraryCallable = fn(&[Value]) -> Result<Value, LexyError>;

#[derive(Debug, Clone)]
pub struct LibraryFunction {
    pub name: String,
    pub arguments: Vec<PrimitiveType>,
    pub return_type: PrimitiveType,
    pub callable: LibraryCallable,
}

impl LibraryFunction {
    pub fn new(
        name: impl Into<String>,
        arguments: Vec<PrimitiveType>,
        return_type: PrimitiveType,
        callable: LibraryCallable,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            return_type,
            callable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Library {
    name: String,
    functions: BTreeMap<String, LibraryFunction>,
}

impl Library {
    pub fn new(name: impl Into<String>, functions: Vec<LibraryFunction>) -> Result<Self, LexyError> {
        let name = name.into();
        let mut by_name = BTreeMap::new();
        for function in functions {
            if by_name.contains_key(&function.name) {
                return Err(LexyError::new(
                    "LIBRARY_FUNCTION_DUPLICATE",
                    format!(
                        "Duplicate function name \"{}\" in library \"{}\".",
                        function.name, name
                    ),
                ));
            }
            by_name.insert(function.name.clone(), function);
        }
        Ok(Self {
            name,
            functions: by_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self, name: &str) -> Option<&LibraryFunction> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &LibraryFunction> {
        self.functions.values()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LibraryRegistry {
    libraries: BTreeMap<String, Library>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `Date`, `Math` and `Number` libraries.
    pub fn with_builtins() -> Result<Self, LexyError> {
        let mut registry = Self::new();
        registry.register(math_library()?)?;
        registry.register(number_library()?)?;
        registry.register(date_library()?)?;
        Ok(registry)
    }

    pub fn with_libraries(libraries: &[Library]) -> Result<Self, LexyError> {
        let mut registry = Self::with_builtins()?;
        for library in libraries {
            registry.register(library.clone())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, library: Library) -> Result<(), LexyError> {
        if self.libraries.contains_key(library.name()) {
            return Err(LexyError::new(
                "LIBRARY_DUPLICATE",
                format!("Duplicate library name \"{}\".", library.name()),
            ));
        }
        self.libraries.insert(library.name().to_string(), library);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Library> {
        self.libraries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn function(&self, library: &str, function: &str) -> Option<&LibraryFunction> {
        self.libraries.get(library)?.function(function)
    }
}

fn library_error(message: impl Into<String>) -> LexyError {
    LexyError::new("EXECUTION_LIBRARY_FAILED", message)
}

fn number_argument(arguments: &[Value], index: usize) -> Result<Decimal, LexyError> {
    arguments
        .get(index)
        .and_then(Value::as_number)
        .ok_or_else(|| library_error(format!("Argument {} should be a number.", index + 1)))
}

fn integer_argument(arguments: &[Value], index: usize) -> Result<i64, LexyError> {
    number_argument(arguments, index)?
        .trunc()
        .to_i64()
        .ok_or_else(|| library_error(format!("Argument {} is out of range.", index + 1)))
}

fn date_argument(arguments: &[Value], index: usize) -> Result<NaiveDateTime, LexyError> {
    arguments
        .get(index)
        .and_then(Value::as_date)
        .ok_or_else(|| library_error(format!("Argument {} should be a date.", index + 1)))
}

fn math_library() -> Result<Library, LexyError> {
    use PrimitiveType::Number;
    Library::new(
        "Math",
        vec![
            LibraryFunction::new("Floor", vec![Number], Number, |arguments| {
                Ok(Value::Number(number_argument(arguments, 0)?.floor()))
            }),
            LibraryFunction::new("Ceiling", vec![Number], Number, |arguments| {
                Ok(Value::Number(number_argument(arguments, 0)?.ceil()))
            }),
            LibraryFunction::new("Truncate", vec![Number], Number, |arguments| {
                Ok(Value::Number(number_argument(arguments, 0)?.trunc()))
            }),
            LibraryFunction::new("Sqrt", vec![Number], Number, |arguments| {
                let value = number_argument(arguments, 0)?;
                value
                    .sqrt()
                    .map(Value::Number)
                    .ok_or_else(|| library_error(format!("Can't take square root of {}.", value)))
            }),
            LibraryFunction::new("Min", vec![Number, Number], Number, |arguments| {
                let left = number_argument(arguments, 0)?;
                let right = number_argument(arguments, 1)?;
                Ok(Value::Number(left.min(right)))
            }),
            LibraryFunction::new("Max", vec![Number, Number], Number, |arguments| {
                let left = number_argument(arguments, 0)?;
                let right = number_argument(arguments, 1)?;
                Ok(Value::Number(left.max(right)))
            }),
        ],
    )
}

fn number_library() -> Result<Library, LexyError> {
    use PrimitiveType::{Number, String};
    Library::new(
        "Number",
        vec![
            LibraryFunction::new("Round", vec![Number, Number], Number, |arguments| {
                let value = number_argument(arguments, 0)?;
                let digits = integer_argument(arguments, 1)?;
                let digits = u32::try_from(digits)
                    .map_err(|_| library_error("Digits should be zero or positive."))?;
                Ok(Value::Number(value.round_dp_with_strategy(
                    digits,
                    RoundingStrategy::MidpointAwayFromZero,
                )))
            }),
            LibraryFunction::new("ToText", vec![Number], String, |arguments| {
                Ok(Value::String(number_argument(arguments, 0)?.normalize().to_string()))
            }),
            LibraryFunction::new("Parse", vec![String], Number, |arguments| {
                let text = arguments
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| library_error("Argument 1 should be a string."))?;
                text.trim()
                    .parse::<Decimal>()
                    .map(Value::Number)
                    .map_err(|_| library_error(format!("Invalid number: '{}'.", text)))
            }),
        ],
    )
}

fn add_months(date: NaiveDateTime, months: i64) -> Result<NaiveDateTime, LexyError> {
    let amount = u32::try_from(months.unsigned_abs())
        .map_err(|_| library_error(format!("Month offset {} is out of range.", months)))?;
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(amount))
    } else {
        date.checked_sub_months(Months::new(amount))
    };
    shifted.ok_or_else(|| library_error("Date is out of range."))
}

fn date_library() -> Result<Library, LexyError> {
    use PrimitiveType::{Date, Number};
    Library::new(
        "Date",
        vec![
            LibraryFunction::new("AddYears", vec![Date, Number], Date, |arguments| {
                let date = date_argument(arguments, 0)?;
                let years = integer_argument(arguments, 1)?;
                Ok(Value::Date(add_months(date, years.saturating_mul(12))?))
            }),
            LibraryFunction::new("AddMonths", vec![Date, Number], Date, |arguments| {
                let date = date_argument(arguments, 0)?;
                let months = integer_argument(arguments, 1)?;
                Ok(Value::Date(add_months(date, months)?))
            }),
            LibraryFunction::new("AddDays", vec![Date, Number], Date, |arguments| {
                let date = date_argument(arguments, 0)?;
                let days = integer_argument(arguments, 1)?;
                let shifted = if days >= 0 {
                    date.checked_add_days(Days::new(days.unsigned_abs()))
                } else {
                    date.checked_sub_days(Days::new(days.unsigned_abs()))
                };
                shifted
                    .map(Value::Date)
                    .ok_or_else(|| library_error("Date is out of range."))
            }),
            LibraryFunction::new("Create", vec![Number, Number, Number], Date, |arguments| {
                let year = integer_argument(arguments, 0)?;
                let month = integer_argument(arguments, 1)?;
                let day = integer_argument(arguments, 2)?;
                let date = i32::try_from(year).ok().and_then(|year| {
                    NaiveDate::from_ymd_opt(
                        year,
                        u32::try_from(month).ok()?,
                        u32::try_from(day).ok()?,
                    )
                });
                date.and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(Value::Date)
                    .ok_or_else(|| {
                        library_error(format!("Invalid date: {}-{}-{}.", year, month, day))
                    })
            }),
            LibraryFunction::new("DayOfWeek", vec![Date], Number, |arguments| {
                let date = date_argument(arguments, 0)?;
                Ok(Value::from(i64::from(date.weekday().number_from_monday())))
            }),
        ],
    )
}

#[cfg(test)]
mod library_tests {
    use super::*;
    use crate::value::parse_date;

    fn call(registry: &LibraryRegistry, library: &str, function: &str, arguments: &[Value]) -> Value {
        let function = registry
            .function(library, function)
            .expect("function should be registered");
        (function.callable)(arguments).expect("library call should succeed")
    }

    #[test]
    fn duplicate_function_names_fail_at_construction() {
        let function = LibraryFunction::new("Same", vec![], PrimitiveType::Number, |_| {
            Ok(Value::from(1))
        });
        let error = Library::new("Custom", vec![function.clone(), function])
            .expect_err("duplicate should fail");
        assert_eq!(error.code, "LIBRARY_FUNCTION_DUPLICATE");
    }

    #[test]
    fn duplicate_library_names_fail_registration() {
        let custom = Library::new("Math", vec![]).expect("library");
        let error = LibraryRegistry::with_libraries(&[custom]).expect_err("duplicate library");
        assert_eq!(error.code, "LIBRARY_DUPLICATE");
    }

    #[test]
    fn builtins_cover_math_number_and_date() {
        let registry = LibraryRegistry::with_builtins().expect("builtins");
        assert_eq!(
            call(&registry, "Math", "Max", &[Value::from(3), Value::from(7)]),
            Value::from(7)
        );
        let half = "2.345".parse::<Decimal>().expect("decimal");
        assert_eq!(
            call(&registry, "Number", "Round", &[Value::Number(half), Value::from(2)]),
            Value::Number("2.35".parse::<Decimal>().expect("decimal"))
        );
        let date = parse_date("2024-01-31").expect("date");
        assert_eq!(
            call(&registry, "Date", "AddMonths", &[Value::Date(date), Value::from(1)]),
            Value::Date(parse_date("2024-02-29").expect("date"))
        );
        assert_eq!(
            call(&registry, "Date", "DayOfWeek", &[Value::Date(date)]),
            Value::from(3)
        );
    }

    #[test]
    fn number_parse_reports_invalid_text() {
        let registry = LibraryRegistry::with_builtins().expect("builtins");
        let function = registry.function("Number", "Parse").expect("parse");
        let error = (function.callable)(&[Value::from("abc")]).expect_err("invalid number");
        assert_eq!(error.code, "EXECUTION_LIBRARY_FAILED");
    }
}
