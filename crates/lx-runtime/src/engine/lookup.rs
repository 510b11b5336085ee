use std::cmp::Ordering;

use lx_core::ir::TableIr;

use super::*;

fn lookup_failed(message: String) -> LexyError {
    LexyError::new("EXECUTION_LOOKUP_FAILED", message)
}

fn column(table: &TableIr, name: &str) -> Result<usize, LexyError> {
    table.column_index(name).ok_or_else(|| {
        LexyError::new(
            "ENGINE_COLUMN_NOT_FOUND",
            format!("Column \"{}\" of table \"{}\" not found.", name, table.name),
        )
    })
}

#[derive(Debug, PartialEq)]
enum RowMatch<'a> {
    Found(usize, &'a RowIr),
    NothingBefore,
    NoRows,
}

/// Exact match first; otherwise the row before the first row whose search
/// value exceeds `condition`; otherwise the last row.
fn find_row<'a>(rows: &[(usize, &'a RowIr)], search: usize, condition: &Value) -> RowMatch<'a> {
    let mut previous = None;
    for &(index, row) in rows {
        match row.values.get(search).and_then(|cell| cell.compare(condition)) {
            Some(Ordering::Equal) => return RowMatch::Found(index, row),
            Some(Ordering::Greater) => {
                return match previous {
                    Some((index, row)) => RowMatch::Found(index, row),
                    None => RowMatch::NothingBefore,
                }
            }
            _ => previous = Some((index, row)),
        }
    }
    match previous {
        Some((index, row)) => RowMatch::Found(index, row),
        None => RowMatch::NoRows,
    }
}

impl LexyEngine {
    pub(super) fn table(&self, name: &str) -> Result<&TableIr, LexyError> {
        self.program.table(name).ok_or_else(|| {
            LexyError::new(
                "ENGINE_TABLE_NOT_FOUND",
                format!("Table \"{}\" not found.", name),
            )
        })
    }

    pub(super) fn lookup(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        lookup: &LookUpIr,
    ) -> Result<Value, LexyError> {
        let table = self.table(&lookup.table)?;
        let search = column(table, &lookup.search_column)?;
        let discriminator = match &lookup.discriminator {
            Some(discriminator) => Some((
                column(table, &discriminator.column)?,
                self.evaluate(context, frame, &discriminator.value)?,
            )),
            None => None,
        };
        let condition = self.evaluate(context, frame, &lookup.value)?;

        let rows = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| match &discriminator {
                Some((index, value)) => row
                    .values
                    .get(*index)
                    .and_then(|cell| cell.compare(value))
                    == Some(Ordering::Equal),
                None => true,
            })
            .collect::<Vec<_>>();

        let described = match &discriminator {
            Some((_, value)) => format!("{} (discriminator {})", condition, value),
            None => condition.to_string(),
        };
        let (index, row) = match find_row(&rows, search, &condition) {
            RowMatch::Found(index, row) => (index, row),
            RowMatch::NothingBefore => {
                return Err(lookup_failed(format!(
                    "Lookup {} in column '{}' of table '{}' failed: no row precedes the first larger value.",
                    described, lookup.search_column, table.name
                )))
            }
            RowMatch::NoRows => {
                return Err(lookup_failed(format!(
                    "Lookup {} in column '{}' of table '{}' failed: no rows.",
                    described, lookup.search_column, table.name
                )))
            }
        };
        context.log_child(
            format!(
                "Lookup {} in table '{}' found row {}.",
                described,
                table.name,
                index + 1
            ),
            Some(row.reference.clone()),
        );

        match &lookup.result {
            LookUpResult::Column(result) => {
                let result = column(table, result)?;
                row.values.get(result).cloned().ok_or_else(|| {
                    LexyError::internal(format!(
                        "Row {} of table '{}' has no value for column {}.",
                        row.reference, table.name, result
                    ))
                })
            }
            LookUpResult::Row => Ok(Value::Object(table.row_object(row))),
        }
    }
}

#[cfg(test)]
mod lookup_tests {
    use super::*;
    use lx_core::SourceReference;

    fn rows(values: &[i64]) -> Vec<RowIr> {
        values
            .iter()
            .map(|value| RowIr {
                reference: SourceReference::new("tests.lexy", 1, 1),
                values: vec![Value::from(*value)],
            })
            .collect()
    }

    fn find(rows: &[RowIr], condition: i64) -> Option<usize> {
        let indexed = rows.iter().enumerate().collect::<Vec<_>>();
        match find_row(&indexed, 0, &Value::from(condition)) {
            RowMatch::Found(index, _) => Some(index),
            _ => None,
        }
    }

    #[test]
    fn exact_match_wins() {
        assert_eq!(find(&rows(&[0, 10, 20]), 10), Some(1));
    }

    #[test]
    fn previous_row_brackets_the_condition() {
        assert_eq!(find(&rows(&[0, 10, 20]), 15), Some(1));
    }

    #[test]
    fn larger_than_every_row_returns_the_last() {
        assert_eq!(find(&rows(&[0, 1]), 2), Some(1));
    }

    #[test]
    fn smaller_than_the_first_row_fails() {
        let bracketed = rows(&[5, 10]);
        let indexed = bracketed.iter().enumerate().collect::<Vec<_>>();
        assert_eq!(find_row(&indexed, 0, &Value::from(1)), RowMatch::NothingBefore);
        assert_eq!(find_row(&[], 0, &Value::from(1)), RowMatch::NoRows);
    }
}
