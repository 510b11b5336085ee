use super::*;

fn object(value: Value, statement: &StatementIr) -> Result<BTreeMap<String, Value>, LexyError> {
    match value {
        Value::Object(entries) => Ok(entries),
        other => Err(LexyError::with_reference(
            "EXECUTION_TYPE_MISMATCH",
            format!("Expected an object but got {}.", other),
            statement.line.reference.clone(),
        )),
    }
}

impl LexyEngine {
    pub(super) fn execute_statements(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        statements: &[StatementIr],
    ) -> Result<(), LexyError> {
        statements
            .iter()
            .try_for_each(|statement| self.execute_statement(context, frame, statement))
    }

    /// Logs the line with its reads, nests everything the statement logs
    /// under it, then records the writes.
    fn execute_statement(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        statement: &StatementIr,
    ) -> Result<(), LexyError> {
        trace!(line = %statement.line.text, "execute");
        if let StatementKind::If {
            branches,
            otherwise,
        } = &statement.kind
        {
            for branch in branches {
                context.log(
                    branch.line.text.clone(),
                    Some(branch.line.reference.clone()),
                    frame.snapshot(&branch.reads),
                );
                let taken = context.in_last_node(|context| {
                    self.condition(context, frame, &branch.condition)
                })?;
                if taken {
                    return context.in_last_node(|context| {
                        self.execute_statements(context, frame, &branch.body)
                    });
                }
            }
            if let Some(otherwise) = otherwise {
                context.log(
                    otherwise.line.text.clone(),
                    Some(otherwise.line.reference.clone()),
                    BTreeMap::new(),
                );
                return context.in_last_node(|context| {
                    self.execute_statements(context, frame, &otherwise.body)
                });
            }
            return Ok(());
        }

        context.log(
            statement.line.text.clone(),
            Some(statement.line.reference.clone()),
            frame.snapshot(&statement.reads),
        );
        context.in_last_node(|context| self.execute_kind(context, frame, statement))?;
        context.add_write_variables(frame.snapshot(&statement.writes));
        Ok(())
    }

    fn execute_kind(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        statement: &StatementIr,
    ) -> Result<(), LexyError> {
        match &statement.kind {
            StatementKind::Declare { name, value } => {
                let value = self.evaluate(context, frame, value)?;
                frame.code.insert(name.clone(), value);
            }
            StatementKind::Assign { target, value } => {
                let value = self.evaluate(context, frame, value)?;
                frame.write(target, value)?;
            }
            StatementKind::Evaluate(expression) => {
                self.evaluate(context, frame, expression)?;
            }
            StatementKind::Extract { value, targets } => {
                let value = self.evaluate(context, frame, value)?;
                self.extract(frame, object(value, statement)?, targets)?;
            }
            StatementKind::SpreadCall { call, targets } => {
                let value = self.call(context, frame, call)?;
                self.extract(frame, object(value, statement)?, targets)?;
            }
            StatementKind::If { .. } => {}
        }
        Ok(())
    }

    fn extract(
        &self,
        frame: &mut Frame,
        mut members: BTreeMap<String, Value>,
        targets: &[(String, VariableReference)],
    ) -> Result<(), LexyError> {
        for (member, target) in targets {
            if let Some(value) = members.remove(member) {
                frame.write(target, value)?;
            }
        }
        Ok(())
    }
}
