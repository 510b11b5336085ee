use super::*;

impl LexyEngine {
    pub(super) fn call(
        &self,
        context: &mut ExecutionContext,
        frame: &mut Frame,
        call: &FunctionCallIr,
    ) -> Result<Value, LexyError> {
        let function = self.function(&call.function)?;
        let parameters = match &call.arguments {
            CallArgumentsIr::Object(expression) => match self.evaluate(context, frame, expression)? {
                Value::Object(entries) => entries,
                other => {
                    return Err(LexyError::new(
                        "EXECUTION_TYPE_MISMATCH",
                        format!(
                            "Parameters of '{}' should be an object but got {}.",
                            function.name, other
                        ),
                    ))
                }
            },
            CallArgumentsIr::Positional(arguments) => {
                let mut parameters = default_object(&function.parameters);
                for (name, argument) in arguments {
                    let value = self.evaluate(context, frame, argument)?;
                    parameters.insert(name.clone(), value);
                }
                parameters
            }
            CallArgumentsIr::Spread(sources) => {
                let mut parameters = default_object(&function.parameters);
                for (name, source) in sources {
                    parameters.insert(name.clone(), frame.read(source)?.clone());
                }
                parameters
            }
        };
        let results = self.execute_function(context, function, parameters)?;
        Ok(Value::Object(results))
    }

    /// Opens the `Execute:` scope, logs both snapshots and runs the body.
    pub(super) fn execute_function(
        &self,
        context: &mut ExecutionContext,
        function: &FunctionIr,
        parameters: BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, LexyError> {
        debug!(function = %function.name, depth = context.depth(), "execute function");
        context.in_scope(
            format!("Execute: {}", function.name),
            Some(function.reference.clone()),
            |context| {
                context.log("Parameters", None, parameters.clone());
                let mut frame = Frame {
                    parameters,
                    results: default_object(&function.results),
                    code: BTreeMap::new(),
                };
                self.execute_statements(context, &mut frame, &function.body)?;
                context.log("Results", None, frame.results.clone());
                Ok(frame.results)
            },
        )
    }
}
