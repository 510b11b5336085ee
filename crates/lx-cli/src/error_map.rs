use lx_core::LexyError;
use lx_tool::LxToolError;

const CLI_ERROR: &str = "CLI_ERROR";

/// Code of the innermost known error in the chain.
fn error_code(error: &anyhow::Error) -> String {
    for cause in error.chain() {
        if let Some(error) = cause.downcast_ref::<LexyError>() {
            return error.code.clone();
        }
        if let Some(error) = cause.downcast_ref::<LxToolError>() {
            return match error {
                LxToolError::ReadFile { .. } => "CLI_SOURCE_READ".to_string(),
                LxToolError::SourceEmpty { .. } => "CLI_SOURCE_EMPTY".to_string(),
                LxToolError::Engine(error) => error.code.clone(),
            };
        }
    }
    CLI_ERROR.to_string()
}

pub(crate) fn emit_error(error: anyhow::Error) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error_code(&error));
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&format!("{:#}", error)).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}
