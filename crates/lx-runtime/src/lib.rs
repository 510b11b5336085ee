mod engine;
mod execution_context;
mod helpers;

pub use engine::{LexyEngine, LexyEngineOptions};
pub use execution_context::ExecutionContext;
