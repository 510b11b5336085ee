pub mod diagnostics;
pub mod error;
pub mod execution;
pub mod ir;
pub mod library;
pub mod types;
pub mod value;

pub use chrono::NaiveDateTime;
pub use diagnostics::*;
pub use error::LexyError;
pub use execution::*;
pub use library::*;
pub use rust_decimal::Decimal;
pub use types::*;
pub use value::*;
