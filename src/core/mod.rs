pub mod error;
pub mod types;
pub mod value;

pub use error::{DispatchError, Result, SourceLocation};
pub use types::{BoundArgument, ExtensionId, RoutineId, TypeId};
pub use value::Value;
