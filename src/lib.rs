// ============================================================================
// Autonomous Dispatch Library
// ============================================================================
//
// Runs routines declared with PRAGMA AUTONOMOUS_TRANSACTION in a session of
// their own: the call is rebuilt as SQL text with every argument turned back
// into an escaped literal and sent through a remote link, so whatever the
// routine commits survives a rollback of the caller.
//
// ============================================================================

pub mod core;
pub mod routine;
pub mod catalog;
pub mod literal;
pub mod statement;
pub mod config;
pub mod session;
pub mod link;
pub mod dispatch;

// Re-export main types for convenience
pub use core::{BoundArgument, DispatchError, Result, RoutineId, SourceLocation, TypeId, Value};
pub use routine::{RoutineDescriptor, mark_autonomous};
pub use catalog::{CatalogService, InMemoryCatalog};
pub use literal::{Literalizer, LiteralClass};
pub use statement::{CallStatement, build_call_statement};
pub use config::{ConfigSource, RuntimeSettings};
pub use session::SessionContext;
pub use link::{PostgresLink, RemoteSqlLink};
pub use dispatch::{AutonomousDispatcher, BufferLedger};
