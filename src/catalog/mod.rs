// ============================================================================
// Catalog Service
// ============================================================================
//
// Capability interface over the metadata store. The dispatch layer only ever
// reads through this trait, which lets the dispatcher run against the
// in-memory catalog in tests and against a server catalog in production.
//
// ============================================================================

pub mod memory;
pub mod resolver;

use crate::core::{ExtensionId, Result, RoutineId, TypeId};
use std::fmt;
use std::sync::Arc;

pub use memory::InMemoryCatalog;
pub use resolver::{FALLBACK_SCHEMA, ResolvedRoutine, quote_identifier, resolve_routine};

/// Groups of catalog objects a subscriber can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogClass {
    Routine,
    Extension,
    Namespace,
}

/// Change notification delivered to subscribers.
///
/// `object` names the changed routine when known; subscribers must not rely on
/// it to decide whether to invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEvent {
    pub class: CatalogClass,
    pub object: Option<RoutineId>,
}

pub type InvalidationCallback = Arc<dyn Fn(&CatalogEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Catalog row describing a stored routine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineEntry {
    pub id: RoutineId,
    /// `None` when the owning schema was dropped concurrently
    pub schema: Option<String>,
    pub name: String,
    pub param_types: Vec<TypeId>,
}

/// Resolved callable used to hand a statement to the remote link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub routine: RoutineId,
    pub name: String,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.routine)
    }
}

pub trait CatalogService: Send + Sync {
    fn lookup_routine(&self, id: RoutineId) -> Result<Option<RoutineEntry>>;

    /// Finds a routine visible on the search path with exactly these argument types
    fn lookup_entry_point(&self, name: &str, arg_types: &[TypeId]) -> Result<Option<EntryPoint>>;

    fn lookup_extension(&self, name: &str) -> Result<Option<ExtensionId>>;

    fn subscribe(&self, class: CatalogClass, callback: InvalidationCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
