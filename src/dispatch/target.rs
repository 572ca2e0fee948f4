// ============================================================================
// Dispatch Target Resolver
// ============================================================================
//
// Caches the entry point of the remote link routine.
//
//   Unresolved ──resolve()──> Resolved ──catalog change──> Unresolved ...
//
// Catalog notifications only bump a generation counter. A cached entry is
// served only while its recorded generation still matches, so an entry
// resolved concurrently with an invalidation is never trusted afterwards.
//
// ============================================================================

use crate::catalog::{CatalogClass, CatalogEvent, CatalogService, EntryPoint, SubscriptionId};
use crate::core::{DispatchError, Result, TypeId};
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Routine of the remote link facility that executes a statement
pub const REMOTE_EXEC_ROUTINE: &str = "dblink_exec";

/// Extension providing `REMOTE_EXEC_ROUTINE`
pub const REMOTE_LINK_EXTENSION: &str = "dblink";

/// Argument signature of the remote exec routine: (connection, statement)
pub const REMOTE_EXEC_SIGNATURE: [TypeId; 2] = [TypeId::TEXT, TypeId::TEXT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Unresolved,
    Resolved,
}

#[derive(Debug, Clone)]
struct CachedTarget {
    entry: EntryPoint,
    generation: u64,
}

pub struct DispatchTargetResolver {
    catalog: Arc<dyn CatalogService>,
    generation: Arc<AtomicU64>,
    cached: Mutex<Option<CachedTarget>>,
    subscription: SubscriptionId,
}

impl DispatchTargetResolver {
    /// Creates an unresolved cache and subscribes it to routine catalog changes
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&generation);
        let subscription = catalog.subscribe(
            CatalogClass::Routine,
            Arc::new(move |_event: &CatalogEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        Self {
            catalog,
            generation,
            cached: Mutex::new(None),
            subscription,
        }
    }

    pub fn state(&self) -> TargetState {
        let current = self.generation.load(Ordering::SeqCst);
        let cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match cached.as_ref() {
            Some(target) if target.generation == current => TargetState::Resolved,
            _ => TargetState::Unresolved,
        }
    }

    /// Drops the cached entry; the next `resolve` looks it up again
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn resolve(&self) -> Result<EntryPoint> {
        let mut cached = self.cached.lock()?;
        let generation = self.generation.load(Ordering::SeqCst);

        match cached.as_ref() {
            Some(target) if target.generation == generation => return Ok(target.entry.clone()),
            Some(target) => debug!("cached {} is stale, resolving again", target.entry),
            None => {}
        }
        *cached = None;

        let entry = self
            .catalog
            .lookup_entry_point(REMOTE_EXEC_ROUTINE, &REMOTE_EXEC_SIGNATURE)?
            .ok_or_else(|| DispatchError::RemoteLinkUnavailable {
                message: format!("{} function not found", REMOTE_EXEC_ROUTINE),
                hint: format!(
                    "Install {} extension: CREATE EXTENSION {}",
                    REMOTE_LINK_EXTENSION, REMOTE_LINK_EXTENSION
                ),
            })?;

        info!("resolved remote dispatch target {}", entry);
        *cached = Some(CachedTarget {
            entry: entry.clone(),
            generation,
        });
        Ok(entry)
    }
}

impl Drop for DispatchTargetResolver {
    fn drop(&mut self) {
        self.catalog.unsubscribe(self.subscription);
    }
}
