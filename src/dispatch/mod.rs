// ============================================================================
// Autonomous Dispatcher
// ============================================================================
//
// Re-invokes an autonomous routine in its own session:
//
//   1. resolve the remote exec entry point (cached, catalog invalidated)
//   2. build the connection descriptor for the current database
//   3. resolve the routine's qualified name and parameter types
//   4. literalize every argument
//   5. build the call statement (with the recursion guard directive)
//   6. run it through the remote link
//
// Strings built for one call live in a `DispatchBuffers` guard and are
// released when it drops, on success and failure alike.
//
// ============================================================================

pub mod conninfo;
pub mod target;

use crate::catalog::{CatalogService, resolve_routine};
use crate::config::ConfigSource;
use crate::core::{BoundArgument, DispatchError, Result, Value};
use crate::link::RemoteSqlLink;
use crate::literal::{Literalizer, TypeOutputRenderer};
use crate::routine::RoutineDescriptor;
use crate::session::SessionContext;
use crate::statement::build_call_statement;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{Instrument, Level, event, info_span};

pub use conninfo::{ConnectionDescriptor, build_connection_descriptor, escape_conninfo_value};
pub use target::{DispatchTargetResolver, TargetState};

/// Counts dispatch buffer sets that are still alive
#[derive(Debug, Default)]
pub struct BufferLedger {
    live: AtomicUsize,
    acquired: AtomicU64,
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer sets acquired and not yet released
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Buffer sets acquired since creation
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }
}

/// Transient strings owned by one dispatch
struct DispatchBuffers {
    database_name: String,
    connection_descriptor: String,
    statement: String,
    ledger: Option<Arc<BufferLedger>>,
}

impl DispatchBuffers {
    fn acquire(ledger: Option<Arc<BufferLedger>>) -> Self {
        if let Some(ledger) = &ledger {
            ledger.live.fetch_add(1, Ordering::SeqCst);
            ledger.acquired.fetch_add(1, Ordering::SeqCst);
        }
        Self {
            database_name: String::new(),
            connection_descriptor: String::new(),
            statement: String::new(),
            ledger,
        }
    }
}

impl Drop for DispatchBuffers {
    fn drop(&mut self) {
        self.database_name.clear();
        self.connection_descriptor.clear();
        self.statement.clear();
        if let Some(ledger) = &self.ledger {
            ledger.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct AutonomousDispatcher {
    catalog: Arc<dyn CatalogService>,
    link: Arc<dyn RemoteSqlLink>,
    config: Arc<dyn ConfigSource>,
    literalizer: Literalizer,
    target: DispatchTargetResolver,
    ledger: Option<Arc<BufferLedger>>,
}

impl AutonomousDispatcher {
    /// Creates a dispatcher for one execution context.
    ///
    /// Registers the catalog subscription that invalidates the cached
    /// dispatch target.
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        link: Arc<dyn RemoteSqlLink>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        let target = DispatchTargetResolver::new(Arc::clone(&catalog));
        Self {
            catalog,
            link,
            config,
            literalizer: Literalizer::new(),
            target,
            ledger: None,
        }
    }

    /// Use a custom output renderer for argument values
    pub fn with_renderer(mut self, renderer: Arc<dyn TypeOutputRenderer>) -> Self {
        self.literalizer = Literalizer::with_renderer(renderer);
        self
    }

    /// Track dispatch buffers in `ledger`
    pub fn with_buffer_ledger(mut self, ledger: Arc<BufferLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn target(&self) -> &DispatchTargetResolver {
        &self.target
    }

    /// Whether the remote link extension is installed
    pub fn remote_link_available(&self) -> Result<bool> {
        Ok(self
            .catalog
            .lookup_extension(target::REMOTE_LINK_EXTENSION)?
            .is_some())
    }

    /// Runs `descriptor` with `args` in an autonomous session.
    ///
    /// Returns `Value::Null`; autonomous calls never hand a value back.
    pub async fn dispatch(
        &self,
        session: &SessionContext,
        descriptor: &RoutineDescriptor,
        args: &[BoundArgument],
    ) -> Result<Value> {
        let span = info_span!(
            "autonomous.dispatch",
            routine = %descriptor.id(),
            args = args.len(),
            link = self.link.name()
        );
        self.dispatch_inner(session, descriptor, args)
            .instrument(span)
            .await
    }

    async fn dispatch_inner(
        &self,
        session: &SessionContext,
        descriptor: &RoutineDescriptor,
        args: &[BoundArgument],
    ) -> Result<Value> {
        if !descriptor.is_autonomous() {
            return Err(DispatchError::context(
                format!("routine {} is not autonomous", descriptor.id()),
                "only routines declared with PRAGMA AUTONOMOUS_TRANSACTION can be dispatched",
            ));
        }

        let entry = self.target.resolve().inspect_err(|err| {
            event!(Level::ERROR, error = %err, "remote dispatch target unavailable");
        })?;

        let mut buffers = DispatchBuffers::acquire(self.ledger.clone());

        buffers.database_name = conninfo::current_database(session)?.to_string();
        buffers.connection_descriptor =
            conninfo::descriptor_for_database(&buffers.database_name, self.config.as_ref())
                .into_string();

        let routine = resolve_routine(self.catalog.as_ref(), descriptor.id())?;
        let literals = args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let type_id = routine.param_types.get(i).copied().unwrap_or(arg.type_id);
                self.literalizer.literalize(type_id, &arg.value, arg.is_null)
            })
            .collect::<Result<Vec<_>>>()?;

        buffers.statement = build_call_statement(&routine.qualified_name, &literals).into_string();
        event!(Level::DEBUG, routine = %routine.qualified_name, "autonomous call statement built");

        let ack = self
            .link
            .execute(&entry, &buffers.connection_descriptor, &buffers.statement)
            .await
            .inspect_err(|err| {
                event!(Level::ERROR, error = %err, "autonomous call failed");
            })?;

        if ack.starts_with("ERROR") {
            event!(Level::ERROR, ack = %ack, "autonomous call reported an error");
            return Err(DispatchError::remote("autonomous transaction failed", ack));
        }

        event!(Level::DEBUG, "autonomous call completed");
        Ok(Value::Null)
    }
}
