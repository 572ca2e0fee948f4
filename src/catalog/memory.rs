use super::{
    CatalogClass, CatalogEvent, CatalogService, EntryPoint, InvalidationCallback, RoutineEntry,
    SubscriptionId,
};
use crate::core::{DispatchError, ExtensionId, Result, RoutineId, TypeId};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// First identifier handed out to user objects
const FIRST_OBJECT_ID: u32 = 16384;

#[derive(Debug, Clone)]
struct StoredRoutine {
    schema: String,
    name: String,
    param_types: Vec<TypeId>,
}

#[derive(Debug, Clone)]
struct StoredExtension {
    id: ExtensionId,
    members: Vec<RoutineId>,
}

/// Immutable snapshot of catalog contents.
///
/// Mutations build a new map and swap the `Arc` (copy-on-write), so readers
/// only hold the lock long enough to clone a pointer.
#[derive(Clone)]
struct CatalogState {
    schemas: Arc<HashSet<String>>,
    routines: Arc<HashMap<RoutineId, StoredRoutine>>,
    extensions: Arc<HashMap<String, StoredExtension>>,
    search_path: Arc<Vec<String>>,
}

struct Subscriber {
    id: SubscriptionId,
    class: CatalogClass,
    callback: InvalidationCallback,
}

/// Catalog store kept entirely in memory.
///
/// Every mutation of routines notifies `CatalogClass::Routine` subscribers,
/// extension changes additionally notify `CatalogClass::Extension`.
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_object_id: AtomicU32,
    next_subscription_id: AtomicU64,
}

impl InMemoryCatalog {
    /// Creates a catalog holding only the `public` schema
    pub fn new() -> Self {
        let mut schemas = HashSet::new();
        schemas.insert("public".to_string());

        Self {
            state: RwLock::new(CatalogState {
                schemas: Arc::new(schemas),
                routines: Arc::new(HashMap::new()),
                extensions: Arc::new(HashMap::new()),
                search_path: Arc::new(vec!["public".to_string()]),
            }),
            subscribers: Mutex::new(Vec::new()),
            next_object_id: AtomicU32::new(FIRST_OBJECT_ID),
            next_subscription_id: AtomicU64::new(1),
        }
    }

    fn snapshot(&self) -> Result<CatalogState> {
        Ok(self.state.read()?.clone())
    }

    fn next_id(&self) -> u32 {
        self.next_object_id.fetch_add(1, Ordering::SeqCst)
    }

    fn notify(&self, class: CatalogClass, object: Option<RoutineId>) -> Result<()> {
        let event = CatalogEvent { class, object };
        let callbacks: Vec<InvalidationCallback> = {
            let subscribers = self.subscribers.lock()?;
            subscribers
                .iter()
                .filter(|s| s.class == class)
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };

        debug!("catalog change {:?}: notifying {} subscriber(s)", event, callbacks.len());
        for callback in callbacks {
            callback(&event);
        }
        Ok(())
    }

    pub fn set_search_path(&self, schemas: &[&str]) -> Result<()> {
        let mut state = self.state.write()?;
        state.search_path = Arc::new(schemas.iter().map(|s| s.to_string()).collect());
        Ok(())
    }

    pub fn create_schema(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.write()?;
            let mut schemas = (*state.schemas).clone();
            schemas.insert(name.to_string());
            state.schemas = Arc::new(schemas);
        }
        self.notify(CatalogClass::Namespace, None)
    }

    /// Removes a schema without touching the routines that live in it.
    ///
    /// Those routines then report no schema, which is what a reader racing
    /// against `DROP SCHEMA` observes.
    pub fn drop_schema(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.write()?;
            if !state.schemas.contains(name) {
                return Err(DispatchError::NotFound(format!("schema \"{}\"", name)));
            }
            let mut schemas = (*state.schemas).clone();
            schemas.remove(name);
            state.schemas = Arc::new(schemas);
        }
        self.notify(CatalogClass::Namespace, None)
    }

    /// CREATE OR REPLACE semantics: an existing routine with the same
    /// schema, name and argument types keeps its identifier.
    pub fn create_routine(
        &self,
        schema: &str,
        name: &str,
        param_types: Vec<TypeId>,
    ) -> Result<RoutineId> {
        let id = {
            let mut state = self.state.write()?;
            self.upsert_routine(&mut state, schema, name, param_types)?
        };

        self.notify(CatalogClass::Routine, Some(id))?;
        Ok(id)
    }

    fn upsert_routine(
        &self,
        state: &mut CatalogState,
        schema: &str,
        name: &str,
        param_types: Vec<TypeId>,
    ) -> Result<RoutineId> {
        if !state.schemas.contains(schema) {
            return Err(DispatchError::NotFound(format!("schema \"{}\"", schema)));
        }

        let existing = state
            .routines
            .iter()
            .find(|(_, r)| r.schema == schema && r.name == name && r.param_types == param_types)
            .map(|(id, _)| *id);
        let id = existing.unwrap_or_else(|| RoutineId(self.next_id()));

        let mut routines = (*state.routines).clone();
        routines.insert(
            id,
            StoredRoutine {
                schema: schema.to_string(),
                name: name.to_string(),
                param_types,
            },
        );
        state.routines = Arc::new(routines);
        Ok(id)
    }

    pub fn drop_routine(&self, id: RoutineId) -> Result<()> {
        {
            let mut state = self.state.write()?;
            if !state.routines.contains_key(&id) {
                return Err(DispatchError::NotFound(format!("function {}", id)));
            }
            let mut routines = (*state.routines).clone();
            routines.remove(&id);
            state.routines = Arc::new(routines);
        }
        self.notify(CatalogClass::Routine, Some(id))
    }

    /// Installs an extension whose member routines live in `schema`.
    ///
    /// Members and the extension record are staged on a copy of the state and
    /// published under the same write lock as the existence check. A failed
    /// install publishes nothing.
    pub fn create_extension(
        &self,
        name: &str,
        schema: &str,
        members: Vec<(String, Vec<TypeId>)>,
    ) -> Result<ExtensionId> {
        let (id, member_ids) = {
            let mut state = self.state.write()?;
            if state.extensions.contains_key(name) {
                return Err(DispatchError::Context {
                    message: format!("extension \"{}\" already exists", name),
                    detail: "drop the extension before installing it again".into(),
                });
            }

            let mut staged = (*state).clone();
            let mut member_ids = Vec::with_capacity(members.len());
            for (routine_name, param_types) in members {
                member_ids.push(self.upsert_routine(
                    &mut staged,
                    schema,
                    &routine_name,
                    param_types,
                )?);
            }

            let id = ExtensionId(self.next_id());
            let mut extensions = (*staged.extensions).clone();
            extensions.insert(
                name.to_string(),
                StoredExtension {
                    id,
                    members: member_ids.clone(),
                },
            );
            staged.extensions = Arc::new(extensions);
            *state = staged;
            (id, member_ids)
        };

        info!("extension \"{}\" installed as {}", name, id);
        for member in &member_ids {
            self.notify(CatalogClass::Routine, Some(*member))?;
        }
        self.notify(CatalogClass::Extension, None)?;
        Ok(id)
    }

    /// Installs the remote link extension into `public`
    pub fn install_dblink(&self) -> Result<ExtensionId> {
        self.create_extension(
            "dblink",
            "public",
            vec![
                ("dblink_exec".to_string(), vec![TypeId::TEXT, TypeId::TEXT]),
                ("dblink_exec".to_string(), vec![TypeId::TEXT]),
                ("dblink_connect".to_string(), vec![TypeId::TEXT]),
            ],
        )
    }

    pub fn drop_extension(&self, name: &str) -> Result<()> {
        let removed = {
            let mut state = self.state.write()?;
            let mut extensions = (*state.extensions).clone();
            let removed = extensions
                .remove(name)
                .ok_or_else(|| DispatchError::NotFound(format!("extension \"{}\"", name)))?;
            state.extensions = Arc::new(extensions);

            let mut routines = (*state.routines).clone();
            for member in &removed.members {
                routines.remove(member);
            }
            state.routines = Arc::new(routines);
            removed
        };

        info!("extension \"{}\" dropped", name);
        for member in &removed.members {
            self.notify(CatalogClass::Routine, Some(*member))?;
        }
        self.notify(CatalogClass::Extension, None)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogService for InMemoryCatalog {
    fn lookup_routine(&self, id: RoutineId) -> Result<Option<RoutineEntry>> {
        let state = self.snapshot()?;
        Ok(state.routines.get(&id).map(|r| RoutineEntry {
            id,
            schema: state.schemas.contains(&r.schema).then(|| r.schema.clone()),
            name: r.name.clone(),
            param_types: r.param_types.clone(),
        }))
    }

    fn lookup_entry_point(&self, name: &str, arg_types: &[TypeId]) -> Result<Option<EntryPoint>> {
        let state = self.snapshot()?;
        for schema in state.search_path.iter() {
            let found = state.routines.iter().find(|(_, r)| {
                &r.schema == schema && r.name == name && r.param_types == arg_types
            });
            if let Some((id, r)) = found {
                return Ok(Some(EntryPoint {
                    routine: *id,
                    name: r.name.clone(),
                }));
            }
        }
        Ok(None)
    }

    fn lookup_extension(&self, name: &str) -> Result<Option<ExtensionId>> {
        Ok(self.snapshot()?.extensions.get(name).map(|e| e.id))
    }

    fn subscribe(&self, class: CatalogClass, callback: InvalidationCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::SeqCst));
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(Subscriber {
                id,
                class,
                callback,
            }),
            Err(poisoned) => poisoned.into_inner().push(Subscriber {
                id,
                class,
                callback,
            }),
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|s| s.id != id);
    }
}
