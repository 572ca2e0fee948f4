/// Kind of backend the current call runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Session opened by a client connection
    Client,
    /// Background worker or standalone process, no client connection info
    Background,
}

/// Execution context of the active call
#[derive(Debug, Clone)]
pub struct SessionContext {
    kind: BackendKind,
    database_name: Option<String>,
    inside_autonomous_transaction: bool,
}

impl SessionContext {
    /// Client session connected to `database`
    pub fn client(database: &str) -> Self {
        Self {
            kind: BackendKind::Client,
            database_name: Some(database.to_string()),
            inside_autonomous_transaction: false,
        }
    }

    /// Client session whose connection info carries no database name
    pub fn client_without_database() -> Self {
        Self {
            kind: BackendKind::Client,
            database_name: None,
            inside_autonomous_transaction: false,
        }
    }

    pub fn background() -> Self {
        Self {
            kind: BackendKind::Background,
            database_name: None,
            inside_autonomous_transaction: false,
        }
    }

    /// Marks the session as the target of an autonomous call, as the
    /// recursion guard directive does on the remote side
    pub fn entered_autonomous(mut self) -> Self {
        self.inside_autonomous_transaction = true;
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    /// Read by the execution layer before it starts another autonomous call
    pub fn is_inside_autonomous_transaction(&self) -> bool {
        self.inside_autonomous_transaction
    }
}
