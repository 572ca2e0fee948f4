use super::RemoteSqlLink;
use crate::catalog::EntryPoint;
use crate::core::{DispatchError, Result};
use async_trait::async_trait;
use log::{debug, error};
use std::time::Duration;
use tokio::task::JoinError;
use tokio_postgres::{Config, NoTls};

/// Remote link speaking the PostgreSQL wire protocol.
///
/// Every call opens a fresh session, runs the statement with the simple query
/// protocol and closes the session again, so the statement commits or rolls
/// back on its own regardless of the caller's transaction.
#[derive(Debug, Clone)]
pub struct PostgresLink {
    default_host: String,
    default_user: Option<String>,
    connect_timeout: Option<Duration>,
}

impl PostgresLink {
    /// Link defaulting to `localhost` and the `PGUSER` / `USER` account
    pub fn new() -> Self {
        let default_user = std::env::var("PGUSER")
            .or_else(|_| std::env::var("USER"))
            .ok();
        Self {
            default_host: "localhost".to_string(),
            default_user,
            connect_timeout: None,
        }
    }

    /// Host (or unix socket directory) used when the descriptor names none
    pub fn default_host(mut self, host: &str) -> Self {
        self.default_host = host.to_string();
        self
    }

    /// User used when the descriptor names none
    pub fn default_user(mut self, user: &str) -> Self {
        self.default_user = Some(user.to_string());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Parses a key/value connection descriptor and fills in link defaults
    pub fn parse_descriptor(&self, descriptor: &str) -> Result<Config> {
        let mut config: Config = descriptor
            .parse()
            .map_err(|e: tokio_postgres::Error| {
                DispatchError::remote("invalid connection descriptor", e.to_string())
            })?;

        if config.get_hosts().is_empty() {
            config.host(self.default_host.as_str());
        }
        if config.get_user().is_none() {
            if let Some(user) = &self.default_user {
                config.user(user.as_str());
            }
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }
        Ok(config)
    }
}

impl Default for PostgresLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Detail text of a failure, server message first when there is one
fn failure_detail(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => server_error_text(db.message(), db.code().code(), db.detail(), db.hint()),
        None => err.to_string(),
    }
}

/// Server error with its SQLSTATE, DETAIL and HINT fields
fn server_error_text(
    message: &str,
    sqlstate: &str,
    detail: Option<&str>,
    hint: Option<&str>,
) -> String {
    let mut text = format!("{} (SQLSTATE {})", message, sqlstate);
    if let Some(detail) = detail {
        text.push_str("\nDETAIL: ");
        text.push_str(detail);
    }
    if let Some(hint) = hint {
        text.push_str("\nHINT: ");
        text.push_str(hint);
    }
    text
}

/// Reports how the connection driver task ended; false when it panicked or
/// was cancelled
fn driver_finished(outcome: std::result::Result<(), JoinError>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(e) => {
            error!("autonomous session driver task failed: {}", e);
            false
        }
    }
}

#[async_trait]
impl RemoteSqlLink for PostgresLink {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn execute(
        &self,
        target: &EntryPoint,
        connection_descriptor: &str,
        statement: &str,
    ) -> Result<String> {
        let config = self.parse_descriptor(connection_descriptor)?;
        debug!("opening autonomous session through {}", target);

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            DispatchError::remote("could not establish connection", failure_detail(&e))
        })?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("autonomous session connection error: {}", e);
            }
        });

        let outcome = client.batch_execute(statement).await;
        drop(client);
        driver_finished(driver.await);

        outcome
            .map(|_| "OK".to_string())
            .map_err(|e| DispatchError::remote("autonomous transaction failed", failure_detail(&e)))
    }
}
