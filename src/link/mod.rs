// ============================================================================
// Remote SQL Link
// ============================================================================
//
// Opens a session described by a connection descriptor and runs one
// statement in it. The acknowledgment text is advisory; failures must carry
// the remote detail text unmodified.
//
// ============================================================================

pub mod postgres;

use crate::catalog::EntryPoint;
use crate::core::Result;
use async_trait::async_trait;

pub use postgres::PostgresLink;

#[async_trait]
pub trait RemoteSqlLink: Send + Sync {
    /// Link name for logging
    fn name(&self) -> &'static str;

    /// Runs `statement` in a new session opened with `connection_descriptor`.
    ///
    /// `target` is the resolved remote exec entry point the call is routed
    /// through.
    async fn execute(
        &self,
        target: &EntryPoint,
        connection_descriptor: &str,
        statement: &str,
    ) -> Result<String>;
}
