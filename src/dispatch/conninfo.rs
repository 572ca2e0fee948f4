use crate::config::{ConfigSource, LISTEN_ADDRESSES_OPTION, PORT_OPTION};
use crate::core::{DispatchError, Result};
use crate::session::{BackendKind, SessionContext};
use std::fmt;

/// Bind scopes that do not name a specific address
const WILDCARD_ADDRESSES: [&str; 3] = ["*", "0.0.0.0", "::"];

/// Connection target of the autonomous session, in key/value form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quotes a connection option value: backslash and quote are backslash
/// escaped, the whole value wrapped in single quotes
pub fn escape_conninfo_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('\'');
    escaped
}

/// Database the session is connected to, or why there is none
pub fn current_database(session: &SessionContext) -> Result<&str> {
    if session.kind() != BackendKind::Client {
        return Err(DispatchError::context(
            "autonomous transactions cannot run in background processes",
            "no client connection is attached to this backend",
        ));
    }

    session.database_name().ok_or_else(|| {
        DispatchError::context(
            "database name not available in connection info",
            "the client connection carries no database name",
        )
    })
}

fn has_specific_bind_target(listen_addresses: &str) -> bool {
    let entries: Vec<&str> = listen_addresses
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    !entries.is_empty() && !entries.iter().any(|entry| WILDCARD_ADDRESSES.contains(entry))
}

/// Builds the connection target for the session's own database
pub fn build_connection_descriptor(
    session: &SessionContext,
    config: &dyn ConfigSource,
) -> Result<ConnectionDescriptor> {
    let database_name = current_database(session)?;
    Ok(descriptor_for_database(database_name, config))
}

/// Builds `dbname='...'[ host=localhost][ port=...]`
pub fn descriptor_for_database(database_name: &str, config: &dyn ConfigSource) -> ConnectionDescriptor {
    let mut descriptor = format!("dbname={}", escape_conninfo_value(database_name));

    if let Some(listen) = config.get(LISTEN_ADDRESSES_OPTION) {
        if has_specific_bind_target(&listen) {
            descriptor.push_str(" host=localhost");
        }
    }

    if let Some(port) = config.get(PORT_OPTION) {
        let port = port.trim();
        if !port.is_empty() {
            descriptor.push_str(" port=");
            if port.chars().all(|c| c.is_ascii_digit()) {
                descriptor.push_str(port);
            } else {
                descriptor.push_str(&escape_conninfo_value(port));
            }
        }
    }

    ConnectionDescriptor(descriptor)
}
