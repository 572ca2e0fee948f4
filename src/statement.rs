use std::fmt;

/// Switches the remote session into the dialect the routine was written in
pub const COMPATIBILITY_DIRECTIVE: &str = "SET ivorysql.compatible_mode = oracle";

/// Setting read by the execution layer to refuse nested autonomous dispatch
pub const RECURSION_GUARD_SETTING: &str = "plisql.inside_autonomous_transaction";

/// Statement text sent to the autonomous session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStatement(String);

impl CallStatement {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CallStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds `<directives> CALL <qualified_name>(<args>);`.
///
/// Arguments must already be literal text; nothing is escaped here.
pub fn build_call_statement<S: AsRef<str>>(qualified_name: &str, literal_args: &[S]) -> CallStatement {
    let args = literal_args
        .iter()
        .map(|arg| arg.as_ref())
        .collect::<Vec<_>>()
        .join(", ");

    CallStatement(format!(
        "{}; SET {} = true; CALL {}({});",
        COMPATIBILITY_DIRECTIVE, RECURSION_GUARD_SETTING, qualified_name, args
    ))
}
