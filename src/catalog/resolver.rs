use super::CatalogService;
use crate::core::{DispatchError, Result, RoutineId, TypeId};
use lazy_static::lazy_static;
use log::warn;
use std::collections::HashSet;

/// Schema substituted when a routine's schema disappears under us
pub const FALLBACK_SCHEMA: &str = "public";

lazy_static! {
    /// Keywords that cannot appear as bare identifiers
    static ref NON_BARE_KEYWORDS: HashSet<&'static str> = [
        // reserved
        "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
        "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
        "current_date", "current_role", "current_time", "current_timestamp", "current_user",
        "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
        "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "initially",
        "intersect", "into", "lateral", "leading", "limit", "localtime", "localtimestamp", "not",
        "null", "offset", "on", "only", "or", "order", "placing", "primary", "references",
        "returning", "select", "session_user", "some", "symmetric", "system_user", "table",
        "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic", "when",
        "where", "window", "with",
        // type or function names
        "authorization", "binary", "collation", "concurrently", "cross", "current_schema",
        "freeze", "full", "ilike", "inner", "is", "isnull", "join", "left", "like", "natural",
        "notnull", "outer", "overlaps", "right", "similar", "tablesample", "verbose",
        // column names
        "between", "bigint", "bit", "boolean", "char", "character", "coalesce", "dec", "decimal",
        "exists", "extract", "float", "greatest", "grouping", "inout", "int", "integer",
        "interval", "json", "json_array", "json_arrayagg", "json_exists", "json_object",
        "json_objectagg", "json_query", "json_scalar", "json_serialize", "json_table",
        "json_value", "least", "merge_action", "national", "nchar", "none", "normalize",
        "nullif", "numeric", "out",
        "overlay", "position", "precision", "real", "row", "setof", "smallint", "substring",
        "time", "timestamp", "treat", "trim", "values", "varchar", "xmlattributes", "xmlconcat",
        "xmlelement", "xmlexists", "xmlforest", "xmlnamespaces", "xmlparse", "xmlpi", "xmlroot",
        "xmlserialize", "xmltable",
    ]
    .into_iter()
    .collect();
}

/// Quotes an identifier only when it would not survive as a bare word.
///
/// Bare identifiers start with a lowercase ASCII letter or underscore, contain
/// only lowercase ASCII letters, digits and underscores, and are not keywords.
pub fn quote_identifier(ident: &str) -> String {
    let mut chars = ident.chars();
    let safe_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let safe = safe_start
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !NON_BARE_KEYWORDS.contains(ident);

    if safe {
        return ident.to_string();
    }

    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push('"');
    for c in ident.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Routine metadata needed to rebuild a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoutine {
    /// `schema.name`, each part quoted on its own
    pub qualified_name: String,
    pub param_types: Vec<TypeId>,
}

pub fn resolve_routine(catalog: &dyn CatalogService, id: RoutineId) -> Result<ResolvedRoutine> {
    let entry = catalog
        .lookup_routine(id)?
        .ok_or_else(|| DispatchError::NotFound(format!("cache lookup failed for function {}", id)))?;

    let schema = match entry.schema {
        Some(schema) => schema,
        None => {
            warn!(
                "schema of routine {} ({}) vanished, falling back to \"{}\"",
                id, entry.name, FALLBACK_SCHEMA
            );
            FALLBACK_SCHEMA.to_string()
        }
    };

    Ok(ResolvedRoutine {
        qualified_name: format!("{}.{}", quote_identifier(&schema), quote_identifier(&entry.name)),
        param_types: entry.param_types,
    })
}
