use super::Value;
use std::fmt;

/// Catalog object identifier of a stored routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineId(pub u32);

impl RoutineId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog object identifier of an installed extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(pub u32);

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type identifier as stored in the type catalog.
///
/// Built-in types keep their well-known object identifiers so that values
/// coming from a real server line up without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const BOOL: TypeId = TypeId(16);
    pub const BYTEA: TypeId = TypeId(17);
    pub const INT8: TypeId = TypeId(20);
    pub const INT2: TypeId = TypeId(21);
    pub const INT4: TypeId = TypeId(23);
    pub const TEXT: TypeId = TypeId(25);
    pub const OID: TypeId = TypeId(26);
    pub const JSON: TypeId = TypeId(114);
    pub const FLOAT4: TypeId = TypeId(700);
    pub const FLOAT8: TypeId = TypeId(701);
    pub const BPCHAR: TypeId = TypeId(1042);
    pub const VARCHAR: TypeId = TypeId(1043);
    pub const DATE: TypeId = TypeId(1082);
    pub const TIME: TypeId = TypeId(1083);
    pub const TIMESTAMP: TypeId = TypeId(1114);
    pub const TIMESTAMPTZ: TypeId = TypeId(1184);
    pub const NUMERIC: TypeId = TypeId(1700);
    pub const RECORD: TypeId = TypeId(2249);
    pub const UUID: TypeId = TypeId(2950);
    pub const JSONB: TypeId = TypeId(3802);

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// SQL name of well-known types, `None` for user-defined ones
    pub fn builtin_name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::BOOL => "boolean",
            Self::BYTEA => "bytea",
            Self::INT8 => "bigint",
            Self::INT2 => "smallint",
            Self::INT4 => "integer",
            Self::TEXT => "text",
            Self::OID => "oid",
            Self::JSON => "json",
            Self::FLOAT4 => "real",
            Self::FLOAT8 => "double precision",
            Self::BPCHAR => "character",
            Self::VARCHAR => "character varying",
            Self::DATE => "date",
            Self::TIME => "time without time zone",
            Self::TIMESTAMP => "timestamp without time zone",
            Self::TIMESTAMPTZ => "timestamp with time zone",
            Self::NUMERIC => "numeric",
            Self::RECORD => "record",
            Self::UUID => "uuid",
            Self::JSONB => "jsonb",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.builtin_name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "type {}", self.0),
        }
    }
}

/// One positional argument of the active call, as marshalled by the executor
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument {
    pub type_id: TypeId,
    pub value: Value,
    pub is_null: bool,
}

impl BoundArgument {
    pub fn new(type_id: TypeId, value: impl Into<Value>) -> Self {
        let value = value.into();
        let is_null = value.is_null();
        Self {
            type_id,
            value,
            is_null,
        }
    }

    pub fn null(type_id: TypeId) -> Self {
        Self {
            type_id,
            value: Value::Null,
            is_null: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(TypeId::INT4.to_string(), "integer");
        assert_eq!(TypeId(99999).to_string(), "type 99999");
        assert!(TypeId(99999).builtin_name().is_none());
    }

    #[test]
    fn test_bound_argument_null_flag() {
        assert!(BoundArgument::null(TypeId::TEXT).is_null);
        assert!(BoundArgument::new(TypeId::TEXT, Value::Null).is_null);
        assert!(!BoundArgument::new(TypeId::INT4, 5i32).is_null);
    }
}
