use std::fmt;

/// The closed set of Decaf types.
///
/// Built-in singletons compare by identity (derived `PartialEq` on a
/// fieldless variant is exactly that). `error` is the poison type: see
/// [`DependencyTree::is_subtype`](crate::DependencyTree::is_subtype) for the
/// short-circuit that keeps it out of the lattice in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Int,
    Float,
    Boolean,
    String,
    Void,
    Null,
    /// Internal poison type: result of a prior type error, used so a single
    /// bad subexpression doesn't cascade into unrelated diagnostics.
    Error,
    /// An instance of the named class.
    User(String),
    /// The type of a bare class name used for static access, e.g. `A.x`.
    ClassLit(String),
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn user_class_name(&self) -> Option<&str> {
        match self {
            Type::User(name) => Some(name),
            _ => None,
        }
    }

    pub fn class_lit_name(&self) -> Option<&str> {
        match self {
            Type::ClassLit(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Boolean => write!(f, "boolean"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Error => write!(f, "error"),
            Type::User(name) => write!(f, "{name}"),
            Type::ClassLit(name) => write!(f, "class {name}"),
        }
    }
}
