//! Declared types and constraints.
//!
//! NaviLang declarations can annotate a variable with a type
//! (`VAR User: Entity`), an enumeration (`VAR Status: Enum[Active, Inactive]`)
//! or a constrained base type (`VAR Age: Number (Positive, Range(0, 150))`).
//! The grammar is closed, so both `TypeInfo` and `Constraint` are exhaustive
//! sum types.

use serde::{Deserialize, Serialize};

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::String => write!(f, "String"),
            Primitive::Number => write!(f, "Number"),
            Primitive::Boolean => write!(f, "Boolean"),
        }
    }
}

/// A declared type annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeInfo {
    Primitive(Primitive),
    Entity,
    Service,
    Endpoint,
    Object,
    /// `Enum[A, B, C]` with the declared variant names in source order.
    Enum(Vec<String>),
    /// A base type plus one or more constraints.
    Constrained {
        base: Box<TypeInfo>,
        constraints: Vec<Constraint>,
    },
}

impl TypeInfo {
    /// Peels `Constrained` wrappers down to the underlying type.
    pub fn base(&self) -> &TypeInfo {
        match self {
            TypeInfo::Constrained { base, .. } => base.base(),
            other => other,
        }
    }

    /// Constraints attached to this type, outermost first.
    pub fn constraints(&self) -> &[Constraint] {
        match self {
            TypeInfo::Constrained { constraints, .. } => constraints,
            _ => &[],
        }
    }

    /// Whether a symbol of this type can be the target of `CALLS`.
    pub fn is_callable(&self) -> bool {
        matches!(self.base(), TypeInfo::Service | TypeInfo::Endpoint)
    }

    /// Whether this type names a scalar value rather than an entity-like thing.
    pub fn is_primitive(&self) -> bool {
        matches!(self.base(), TypeInfo::Primitive(_))
    }

    /// Human-readable category name, used in type mismatch messages.
    pub fn category(&self) -> String {
        match self {
            TypeInfo::Primitive(p) => p.to_string(),
            TypeInfo::Entity => "Entity".to_string(),
            TypeInfo::Service => "Service".to_string(),
            TypeInfo::Endpoint => "Endpoint".to_string(),
            TypeInfo::Object => "Object".to_string(),
            TypeInfo::Enum(variants) => format!("Enum[{}]", variants.join(", ")),
            TypeInfo::Constrained { base, .. } => base.category(),
        }
    }
}

impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.category())
    }
}

/// A single constraint inside a constrained type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Required,
    Optional,
    Auto,
    Positive,
    Range(i64, i64),
    Length(i64, i64),
    Pattern(String),
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Required => write!(f, "Required"),
            Constraint::Optional => write!(f, "Optional"),
            Constraint::Auto => write!(f, "Auto"),
            Constraint::Positive => write!(f, "Positive"),
            Constraint::Range(min, max) => write!(f, "Range({min}, {max})"),
            Constraint::Length(min, max) => write!(f, "Length({min}, {max})"),
            Constraint::Pattern(re) => write!(f, "Pattern(\"{re}\")"),
        }
    }
}
