//! Shared types used across all eventide crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a deferred value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeferredId(pub Uuid);

impl DeferredId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeferredId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deferred-{}", &self.0.simple().to_string()[..8])
    }
}

/// Unique identifier for a chain cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub Uuid);

impl CellId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell-{}", &self.0.simple().to_string()[..8])
    }
}

/// The kinds of eventual operation.
///
/// Only the first five may be intercepted by a handler; the rest are
/// constructors of new deferred values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Read a property.
    Get,
    /// Call the target as a function.
    Apply,
    /// Call a method of the target.
    Send,
    /// Assign a property.
    Set,
    /// Remove a property.
    Delete,
    Resolve,
    Reject,
    MakeStep,
}

impl OpKind {
    /// The operations a handler may implement.
    pub const HANDLED: [OpKind; 5] = [
        OpKind::Get,
        OpKind::Apply,
        OpKind::Send,
        OpKind::Set,
        OpKind::Delete,
    ];

    /// Map a dispatch factory method name onto the operation it handles.
    ///
    /// Returns `None` for names with no handled counterpart.
    pub fn from_factory_name(name: &str) -> Option<OpKind> {
        match name {
            "get" => Some(OpKind::Get),
            "apply" => Some(OpKind::Apply),
            "send" => Some(OpKind::Send),
            "set" => Some(OpKind::Set),
            "delete" => Some(OpKind::Delete),
            _ => None,
        }
    }

    /// Name of the operation in the handled-protocol vocabulary.
    pub fn handled_name(&self) -> &'static str {
        match self {
            OpKind::Get => "get",
            OpKind::Apply => "applyFunction",
            OpKind::Send => "applyMethod",
            OpKind::Set => "set",
            OpKind::Delete => "delete",
            OpKind::Resolve => "resolve",
            OpKind::Reject => "reject",
            OpKind::MakeStep => "makeStep",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handled_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_names_map_to_handled_operations() {
        assert_eq!(OpKind::from_factory_name("apply"), Some(OpKind::Apply));
        assert_eq!(OpKind::from_factory_name("send"), Some(OpKind::Send));
        assert_eq!(OpKind::from_factory_name("get"), Some(OpKind::Get));
        assert_eq!(OpKind::from_factory_name("has"), None);
        assert_eq!(OpKind::from_factory_name("resolve"), None);
    }

    #[test]
    fn test_handled_names() {
        assert_eq!(OpKind::Apply.to_string(), "applyFunction");
        assert_eq!(OpKind::Send.to_string(), "applyMethod");
        assert!(OpKind::HANDLED.contains(&OpKind::Delete));
        assert!(!OpKind::HANDLED.contains(&OpKind::MakeStep));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(DeferredId::new(), DeferredId::new());
        assert!(CellId::new().to_string().starts_with("cell-"));
    }
}
