//! Property keys.

use std::fmt;

/// Symbols the runtime itself consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WellKnownSymbol {
    /// Looked up by hosts when coercing a value to a primitive.
    ToPrimitive,
    /// Names the tag used when rendering `[object <tag>]`.
    ToStringTag,
}

impl WellKnownSymbol {
    pub fn description(&self) -> &'static str {
        match self {
            WellKnownSymbol::ToPrimitive => "Symbol.toPrimitive",
            WellKnownSymbol::ToStringTag => "Symbol.toStringTag",
        }
    }
}

/// A property key: either a string name or a well-known symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Name(String),
    Symbol(WellKnownSymbol),
}

impl Key {
    /// The string name, if this key is not a symbol.
    pub fn name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Key::Symbol(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{}", name),
            Key::Symbol(sym) => write!(f, "Symbol({})", sym.description()),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::Name(name.clone())
    }
}

impl From<WellKnownSymbol> for Key {
    fn from(sym: WellKnownSymbol) -> Self {
        Key::Symbol(sym)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Name(index.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from("then").to_string(), "then");
        assert_eq!(
            Key::from(WellKnownSymbol::ToPrimitive).to_string(),
            "Symbol(Symbol.toPrimitive)"
        );
        assert_eq!(Key::from(3usize).to_string(), "3");
    }

    #[test]
    fn test_symbol_and_name_are_distinct() {
        let sym = Key::from(WellKnownSymbol::ToStringTag);
        assert!(sym.is_symbol());
        assert_eq!(sym.name(), None);
        assert_ne!(sym, Key::from("Symbol.toStringTag"));
    }
}
