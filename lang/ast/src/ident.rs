use std::fmt;

/// A surface-level identifier.
///
/// Identifiers double as type-level variable names: the annotation `a : int`
/// introduces the index variable `a`, and machine-generated names (`?N`) share
/// this representation.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ident {
    pub id: String,
}

impl Ident {
    pub fn from_string(id: &str) -> Self {
        Ident { id: id.to_owned() }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

impl From<String> for Ident {
    fn from(id: String) -> Self {
        Ident { id }
    }
}

impl From<&str> for Ident {
    fn from(id: &str) -> Self {
        Ident::from_string(id)
    }
}
