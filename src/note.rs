use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic pitch token, e.g. "C4" or "D#4". Compared by exact symbol
/// equality; no enharmonic or octave-folding equivalence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Note(String);

impl Note {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Note {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
