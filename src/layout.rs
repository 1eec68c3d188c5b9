use crate::note::Note;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label bound to the physical space bar. The raw representation of that
/// key is a space character, not the literal string "SPACE", so resolve()
/// translates before lookup.
pub const SPACE_LABEL: &str = "SPACE";

/// One key of the active layout: a keyboard label paired with the note it
/// plays. `accidental` marks the visually subordinate (black) keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub note: Note,
    pub label: String,
    #[serde(default)]
    pub accidental: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("duplicate key label in layout: {0}")]
    DuplicateLabel(String),
}

/// Immutable set of key bindings for a session, with a label map
/// precomputed once at construction since layouts never change while a
/// session is active.
#[derive(Clone, Debug)]
pub struct Layout {
    bindings: Vec<KeyBinding>,
    by_label: HashMap<String, Note>,
}

impl Layout {
    /// Validates and activates a layout. Labels must be unique
    /// (case-insensitive); a binding with an empty label has no keyboard
    /// mapping and is reachable only by pointer.
    pub fn new(bindings: Vec<KeyBinding>) -> Result<Self, LayoutError> {
        let mut by_label = HashMap::new();
        for binding in &bindings {
            if binding.label.is_empty() {
                continue;
            }
            let label = normalize_label(&binding.label);
            if by_label.insert(label.clone(), binding.note.clone()).is_some() {
                return Err(LayoutError::DuplicateLabel(label));
            }
        }
        Ok(Self { bindings, by_label })
    }

    /// Maps a raw key label to its bound note. Case-insensitive; a single
    /// space character resolves against the SPACE binding. Returns None
    /// when the label is not bound in this layout.
    pub fn resolve(&self, raw: &str) -> Option<&Note> {
        let label = if raw == " " {
            SPACE_LABEL.to_string()
        } else {
            normalize_label(raw)
        };
        self.by_label.get(&label)
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn contains_note(&self, note: &Note) -> bool {
        self.bindings.iter().any(|b| &b.note == note)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn normalize_label(raw: &str) -> String {
    raw.to_uppercase()
}
