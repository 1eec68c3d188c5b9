use crate::layout::{KeyBinding, Layout, LayoutError};
use crate::note::Note;
use include_dir::{include_dir, Dir};
use serde::Deserialize;

static LEVEL_DIR: Dir = include_dir!("src/levels");

/// Raw on-disk shape of a level file.
#[derive(Deserialize, Clone, Debug)]
struct LevelFile {
    name: String,
    title: String,
    hint: String,
    keys: Vec<KeyBinding>,
    melody: Vec<Note>,
}

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("level file not found: {0}")]
    NotFound(String),
    #[error("unable to decode level file: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("target melody is empty")]
    EmptyMelody,
    #[error("melody note {0} is not playable in this layout")]
    UnplayableNote(String),
}

/// One playable level: a validated layout, the target melody, and the text
/// the presentation layer shows around them. All configuration problems
/// (duplicate labels, empty melody, melody notes the layout cannot play)
/// are rejected here, before any input is processed.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub title: String,
    pub hint: String,
    layout: Layout,
    melody: Vec<Note>,
}

impl Level {
    pub fn new(name: &str) -> Result<Self, LevelError> {
        let file = LEVEL_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| LevelError::NotFound(name.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| LevelError::NotFound(name.to_string()))?;
        let raw: LevelFile = serde_json::from_str(contents)?;
        Self::from_parts(raw)
    }

    fn from_parts(raw: LevelFile) -> Result<Self, LevelError> {
        let layout = Layout::new(raw.keys)?;
        if raw.melody.is_empty() {
            return Err(LevelError::EmptyMelody);
        }
        for note in &raw.melody {
            if !layout.contains_note(note) {
                return Err(LevelError::UnplayableNote(note.to_string()));
            }
        }
        Ok(Self {
            name: raw.name,
            title: raw.title,
            hint: raw.hint,
            layout,
            melody: raw.melody,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn melody(&self) -> &[Note] {
        &self.melody
    }
}
