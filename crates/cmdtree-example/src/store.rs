//! A JSON file of notes.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    notes: Vec<Note>,
}

/// Notes loaded from, and saved back to, one file.
#[derive(Debug)]
pub struct NoteStore {
    path: PathBuf,
    file: StoreFile,
}

impl NoteStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("{} is not a notes file", path.display()))?
        } else {
            StoreFile::default()
        };
        debug!(path = %path.display(), notes = file.notes.len(), "opened note store");
        Ok(Self { path, file })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(&self.file)?;
        fs::write(&self.path, content)
            .with_context(|| format!("cannot write {}", self.path.display()))
    }

    pub fn notes(&self) -> &[Note] {
        &self.file.notes
    }

    pub fn add(&mut self, title: String, body: Option<String>, tags: Vec<String>) -> &Note {
        self.file.next_id += 1;
        self.file.notes.push(Note {
            id: self.file.next_id,
            title,
            body,
            tags,
        });
        &self.file.notes[self.file.notes.len() - 1]
    }

    pub fn get(&self, id: u64) -> Option<&Note> {
        self.file.notes.iter().find(|n| n.id == id)
    }

    pub fn remove(&mut self, id: u64) -> Option<Note> {
        let index = self.file.notes.iter().position(|n| n.id == id)?;
        Some(self.file.notes.remove(index))
    }

    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.file.notes.iter().flat_map(|n| &n.tags) {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Renames `from` to `to` on every note, returning how many changed.
    pub fn rename_tag(&mut self, from: &str, to: &str) -> anyhow::Result<usize> {
        if to.is_empty() {
            bail!("tag name cannot be empty");
        }
        let mut changed = 0;
        for note in &mut self.file.notes {
            if note.tags.iter().any(|t| t == from) {
                note.tags.retain(|t| t != from && t != to);
                note.tags.push(to.to_string());
                changed += 1;
            }
        }
        Ok(changed)
    }
}
