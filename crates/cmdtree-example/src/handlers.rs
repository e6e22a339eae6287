//! Command handlers.
//!
//! Each handler takes the typed record of its command, deserialized from the
//! resolved context. Every record carries `store`, inherited from the root
//! package.

use anyhow::anyhow;
use cmdtree::{HandlerResult, Output};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::store::{Note, NoteStore};

#[derive(Debug, Deserialize)]
pub struct AddArgs {
    pub store: String,
    pub title: String,
    pub body: Option<String>,
    pub tags: Vec<String>,
}

pub fn add(args: AddArgs) -> anyhow::Result<Note> {
    let mut store = NoteStore::open(&args.store)?;
    let note = store.add(args.title, args.body, args.tags).clone();
    store.save()?;
    Ok(note)
}

#[derive(Debug, Deserialize)]
pub struct ListArgs {
    pub store: String,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

pub fn list(args: ListArgs) -> anyhow::Result<Vec<Note>> {
    let store = NoteStore::open(&args.store)?;
    let notes = store
        .notes()
        .iter()
        .filter(|n| match &args.tag {
            Some(tag) => n.tags.contains(tag),
            None => true,
        })
        .take(args.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Ok(notes)
}

#[derive(Debug, Deserialize)]
pub struct ShowArgs {
    pub store: String,
    pub id: u64,
}

pub fn show(args: ShowArgs) -> anyhow::Result<Note> {
    let store = NoteStore::open(&args.store)?;
    store
        .get(args.id)
        .cloned()
        .ok_or_else(|| anyhow!("no note with id {}", args.id))
}

#[derive(Debug, Deserialize)]
pub struct RemoveArgs {
    pub store: String,
    pub id: u64,
    pub force: bool,
}

pub fn remove(args: RemoveArgs) -> HandlerResult {
    let mut store = NoteStore::open(&args.store)?;
    match store.remove(args.id) {
        Some(note) => {
            store.save()?;
            Ok(Output::Text(format!("removed note {} ({})", note.id, note.title)))
        }
        None if args.force => Ok(Output::Silent),
        None => Err(anyhow!("no note with id {}", args.id)),
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreArgs {
    pub store: String,
}

pub fn tag_counts(args: StoreArgs) -> anyhow::Result<BTreeMap<String, usize>> {
    Ok(NoteStore::open(&args.store)?.tag_counts())
}

#[derive(Debug, Deserialize)]
pub struct RenameArgs {
    pub store: String,
    pub from: String,
    pub to: String,
}

pub fn rename_tag(args: RenameArgs) -> HandlerResult {
    let mut store = NoteStore::open(&args.store)?;
    let changed = store.rename_tag(&args.from, &args.to)?;
    store.save()?;
    Ok(Output::Text(format!(
        "renamed '{}' to '{}' on {changed} note(s)",
        args.from, args.to
    )))
}
