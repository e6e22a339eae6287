//! `notes`, a small note keeper whose commands are discovered from the
//! `commands/` package tree.

pub mod handlers;
pub mod store;

use cmdtree::{App, AppBuilder, FsSource, Handler, HandlerTable};
use std::path::{Path, PathBuf};

/// The package tree shipped with the crate.
pub fn commands_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("commands")
}

/// Binds every function the descriptors in `commands/` declare.
pub fn handler_table() -> HandlerTable {
    HandlerTable::new()
        .bind("add::main", Handler::typed(handlers::add))
        .bind("list::run", Handler::typed(handlers::list))
        .bind("show::show_note", Handler::typed(handlers::show))
        .bind("remove::main", Handler::typed(handlers::remove))
        .bind("tag::list::main", Handler::typed(handlers::tag_counts))
        .bind("tag::rename::rename_tag", Handler::typed(handlers::rename_tag))
}

/// The application over the package tree at `commands`.
pub fn builder(commands: impl Into<PathBuf>) -> AppBuilder {
    App::builder("notes")
        .version(env!("CARGO_PKG_VERSION"))
        .source(FsSource::new(commands, handler_table()))
}
