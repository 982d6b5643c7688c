//! Filesystem event handler for the notify watcher (hot-reload).

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tracing::{info, warn};

use super::core::{insert_document, is_dotfile, is_yaml, parse_document, DocumentMap};

/// Handle a single filesystem event from the notify watcher.
pub(super) fn handle_fs_event(event: &Event, documents: &RwLock<DocumentMap>) {
    for path in &event.paths {
        // Dotfiles include our own `.tmp` files.
        if !is_yaml(path) || is_dotfile(path) {
            continue;
        }

        match &event.kind {
            EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_)) => {
                if !path.exists() {
                    // Rename source: the file moved away.
                    remove_rule_by_path(documents, path);
                    continue;
                }
                reload(documents, path);
            }
            EventKind::Remove(RemoveKind::File) => remove_rule_by_path(documents, path),
            _ => {}
        }
    }
}

fn reload(documents: &RwLock<DocumentMap>, path: &Path) {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read file during hot-reload");
            return;
        }
    };
    match parse_document(&contents) {
        Ok(doc) => {
            info!(rule_id = doc.id(), enabled = doc.is_enabled(), path = %path.display(), "hot-reloaded rule");
            insert_document(documents, path.to_path_buf(), doc);
        }
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "failed to parse rule during hot-reload, keeping previous version"
        ),
    }
}

/// Drop whichever rule was loaded from `path`.
pub(super) fn remove_rule_by_path(documents: &RwLock<DocumentMap>, path: &Path) {
    let mut guard = documents.write().expect("documents lock poisoned");
    let before = guard.len();
    guard.retain(|_, loaded| loaded.path != path);
    if guard.len() < before {
        info!(path = %path.display(), "removed rule after file deletion");
    }
}
