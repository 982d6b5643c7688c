//! Core [`RuleLoader`] struct: filesystem-backed rule loading with optional hot-reload.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::schema::{Rule, RuleDocument, RuleId};
use crate::store::{RuleStore, StoreResult};

use super::error::{LoadResult, LoadStatus, Result, RuleError};
use super::watcher::handle_fs_event;

/// A parsed document and the file it came from.
#[derive(Debug, Clone)]
pub(super) struct LoadedDocument {
    pub(super) path: PathBuf,
    pub(super) doc: RuleDocument,
}

pub(super) type DocumentMap = HashMap<RuleId, LoadedDocument>;

/// Filesystem-backed rule loader with optional hot-reload.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files and keeps
/// the parsed documents keyed by rule id.
pub struct RuleLoader {
    rules_dir: PathBuf,
    pub(super) documents: Arc<RwLock<DocumentMap>>,
    /// Held to keep the watcher alive.
    _watcher: Option<RecommendedWatcher>,
}

impl RuleLoader {
    /// Create a new loader for the given directory, creating it if missing.
    pub fn new(rules_dir: PathBuf) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            documents: Arc::new(RwLock::new(HashMap::new())),
            _watcher: None,
        }
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Parse errors are reported per file and do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut results)?;
        let enabled = results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Loaded { enabled: true, .. }))
            .count();
        info!(path = %self.rules_dir.display(), files = results.len(), enabled, "rules directory loaded");
        Ok(results)
    }

    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        // Sorted so duplicate ids resolve the same way on every platform.
        let mut paths = entries.map(|e| e.map(|e| e.path())).collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        for path in paths {
            if is_dotfile(&path) {
                if path.is_file() {
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                }
                continue;
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            if !is_yaml(&path) {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            match self.load_file(&path) {
                Ok(doc) => {
                    let rule_id = doc.id();
                    let enabled = doc.is_enabled();
                    if !enabled {
                        warn!(rule_id, path = %path.display(), "rule is disabled, not active");
                    }
                    info!(rule_id, name = %doc.metadata.name, rule_type = %doc.rule.rule_type, "loaded rule");
                    insert_document(&self.documents, path.clone(), doc);
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { rule_id, enabled },
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a single rule file without registering it.
    pub fn load_file(&self, path: &Path) -> Result<RuleDocument> {
        let contents = fs::read_to_string(path)?;
        parse_document(&contents)
    }

    /// Start a filesystem watcher with 500ms poll interval.
    ///
    /// On file create/modify the rule is re-parsed and upserted; on delete it
    /// is dropped. A file that fails to parse keeps its previous version.
    pub fn watch(&mut self) -> Result<()> {
        let documents = Arc::clone(&self.documents);

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &documents),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            })?;

        watcher.watch(&self.rules_dir, RecursiveMode::Recursive)?;
        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.rules_dir.display(), "watching rules directory for changes (recursive)");
        self._watcher = Some(watcher);
        Ok(())
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Every loaded document, enabled or not, ordered by rule id.
    pub fn rules(&self) -> Vec<RuleDocument> {
        let guard = self.documents.read().expect("documents lock poisoned");
        let mut docs: Vec<RuleDocument> = guard.values().map(|d| d.doc.clone()).collect();
        docs.sort_by_key(RuleDocument::id);
        docs
    }

    pub fn get(&self, id: RuleId) -> Option<RuleDocument> {
        let guard = self.documents.read().expect("documents lock poisoned");
        guard.get(&id).map(|d| d.doc.clone())
    }

    /// Enabled rules ordered by id: what the engine evaluates.
    pub fn active_rules(&self) -> Vec<Rule> {
        self.rules()
            .into_iter()
            .filter(RuleDocument::is_enabled)
            .map(|d| d.rule)
            .collect()
    }

    /// Atomically write a rule document to `<metadata.name>.yml`.
    ///
    /// Writes to a dot-prefixed `.tmp` file first, then renames over the final
    /// path. A previous file for the same id under another name is removed.
    pub fn write_rule(&self, doc: &RuleDocument) -> Result<PathBuf> {
        doc.validate().map_err(RuleError::Validation)?;
        let name = &doc.metadata.name;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(RuleError::Validation(format!(
                "metadata.name '{}' is not usable as a file name",
                name
            )));
        }

        let final_path = self.rules_dir.join(format!("{}.yml", name));
        let tmp_path = self.rules_dir.join(format!(".{}.tmp", name));

        let yaml = doc.to_yaml()?;
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &final_path)?;

        let previous = {
            let guard = self.documents.read().expect("documents lock poisoned");
            guard.get(&doc.id()).map(|d| d.path.clone())
        };
        if let Some(old) = previous.filter(|old| *old != final_path) {
            if old.exists() {
                fs::remove_file(&old)?;
            }
        }

        info!(rule_id = doc.id(), path = %final_path.display(), "wrote rule file");
        insert_document(&self.documents, final_path.clone(), doc.clone());
        Ok(final_path)
    }

    /// Delete the file a rule was loaded from and forget the rule.
    pub fn delete_rule(&self, id: RuleId) -> Result<()> {
        let path = {
            let guard = self.documents.read().expect("documents lock poisoned");
            guard.get(&id).map(|d| d.path.clone())
        };
        let Some(path) = path else {
            return Err(RuleError::Validation(format!("no rule loaded with id {}", id)));
        };

        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.documents.write().expect("documents lock poisoned").remove(&id);

        info!(rule_id = id, path = %path.display(), "deleted rule");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RuleStore for RuleLoader {
    async fn list_all(&self) -> StoreResult<Vec<Rule>> {
        Ok(self.active_rules())
    }
}

/// Deserialize and validate one rule document.
pub(super) fn parse_document(contents: &str) -> Result<RuleDocument> {
    let doc: RuleDocument = serde_yaml::from_str(contents)?;
    doc.validate().map_err(RuleError::Validation)?;
    Ok(doc)
}

/// Register a document, replacing any earlier one with the same id or loaded
/// from the same file.
pub(super) fn insert_document(documents: &RwLock<DocumentMap>, path: PathBuf, doc: RuleDocument) {
    let mut guard = documents.write().expect("documents lock poisoned");
    let id = doc.id();
    guard.retain(|other, loaded| {
        let stale = *other != id && loaded.path == path;
        if stale {
            info!(rule_id = *other, now = id, path = %path.display(), "rule id changed in file");
        }
        !stale
    });
    if let Some(existing) = guard.get(&id) {
        if existing.path != path {
            warn!(
                rule_id = id,
                kept = %path.display(),
                replaced = %existing.path.display(),
                "duplicate rule id, last loaded file wins"
            );
        }
    }
    guard.insert(id, LoadedDocument { path, doc });
}

pub(super) fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

pub(super) fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
