//! Named references to user scripts, so a front-end can offer "run X" as one step.

use crate::error::ShortcutError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutRegistry {
    #[serde(default)]
    shortcuts: BTreeMap<String, PathBuf>,
}

impl ShortcutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `name`. Returns the reference it replaced, if any.
    pub fn create(
        &mut self,
        name: &str,
        reference: impl Into<PathBuf>,
    ) -> Result<Option<PathBuf>, ShortcutError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShortcutError::EmptyName);
        }
        Ok(self.shortcuts.insert(name.to_string(), reference.into()))
    }

    pub fn remove(&mut self, name: &str) -> Option<PathBuf> {
        self.shortcuts.remove(name.trim())
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.shortcuts.get(name.trim()).map(PathBuf::as_path)
    }

    /// Shortcut names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.shortcuts.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    /// Read a registry saved by `save_to`. A missing file is an empty registry.
    pub fn load_from(path: &Path) -> Result<Self, ShortcutError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(ShortcutError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ShortcutError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ShortcutError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_replaces_and_lists_sorted() {
        let mut registry = ShortcutRegistry::new();
        assert_eq!(registry.create("zeta", "/z.lua").unwrap(), None);
        assert_eq!(registry.create("alpha", "/a.lua").unwrap(), None);
        assert_eq!(
            registry.create(" alpha ", "/a2.lua").unwrap(),
            Some(PathBuf::from("/a.lua"))
        );
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert_eq!(registry.get("alpha"), Some(Path::new("/a2.lua")));
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut registry = ShortcutRegistry::new();
        assert!(matches!(
            registry.create("   ", "/x.lua"),
            Err(ShortcutError::EmptyName)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_forgets_the_reference() {
        let mut registry = ShortcutRegistry::new();
        registry.create("run", "/run.lua").unwrap();
        assert_eq!(registry.remove("run"), Some(PathBuf::from("/run.lua")));
        assert_eq!(registry.remove("run"), None);
        assert!(registry.get("run").is_none());
    }

    #[test]
    fn persists_through_a_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shortcuts.json");
        assert!(ShortcutRegistry::load_from(&path).unwrap().is_empty());

        let mut registry = ShortcutRegistry::new();
        registry.create("demo", "/scripts/demo.lua").unwrap();
        registry.save_to(&path).unwrap();
        assert_eq!(ShortcutRegistry::load_from(&path).unwrap(), registry);

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ShortcutRegistry::load_from(&path),
            Err(ShortcutError::Format(_))
        ));
    }
}
