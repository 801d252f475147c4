//! JSON file store adapter (TRD Section 11.1).
//!
//! One pretty-printed JSON document per canvas, named `<canvas>.json` under
//! the store directory. Good enough for a single workstation; a database
//! adapter would implement the same port.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::CanvasError;
use crate::ports::store_port::{NodeRecord, StorePort};

pub struct JsonStoreAdapter {
    dir: PathBuf,
}

impl JsonStoreAdapter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, CanvasError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
            && !name.contains("..");
        if !valid {
            return Err(CanvasError::Store {
                reason: format!("invalid canvas name '{name}'"),
            });
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl StorePort for JsonStoreAdapter {
    fn save(&self, name: &str, root: &NodeRecord) -> Result<(), CanvasError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(root).map_err(|e| CanvasError::Store {
            reason: e.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<NodeRecord, CanvasError> {
        let path = self.path_for(name)?;
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| CanvasError::Store {
            reason: format!("corrupt canvas '{name}': {e}"),
        })
    }

    fn list(&self) -> Result<Vec<String>, CanvasError> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
