//! JSON snapshot persistence for the tenant store

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use inv_common::{Error, Result};

use crate::namespace::NamespaceState;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    namespaces: BTreeMap<String, NamespaceState>,
}

/// Load namespace states from a snapshot file. A missing file is an
/// empty store; an unreadable or corrupt file is an error.
pub(crate) fn load(path: &Path) -> Result<BTreeMap<String, NamespaceState>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read(path)
        .map_err(|e| Error::Internal(format!("failed to read snapshot {}: {}", path.display(), e)))?;
    let snapshot: Snapshot = serde_json::from_slice(&raw)
        .map_err(|e| Error::Internal(format!("corrupt snapshot {}: {}", path.display(), e)))?;
    Ok(snapshot.namespaces)
}

/// Write namespace states to a snapshot file.
pub(crate) fn save(path: &Path, namespaces: &BTreeMap<String, NamespaceState>) -> Result<()> {
    let snapshot = Snapshot {
        namespaces: namespaces.clone(),
    };
    let raw = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| Error::Internal(format!("failed to encode snapshot: {}", e)))?;
    fs::write(path, raw)
        .map_err(|e| Error::Internal(format!("failed to write snapshot {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(load(&path), Err(Error::Internal(_))));
    }
}
