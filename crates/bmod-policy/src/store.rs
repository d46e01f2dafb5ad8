// store.rs — Durable storage for policies.
//
// FilePolicyStore keeps one JSON file per policy: `<dir>/<policy_id>.json`.
// Writes go to a temporary file that is renamed into place, so a crash
// leaves either the old record or the new one, never half of either.
//
// Loading is strict. A record that cannot be read or parsed is reported as
// CorruptStore instead of being skipped; the engine refuses to start with a
// partial rule set.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::PolicyError;
use crate::policy::{Policy, PolicyId};

/// Where the engine persists policies.
pub trait PolicyStore: Send + Sync {
    /// Create or overwrite the record for `policy.id`.
    fn save(&self, policy: &Policy) -> Result<(), PolicyError>;

    /// Remove the record. Missing records are not an error.
    fn delete(&self, id: PolicyId) -> Result<(), PolicyError>;

    /// Every stored policy, in insertion (ordinal) order.
    fn load_all(&self) -> Result<Vec<Policy>, PolicyError>;
}

/// One JSON file per policy in a directory.
pub struct FilePolicyStore {
    dir: PathBuf,
}

impl FilePolicyStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| PolicyError::StoreWrite {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn policy_file(&self, id: PolicyId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn corrupt(path: &Path, reason: impl Into<String>) -> PolicyError {
        PolicyError::CorruptStore {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn read_record(path: &Path) -> Result<Policy, PolicyError> {
        let json = fs::read_to_string(path).map_err(|e| Self::corrupt(path, e.to_string()))?;
        let policy: Policy =
            serde_json::from_str(&json).map_err(|e| Self::corrupt(path, e.to_string()))?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if Uuid::parse_str(stem).ok() != Some(policy.id) {
            return Err(Self::corrupt(
                path,
                format!("file name does not match policy id {}", policy.id),
            ));
        }
        // A stored rule that no longer validates is corruption too.
        policy
            .rule
            .validate()
            .map_err(|e| Self::corrupt(path, e.to_string()))?;
        Ok(policy)
    }
}

impl PolicyStore for FilePolicyStore {
    fn save(&self, policy: &Policy) -> Result<(), PolicyError> {
        let path = self.policy_file(policy.id);
        let tmp = self.dir.join(format!(".{}.json.tmp", policy.id));
        let json = serde_json::to_string_pretty(policy)?;

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_data()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|source| {
            let _ = fs::remove_file(&tmp);
            PolicyError::StoreWrite {
                path: path.clone(),
                source,
            }
        })
    }

    fn delete(&self, id: PolicyId) -> Result<(), PolicyError> {
        let path = self.policy_file(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PolicyError::StoreWrite { path, source }),
        }
    }

    fn load_all(&self) -> Result<Vec<Policy>, PolicyError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| Self::corrupt(&self.dir, e.to_string()))?;

        let mut policies = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::corrupt(&self.dir, e.to_string()))?;
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if is_record {
                policies.push(Self::read_record(&path)?);
            }
        }

        policies.sort_by_key(|p| p.ordinal);
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{ActionRestrictionRule, PolicyRule};
    use chrono::Utc;
    use tempfile::tempdir;

    fn policy(ordinal: u64) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            ordinal,
            rule: PolicyRule::ActionRestriction(ActionRestrictionRule::restrict(["delete"])),
            description: format!("policy {}", ordinal),
            active: true,
            created_at: Utc::now(),
            priority: None,
            created_by: Some("root".to_string()),
            source_text: None,
        }
    }

    #[test]
    fn save_and_load_in_ordinal_order() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path().join("policies")).unwrap();
        let (a, b, c) = (policy(1), policy(2), policy(3));
        store.save(&c).unwrap();
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![a, b, c]);
    }

    #[test]
    fn save_overwrites_and_delete_removes() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();
        let mut p = policy(1);
        store.save(&p).unwrap();
        p.active = false;
        store.save(&p).unwrap();
        assert!(!store.load_all().unwrap()[0].active);

        store.delete(p.id).unwrap();
        store.delete(p.id).unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn unparseable_record_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();
        store.save(&policy(1)).unwrap();
        fs::write(dir.path().join(format!("{}.json", Uuid::new_v4())), "{ not json").unwrap();

        match store.load_all() {
            Err(PolicyError::CorruptStore { .. }) => {}
            other => panic!("expected CorruptStore, got {:?}", other),
        }
    }

    #[test]
    fn misnamed_record_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = FilePolicyStore::open(dir.path()).unwrap();
        let p = policy(1);
        let json = serde_json::to_string(&p).unwrap();
        fs::write(dir.path().join("renamed.json"), json).unwrap();

        assert!(matches!(
            store.load_all(),
            Err(PolicyError::CorruptStore { .. })
        ));
    }
}
