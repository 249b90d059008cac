use crate::error::RuntimeError;
use crate::pipeline::RunStatus;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const RUNS_DIR: &str = "runs";

/// Terminal run records, one JSON file per run id
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join(RUNS_DIR),
        }
    }

    /// Load every readable record; unreadable files are skipped
    pub fn load_all(&self) -> Vec<RunStatus> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(RuntimeError::from)
                .and_then(|content| {
                    serde_json::from_str::<RunStatus>(&content).map_err(RuntimeError::from)
                })
            {
                Ok(record) => records.push(record),
                Err(e) => warn!("Ignoring run record {:?}: {}", path, e),
            }
        }
        records
    }

    pub fn save(&self, status: &RunStatus) -> Result<(), RuntimeError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(status)?;
        fs::write(self.record_path(status), json)?;
        Ok(())
    }

    fn record_path(&self, status: &RunStatus) -> PathBuf {
        self.dir.join(format!("{}.json", status.run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunState;
    use crate::testutil::input;

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        assert!(store.load_all().is_empty());

        let mut status = RunStatus::pending(&input("PROJ-1", "x", 1));
        status.finish(RunState::Succeeded, None);
        store.save(&status).unwrap();

        // overwrite keeps a single record per run
        store.save(&status).unwrap();
        std::fs::write(dir.path().join("runs").join("broken.json"), "{").unwrap();

        let loaded = store.load_all();
        assert_eq!(loaded, vec![status]);
    }
}
