use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::AdminError;

/// File contents rendered in memory and written only once every file of an
/// update is ready.
#[derive(Debug, Default)]
pub struct StagedWrites {
    files: Vec<StagedFile>,
}

#[derive(Debug)]
struct StagedFile {
    path: PathBuf,
    contents: String,
}

impl StagedWrites {
    pub fn stage(&mut self, path: PathBuf, contents: String) {
        if let Some(existing) = self.files.iter_mut().find(|file| file.path == path) {
            existing.contents = contents;
        } else {
            self.files.push(StagedFile { path, contents });
        }
    }

    /// Writes every staged file to its own temporary sibling, then moves them
    /// all into place. A failed temp write leaves every target untouched, and
    /// concurrent commits never share a temporary file.
    pub fn commit(self) -> Result<usize, AdminError> {
        let mut temps = Vec::with_capacity(self.files.len());
        for file in &self.files {
            temps.push(write_temp(file)?);
        }

        let total = self.files.len();
        for (index, (file, temp)) in self.files.iter().zip(temps).enumerate() {
            if let Err(err) = temp.persist(&file.path) {
                if index > 0 {
                    warn!(
                        committed = index,
                        "replace failed after earlier files were updated"
                    );
                }
                return Err(AdminError::io("replace", &file.path, err.error));
            }
            info!(path = %file.path.display(), bytes = file.contents.len(), "file updated");
        }
        Ok(total)
    }
}

fn write_temp(file: &StagedFile) -> Result<NamedTempFile, AdminError> {
    let dir = file
        .path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".roleplan-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| AdminError::io("create temporary file in", dir, err))?;
    temp.write_all(file.contents.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|err| AdminError::io("write temporary file", temp.path(), err))?;
    if let Ok(metadata) = fs::metadata(&file.path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|err| AdminError::io("set permissions on", temp.path(), err))?;
    }
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover_temps(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .expect("dir should list")
            .map(|entry| entry.expect("entry should read").path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[test]
    fn commit_replaces_all_staged_files() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let first = dir.path().join("a.py");
        let second = dir.path().join("b.py");
        fs::write(&first, "old a").expect("fixture should write");
        fs::write(&second, "old b").expect("fixture should write");

        let mut staged = StagedWrites::default();
        staged.stage(first.clone(), "draft".to_string());
        staged.stage(second.clone(), "new b".to_string());
        staged.stage(first.clone(), "new a".to_string());

        assert_eq!(staged.commit().expect("commit should succeed"), 2);
        assert_eq!(fs::read_to_string(&first).expect("a should read"), "new a");
        assert_eq!(fs::read_to_string(&second).expect("b should read"), "new b");
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn failed_temp_write_leaves_targets_untouched() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let existing = dir.path().join("a.py");
        fs::write(&existing, "old a").expect("fixture should write");
        let unreachable = dir.path().join("missing-dir").join("b.py");

        let mut staged = StagedWrites::default();
        staged.stage(existing.clone(), "new a".to_string());
        staged.stage(unreachable, "new b".to_string());

        let err = staged.commit().expect_err("second temp write should fail");
        assert!(matches!(err, AdminError::Io { .. }));
        assert_eq!(fs::read_to_string(&existing).expect("a should read"), "old a");
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[test]
    fn concurrent_commits_to_one_file_all_succeed() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let target = dir.path().join("shared.py");
        fs::write(&target, "initial").expect("fixture should write");

        std::thread::scope(|scope| {
            let handles = (0..8)
                .map(|worker| {
                    let target = target.clone();
                    scope.spawn(move || {
                        for round in 0..25 {
                            let mut staged = StagedWrites::default();
                            staged.stage(target.clone(), format!("worker {worker} round {round}"));
                            staged.commit().expect("every commit should succeed");
                        }
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                handle.join().expect("worker should finish");
            }
        });

        let contents = fs::read_to_string(&target).expect("target should read");
        assert!(contents.starts_with("worker "), "{contents}");
        assert!(leftover_temps(dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn commit_keeps_target_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("temp dir should be created");
        let target = dir.path().join("config.py");
        fs::write(&target, "old").expect("fixture should write");
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644))
            .expect("permissions should set");

        let mut staged = StagedWrites::default();
        staged.stage(target.clone(), "new".to_string());
        staged.commit().expect("commit should succeed");

        let mode = fs::metadata(&target).expect("metadata should read").permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
