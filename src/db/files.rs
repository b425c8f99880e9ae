//! On-disk attachment storage, one directory per agent.
//!
//! Changes go through two phases. [`AttachmentDir::stage`] writes the new
//! files and works out the resulting list without removing anything; the
//! caller then persists the list and either [`commit`](AttachmentDir::commit)s
//! (removing deleted files) or [`rollback`](AttachmentDir::rollback)s
//! (removing the files it wrote).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::Attachment;

#[derive(Debug, Clone)]
pub struct AttachmentDir {
    root: PathBuf,
}

/// A staged attachment change for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    /// The file list to persist: surviving committed files in committed
    /// order, then new files in arrival order.
    pub files: Vec<String>,
    /// Files written by `stage` that were not committed before.
    written: Vec<String>,
    /// Committed files to remove once the list is persisted.
    removed: Vec<String>,
}

impl FileChanges {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

impl AttachmentDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn agent_dir(&self, agent: &str) -> PathBuf {
        self.root.join(agent)
    }

    /// Write `new_files` and compute the resulting file list.
    ///
    /// Names are checked before anything touches the disk. Deletions only
    /// apply to committed names and are deferred to [`commit`](Self::commit).
    pub fn stage(
        &self,
        agent: &str,
        committed: &[String],
        new_files: &[Attachment],
        deleted: &[String],
    ) -> Result<FileChanges> {
        for file in new_files {
            validate_file_name(&file.name).map_err(anyhow::Error::msg)?;
        }

        let mut changes = FileChanges::default();
        for name in committed {
            if deleted.contains(name) {
                changes.removed.push(name.clone());
            } else {
                changes.files.push(name.clone());
            }
        }

        if new_files.is_empty() {
            return Ok(changes);
        }

        let dir = self.agent_dir(agent);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        for file in new_files {
            let path = dir.join(&file.name);
            if let Err(e) = std::fs::write(&path, &file.data) {
                self.rollback(agent, &changes);
                return Err(e).with_context(|| format!("Failed to write {}", path.display()));
            }
            tracing::debug!("Stored attachment {}/{} ({} bytes)", agent, file.name, file.size());
            if !committed.contains(&file.name) && !changes.written.contains(&file.name) {
                changes.written.push(file.name.clone());
            }
            // A re-uploaded name replaces the deletion.
            changes.removed.retain(|name| *name != file.name);
            if !changes.files.contains(&file.name) {
                changes.files.push(file.name.clone());
            }
        }

        Ok(changes)
    }

    /// Remove the files deleted by `changes`. Failures are logged; the
    /// persisted list no longer names those files either way.
    pub fn commit(&self, agent: &str, changes: &FileChanges) {
        let dir = self.agent_dir(agent);
        for name in &changes.removed {
            let path = dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed attachment {}/{}", agent, name),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    /// Undo `stage`: remove the files it added. Committed files are left alone.
    pub fn rollback(&self, agent: &str, changes: &FileChanges) {
        let dir = self.agent_dir(agent);
        for name in &changes.written {
            let path = dir.join(name);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to roll back {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Delete the agent's directory and everything in it.
    pub fn remove_all(&self, agent: &str) -> Result<()> {
        let dir = self.agent_dir(agent);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Attachment names become file names and entries of a comma-delimited list:
/// no separators, no traversal, no commas and no surrounding whitespace.
pub fn validate_file_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Attachment name cannot be blank".to_string());
    }
    if name == "."
        || name == ".."
        || name.contains(['/', '\\', ','])
        || name.trim() != name
    {
        return Err(format!("Invalid attachment name: {:?}", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stage_keeps_committed_order_then_new_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = AttachmentDir::new(tmp.path());
        let first = dir
            .stage(
                "bot",
                &[],
                &[Attachment::new("a.txt", "a"), Attachment::new("b.txt", "b")],
                &[],
            )
            .unwrap();
        dir.commit("bot", &first);
        assert_eq!(first.files, names(&["a.txt", "b.txt"]));

        let second = dir
            .stage(
                "bot",
                &first.files,
                &[Attachment::new("c.txt", "c")],
                &names(&["a.txt"]),
            )
            .unwrap();
        assert_eq!(second.files, names(&["b.txt", "c.txt"]));
        assert!(dir.agent_dir("bot").join("a.txt").exists());

        dir.commit("bot", &second);
        assert!(!dir.agent_dir("bot").join("a.txt").exists());
        assert_eq!(std::fs::read(dir.agent_dir("bot").join("c.txt")).unwrap(), b"c");
    }

    #[test]
    fn rollback_removes_only_new_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = AttachmentDir::new(tmp.path());
        let first = dir
            .stage("bot", &[], &[Attachment::new("a.txt", "a")], &[])
            .unwrap();
        dir.commit("bot", &first);

        let second = dir
            .stage(
                "bot",
                &first.files,
                &[Attachment::new("c.txt", "c")],
                &names(&["a.txt"]),
            )
            .unwrap();
        dir.rollback("bot", &second);

        assert!(dir.agent_dir("bot").join("a.txt").exists());
        assert!(!dir.agent_dir("bot").join("c.txt").exists());
    }

    #[test]
    fn reuploading_a_deleted_name_keeps_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = AttachmentDir::new(tmp.path());
        let first = dir
            .stage("bot", &[], &[Attachment::new("a.txt", "old")], &[])
            .unwrap();

        let second = dir
            .stage(
                "bot",
                &first.files,
                &[Attachment::new("a.txt", "new")],
                &names(&["a.txt"]),
            )
            .unwrap();
        dir.commit("bot", &second);

        assert_eq!(second.files, names(&["a.txt"]));
        assert_eq!(std::fs::read(dir.agent_dir("bot").join("a.txt")).unwrap(), b"new");
    }

    #[test]
    fn stage_rejects_traversal_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = AttachmentDir::new(tmp.path());
        let result = dir.stage(
            "bot",
            &[],
            &[Attachment::new("ok.txt", "x"), Attachment::new("../evil", "x")],
            &[],
        );
        assert!(result.is_err());
        assert!(!dir.agent_dir("bot").join("ok.txt").exists());
    }

    #[test]
    fn file_names_must_survive_the_file_list() {
        assert!(validate_file_name("\"quoted\".txt").is_ok());
        assert!(validate_file_name(" padded.txt").is_err());
        assert!(validate_file_name("a,b.txt").is_err());
        assert!(validate_file_name("..").is_err());
    }

    #[test]
    fn remove_all_deletes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = AttachmentDir::new(tmp.path());
        dir.stage("bot", &[], &[Attachment::new("a.txt", "a")], &[]).unwrap();
        dir.remove_all("bot").unwrap();
        assert!(!dir.agent_dir("bot").exists());
        dir.remove_all("bot").unwrap();
    }
}
