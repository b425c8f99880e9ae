//! Attachment diff tracking: committed names, staged uploads and deletion marks.

use std::collections::HashSet;

use crate::models::{csv, Attachment};

/// Staged uploads and deletion marks in the form the commit engine sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentDiff {
    pub staged: Vec<Attachment>,
    /// Deletion marks, comma-joined in committed order.
    pub deleted: String,
}

/// How an attachment listing entry is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentStyle {
    /// Committed and kept.
    Committed,
    /// Committed and marked for deletion (struck through).
    Deleted,
    /// Staged, not yet committed.
    Pending,
}

impl AttachmentStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Deleted => "deleted",
            Self::Pending => "pending",
        }
    }
}

/// One row of the attachment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEntry {
    /// 1-based, contiguous across committed then staged entries.
    pub number: usize,
    pub name: String,
    pub style: AttachmentStyle,
}

/// The attachment state of one edit session.
///
/// Invariants: staged names are unique and never collide with a committed
/// name; deletion marks are always a subset of the committed names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSet {
    original: Vec<String>,
    staged: Vec<Attachment>,
    deleted: HashSet<String>,
}

impl AttachmentSet {
    pub fn new(original: Vec<String>) -> Self {
        Self {
            original,
            staged: Vec::new(),
            deleted: HashSet::new(),
        }
    }

    pub fn original(&self) -> &[String] {
        &self.original
    }

    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    pub fn staged_names(&self) -> Vec<&str> {
        self.staged.iter().map(|a| a.name.as_str()).collect()
    }

    /// Deletion marks in committed order.
    pub fn deleted_marks(&self) -> Vec<&str> {
        self.original
            .iter()
            .filter(|name| self.deleted.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn is_marked(&self, name: &str) -> bool {
        self.deleted.contains(name)
    }

    /// True if anything is staged or marked.
    pub fn has_changes(&self) -> bool {
        !self.staged.is_empty() || !self.deleted.is_empty()
    }

    /// Append candidates to the staged list in arrival order.
    ///
    /// Candidates whose name is already committed or already staged
    /// (including earlier candidates of the same call) are dropped silently.
    /// Returns the number of candidates accepted.
    pub fn stage(&mut self, candidates: impl IntoIterator<Item = Attachment>) -> usize {
        let mut accepted = 0;
        for candidate in candidates {
            let duplicate = self.original.iter().any(|name| *name == candidate.name)
                || self.staged.iter().any(|a| a.name == candidate.name);
            if duplicate {
                tracing::debug!("Ignoring duplicate attachment {}", candidate.name);
                continue;
            }
            self.staged.push(candidate);
            accepted += 1;
        }
        accepted
    }

    /// Flip the deletion mark of a committed attachment.
    ///
    /// Names that are not committed are ignored. Returns whether the name is
    /// marked afterwards.
    pub fn toggle_delete(&mut self, name: &str) -> bool {
        if !self.original.iter().any(|n| n == name) {
            return false;
        }
        if !self.deleted.remove(name) {
            self.deleted.insert(name.to_string());
        }
        self.deleted.contains(name)
    }

    /// Remove a staged attachment by name.
    pub fn remove_staged(&mut self, name: &str) -> Option<Attachment> {
        let index = self.staged.iter().position(|a| a.name == name)?;
        Some(self.staged.remove(index))
    }

    /// Staged uploads and deletion marks for the commit engine.
    pub fn serialize(&self) -> AttachmentDiff {
        AttachmentDiff {
            staged: self.staged.clone(),
            deleted: csv::join(&self.deleted_marks()),
        }
    }

    /// Replace staging and marks with a submitted diff.
    ///
    /// The diff goes through the same filters as [`stage`](Self::stage) and
    /// [`toggle_delete`](Self::toggle_delete): duplicates are dropped and
    /// marks on names that are not committed are ignored.
    pub fn apply(&mut self, diff: AttachmentDiff) {
        self.staged.clear();
        self.stage(diff.staged);
        self.deleted = csv::split(&diff.deleted)
            .into_iter()
            .filter(|name| self.original.contains(name))
            .collect();
    }

    /// Drop all staging and marks.
    pub fn reset(&mut self) {
        self.staged.clear();
        self.deleted.clear();
    }

    /// Start over from a new committed list.
    pub fn rebase(&mut self, original: Vec<String>) {
        *self = Self::new(original);
    }

    /// Listing rows: committed entries first, then staged ones.
    pub fn entries(&self) -> Vec<AttachmentEntry> {
        let committed = self.original.iter().map(|name| {
            let style = if self.is_marked(name) {
                AttachmentStyle::Deleted
            } else {
                AttachmentStyle::Committed
            };
            (name.clone(), style)
        });
        let staged = self
            .staged
            .iter()
            .map(|a| (a.name.clone(), AttachmentStyle::Pending));

        committed
            .chain(staged)
            .enumerate()
            .map(|(index, (name, style))| AttachmentEntry {
                number: index + 1,
                name,
                style,
            })
            .collect()
    }
}
