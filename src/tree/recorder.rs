//! Update Recorder
//!
//! Offset-based structured editing of one file. Offsets always refer to the
//! snapshot taken when the recorder was created, so edits can be registered in any
//! order. Committing replays the sorted edit list over the snapshot in one pass
//! and records a single `Overwrite`.

use crate::error::TreeError;
use crate::host::Content;
use crate::tree::path;
use crate::tree::staged::Tree;
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Insertion {
    offset: usize,
    side: Side,
    /// Registration order, to keep same-offset, same-side insertions stable.
    seq: usize,
    content: Vec<u8>,
}

/// Edits against one snapshot of one file. Consumed by [`Tree::commit_update`].
#[derive(Debug)]
pub struct UpdateRecorder {
    path: String,
    original: Content,
    insertions: Vec<Insertion>,
    /// Sorted, non-overlapping.
    removals: Vec<Range<usize>>,
}

impl UpdateRecorder {
    fn new(path: String, original: Content) -> Self {
        Self {
            path,
            original,
            insertions: Vec::new(),
            removals: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The snapshot this recorder is bound to.
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Insert before any right-side insertion at the same offset.
    pub fn insert_left(
        &mut self,
        offset: usize,
        content: impl AsRef<[u8]>,
    ) -> Result<&mut Self, TreeError> {
        self.insert(offset, Side::Left, content.as_ref())
    }

    /// Insert after any left-side insertion at the same offset.
    pub fn insert_right(
        &mut self,
        offset: usize,
        content: impl AsRef<[u8]>,
    ) -> Result<&mut Self, TreeError> {
        self.insert(offset, Side::Right, content.as_ref())
    }

    pub fn remove(&mut self, offset: usize, length: usize) -> Result<&mut Self, TreeError> {
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= self.original.len())
            .ok_or_else(|| self.out_of_range(offset))?;
        if length == 0 {
            return Ok(self);
        }
        let position = self.removals.partition_point(|r| r.start < offset);
        let overlaps_previous = position > 0 && self.removals[position - 1].end > offset;
        let overlaps_next = self
            .removals
            .get(position)
            .map_or(false, |next| next.start < end);
        if overlaps_previous || overlaps_next {
            return Err(TreeError::OverlappingRemoval {
                path: self.path.clone(),
                offset,
                length,
            });
        }
        self.removals.insert(position, offset..end);
        Ok(self)
    }

    fn insert(&mut self, offset: usize, side: Side, content: &[u8]) -> Result<&mut Self, TreeError> {
        if offset > self.original.len() {
            return Err(self.out_of_range(offset));
        }
        let seq = self.insertions.len();
        self.insertions.push(Insertion {
            offset,
            side,
            seq,
            content: content.to_vec(),
        });
        Ok(self)
    }

    fn out_of_range(&self, offset: usize) -> TreeError {
        TreeError::UpdateOutOfRange {
            path: self.path.clone(),
            offset,
            len: self.original.len(),
        }
    }

    /// Apply every edit to the snapshot.
    pub(crate) fn render(&self) -> Vec<u8> {
        let mut insertions: Vec<&Insertion> = self.insertions.iter().collect();
        insertions.sort_by_key(|i| (i.offset, i.side, i.seq));

        let added: usize = insertions.iter().map(|i| i.content.len()).sum();
        let mut out = Vec::with_capacity(self.original.len() + added);
        let mut cursor = 0;
        let mut next_removal = 0;
        for insertion in insertions {
            self.copy_kept(&mut out, cursor, insertion.offset, &mut next_removal);
            out.extend_from_slice(&insertion.content);
            cursor = insertion.offset;
        }
        self.copy_kept(&mut out, cursor, self.original.len(), &mut next_removal);
        out
    }

    /// Copy `original[from..to]`, skipping removed ranges.
    fn copy_kept(&self, out: &mut Vec<u8>, from: usize, to: usize, next_removal: &mut usize) {
        let mut pos = from;
        while pos < to {
            while *next_removal < self.removals.len() && self.removals[*next_removal].end <= pos {
                *next_removal += 1;
            }
            match self.removals.get(*next_removal) {
                Some(removal) if removal.start <= pos => pos = removal.end.min(to),
                Some(removal) => {
                    let end = removal.start.min(to);
                    out.extend_from_slice(&self.original[pos..end]);
                    pos = end;
                }
                None => {
                    out.extend_from_slice(&self.original[pos..to]);
                    pos = to;
                }
            }
        }
    }
}

impl Tree {
    /// Start a structured update bound to the file's current content.
    pub fn begin_update(&self, file_path: &str) -> Result<UpdateRecorder, TreeError> {
        let file_path = path::normalize_file(file_path)?;
        let original = self
            .resolve(&file_path)?
            .ok_or_else(|| TreeError::FileDoesNotExist(file_path.clone()))?;
        Ok(UpdateRecorder::new(file_path, original))
    }

    /// Apply a recorder's edits as one `Overwrite`.
    ///
    /// Fails with `ContentHasMutated` if the file changed after the recorder was created.
    pub fn commit_update(&mut self, recorder: UpdateRecorder) -> Result<(), TreeError> {
        let current = self.resolve(&recorder.path)?;
        match current {
            Some(current) if current[..] == recorder.original[..] => {}
            _ => return Err(TreeError::ContentHasMutated(recorder.path)),
        }
        let content = recorder.render();
        debug!(
            path = %recorder.path,
            insertions = recorder.insertions.len(),
            removals = recorder.removals.len(),
            "Committing update"
        );
        self.record_overwrite(recorder.path, Content::from(content));
        Ok(())
    }
}
