//! Interactive, one-file-at-a-time extraction.
//!
//! [`open`] yields an [`ExtractionSequence`] that proposes each file it is
//! about to write as a pending [`ExtractionStep`]. Nothing touches the disk
//! until the caller answers with [`ExtractionSequence::decide`], so a caller
//! can ask a human before replacing a file that already exists.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::archive::{ArchiveKind, Decoder};
use crate::InstallerError;

/// Archive entry names to extract, each with its destination, in the order
/// they should be tried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMapping {
    entries: Vec<(String, PathBuf)>,
}

impl EntryMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, entry: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        self.entries.push((entry.into(), dest.into()));
        self
    }

    /// Map a binary called `name` into `dir`, Windows name first.
    #[must_use]
    pub fn for_binary(name: &str, dir: &Path) -> Self {
        let exe = format!("{name}.exe");
        Self::new()
            .with(exe.clone(), dir.join(exe))
            .with(name, dir.join(name))
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, dest)| (name.as_str(), dest.as_path()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One file of an extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionStep {
    /// The entry's path inside the archive.
    pub entry: String,
    pub destination: PathBuf,
    /// Whether a file is present at `destination`.
    pub exists: bool,
    /// Whether this step wrote the destination.
    pub written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Opened, no step proposed yet.
    Streaming,
    /// A step is pending a decision.
    Proposed,
    /// The last pending step was decided and more remain.
    Decided,
    /// Every step has been decided.
    Completed,
}

/// The lazy sequence of steps produced by [`open`].
pub struct ExtractionSequence {
    decoder: Decoder,
    remaining: VecDeque<(String, PathBuf)>,
    pending: Option<ExtractionStep>,
    state: SequenceState,
    total: usize,
}

/// Open `bytes` (the contents of the asset `asset_name`) for extraction of
/// the entries named in `mapping`.
///
/// Entries named in the mapping but absent from the archive produce no step.
pub fn open(
    asset_name: &str,
    bytes: Vec<u8>,
    mapping: &EntryMapping,
) -> Result<ExtractionSequence, InstallerError> {
    let kind = ArchiveKind::from_name(asset_name).ok_or_else(|| {
        InstallerError::ArchiveFormat(format!("unsupported archive format: {asset_name}"))
    })?;
    let decoder = Decoder::open(kind, bytes)?;

    let remaining: VecDeque<_> = mapping
        .iter()
        .filter_map(|(name, dest)| match decoder.find(name) {
            Some(entry) => Some((entry.path.clone(), dest.to_path_buf())),
            None => {
                debug!("{asset_name} has no {name} entry");
                None
            }
        })
        .collect();

    Ok(ExtractionSequence {
        decoder,
        total: remaining.len(),
        remaining,
        pending: None,
        state: SequenceState::Streaming,
    })
}

impl ExtractionSequence {
    /// The step awaiting a decision, or `None` once the sequence is done.
    ///
    /// The destination's existence is sampled when the step is proposed.
    pub fn pending(&mut self) -> Option<&ExtractionStep> {
        if self.pending.is_none() {
            self.propose();
        }
        self.pending.as_ref()
    }

    /// Resolve the pending step: write it when `proceed` is true, drop it
    /// otherwise. Returns the decided step, or `None` if nothing was left.
    pub fn decide(&mut self, proceed: bool) -> Result<Option<ExtractionStep>, InstallerError> {
        if self.pending.is_none() {
            self.propose();
        }
        let Some(mut step) = self.pending.take() else {
            return Ok(None);
        };

        if proceed {
            let bytes = self
                .decoder
                .extract_entry_to(&step.entry, &step.destination)?;
            info!("wrote {} ({bytes} bytes)", step.destination.display());
            step.exists = true;
            step.written = true;
        } else {
            info!("kept existing {}", step.destination.display());
        }

        self.state = if self.remaining.is_empty() {
            SequenceState::Completed
        } else {
            SequenceState::Decided
        };
        Ok(Some(step))
    }

    #[must_use]
    pub const fn state(&self) -> SequenceState {
        self.state
    }

    /// Number of steps this sequence produces in total.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.total
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }

    fn propose(&mut self) {
        match self.remaining.pop_front() {
            Some((entry, destination)) => {
                // A dangling symlink still occupies the destination.
                let exists = fs::symlink_metadata(&destination).is_ok();
                self.pending = Some(ExtractionStep {
                    entry,
                    destination,
                    exists,
                    written: false,
                });
                self.state = SequenceState::Proposed;
            }
            None => self.state = SequenceState::Completed,
        }
    }
}
