use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;

use crate::InstallerError;

/// The archive formats release assets are shipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    Zip,
}

/// Asset name suffixes and the format each one selects.
const SUFFIXES: &[(&str, ArchiveKind)] = &[
    (".tar.gz", ArchiveKind::TarGz),
    (".tgz", ArchiveKind::TarGz),
    (".tar", ArchiveKind::Tar),
    (".zip", ArchiveKind::Zip),
];

impl ArchiveKind {
    /// Pick the format from an asset name, preferring the longest suffix.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        SUFFIXES
            .iter()
            .filter(|(suffix, _)| lowered.ends_with(suffix))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, kind)| *kind)
    }
}

/// A regular file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full path as stored in the archive.
    pub path: String,
    /// Last path component, used to match entry names.
    pub file_name: String,
}

/// An opened archive held in memory.
pub enum Decoder {
    Tar {
        bytes: Vec<u8>,
        gzip: bool,
        entries: Vec<ArchiveEntry>,
    },
    Zip {
        archive: zip::ZipArchive<Cursor<Vec<u8>>>,
        entries: Vec<ArchiveEntry>,
    },
}

impl Decoder {
    /// Open and validate `bytes` as an archive of the given kind.
    pub fn open(kind: ArchiveKind, bytes: Vec<u8>) -> Result<Self, InstallerError> {
        let decoder = match kind {
            ArchiveKind::TarGz | ArchiveKind::Tar => {
                let gzip = kind == ArchiveKind::TarGz;
                let entries = list_tar(&bytes, gzip).map_err(InstallerError::ArchiveFormat)?;
                Self::Tar {
                    bytes,
                    gzip,
                    entries,
                }
            }
            ArchiveKind::Zip => {
                let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
                    InstallerError::ArchiveFormat(format!("failed to open zip archive: {e}"))
                })?;
                let entries = list_zip(&mut archive).map_err(InstallerError::ArchiveFormat)?;
                Self::Zip { archive, entries }
            }
        };

        debug!("opened {kind:?} archive with {} file(s)", decoder.entries().len());
        Ok(decoder)
    }

    /// Every regular file in the archive, in stored order.
    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        match self {
            Self::Tar { entries, .. } | Self::Zip { entries, .. } => entries,
        }
    }

    /// The first entry whose file name is `file_name`.
    #[must_use]
    pub fn find(&self, file_name: &str) -> Option<&ArchiveEntry> {
        self.entries().iter().find(|e| e.file_name == file_name)
    }

    /// Write the entry stored at `entry_path` to `dest`, replacing any file
    /// already there. Returns the number of bytes written.
    pub fn extract_entry_to(&mut self, entry_path: &str, dest: &Path) -> Result<u64, InstallerError> {
        match self {
            Self::Tar { bytes, gzip, .. } => {
                let mut archive = tar_archive(bytes, *gzip);
                let entries = archive.entries().map_err(|e| {
                    InstallerError::ArchiveFormat(format!("failed to read tar entries: {e}"))
                })?;
                for entry in entries {
                    let mut entry = entry.map_err(|e| {
                        InstallerError::ArchiveFormat(format!("failed to read tar entry: {e}"))
                    })?;
                    let path = entry
                        .path()
                        .map_err(|e| {
                            InstallerError::ArchiveFormat(format!("failed to read entry path: {e}"))
                        })?
                        .to_string_lossy()
                        .into_owned();
                    if path == entry_path {
                        return write_executable(dest, &mut entry);
                    }
                }
                Err(InstallerError::ArchiveFormat(format!(
                    "{entry_path} not found in tar archive"
                )))
            }
            Self::Zip { archive, .. } => {
                let mut file = archive.by_name(entry_path).map_err(|e| {
                    InstallerError::ArchiveFormat(format!("failed to read zip entry {entry_path}: {e}"))
                })?;
                write_executable(dest, &mut file)
            }
        }
    }
}

fn tar_archive(bytes: &[u8], gzip: bool) -> tar::Archive<Box<dyn Read + '_>> {
    let reader: Box<dyn Read + '_> = if gzip {
        Box::new(GzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    };
    tar::Archive::new(reader)
}

fn list_tar(bytes: &[u8], gzip: bool) -> Result<Vec<ArchiveEntry>, String> {
    let mut archive = tar_archive(bytes, gzip);
    let mut found = Vec::new();

    for entry in archive
        .entries()
        .map_err(|e| format!("failed to read tar entries: {e}"))?
    {
        let entry = entry.map_err(|e| format!("failed to read tar entry: {e}"))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry
            .path()
            .map_err(|e| format!("failed to read entry path: {e}"))?;

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            found.push(ArchiveEntry {
                path: path.to_string_lossy().into_owned(),
                file_name: file_name.to_string(),
            });
        }
    }

    Ok(found)
}

fn list_zip(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>) -> Result<Vec<ArchiveEntry>, String> {
    let mut found = Vec::new();

    for i in 0..archive.len() {
        let file = archive
            .by_index(i)
            .map_err(|e| format!("failed to read zip entry: {e}"))?;
        if file.is_dir() {
            continue;
        }

        let file_name = file
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_os_string()))
            .and_then(|n| n.into_string().ok());

        if let Some(file_name) = file_name {
            found.push(ArchiveEntry {
                path: file.name().to_string(),
                file_name,
            });
        }
    }

    Ok(found)
}

fn write_executable(dest: &Path, reader: &mut dyn Read) -> Result<u64, InstallerError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| InstallerError::io(parent, e))?;
    }

    // Replace a symlink instead of writing through it.
    if fs::symlink_metadata(dest).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(dest).map_err(|e| InstallerError::io(dest, e))?;
    }

    let mut file = File::create(dest).map_err(|e| InstallerError::io(dest, e))?;
    let written = io::copy(reader, &mut file).map_err(|e| InstallerError::io(dest, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o755);
        fs::set_permissions(dest, perms).map_err(|e| InstallerError::io(dest, e))?;
    }

    Ok(written)
}
