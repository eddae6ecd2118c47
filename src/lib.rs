pub mod archive;
pub mod catalog;
pub mod cli;
pub mod download;
pub mod extract;
pub mod github;
pub mod install;
pub mod matcher;
pub mod platform;
pub mod progress;
pub mod prompt;

use std::path::PathBuf;

pub use catalog::{Asset, Release, ReleaseCatalog, ReleaseSource, VersionConstraint};
pub use extract::{EntryMapping, ExtractionSequence, ExtractionStep};
pub use install::{InstallOptions, Installation, Installer};
pub use matcher::NoMatchingAssetError;
pub use platform::PlatformDescriptor;
pub use progress::{ProgressReporter, ProgressSink};
pub use prompt::{FixedAnswer, InteractivePrompter, Prompter};

#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    #[error("platform detection failed: {0}")]
    Platform(String),

    #[error("failed to obtain release catalog: {0}")]
    Catalog(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("no release with assets satisfies version constraint `{0}`")]
    NoRelease(String),

    #[error(transparent)]
    NoMatchingAsset(#[from] NoMatchingAssetError),

    #[error("invalid archive: {0}")]
    ArchiveFormat(String),

    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("{asset} does not contain any of: {}", .wanted.join(", "))]
    MissingBinary { asset: String, wanted: Vec<String> },

    #[error("nothing was installed: all {declined} conflicting file(s) were kept")]
    NothingInstalled { declined: usize },
}

impl InstallerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Install the binary described by `options` from `source`.
///
/// Conflicting files are resolved through `prompter`. Returns the installed
/// binary's path together with the release and asset it came from.
pub fn install<S, P>(
    source: &S,
    prompter: &mut P,
    options: &InstallOptions,
) -> Result<Installation, InstallerError>
where
    S: ReleaseSource,
    P: Prompter,
{
    Installer::new(source, prompter, options).run()
}
