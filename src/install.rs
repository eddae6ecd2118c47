use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::catalog::{Release, ReleaseCatalog, ReleaseSource, VersionConstraint};
use crate::extract::{self, EntryMapping};
use crate::matcher;
use crate::platform::{binary_file_name, PlatformDescriptor};
use crate::progress::ProgressReporter;
use crate::prompt::Prompter;
use crate::InstallerError;

/// Where the default configuration lands, relative to the target directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Everything one installation run needs to know.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Binary name without any platform extension.
    pub binary: String,
    pub target_dir: PathBuf,
    pub platform: PlatformDescriptor,
    pub version: VersionConstraint,
    /// `None` never writes a configuration file.
    pub config_file: Option<PathBuf>,
    pub show_progress: bool,
}

impl InstallOptions {
#[must_use]
    pub fn new(
        binary: impl Into<String>,
        target_dir: impl Into<PathBuf>,
        platform: PlatformDescriptor,
    ) -> Self {
        Self {
            binary: binary.into(),
            target_dir: target_dir.into(),
            platform,
            version: VersionConstraint::default(),
            config_file: Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
            show_progress: false,
        }
    }
}

/// `~/.local/bin`
pub fn default_install_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("could not determine home directory")?;
    Ok(home.join(".local").join("bin"))
}

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub path: PathBuf,
    pub version: String,
    pub asset: String,
    /// The configuration file written by this run, if any.
    pub config: Option<PathBuf>,
}

/// Runs one installation: resolve, download, extract, configure.
pub struct Installer<'a, S, P> {
    source: &'a S,
    prompter: &'a mut P,
    options: &'a InstallOptions,
}

impl<'a, S, P> Installer<'a, S, P>
where
    S: ReleaseSource,
    P: Prompter,
{
#[must_use]
    pub fn new(source: &'a S, prompter: &'a mut P, options: &'a InstallOptions) -> Self {
        Self {
            source,
            prompter,
            options,
        }
    }

    pub fn run(mut self) -> Result<Installation, InstallerError> {
        let dir = &self.options.target_dir;
        fs::create_dir_all(dir).map_err(|e| InstallerError::io(dir, e))?;

        let catalog = ReleaseCatalog::new(self.source.releases()?)
            .filter(&self.options.version)
            .with_assets();
        if catalog.is_empty() {
            return Err(InstallerError::NoRelease(self.options.version.to_string()));
        }
        debug!(
            "{} release(s) satisfy {}: {}",
            catalog.len(),
            self.options.version,
            catalog.versions().join(", ")
        );

        let (asset, release) = matcher::find(&catalog, &self.options.platform)?;
        info!(
            "installing {} {} from {}",
            self.options.binary, release.version, asset.name
        );

        let bytes = {
            let mut reporter = if self.options.show_progress {
                ProgressReporter::new(&asset.name)
            } else {
                ProgressReporter::hidden()
            };
            self.source.fetch(asset, release, &mut reporter)?
        };

        let mapping = EntryMapping::for_binary(&self.options.binary, dir);
        let mut sequence = extract::open(&asset.name, bytes, &mapping)?;
        if sequence.is_empty() {
            return Err(InstallerError::MissingBinary {
                asset: asset.name.clone(),
                wanted: mapping.names(),
            });
        }

        let mut installed = Vec::new();
        let mut declined = 0;
        while let Some(step) = sequence.pending() {
            let proceed = if step.exists {
                let question = format!(
                    "{} already exists. Overwrite it?",
                    step.destination.display()
                );
                self.prompter.confirm(&question, false)?
            } else {
                true
            };

            match sequence.decide(proceed)? {
                Some(done) if done.written => installed.push(done.destination),
                Some(_) => declined += 1,
                None => break,
            }
        }

        let preferred = binary_file_name(&self.options.binary, &self.options.platform);
        let Some(path) = installed
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == preferred.as_str()))
            .or_else(|| installed.first())
            .cloned()
        else {
            return Err(InstallerError::NothingInstalled { declined });
        };

        let config = self.write_default_config(release)?;

        Ok(Installation {
            path,
            version: release.version.clone(),
            asset: asset.name.clone(),
            config,
        })
    }

    /// Write the release's default configuration unless a file is already
    /// there or the user declines.
    fn write_default_config(&mut self, release: &Release) -> Result<Option<PathBuf>, InstallerError> {
        let Some(relative) = &self.options.config_file else {
            return Ok(None);
        };
        let path = self.options.target_dir.join(relative);
        if path.exists() {
            debug!("keeping existing configuration at {}", path.display());
            return Ok(None);
        }

        let Some(blob) = self.source.default_config(release)? else {
            return Ok(None);
        };

        let question = format!("Write default configuration to {}?", path.display());
        if !self.prompter.confirm(&question, true)? {
            return Ok(None);
        }

        write_config(&path, &blob)?;
        info!("wrote default configuration to {}", path.display());
        Ok(Some(path))
    }
}

fn write_config(path: &Path, blob: &[u8]) -> Result<(), InstallerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| InstallerError::io(parent, e))?;
    }
    fs::write(path, blob).map_err(|e| InstallerError::io(path, e))
}
