use std::path::PathBuf;

use clap::Parser;

use crate::catalog::VersionConstraint;
use crate::github::{GitHubSource, DEFAULT_API_BASE, DEFAULT_CONFIG_ASSET};
use crate::install::{default_install_dir, InstallOptions, DEFAULT_CONFIG_FILE};
use crate::platform::PlatformDescriptor;
use crate::InstallerError;

/// Install a prebuilt binary from a project's GitHub releases.
#[derive(Debug, Parser)]
#[command(name = "release-installer", version)]
pub struct Cli {
    /// GitHub repository in `owner/name` form.
    #[arg(long, env = "INSTALLER_REPO")]
    pub repo: String,

    /// Binary to install; defaults to the repository name.
    #[arg(long)]
    pub name: Option<String>,

    /// `stable`, `prerelease`, or an exact version such as `v1.4.0`.
    #[arg(long = "release", default_value = "stable")]
    pub release: String,

    /// Operating system tag to install for instead of the host's.
    #[arg(long)]
    pub os: Option<String>,

    /// Architecture tag to install for instead of the host's.
    #[arg(long)]
    pub arch: Option<String>,

    /// Installation directory [default: ~/.local/bin]
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Configuration file path, relative to the installation directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Never write a default configuration file.
    #[arg(long)]
    pub no_config: bool,

    /// Release asset that holds the default configuration.
    #[arg(long, default_value = DEFAULT_CONFIG_ASSET)]
    pub config_asset: String,

    #[arg(long, env = "INSTALLER_GITHUB_API", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Answer yes to every question.
    #[arg(long, short = 'y', conflicts_with = "no")]
    pub yes: bool,

    /// Answer no to every question; existing files are kept.
    #[arg(long, short = 'n')]
    pub no: bool,

    /// Hide the download progress bar.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// `Some(answer)` when questions must not be asked interactively.
    #[must_use]
    pub const fn fixed_answer(&self) -> Option<bool> {
        if self.yes {
            Some(true)
        } else if self.no {
            Some(false)
        } else {
            None
        }
    }

    #[must_use]
    pub fn binary_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| {
            self.repo
                .rsplit('/')
                .next()
                .unwrap_or(self.repo.as_str())
        })
    }

    #[must_use]
    pub fn source(&self) -> GitHubSource {
        GitHubSource::new(&self.repo)
            .with_api_base(&self.api_base)
            .with_config_asset(&self.config_asset)
    }

    pub fn options(&self) -> Result<InstallOptions, InstallerError> {
        let platform = PlatformDescriptor::detect()
            .or_else(|e| match (&self.os, &self.arch) {
                (Some(_), Some(_)) => Ok(PlatformDescriptor::new("", "")),
                _ => Err(e),
            })
            .map_err(InstallerError::Platform)?
            .with_overrides(self.os.as_deref(), self.arch.as_deref());

        let target_dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => default_install_dir().map_err(InstallerError::Platform)?,
        };

        let mut options = InstallOptions::new(self.binary_name(), target_dir, platform);
        options.version = VersionConstraint::parse(&self.release);
        options.config_file = (!self.no_config).then(|| self.config_file.clone());
        options.show_progress = !self.quiet;
        Ok(options)
    }
}
