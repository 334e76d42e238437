use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// Environment variable that relocates the home directory used for storage
pub const HOME_ENV: &str = "PROFMGR_HOME";

/// Name of the per-profile metadata file
pub const DATA_FILE: &str = ".data.json";

/// Name of the per-profile certificate file
pub const CERT_FILE: &str = ".cert.crt";

/// All computed paths used by profmgr
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.profmgr/.profiles
    pub profiles_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let home = match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => BaseDirs::new()
                .context("Failed to determine home directory")?
                .home_dir()
                .to_path_buf(),
        };

        Ok(Self::with_home(home))
    }

    /// Paths rooted at an explicit home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: home.into().join(".profmgr").join(".profiles"),
        }
    }

    /// Get the path to a specific profile directory
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(name)
    }

    /// Get the path to a specific profile's metadata file
    pub fn profile_data(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(DATA_FILE)
    }

    /// Get the path to a specific profile's certificate file
    pub fn profile_cert(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(CERT_FILE)
    }

    /// Ensure the profiles directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.profiles_dir).with_context(|| {
            format!(
                "Failed to create profiles directory: {}",
                self.profiles_dir.display()
            )
        })
    }
}
