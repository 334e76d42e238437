//! Core profile management logic.
//!
//! This module owns the on-disk layout under `~/.profmgr/.profiles/`:
//! - One directory per profile, named after the profile
//! - `.data.json` holding type, server URL and credentials
//! - An optional `.cert.crt` with a cached server certificate
//!
//! [`ProfileStore`] creates, loads, updates and deletes profiles and keeps at
//! most one of them "loaded" in memory. All failures are reported as
//! [`ProfileError`] codes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::ProfileError;
use crate::fs_utils::FileAccess;
use crate::paths::Paths;
use crate::profile::{NewProfile, ProfileRecord, ProfileUpdate, StoredProfile};

/// What `add` does when a profile with the same name exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Refuse with [`ProfileError::ProfileAlreadyExists`]
    Fail,
    /// Replace the existing metadata and certificate
    Overwrite,
}

/// Result of a successful `add`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The profile was written and is now the loaded profile
    Loaded,
    /// The profile was written but could not be loaded back; nothing is loaded
    LoadFailed(ProfileError),
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens.
pub fn validate_profile_name(name: &str) -> Result<(), ProfileError> {
    if name.is_empty() || name.chars().count() > 64 {
        return Err(ProfileError::InvalidProfileName);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ProfileError::InvalidProfileName);
    }

    Ok(())
}

/// Whether `name` addresses exactly one entry inside the profiles directory.
///
/// Lookups accept any such name so that profiles created under other naming
/// rules stay reachable; only `add` enforces [`validate_profile_name`].
fn is_safe_lookup_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !name.chars().any(std::path::is_separator)
}

/// Directory-backed profile storage with a single loaded-profile slot
#[derive(Debug)]
pub struct ProfileStore {
    paths: Paths,
    loaded: Option<ProfileRecord>,
}

impl ProfileStore {
    /// Open the store, creating the profiles directory if needed.
    ///
    /// # Errors
    /// Fails if the profiles directory cannot be created; no operation can
    /// work without it.
    pub fn open(paths: Paths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;
        Ok(Self {
            paths,
            loaded: None,
        })
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.paths.profiles_dir
    }

    /// A copy of the loaded profile
    pub fn loaded(&self) -> Option<ProfileRecord> {
        self.loaded.clone()
    }

    /// Forget the loaded profile
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> bool {
        self.checked_dir(name).is_some_and(|dir| dir.is_dir())
    }

    /// Names of all stored profiles, in directory enumeration order
    pub fn list(&self) -> Result<Vec<String>, ProfileError> {
        let entries = fs::read_dir(&self.paths.profiles_dir).map_err(|e| {
            error!(
                path = %self.paths.profiles_dir.display(),
                error = %e,
                "Failed to read profiles directory"
            );
            ProfileError::InvalidPath
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry in profiles directory");
                    continue;
                }
            };
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    warn!(name = ?raw, "Skipping profile directory with a non UTF-8 name");
                }
            }
        }
        Ok(names)
    }

    /// Create a profile, failing if it already exists
    pub fn create_fail_if_exists(&mut self, new: &NewProfile) -> Result<AddOutcome, ProfileError> {
        self.add(new, ConflictPolicy::Fail)
    }

    /// Create a profile, replacing an existing one of the same name
    pub fn create_overwrite(&mut self, new: &NewProfile) -> Result<AddOutcome, ProfileError> {
        self.add(new, ConflictPolicy::Overwrite)
    }

    /// Create a profile and load it.
    ///
    /// Name, server URL, credentials and the certificate source are all
    /// checked before anything is written. If the profile is written but
    /// cannot be loaded back, the call still succeeds with
    /// [`AddOutcome::LoadFailed`].
    ///
    /// # Errors
    /// - [`ProfileError::InvalidProfileName`], [`ProfileError::MissingServerUrl`]
    ///   or [`ProfileError::MissingCredentials`] for bad input
    /// - [`ProfileError::InvalidPath`] if the certificate cannot be read
    /// - [`ProfileError::ProfileAlreadyExists`] under [`ConflictPolicy::Fail`]
    /// - [`ProfileError::FileOpenFailed`] if the profile cannot be written
    pub fn add(
        &mut self,
        new: &NewProfile,
        policy: ConflictPolicy,
    ) -> Result<AddOutcome, ProfileError> {
        validate_profile_name(&new.name)?;
        let document = new.to_document()?;
        let certificate = new.cert_path.as_deref().map(read_certificate).transpose()?;

        let profile_dir = self.paths.profile_dir(&new.name);
        if profile_dir.exists() {
            match policy {
                ConflictPolicy::Fail => return Err(ProfileError::ProfileAlreadyExists),
                ConflictPolicy::Overwrite => {
                    debug!(profile = %new.name, "Overwriting existing profile");
                    self.remove_profile_files(&new.name)?;
                }
            }
        } else {
            fs::create_dir(&profile_dir).map_err(|e| {
                error!(
                    path = %profile_dir.display(),
                    error = %e,
                    "Failed to create profile directory"
                );
                ProfileError::FileOpenFailed
            })?;
        }

        self.write_document(&new.name, &document)?;
        if let Some(content) = certificate {
            self.store_certificate(&new.name, &content)?;
        }
        info!(profile = %new.name, "Created profile");

        match self.load(&new.name) {
            Ok(()) => Ok(AddOutcome::Loaded),
            Err(e) => {
                warn!(profile = %new.name, "Failed to load profile after adding it: {e}");
                Ok(AddOutcome::LoadFailed(e))
            }
        }
    }

    /// Copy a certificate file into an existing profile, replacing any
    /// previous one.
    ///
    /// # Errors
    /// - [`ProfileError::ProfileNotFound`] if the profile does not exist
    /// - [`ProfileError::InvalidPath`] if `cert_source` cannot be read
    /// - [`ProfileError::FileOpenFailed`] if the copy cannot be written
    pub fn add_certificate(
        &mut self,
        name: &str,
        cert_source: impl AsRef<Path>,
    ) -> Result<(), ProfileError> {
        if !self.exists(name) {
            return Err(ProfileError::ProfileNotFound);
        }

        let content = read_certificate(cert_source.as_ref())?;
        self.store_certificate(name, &content)?;
        info!(profile = %name, "Added certificate to profile");
        Ok(())
    }

    /// Set the token of an existing profile. The profile is loaded first.
    ///
    /// Type, server URL and any user/password are kept. If the metadata file
    /// cannot be written, neither the file nor the loaded record change.
    ///
    /// # Errors
    /// Any error from [`ProfileStore::load`], or
    /// [`ProfileError::FileOpenFailed`] if the metadata file is not writable.
    pub fn add_token(&mut self, name: &str, token: &str) -> Result<(), ProfileError> {
        self.load(name)?;
        let mut record = self.loaded.clone().ok_or(ProfileError::ProfileNotFound)?;

        record.token = Some(token.to_string());
        self.write_document(name, &StoredProfile::from_record(&record))?;

        if let Some(loaded) = self.loaded.as_mut()
            && loaded.name == name
        {
            loaded.token = record.token;
        }
        info!(profile = %name, "Added token to profile");
        Ok(())
    }

    /// Apply field changes to an existing profile and keep it loaded.
    ///
    /// The result must still have a non-empty server URL and either a token
    /// or a user/password pair; otherwise nothing is written.
    pub fn update(&mut self, name: &str, update: &ProfileUpdate) -> Result<(), ProfileError> {
        self.load(name)?;
        let mut record = self.loaded.clone().ok_or(ProfileError::ProfileNotFound)?;

        if let Some(profile_type) = update.profile_type {
            record.profile_type = profile_type;
        }
        if let Some(server_url) = &update.server_url {
            if server_url.is_empty() {
                return Err(ProfileError::MissingServerUrl);
            }
            record.server_url = server_url.clone();
        }
        if let Some(token) = &update.token {
            record.token = Some(token.clone());
        }
        if let Some(user) = &update.user {
            record.user = Some(user.clone());
        }
        if let Some(password) = &update.password {
            record.password = Some(password.clone());
        }
        if !record.has_credentials() {
            return Err(ProfileError::MissingCredentials);
        }

        let certificate = update.cert_path.as_deref().map(read_certificate).transpose()?;

        if update.touches_metadata() {
            self.write_document(name, &StoredProfile::from_record(&record))?;
            self.loaded = Some(record);
        }
        if let Some(content) = certificate {
            self.store_certificate(name, &content)?;
        }
        info!(profile = %name, "Updated profile");
        Ok(())
    }

    /// Load a profile into the loaded slot.
    ///
    /// The slot is cleared first and stays empty if loading fails.
    ///
    /// # Errors
    /// - [`ProfileError::ProfileNotFound`] if the metadata file is missing or
    ///   unreadable
    /// - [`ProfileError::InvalidProfileType`] if the stored type is unknown
    /// - [`ProfileError::MissingServerUrl`] if no server URL is stored
    pub fn load(&mut self, name: &str) -> Result<(), ProfileError> {
        self.reset();
        let record = self.read(name)?;
        debug!(profile = %name, "Loaded profile");
        self.loaded = Some(record);
        Ok(())
    }

    /// Read a profile from disk without touching the loaded slot
    pub fn read(&self, name: &str) -> Result<ProfileRecord, ProfileError> {
        if self.checked_dir(name).is_none() {
            return Err(ProfileError::ProfileNotFound);
        }

        let data_path = self.paths.profile_data(name);
        if !data_path.is_file() {
            return Err(ProfileError::ProfileNotFound);
        }

        let content = FileAccess::at(&data_path)
            .and_then(|mut access| access.read())
            .map_err(|_| ProfileError::ProfileNotFound)?;

        let document: StoredProfile = serde_json::from_slice(&content).map_err(|e| {
            warn!(path = %data_path.display(), error = %e, "Unreadable profile data");
            ProfileError::ProfileNotFound
        })?;

        let cert_path = self.paths.profile_cert(name);
        let cert_path = cert_path.is_file().then_some(cert_path);

        document.into_record(name, cert_path)
    }

    /// Remove a profile's files and directory.
    ///
    /// Returns `false` if there was no such profile; that is not an error.
    /// Deleting the loaded profile clears the loaded slot.
    pub fn delete(&mut self, name: &str) -> Result<bool, ProfileError> {
        let profile_dir = match self.checked_dir(name) {
            Some(dir) if dir.is_dir() => dir,
            _ => {
                warn!("Folder for profile '{name}' does not exist");
                return Ok(false);
            }
        };

        self.remove_profile_files(name)?;
        fs::remove_dir(&profile_dir).map_err(|e| {
            error!(
                path = %profile_dir.display(),
                error = %e,
                "Failed to remove profile directory"
            );
            ProfileError::FileOpenFailed
        })?;

        if self.loaded.as_ref().is_some_and(|p| p.name == name) {
            self.reset();
        }
        info!(profile = %name, "Removed profile");
        Ok(true)
    }

    /// Profile directory for a name that stays inside the profiles directory
    fn checked_dir(&self, name: &str) -> Option<PathBuf> {
        is_safe_lookup_name(name).then(|| self.paths.profile_dir(name))
    }

    fn write_document(&self, name: &str, document: &StoredProfile) -> Result<(), ProfileError> {
        let json = serde_json::to_string_pretty(document).map_err(|e| {
            error!(profile = %name, error = %e, "Failed to serialize profile data");
            ProfileError::FileOpenFailed
        })?;

        let mut access = FileAccess::at(self.paths.profile_data(name))?;
        access.write(json + "\n")?;
        access.hide();
        Ok(())
    }

    fn store_certificate(&mut self, name: &str, content: &[u8]) -> Result<(), ProfileError> {
        let cert_path = self.paths.profile_cert(name);
        let mut access = FileAccess::at(&cert_path)?;
        access.write(content)?;
        access.hide();

        if let Some(loaded) = self.loaded.as_mut()
            && loaded.name == name
        {
            loaded.cert_path = Some(cert_path);
        }
        Ok(())
    }

    fn remove_profile_files(&self, name: &str) -> Result<(), ProfileError> {
        FileAccess::at(self.paths.profile_data(name))?.delete()?;
        FileAccess::at(self.paths.profile_cert(name))?.delete()
    }
}

/// Read a certificate source file in full
fn read_certificate(source: &Path) -> Result<Vec<u8>, ProfileError> {
    FileAccess::at(source)
        .and_then(|mut access| access.read())
        .map_err(|_| {
            debug!(path = %source.display(), "Certificate cannot be read");
            ProfileError::InvalidPath
        })
}
