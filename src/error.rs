//! Status codes returned by the profile store and file helpers.
//!
//! Every failure that leaves a public store operation is one of these
//! variants. Low-level I/O and JSON errors are logged where they happen and
//! translated; they never cross this boundary.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("The provided filepath does not exist.")]
    InvalidPath,

    #[error("Failed to open file.")]
    FileOpenFailed,

    #[error("Missing user information was provided or not found in file.")]
    MissingUserInformation,

    #[error("Failed to provide server credentials.")]
    MissingCredentials,

    #[error("To add a new profile, the server url must be provided with the --server option")]
    MissingServerUrl,

    #[error("The provided profile type is invalid.")]
    InvalidProfileType,

    #[error("The profile does not exist.")]
    ProfileNotFound,

    #[error(
        "The profile you want to add already exists.\nUse the 'update' command to update it."
    )]
    ProfileAlreadyExists,

    #[error("The profile name may only contain letters, digits, '-' and '_' (max. 64 characters).")]
    InvalidProfileName,
}

impl ProfileError {
    /// Numeric status code, also used as the process exit status.
    ///
    /// 0 is success, 1 a generic error and 2 an argument parsing error, so
    /// the store's own codes start at 3.
    pub fn code(self) -> u8 {
        match self {
            Self::InvalidPath => 3,
            Self::FileOpenFailed => 4,
            Self::MissingUserInformation => 5,
            Self::MissingCredentials => 6,
            Self::MissingServerUrl => 7,
            Self::InvalidProfileType => 8,
            Self::ProfileNotFound => 9,
            Self::ProfileAlreadyExists => 10,
            Self::InvalidProfileName => 11,
        }
    }
}
