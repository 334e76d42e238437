pub mod commands;
pub mod error;
pub mod fs_utils;
pub mod paths;
pub mod profile;
pub mod store;
pub mod ui;

pub use error::ProfileError;
pub use profile::{NewProfile, ProfileRecord, ProfileType, ProfileUpdate};
pub use store::{AddOutcome, ConflictPolicy, ProfileStore};

#[cfg(test)]
pub mod test_utils;
