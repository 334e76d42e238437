//! Profile records and the metadata document stored for each profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ProfileError;

/// Kinds of server a profile can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileType {
    Jira,
    Polarion,
    Superset,
    Conaktiv,
    Stages,
}

impl ProfileType {
    /// Get all profile types
    pub fn all() -> [ProfileType; 5] {
        [
            ProfileType::Jira,
            ProfileType::Polarion,
            ProfileType::Superset,
            ProfileType::Conaktiv,
            ProfileType::Stages,
        ]
    }

    /// The value stored on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Jira => "jira",
            ProfileType::Polarion => "polarion",
            ProfileType::Superset => "superset",
            ProfileType::Conaktiv => "conaktiv",
            ProfileType::Stages => "stages",
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileType {
    type Err = ProfileError;

    /// Exact match on the stored value; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(ProfileError::InvalidProfileType)
    }
}

/// One profile as held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    pub profile_type: ProfileType,
    pub server_url: String,
    pub token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Location of the profile's cached certificate, if it has one
    pub cert_path: Option<PathBuf>,
}

impl ProfileRecord {
    /// Token, or both user and password
    pub fn has_credentials(&self) -> bool {
        self.token.is_some() || (self.user.is_some() && self.password.is_some())
    }
}

/// Input for creating a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub name: String,
    pub profile_type: ProfileType,
    pub server_url: String,
    pub token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Certificate to copy into the profile
    pub cert_path: Option<PathBuf>,
}

impl NewProfile {
    /// Profile authenticated by token
    pub fn with_token(
        name: impl Into<String>,
        profile_type: ProfileType,
        server_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            profile_type,
            server_url: server_url.into(),
            token: Some(token.into()),
            user: None,
            password: None,
            cert_path: None,
        }
    }

    /// Profile authenticated by user and password
    pub fn with_login(
        name: impl Into<String>,
        profile_type: ProfileType,
        server_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            profile_type,
            server_url: server_url.into(),
            token: None,
            user: Some(user.into()),
            password: Some(password.into()),
            cert_path: None,
        }
    }

    pub fn cert(mut self, cert_path: impl Into<PathBuf>) -> Self {
        self.cert_path = Some(cert_path.into());
        self
    }

    /// Build the metadata document for this profile.
    ///
    /// A token takes precedence: when present, user and password are not
    /// stored at all.
    ///
    /// # Errors
    /// [`ProfileError::MissingServerUrl`] for an empty server URL,
    /// [`ProfileError::MissingCredentials`] when neither a token nor a
    /// complete user/password pair is given.
    pub fn to_document(&self) -> Result<StoredProfile, ProfileError> {
        if self.server_url.is_empty() {
            return Err(ProfileError::MissingServerUrl);
        }

        let (token, user, password) = match (&self.token, &self.user, &self.password) {
            (Some(token), _, _) => (Some(token.clone()), None, None),
            (None, Some(user), Some(password)) => (None, Some(user.clone()), Some(password.clone())),
            _ => return Err(ProfileError::MissingCredentials),
        };

        Ok(StoredProfile {
            profile_type: Some(self.profile_type.as_str().to_string()),
            server_url: Some(self.server_url.clone()),
            token,
            user,
            password,
        })
    }
}

/// Changes to apply to an existing profile; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub profile_type: Option<ProfileType>,
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub cert_path: Option<PathBuf>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.profile_type.is_none()
            && self.server_url.is_none()
            && self.token.is_none()
            && self.user.is_none()
            && self.password.is_none()
            && self.cert_path.is_none()
    }

    /// Whether any field stored in the metadata file changes
    pub fn touches_metadata(&self) -> bool {
        self.profile_type.is_some()
            || self.server_url.is_some()
            || self.token.is_some()
            || self.user.is_some()
            || self.password.is_some()
    }
}

/// The JSON document in a profile's metadata file
///
/// All keys are optional at this level so that a document can be read
/// field by field; [`StoredProfile::into_record`] enforces what a loadable
/// profile needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,

    #[serde(rename = "server", default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl StoredProfile {
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            profile_type: Some(record.profile_type.as_str().to_string()),
            server_url: Some(record.server_url.clone()),
            token: record.token.clone(),
            user: record.user.clone(),
            password: record.password.clone(),
        }
    }

    /// Assemble a record from this document.
    ///
    /// The type is checked before any other key. User and password are only
    /// taken over as a pair.
    pub fn into_record(
        self,
        name: &str,
        cert_path: Option<PathBuf>,
    ) -> Result<ProfileRecord, ProfileError> {
        let profile_type: ProfileType = self
            .profile_type
            .as_deref()
            .ok_or(ProfileError::InvalidProfileType)?
            .parse()?;

        let server_url = self.server_url.ok_or(ProfileError::MissingServerUrl)?;

        let (user, password) = match (self.user, self.password) {
            (Some(user), Some(password)) => (Some(user), Some(password)),
            _ => (None, None),
        };

        Ok(ProfileRecord {
            name: name.to_string(),
            profile_type,
            server_url,
            token: self.token,
            user,
            password,
            cert_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_type_from_str() {
        assert_eq!("jira".parse::<ProfileType>(), Ok(ProfileType::Jira));
        assert_eq!("stages".parse::<ProfileType>(), Ok(ProfileType::Stages));
        assert_eq!(
            "JIRA".parse::<ProfileType>(),
            Err(ProfileError::InvalidProfileType)
        );
        assert_eq!(
            "invalid".parse::<ProfileType>(),
            Err(ProfileError::InvalidProfileType)
        );
    }

    #[test]
    fn test_profile_type_display_round_trip() {
        for t in ProfileType::all() {
            assert_eq!(t.to_string(), t.as_str());
            assert_eq!(t.to_string().parse::<ProfileType>(), Ok(t));
        }
    }

    #[test]
    fn test_token_takes_precedence() {
        let mut new = NewProfile::with_token("p", ProfileType::Jira, "https://x", "t");
        new.user = Some("u".to_string());
        new.password = Some("pw".to_string());

        let doc = new.to_document().unwrap();
        assert_eq!(doc.token.as_deref(), Some("t"));
        assert!(doc.user.is_none());
        assert!(doc.password.is_none());
    }

    #[test]
    fn test_document_requires_credentials() {
        let mut new = NewProfile::with_login("p", ProfileType::Jira, "https://x", "u", "pw");
        new.password = None;
        assert_eq!(new.to_document(), Err(ProfileError::MissingCredentials));

        new.user = None;
        assert_eq!(new.to_document(), Err(ProfileError::MissingCredentials));
    }

    #[test]
    fn test_document_requires_server() {
        let new = NewProfile::with_token("p", ProfileType::Jira, "", "t");
        assert_eq!(new.to_document(), Err(ProfileError::MissingServerUrl));
    }

    #[test]
    fn test_document_keys() {
        let doc = NewProfile::with_login("p", ProfileType::Polarion, "https://x", "u", "pw")
            .to_document()
            .unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["type"], "polarion");
        assert_eq!(value["server"], "https://x");
        assert_eq!(value["user"], "u");
        assert_eq!(value["password"], "pw");
        assert!(value.get("token").is_none());
    }

    #[test]
    fn test_into_record_checks_type_first() {
        // Server is missing too, but the type is reported.
        let doc: StoredProfile = serde_json::from_str(r#"{"type": "other"}"#).unwrap();
        assert_eq!(
            doc.into_record("p", None),
            Err(ProfileError::InvalidProfileType)
        );

        let doc: StoredProfile = serde_json::from_str(r#"{"server": "https://x"}"#).unwrap();
        assert_eq!(
            doc.into_record("p", None),
            Err(ProfileError::InvalidProfileType)
        );
    }

    #[test]
    fn test_into_record_requires_user_and_password_pair() {
        let doc: StoredProfile =
            serde_json::from_str(r#"{"type": "jira", "server": "s", "user": "u"}"#).unwrap();
        let record = doc.into_record("p", None).unwrap();
        assert!(record.user.is_none());
        assert!(record.password.is_none());
        assert!(!record.has_credentials());
    }

    #[test]
    fn test_record_document_round_trip() {
        let record = ProfileRecord {
            name: "p".to_string(),
            profile_type: ProfileType::Conaktiv,
            server_url: "https://x".to_string(),
            token: Some("t".to_string()),
            user: None,
            password: None,
            cert_path: None,
        };
        let back = StoredProfile::from_record(&record)
            .into_record("p", None)
            .unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_update_flags() {
        assert!(ProfileUpdate::default().is_empty());

        let cert_only = ProfileUpdate {
            cert_path: Some(PathBuf::from("c.crt")),
            ..Default::default()
        };
        assert!(!cert_only.is_empty());
        assert!(!cert_only.touches_metadata());

        let server = ProfileUpdate {
            server_url: Some("https://y".to_string()),
            ..Default::default()
        };
        assert!(server.touches_metadata());
    }
}
