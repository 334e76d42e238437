//! High-level command orchestration for the CLI.
//!
//! Each function here corresponds to a subcommand in `main.rs` (`list`,
//! `add`, `remove`, `update`, `show`). Arguments are validated here first,
//! mirroring the store's own checks, and results are rendered through
//! `crate::ui`. Store failures propagate as [`ProfileError`] inside
//! `anyhow::Error` so `main` can map them to exit codes.

use anstyle::AnsiColor;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::error::ProfileError;
use crate::profile::{NewProfile, ProfileType, ProfileUpdate};
use crate::store::{AddOutcome, ConflictPolicy, ProfileStore};
use crate::ui::{Ui, mask_secret};

const TYPE_HELP: &str = "jira, polarion, superset, conaktiv or stages";

/// Arguments of `profmgr add`
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// The name of the profile
    pub name: String,

    /// The type of the profile (jira, polarion, superset, conaktiv or stages)
    #[arg(short = 'T', long = "profile-type", visible_alias = "type", value_name = "TYPE")]
    pub profile_type: String,

    /// The server URL to connect to
    #[arg(short, long, value_name = "URL")]
    pub server: Option<String>,

    /// The token to authenticate at the server (preferred over user/password)
    #[arg(short, long)]
    pub token: Option<String>,

    /// The user to authenticate at the server
    #[arg(short, long)]
    pub user: Option<String>,

    /// The password to authenticate at the server
    #[arg(short, long)]
    pub password: Option<String>,

    /// The server's TLS certificate
    #[arg(short, long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Overwrite an existing profile without asking
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments of `profmgr update`
#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    /// The name of the profile
    pub name: String,

    /// New profile type (jira, polarion, superset, conaktiv or stages)
    #[arg(short = 'T', long = "profile-type", visible_alias = "type", value_name = "TYPE")]
    pub profile_type: Option<String>,

    /// New server URL
    #[arg(short, long, value_name = "URL")]
    pub server: Option<String>,

    /// New token
    #[arg(short, long)]
    pub token: Option<String>,

    /// New user
    #[arg(short, long)]
    pub user: Option<String>,

    /// New password
    #[arg(short, long)]
    pub password: Option<String>,

    /// New server certificate
    #[arg(short, long, value_name = "FILE")]
    pub cert: Option<PathBuf>,
}

/// List all stored profiles
pub fn list(store: &ProfileStore, ui: &Ui) -> Result<()> {
    let mut names = store.list()?;

    if names.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!(
            "  {} add <name> --profile-type <type> --server <url> --token <token>",
            ui.bold("profmgr")
        ));
        return Ok(());
    }
    names.sort();

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell("Profile"),
        ui.header_cell("Type"),
        ui.header_cell("Server"),
    ]);

    for name in &names {
        match store.read(name) {
            Ok(record) => table.add_row(vec![
                ui.cell(name),
                ui.type_cell(record.profile_type),
                ui.cell(record.server_url),
            ]),
            Err(e) => table.add_row(vec![
                ui.cell(name),
                ui.colored_cell("?", AnsiColor::Red),
                ui.colored_cell(e.to_string(), AnsiColor::Red),
            ]),
        };
    }

    ui.section("Profiles");
    ui.println(table.to_string());
    Ok(())
}

/// Add a new profile.
///
/// An existing profile is only replaced with `--force` or, when
/// `interactive` is set, after the user confirms.
pub fn add(store: &mut ProfileStore, ui: &Ui, args: AddArgs, interactive: bool) -> Result<()> {
    let profile_type = parse_type(&args.profile_type)?;

    let server_url = args
        .server
        .filter(|s| !s.is_empty())
        .ok_or(ProfileError::MissingServerUrl)?;

    if args.token.is_none() && (args.user.is_none() || args.password.is_none()) {
        ui.info(
            "Profiles can only be created using login credentials. \
             Please provide a token using the --token option or --user/--password.",
        );
        return Err(ProfileError::MissingUserInformation.into());
    }

    let policy = if !store.exists(&args.name) {
        ConflictPolicy::Fail
    } else if args.force {
        ConflictPolicy::Overwrite
    } else if interactive {
        if !confirm_overwrite(&args.name)? {
            ui.warn(format!("Adding profile '{}' has been canceled.", args.name));
            return Ok(());
        }
        ConflictPolicy::Overwrite
    } else {
        return Err(ProfileError::ProfileAlreadyExists.into());
    };

    let new = NewProfile {
        name: args.name,
        profile_type,
        server_url,
        token: args.token,
        user: args.user,
        password: args.password,
        cert_path: args.cert,
    };

    let outcome = store.add(&new, policy)?;
    ui.ok(format!("Created profile '{}'", new.name));
    if let AddOutcome::LoadFailed(e) = outcome {
        ui.warn(format!(
            "Profile '{}' was written but could not be loaded back: {}",
            new.name, e
        ));
    }
    Ok(())
}

fn confirm_overwrite(name: &str) -> Result<bool> {
    inquire::Confirm::new(&format!(
        "A profile named '{}' already exists. Do you want to overwrite it?",
        name
    ))
    .with_default(false)
    .with_help_message("The stored credentials and certificate will be replaced")
    .prompt()
    .context("Confirmation cancelled")
}

/// Remove a profile; a missing profile is reported but not an error
pub fn remove(store: &mut ProfileStore, ui: &Ui, name: &str) -> Result<()> {
    if store.delete(name)? {
        ui.ok(format!("Removed profile '{}'", name));
    } else {
        ui.warn(format!("Profile '{}' does not exist, nothing removed.", name));
    }
    Ok(())
}

/// Update fields, token and certificate of an existing profile
///
/// All changes go through one store update, which checks the result and
/// reads the certificate before writing anything.
pub fn update(store: &mut ProfileStore, ui: &Ui, args: UpdateArgs) -> Result<()> {
    let profile_type = args.profile_type.as_deref().map(parse_type).transpose()?;

    let changes = ProfileUpdate {
        profile_type,
        server_url: args.server,
        token: args.token,
        user: args.user,
        password: args.password,
        cert_path: args.cert,
    };

    if changes.is_empty() {
        ui.warn("Nothing to update.");
        ui.println(format!(
            "Pass at least one of {} to change profile '{}'.",
            ui.bold("--profile-type, --server, --token, --user, --password, --cert"),
            args.name
        ));
        return Ok(());
    }

    store.update(&args.name, &changes)?;
    ui.ok(format!("Updated profile '{}'", args.name));
    Ok(())
}

/// Load a profile and show its details with secrets masked
pub fn show(store: &mut ProfileStore, ui: &Ui, name: &str) -> Result<()> {
    store.load(name)?;
    let record = store.loaded().ok_or(ProfileError::ProfileNotFound)?;

    let secret_cell = |value: Option<&String>| match value {
        Some(value) => ui.cell(mask_secret(value)),
        None => ui.cell(ui.dim("-")),
    };

    let mut table = ui.simple_table();
    table.add_row(vec![ui.cell("Type:"), ui.type_cell(record.profile_type)]);
    table.add_row(vec![ui.cell("Server:"), ui.cell(&record.server_url)]);
    table.add_row(vec![ui.cell("Token:"), secret_cell(record.token.as_ref())]);
    table.add_row(vec![
        ui.cell("User:"),
        ui.cell(record.user.clone().unwrap_or_else(|| ui.dim("-"))),
    ]);
    table.add_row(vec![ui.cell("Password:"), secret_cell(record.password.as_ref())]);
    table.add_row(vec![
        ui.cell("Certificate:"),
        match &record.cert_path {
            Some(path) => ui.cell(path.display().to_string()),
            None => ui.cell(ui.dim("-")),
        },
    ]);

    ui.section(format!("Profile: {}", record.name));
    ui.newline();
    ui.println(table.to_string());
    Ok(())
}

fn parse_type(value: &str) -> Result<ProfileType> {
    value.parse::<ProfileType>().map_err(|e| {
        tracing::debug!("Unknown profile type '{value}', expected {TYPE_HELP}");
        e.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{setup_test_store, write_test_cert};
    use crate::ui::ColorMode;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    fn add_args(name: &str) -> AddArgs {
        AddArgs {
            name: name.to_string(),
            profile_type: "jira".to_string(),
            server: Some("https://jira.example.com".to_string()),
            token: Some("secret-token".to_string()),
            user: None,
            password: None,
            cert: None,
            force: false,
        }
    }

    fn update_args(name: &str) -> UpdateArgs {
        UpdateArgs {
            name: name.to_string(),
            profile_type: None,
            server: None,
            token: None,
            user: None,
            password: None,
            cert: None,
        }
    }

    fn status_of(result: Result<()>) -> Option<ProfileError> {
        result.err()?.downcast_ref::<ProfileError>().copied()
    }

    #[test]
    fn test_list_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_store(&temp_dir);
        assert!(list(&store, &test_ui()).is_ok());
    }

    #[test]
    fn test_add_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();

        add(&mut store, &ui, add_args("work"), false).unwrap();
        assert!(store.exists("work"));
        assert_eq!(store.loaded().unwrap().name, "work");

        // A broken profile is listed, not fatal.
        std::fs::create_dir(store.profiles_dir().join("broken")).unwrap();
        assert!(list(&store, &ui).is_ok());
    }

    #[test]
    fn test_add_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();

        add(&mut store, &ui, add_args("work"), false).unwrap();
        assert_eq!(
            status_of(add(&mut store, &ui, add_args("work"), false)),
            Some(ProfileError::ProfileAlreadyExists)
        );

        let mut forced = add_args("work");
        forced.profile_type = "stages".to_string();
        forced.force = true;
        add(&mut store, &ui, forced, false).unwrap();
        assert_eq!(store.read("work").unwrap().profile_type, ProfileType::Stages);
    }

    #[test]
    fn test_add_validates_arguments() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();

        let mut bad_type = add_args("p");
        bad_type.profile_type = "github".to_string();
        assert_eq!(
            status_of(add(&mut store, &ui, bad_type, false)),
            Some(ProfileError::InvalidProfileType)
        );

        let mut no_server = add_args("p");
        no_server.server = None;
        assert_eq!(
            status_of(add(&mut store, &ui, no_server, false)),
            Some(ProfileError::MissingServerUrl)
        );

        let mut half_login = add_args("p");
        half_login.token = None;
        half_login.user = Some("u".to_string());
        assert_eq!(
            status_of(add(&mut store, &ui, half_login, false)),
            Some(ProfileError::MissingUserInformation)
        );

        assert!(!store.exists("p"));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();

        // Missing profiles are not an error.
        remove(&mut store, &ui, "nonexistent").unwrap();

        add(&mut store, &ui, add_args("work"), false).unwrap();
        remove(&mut store, &ui, "work").unwrap();
        assert!(!store.exists("work"));
        assert!(store.loaded().is_none());
    }

    #[test]
    fn test_update_token_and_cert() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();
        let cert = write_test_cert(&temp_dir, "server.crt", "CERT DATA");

        let mut login = add_args("work");
        login.token = None;
        login.user = Some("u".to_string());
        login.password = Some("pw".to_string());
        add(&mut store, &ui, login, false).unwrap();

        let mut args = update_args("work");
        args.token = Some("new-token".to_string());
        args.server = Some("https://other.example.com".to_string());
        args.cert = Some(cert);
        update(&mut store, &ui, args).unwrap();

        let record = store.read("work").unwrap();
        assert_eq!(record.token.as_deref(), Some("new-token"));
        assert_eq!(record.server_url, "https://other.example.com");
        assert_eq!(
            std::fs::read_to_string(record.cert_path.unwrap()).unwrap(),
            "CERT DATA"
        );
    }

    #[test]
    fn test_update_errors() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();

        // Nothing requested is only a warning.
        update(&mut store, &ui, update_args("missing")).unwrap();

        let mut args = update_args("missing");
        args.token = Some("t".to_string());
        assert_eq!(
            status_of(update(&mut store, &ui, args)),
            Some(ProfileError::ProfileNotFound)
        );

        add(&mut store, &ui, add_args("work"), false).unwrap();
        let mut args = update_args("work");
        args.server = Some("https://changed".to_string());
        args.cert = Some(temp_dir.path().join("missing.crt"));
        assert_eq!(
            status_of(update(&mut store, &ui, args)),
            Some(ProfileError::InvalidPath)
        );
        assert_eq!(
            store.read("work").unwrap().server_url,
            "https://jira.example.com"
        );
    }

    #[test]
    fn test_update_with_unreadable_cert_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();
        add(&mut store, &ui, add_args("work"), false).unwrap();
        let before = store.read("work").unwrap();

        // Exists, but is not a readable file
        let cert_dir = temp_dir.path().join("certs");
        std::fs::create_dir(&cert_dir).unwrap();

        let mut args = update_args("work");
        args.server = Some("https://changed".to_string());
        args.token = Some("new-token".to_string());
        args.cert = Some(cert_dir);
        assert_eq!(
            status_of(update(&mut store, &ui, args)),
            Some(ProfileError::InvalidPath)
        );

        let after = store.read("work").unwrap();
        assert_eq!(after, before);
        assert!(after.cert_path.is_none());
    }

    #[test]
    fn test_show() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = setup_test_store(&temp_dir);
        let ui = test_ui();

        assert_eq!(
            status_of(show(&mut store, &ui, "missing")),
            Some(ProfileError::ProfileNotFound)
        );

        add(&mut store, &ui, add_args("work"), false).unwrap();
        store.reset();
        show(&mut store, &ui, "work").unwrap();
        assert_eq!(store.loaded().unwrap().name, "work");
    }
}
