use std::env;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

use crate::services::keyring::{Keyring, KeyringParseError};

/// Startup configuration problems are fatal: the process refuses to serve
/// any message until they are fixed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No token provided (TOKEN)")]
    MissingToken,

    #[error("No destination directory provided (DEST_DIR)")]
    MissingDestDir,

    #[error("No users specified (ALLOWED_USERS)")]
    NoAllowedUsers,

    #[error(transparent)]
    Passwords(#[from] KeyringParseError),

    #[error("Failed to create destination directory {path}: {source}")]
    CreateDestDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Process-wide configuration, loaded once from the environment and passed
/// explicitly into each component. Immutable after load.
#[derive(Debug, Clone)]
pub struct Config {
    /// Transport credential.
    pub token: String,
    /// Destination store for committed documents.
    pub dest_dir: PathBuf,
    /// Sender identities allowed to use the bot.
    pub allowed_users: Vec<String>,
    /// Ordered candidate passwords for protected documents.
    pub passwords: Keyring,
}

impl Config {
    /// Load and validate configuration from environment variables:
    /// `TOKEN`, `DEST_DIR`, `ALLOWED_USERS` (required) and `PDF_PASSWORDS`
    /// (optional `name:value` pairs).
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var("TOKEN")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let dest_dir = env::var("DEST_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingDestDir)?;

        let allowed_users: Vec<String> = env::var("ALLOWED_USERS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if allowed_users.is_empty() {
            return Err(ConfigError::NoAllowedUsers);
        }

        let passwords = match env::var("PDF_PASSWORDS") {
            Ok(raw) => Keyring::parse(&raw)?,
            Err(_) => Keyring::default(),
        };

        Ok(Self {
            token,
            dest_dir,
            allowed_users,
            passwords,
        })
    }

    /// Create the destination directory if it does not exist yet. Only the
    /// final path component is created; a missing parent is a config error.
    pub fn ensure_dest_dir(&self) -> Result<(), ConfigError> {
        match std::fs::create_dir(&self.dest_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(ConfigError::CreateDestDir {
                path: self.dest_dir.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so all from_env scenarios
    // run inside one test.
    #[test]
    fn test_from_env() {
        unsafe {
            env::remove_var("TOKEN");
            env::remove_var("DEST_DIR");
            env::remove_var("ALLOWED_USERS");
            env::remove_var("PDF_PASSWORDS");
        }
        assert!(matches!(Config::from_env(), Err(ConfigError::MissingToken)));

        unsafe { env::set_var("TOKEN", "123:abc") };
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingDestDir)
        ));

        unsafe { env::set_var("DEST_DIR", "/tmp/archive") };
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::NoAllowedUsers)
        ));

        unsafe { env::set_var("ALLOWED_USERS", " ,") };
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::NoAllowedUsers)
        ));

        unsafe { env::set_var("ALLOWED_USERS", "alice, bob") };
        let config = Config::from_env().unwrap();
        assert_eq!(config.token, "123:abc");
        assert_eq!(config.dest_dir, PathBuf::from("/tmp/archive"));
        assert_eq!(config.allowed_users, vec!["alice", "bob"]);
        assert!(config.passwords.is_empty());

        unsafe { env::set_var("PDF_PASSWORDS", "finance:s3cret,vault:a:b") };
        let config = Config::from_env().unwrap();
        let names: Vec<&str> = config.passwords.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["finance", "vault"]);

        unsafe { env::set_var("PDF_PASSWORDS", "broken") };
        assert!(matches!(Config::from_env(), Err(ConfigError::Passwords(_))));

        unsafe {
            env::remove_var("TOKEN");
            env::remove_var("DEST_DIR");
            env::remove_var("ALLOWED_USERS");
            env::remove_var("PDF_PASSWORDS");
        }
    }

    #[test]
    fn test_ensure_dest_dir_tolerates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            token: "t".to_string(),
            dest_dir: dir.path().join("store"),
            allowed_users: vec!["alice".to_string()],
            passwords: Keyring::default(),
        };
        config.ensure_dest_dir().unwrap();
        config.ensure_dest_dir().unwrap();
        assert!(config.dest_dir.is_dir());
    }

    #[test]
    fn test_ensure_dest_dir_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            token: "t".to_string(),
            dest_dir: dir.path().join("missing/store"),
            allowed_users: vec!["alice".to_string()],
            passwords: Keyring::default(),
        };
        assert!(matches!(
            config.ensure_dest_dir(),
            Err(ConfigError::CreateDestDir { .. })
        ));
    }
}
