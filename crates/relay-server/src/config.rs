//! Credentials config file (relay op 0 passwords).

use serde::Deserialize;

use crate::error::ServerError;

/// On-disk shape of the credentials config file (TOML).
#[derive(Debug, Deserialize)]
pub struct CredentialsFile {
    /// Accepted passwords for relay op 0 (authenticate). Presenting any one
    /// of these raises a session's auth level.
    #[serde(default)]
    pub passwords: Vec<String>,
}

impl CredentialsFile {
    /// Loads and parses a credentials file from `path`.
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ServerError::CredentialsConfig { path: path.to_string(), reason: e.to_string() })?;

        toml::from_str(&contents)
            .map_err(|e| ServerError::CredentialsConfig { path: path.to_string(), reason: e.to_string() })
    }

    /// Converts the loaded passwords into the runtime credential set.
    #[must_use]
    pub fn into_credentials(self) -> relay_core::Credentials {
        relay_core::Credentials::new(self.passwords.into_iter().map(String::into_bytes).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_password_list() {
        let file: CredentialsFile = toml::from_str("passwords = [\"a\", \"b\"]").unwrap();
        assert_eq!(file.passwords, vec!["a", "b"]);
    }

    #[test]
    fn missing_passwords_key_defaults_empty() {
        let file: CredentialsFile = toml::from_str("").unwrap();
        assert!(file.passwords.is_empty());
    }
}
