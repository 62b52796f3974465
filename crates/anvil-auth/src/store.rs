//! Credential resolution and persistence.
//!
//! Tokens are resolved with a fixed precedence: an environment-supplied
//! override wins over whatever is stored in the credential file. The
//! override itself is read once by the binary and passed in as
//! configuration so this module never touches ambient process state.
//!
//! Every account owns a pair of records — one for the API host and one
//! for the git transport host — that always carry identical login and
//! token values. Saves and clears operate on the pair.

use std::path::PathBuf;

use tracing::debug;

use crate::error::AuthResult;
use crate::netrc::Netrc;

/// Configuration for a [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Credential file location (already resolved to the encrypted
    /// sibling when one exists).
    pub netrc_path: PathBuf,
    /// Hostname the API credential record is keyed by.
    pub api_host: String,
    /// Hostname the git transport credential record is keyed by.
    pub git_host: String,
    /// Environment-supplied token override, if any.
    pub api_key_override: Option<String>,
}

/// Reads and writes the machine-scoped credential file.
#[derive(Debug)]
pub struct CredentialStore {
    config: StoreConfig,
}

impl CredentialStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Whether an environment override is shadowing stored credentials.
    pub fn has_override(&self) -> bool {
        self.config.api_key_override.is_some()
    }

    /// Resolve the active session token.
    ///
    /// Precedence: environment override, then the API-host record.
    /// `Ok(None)` means unauthenticated; this never prompts. A malformed
    /// credential file is the only failure.
    pub fn resolve_token(&self) -> AuthResult<Option<String>> {
        if let Some(key) = &self.config.api_key_override {
            return Ok(Some(key.clone()));
        }

        let netrc = self.load()?;
        Ok(netrc
            .machine(&self.config.api_host)
            .map(|m| m.password.clone()))
    }

    /// Resolve the stored login identity.
    ///
    /// Returns `Ok(None)` when an override is active — the override
    /// carries no identity — or when no record exists.
    pub fn resolve_login(&self) -> AuthResult<Option<String>> {
        if self.config.api_key_override.is_some() {
            return Ok(None);
        }

        let netrc = self.load()?;
        Ok(netrc
            .machine(&self.config.api_host)
            .map(|m| m.login.clone()))
    }

    /// Persist a fresh credential pair, replacing any previous records
    /// for both hosts.
    pub fn save(&self, login: &str, token: &str) -> AuthResult<()> {
        let mut netrc = self.load()?;
        netrc.remove_machine(&self.config.api_host);
        netrc.remove_machine(&self.config.git_host);
        netrc.add_machine(&self.config.api_host, login, token);
        netrc.add_machine(&self.config.git_host, login, token);
        netrc.save()?;

        debug!(login = %login, "Saved credential pair");
        Ok(())
    }

    /// Remove the credential pair for both hosts. No-op if absent.
    pub fn clear(&self) -> AuthResult<()> {
        let mut netrc = self.load()?;
        netrc.remove_machine(&self.config.api_host);
        netrc.remove_machine(&self.config.git_host);
        netrc.save()?;

        debug!("Cleared credential pair");
        Ok(())
    }

    fn load(&self) -> AuthResult<Netrc> {
        Netrc::load(self.config.netrc_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const API_HOST: &str = "api.anvil.dev";
    const GIT_HOST: &str = "git.anvil.dev";

    fn store_in(dir: &TempDir, api_key_override: Option<&str>) -> CredentialStore {
        CredentialStore::new(StoreConfig {
            netrc_path: dir.path().join(".netrc"),
            api_host: API_HOST.to_string(),
            git_host: GIT_HOST.to_string(),
            api_key_override: api_key_override.map(str::to_string),
        })
    }

    #[test]
    fn save_round_trips_through_resolution() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, None);

        store.save("u@example.com", "T").unwrap();
        assert_eq!(store.resolve_token().unwrap().as_deref(), Some("T"));
        assert_eq!(
            store.resolve_login().unwrap().as_deref(),
            Some("u@example.com")
        );

        // Both host records exist with identical values.
        let netrc = Netrc::load(dir.path().join(".netrc")).unwrap();
        for host in [API_HOST, GIT_HOST] {
            let m = netrc.machine(host).unwrap();
            assert_eq!(m.login, "u@example.com");
            assert_eq!(m.password, "T");
        }
    }

    #[test]
    fn override_wins_regardless_of_file_contents() {
        let dir = TempDir::new().unwrap();
        store_in(&dir, None).save("u@example.com", "stored").unwrap();

        let store = store_in(&dir, Some("ABC123"));
        assert_eq!(store.resolve_token().unwrap().as_deref(), Some("ABC123"));
    }

    #[test]
    fn override_carries_no_identity() {
        let dir = TempDir::new().unwrap();
        store_in(&dir, None).save("u@example.com", "stored").unwrap();

        let store = store_in(&dir, Some("ABC123"));
        assert_eq!(store.resolve_login().unwrap(), None);
    }

    #[test]
    fn missing_file_resolves_to_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, None);
        assert_eq!(store.resolve_token().unwrap(), None);
        assert_eq!(store.resolve_login().unwrap(), None);
    }

    #[test]
    fn relogin_overwrites_previous_pair() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, None);

        store.save("a@example.com", "1").unwrap();
        store.save("b@example.com", "2").unwrap();

        let netrc = Netrc::load(dir.path().join(".netrc")).unwrap();
        for host in [API_HOST, GIT_HOST] {
            let m = netrc.machine(host).unwrap();
            assert_eq!(m.login, "b@example.com");
            assert_eq!(m.password, "2");
        }
        // Exactly one record per host remains.
        let content = std::fs::read_to_string(dir.path().join(".netrc")).unwrap();
        assert_eq!(content.matches(API_HOST).count(), 1);
        assert_eq!(content.matches(GIT_HOST).count(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir, None);

        store.save("u@example.com", "T").unwrap();
        store.clear().unwrap();
        let after_first = std::fs::read_to_string(dir.path().join(".netrc")).unwrap();

        store.clear().unwrap();
        let after_second = std::fs::read_to_string(dir.path().join(".netrc")).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(store.resolve_token().unwrap(), None);
    }

    #[test]
    fn clear_leaves_foreign_machines_alone() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".netrc"),
            "machine example.org\n  login other\n  password secret\n",
        )
        .unwrap();

        let store = store_in(&dir, None);
        store.save("u@example.com", "T").unwrap();
        store.clear().unwrap();

        let netrc = Netrc::load(dir.path().join(".netrc")).unwrap();
        assert!(netrc.machine("example.org").is_some());
        assert!(netrc.machine(API_HOST).is_none());
    }

    #[test]
    fn malformed_file_surfaces_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".netrc"), "login orphan\n").unwrap();

        let store = store_in(&dir, None);
        assert!(store.resolve_token().is_err());
    }
}
