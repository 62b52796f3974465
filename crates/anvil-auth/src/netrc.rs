//! Line-oriented netrc credential file support.
//!
//! The credential file follows the standard machine/login/password
//! convention so other tools (notably the git transport) can read the
//! same entries. A missing file parses to an empty store; a malformed
//! file is an error. If an encrypted sibling (`.gpg` suffix) exists it
//! takes precedence as the read/write location — the encryption itself
//! is handled by an external mechanism, this module only picks the path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// One credential record: a machine (hostname) with its login and token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
    pub login: String,
    pub password: String,
    /// Optional `account` field, preserved verbatim for entries owned by
    /// other tools.
    pub account: Option<String>,
}

impl Machine {
    fn empty(name: String) -> Self {
        Self {
            name,
            login: String::new(),
            password: String::new(),
            account: None,
        }
    }
}

/// An ordered netrc file. Machines are unique per name; order of
/// unrelated entries is preserved across rewrites.
#[derive(Debug)]
pub struct Netrc {
    path: PathBuf,
    machines: Vec<Machine>,
}

impl Netrc {
    /// Load a netrc file. A nonexistent file yields an empty store at
    /// the given path so it can be created lazily on first save.
    pub fn load(path: PathBuf) -> AuthResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Credential file missing, starting empty");
            return Ok(Self {
                path,
                machines: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let machines = parse(&content).map_err(|reason| AuthError::MalformedNetrc {
            path: path.clone(),
            reason,
        })?;

        Ok(Self { path, machines })
    }

    /// Path this store reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a machine by name.
    pub fn machine(&self, name: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.name == name)
    }

    /// Remove the machine with the given name. No-op if absent.
    pub fn remove_machine(&mut self, name: &str) {
        self.machines.retain(|m| m.name != name);
    }

    /// Append a machine, replacing any existing entry with the same name.
    pub fn add_machine(&mut self, name: &str, login: &str, password: &str) {
        self.remove_machine(name);
        self.machines.push(Machine {
            name: name.to_string(),
            login: login.to_string(),
            password: password.to_string(),
            account: None,
        });
    }

    /// Persist the store, creating the file if it does not exist yet.
    pub fn save(&self) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, render(&self.machines))?;

        // Credential files must not be group/world readable.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        debug!(path = %self.path.display(), machines = self.machines.len(), "Wrote credential file");
        Ok(())
    }
}

/// Resolve the credential file path under the given home directory.
///
/// Uses `.netrc` (`_netrc` on Windows); an existing `.gpg` sibling takes
/// precedence for both reads and writes.
pub fn resolve_netrc_path(home: &Path) -> PathBuf {
    #[cfg(windows)]
    let base = home.join("_netrc");
    #[cfg(not(windows))]
    let base = home.join(".netrc");

    let mut encrypted = OsString::from(base.as_os_str());
    encrypted.push(".gpg");
    let encrypted = PathBuf::from(encrypted);

    if encrypted.exists() {
        encrypted
    } else {
        base
    }
}

fn parse(content: &str) -> Result<Vec<Machine>, String> {
    let mut machines: Vec<Machine> = Vec::new();
    let mut in_macro = false;

    for line in content.lines() {
        // A macdef body runs until the next blank line.
        if in_macro {
            if line.trim().is_empty() {
                in_macro = false;
            }
            continue;
        }

        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "machine" => {
                    let name = tokens
                        .next()
                        .ok_or_else(|| "`machine` without a name".to_string())?;
                    machines.push(Machine::empty(name.to_string()));
                }
                "default" => {
                    // A catch-all entry; kept so rewrites do not drop it,
                    // never matched by host lookups.
                    machines.push(Machine::empty("default".to_string()));
                }
                "login" | "password" | "account" => {
                    let value = tokens
                        .next()
                        .ok_or_else(|| format!("`{token}` without a value"))?;
                    let machine = machines
                        .last_mut()
                        .ok_or_else(|| format!("`{token}` outside a machine block"))?;
                    match token {
                        "login" => machine.login = value.to_string(),
                        "password" => machine.password = value.to_string(),
                        _ => machine.account = Some(value.to_string()),
                    }
                }
                "macdef" => {
                    in_macro = true;
                    break;
                }
                other => return Err(format!("unexpected keyword `{other}`")),
            }
        }
    }

    Ok(machines)
}

fn render(machines: &[Machine]) -> String {
    let mut out = String::new();
    for machine in machines {
        if machine.name == "default" {
            out.push_str("default\n");
        } else {
            out.push_str(&format!("machine {}\n", machine.name));
        }
        if !machine.login.is_empty() {
            out.push_str(&format!("  login {}\n", machine.login));
        }
        if !machine.password.is_empty() {
            out.push_str(&format!("  password {}\n", machine.password));
        }
        if let Some(account) = &machine.account {
            out.push_str(&format!("  account {}\n", account));
        }
    }
    out
}
