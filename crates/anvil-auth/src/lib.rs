//! Credential resolution and interactive authentication for the anvil
//! CLI.
//!
//! This crate decides which credential an authenticated command uses,
//! drives the login handshake, and persists credentials in the
//! machine-keyed netrc file shared with the git transport.
//!
//! # Token resolution
//!
//! Precedence, highest first:
//!
//! 1. The environment-supplied override (read once by the binary and
//!    passed in via [`StoreConfig`])
//! 2. The credential file record for the API host
//!
//! An empty result means "unauthenticated"; resolution never prompts.
//!
//! # Login strategies
//!
//! - [`login::direct_login`]: email/password with an unbounded
//!   second-factor challenge loop
//! - [`login::sso_login`]: browser single-sign-on with a pasted-back
//!   access token
//!
//! Both return an `(identity, token)` pair for the caller to persist;
//! error handling is by value — the CLI entry point owns process exit.
//!
//! # Storage
//!
//! Credentials live in `~/.netrc` (`_netrc` on Windows) as two records
//! per account — API host and git transport host — always written and
//! removed as a pair. An existing `.gpg` sibling takes precedence as
//! the read/write location.

pub mod api;
pub mod error;
pub mod login;
pub mod netrc;
pub mod prompt;
pub mod store;
pub mod twofactor;

pub use api::{Account, ApiClient};
pub use error::{AuthError, AuthResult};
pub use login::{direct_login, sso_login, LoginOutcome, SsoConfig};
pub use prompt::{Prompter, TerminalPrompter};
pub use store::{CredentialStore, StoreConfig};
