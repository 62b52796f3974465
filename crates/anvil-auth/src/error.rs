//! Error types for authentication operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during authentication operations.
///
/// Login flows never terminate the process themselves; they surface one
/// of these variants and the CLI entry point decides the exit code.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Failed to read or write the credential file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure, or an undecodable response body.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The credential file exists but could not be parsed.
    #[error("Error parsing credential file at {}: {reason}", path.display())]
    MalformedNetrc { path: PathBuf, reason: String },

    /// The login endpoint rejected the supplied credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// A pasted single-sign-on token failed verification.
    #[error("Access token invalid.")]
    InvalidAccessToken,

    /// The API returned a status this client does not understand.
    #[error(
        "Invalid response from API.\nHTTP {status}\n{body}\n\n\
         Are you behind a proxy?\nhttps://devcenter.anvil.dev/articles/using-an-http-proxy"
    )]
    UnexpectedStatus { status: u16, body: String },

    /// A two-factor management call was rejected by the server.
    ///
    /// This is the one recoverable error in the subsystem: callers print
    /// the server-provided message and return control without exiting.
    #[error("{0}")]
    TwoFactor(String),

    /// No token could be resolved, or the resolved token was rejected.
    #[error("not logged in")]
    NotLoggedIn,

    /// Stdin closed while waiting for interactive input.
    #[error("input stream closed")]
    InputClosed,

    /// Could not determine the user's home directory.
    #[error("Could not determine home directory")]
    NoHomeDir,
}

impl AuthError {
    /// Whether this error is recoverable in-process.
    ///
    /// Only the two-factor-disable server rejection reports failure
    /// without ending the invocation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TwoFactor(_))
    }
}
