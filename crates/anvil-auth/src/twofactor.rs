//! Account two-factor-authentication management.
//!
//! All three operations assume a token was already resolved by the
//! command gate and perform exactly one HTTP call, prompting inline for
//! the password and/or second-factor code where the API requires them.

use crate::api::ApiClient;
use crate::error::{AuthError, AuthResult};
use crate::prompt::Prompter;

/// Report whether two-factor authentication is enabled on the account.
pub async fn status(api: &ApiClient, token: &str) -> AuthResult<bool> {
    match api.account(token).await? {
        Some(account) => Ok(account.two_factor_authentication),
        None => Err(AuthError::NotLoggedIn),
    }
}

/// Disable two-factor authentication.
///
/// The server's rejection comes back as [`AuthError::TwoFactor`], the
/// subsystem's only recoverable error: the caller prints the message
/// and keeps going instead of exiting.
pub async fn disable(
    api: &ApiClient,
    prompter: &mut dyn Prompter,
    token: &str,
) -> AuthResult<()> {
    let password = prompter.prompt_hidden("Password (typing will be hidden): ")?;
    api.disable_two_factor(token, &password).await
}

/// Generate a fresh set of recovery codes, replacing the old ones.
pub async fn regenerate_recovery_codes(
    api: &ApiClient,
    prompter: &mut dyn Prompter,
    token: &str,
) -> AuthResult<Vec<String>> {
    let password = prompter.prompt_hidden("Password (typing will be hidden): ")?;
    let code = prompter.prompt_line("Two-factor code: ")?;
    api.regenerate_recovery_codes(token, &password, &code).await
}
