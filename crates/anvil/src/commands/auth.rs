//! Authentication command handlers.
//!
//! Handles login, logout, whoami, token display, and two-factor
//! management. Environment overrides are read here, once, and passed
//! into the auth crate as explicit configuration.

use anvil_auth::api::{DEFAULT_API_HOST, DEFAULT_GIT_HOST};
use anvil_auth::{
    login, netrc, twofactor, ApiClient, AuthError, AuthResult, CredentialStore, Prompter,
    SsoConfig, StoreConfig, TerminalPrompter,
};
use clap::Subcommand;

/// Environment variable overriding the stored API token.
const API_KEY_ENV_VAR: &str = "ANVIL_API_KEY";

/// Environment variable carrying a full SSO initiation URL.
const SSO_URL_ENV_VAR: &str = "ANVIL_SSO_URL";

/// Environment variable carrying the SSO organization name.
const ORGANIZATION_ENV_VAR: &str = "ANVIL_ORGANIZATION";

/// Authentication subcommands.
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in with your anvil credentials
    Login {
        /// Log in for enterprise users under single sign-on
        #[arg(long)]
        sso: bool,
    },
    /// Clear your local anvil credentials
    Logout,
    /// Display your anvil login
    Whoami,
    /// Display your API token
    Token,
    /// Two-factor authentication management
    #[command(name = "2fa")]
    TwoFactor {
        #[command(subcommand)]
        command: Option<TwoFactorCommands>,
    },
}

/// Two-factor subcommands; bare `2fa` reports enablement status.
#[derive(Subcommand)]
pub enum TwoFactorCommands {
    /// Disable two-factor authentication for your account
    Disable,
    /// Generate and replace recovery codes
    GenRecoveryCodes,
}

/// Handle authentication commands.
pub async fn handle_auth(command: AuthCommands) -> AuthResult<()> {
    let store = credential_store()?;
    let api = ApiClient::new()?;
    let mut prompter = TerminalPrompter;

    match command {
        AuthCommands::Login { sso } => {
            warn_on_override(&store);
            let outcome = if sso {
                login::sso_login(&api, &mut prompter, &sso_config()).await?
            } else {
                login::direct_login(&api, &mut prompter, DEFAULT_API_HOST).await?
            };
            store.save(&outcome.email, &outcome.token)?;
            println!("Logged in as {}", outcome.email);
            Ok(())
        }
        AuthCommands::Logout => {
            warn_on_override(&store);
            store.clear()?;
            println!("Local credentials cleared.");
            Ok(())
        }
        AuthCommands::Whoami => {
            warn_on_override(&store);
            // No login-on-demand here: scripts probing identity must get
            // the distinguished exit code, not a prompt. A token that no
            // longer resolves to an account counts as not logged in.
            let token = store.resolve_token()?.ok_or(AuthError::NotLoggedIn)?;
            let account = api.account(&token).await?.ok_or(AuthError::NotLoggedIn)?;
            println!("{}", account.email);
            Ok(())
        }
        AuthCommands::Token => {
            let token = require_token(&store, &api, &mut prompter).await?;
            println!("{token}");
            Ok(())
        }
        AuthCommands::TwoFactor { command } => {
            let token = require_token(&store, &api, &mut prompter).await?;
            match command {
                None => {
                    if twofactor::status(&api, &token).await? {
                        println!("Two-factor authentication is enabled");
                    } else {
                        println!("Two-factor authentication is not enabled");
                    }
                    Ok(())
                }
                Some(TwoFactorCommands::Disable) => {
                    match twofactor::disable(&api, &mut prompter, &token).await {
                        Ok(()) => {
                            println!("disabled two-factor authentication");
                            Ok(())
                        }
                        // The one recoverable failure in the subsystem:
                        // report and return without exiting.
                        Err(err) if err.is_recoverable() => {
                            eprintln!("{err}");
                            Ok(())
                        }
                        Err(err) => Err(err),
                    }
                }
                Some(TwoFactorCommands::GenRecoveryCodes) => {
                    let codes =
                        twofactor::regenerate_recovery_codes(&api, &mut prompter, &token).await?;
                    println!("Recovery codes:");
                    for code in codes {
                        println!("{code}");
                    }
                    Ok(())
                }
            }
        }
    }
}

/// Capability gate for commands that need a token: resolve one, or run
/// the Direct login first and continue with the fresh token.
async fn require_token(
    store: &CredentialStore,
    api: &ApiClient,
    prompter: &mut dyn Prompter,
) -> AuthResult<String> {
    if let Some(token) = store.resolve_token()? {
        return Ok(token);
    }

    let outcome = login::direct_login(api, prompter, DEFAULT_API_HOST).await?;
    store.save(&outcome.email, &outcome.token)?;
    println!("Logged in as {}", outcome.email);
    Ok(outcome.token)
}

fn credential_store() -> AuthResult<CredentialStore> {
    let home = dirs::home_dir().ok_or(AuthError::NoHomeDir)?;
    Ok(CredentialStore::new(StoreConfig {
        netrc_path: netrc::resolve_netrc_path(&home),
        api_host: DEFAULT_API_HOST.to_string(),
        git_host: DEFAULT_GIT_HOST.to_string(),
        api_key_override: env_non_empty(API_KEY_ENV_VAR),
    }))
}

fn sso_config() -> SsoConfig {
    SsoConfig {
        sso_url: env_non_empty(SSO_URL_ENV_VAR),
        organization: env_non_empty(ORGANIZATION_ENV_VAR),
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// An active override shadows whatever login/logout writes; say so.
fn warn_on_override(store: &CredentialStore) {
    if store.has_override() {
        tracing::warn!("{} is set", API_KEY_ENV_VAR);
        eprintln!("warning: {API_KEY_ENV_VAR} is set");
    }
}
