//! Login protocol state machines.
//!
//! Two independent strategies, each producing an `(identity, token)`
//! pair:
//!
//! - **Direct**: email/password submitted to the password grant, with
//!   an unbounded second-factor challenge loop driven by fresh user
//!   input on every 403.
//! - **Delegated**: browser-opened single-sign-on; the user pastes back
//!   an externally issued token which is verified against the account
//!   endpoint.
//!
//! Neither strategy terminates the process; failures surface as
//! [`AuthError`] values for the CLI entry point to turn into exit codes.

use tracing::{debug, warn};

use crate::api::{ApiClient, Authorization, PasswordLogin, DEFAULT_API_HOST};
use crate::error::{AuthError, AuthResult};
use crate::prompt::Prompter;

/// A successful login: the identity to store alongside the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub email: String,
    pub token: String,
}

/// Environment-supplied inputs for the Delegated strategy.
#[derive(Debug, Clone, Default)]
pub struct SsoConfig {
    /// Full SSO initiation URL; skips organization resolution entirely.
    pub sso_url: Option<String>,
    /// Organization name; skips the interactive prompt.
    pub organization: Option<String>,
}

/// Accumulated state for the password grant challenge loop.
struct LoginAttempt {
    email: String,
    password: String,
    second_factor: Option<String>,
}

/// Run the Direct strategy: collect credentials, submit, and loop on
/// second-factor challenges until the server issues a token.
pub async fn direct_login(
    api: &ApiClient,
    prompter: &mut dyn Prompter,
    api_host: &str,
) -> AuthResult<LoginOutcome> {
    if api_host == DEFAULT_API_HOST {
        eprintln!("Enter your anvil credentials.");
    } else {
        eprintln!("Enter your anvil credentials for {api_host}.");
    }

    let email = prompter.prompt_line("Email: ")?;
    let password = prompter.prompt_hidden("Password (typing will be hidden): ")?;

    let mut attempt = LoginAttempt {
        email,
        password,
        second_factor: None,
    };

    let token = loop {
        let submitted = api
            .password_login(
                &attempt.email,
                &attempt.password,
                attempt.second_factor.as_deref(),
            )
            .await?;

        match submitted {
            PasswordLogin::Authorized(token) => break token,
            PasswordLogin::SecondFactorRequired => {
                debug!("Second-factor challenge received");
                attempt.second_factor = Some(prompter.prompt_line("Two-factor code: ")?);
            }
        }
    };

    Ok(LoginOutcome {
        email: attempt.email,
        token,
    })
}

/// Run the Delegated strategy: open the SSO page, collect the pasted
/// token, and verify it resolves to an account.
pub async fn sso_login(
    api: &ApiClient,
    prompter: &mut dyn Prompter,
    config: &SsoConfig,
) -> AuthResult<LoginOutcome> {
    let url = resolve_sso_url(prompter, config)?;
    open_browser(&url);

    let token = prompter.prompt_hidden("Enter your access token (typing will be hidden): ")?;
    verify_access_token(api, token).await
}

/// Verify a pasted access token against the account endpoint.
pub async fn verify_access_token(api: &ApiClient, token: String) -> AuthResult<LoginOutcome> {
    match api.account(&token).await? {
        Some(account) => Ok(LoginOutcome {
            email: account.email,
            token,
        }),
        None => Err(AuthError::InvalidAccessToken),
    }
}

/// Create a session token via the OAuth authorizations resource,
/// looping on second-factor challenges like the password grant.
///
/// Reserved for the next API version; no CLI entry point invokes this
/// yet.
pub async fn authorize(
    api: &ApiClient,
    prompter: &mut dyn Prompter,
    email: &str,
    password: &str,
) -> AuthResult<String> {
    let mut second_factor: Option<String> = None;
    loop {
        match api
            .create_authorization(email, password, second_factor.as_deref())
            .await?
        {
            Authorization::Created(token) => return Ok(token),
            Authorization::SecondFactorRequired => {
                second_factor = Some(prompter.prompt_line("Two-factor code: ")?);
            }
        }
    }
}

fn resolve_sso_url(prompter: &mut dyn Prompter, config: &SsoConfig) -> AuthResult<String> {
    if let Some(url) = config.sso_url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }

    let organization = match config.organization.as_deref().filter(|o| !o.is_empty()) {
        Some(org) => org.to_string(),
        // prompt_line re-prompts until non-empty
        None => prompter.prompt_line("Enter your organization name: ")?,
    };

    Ok(format!(
        "https://sso.anvil.dev/saml/{organization}/init?cli=true"
    ))
}

/// Best-effort browser open; on failure the URL is printed for manual
/// navigation and the flow continues.
fn open_browser(url: &str) {
    eprint!("Opening browser for login...");
    match open::that(url) {
        Ok(()) => eprintln!(" done"),
        Err(err) => {
            warn!(error = %err, "Could not open browser");
            eprintln!(" {err}.\nNavigate to {url}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TWO_FACTOR_HEADER;
    use crate::prompt::ScriptedPrompter;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn direct_login_retries_once_with_second_factor() {
        let server = MockServer::start().await;

        // The code-carrying resubmission succeeds; mounted first so it
        // takes priority over the challenge below.
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header(TWO_FACTOR_HEADER, "123456"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "api_key": "T2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut prompter = ScriptedPrompter::new(&["u@example.com", "123456"], &["pw"]);

        let outcome = direct_login(&api, &mut prompter, DEFAULT_API_HOST)
            .await
            .unwrap();
        assert_eq!(outcome.email, "u@example.com");
        // Token comes from the second response only.
        assert_eq!(outcome.token, "T2");
        // expect(1) on both mocks verifies exactly two submissions.
    }

    #[tokio::test]
    async fn direct_login_succeeds_without_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "api_key": "T"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut prompter = ScriptedPrompter::new(&["u@example.com"], &["pw"]);

        let outcome = direct_login(&api, &mut prompter, "api.other.dev").await.unwrap();
        assert_eq!(outcome.token, "T");
    }

    #[tokio::test]
    async fn direct_login_propagates_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "nope"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut prompter = ScriptedPrompter::new(&["u@example.com"], &["pw"]);

        let err = direct_login(&api, &mut prompter, DEFAULT_API_HOST)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(msg) if msg == "nope"));
    }

    #[tokio::test]
    async fn pasted_token_resolving_to_account_logs_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .and(header("authorization", "Bearer PASTED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "a@b.com"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let outcome = verify_access_token(&api, "PASTED".to_string()).await.unwrap();
        assert_eq!(outcome.email, "a@b.com");
        assert_eq!(outcome.token, "PASTED");
    }

    #[tokio::test]
    async fn rejected_pasted_token_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let err = verify_access_token(&api, "PASTED".to_string()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidAccessToken));
    }

    #[tokio::test]
    async fn delegated_outcome_persists_identity_and_pasted_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "a@b.com"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let outcome = verify_access_token(&api, "PASTED".to_string()).await.unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let store = crate::store::CredentialStore::new(crate::store::StoreConfig {
            netrc_path: dir.path().join(".netrc"),
            api_host: "api.anvil.dev".to_string(),
            git_host: "git.anvil.dev".to_string(),
            api_key_override: None,
        });
        store.save(&outcome.email, &outcome.token).unwrap();

        assert_eq!(store.resolve_login().unwrap().as_deref(), Some("a@b.com"));
        assert_eq!(store.resolve_token().unwrap().as_deref(), Some("PASTED"));
    }

    #[test]
    fn sso_url_override_wins() {
        let mut prompter = ScriptedPrompter::new(&[], &[]);
        let config = SsoConfig {
            sso_url: Some("https://sso.example.com/custom".to_string()),
            organization: Some("ignored".to_string()),
        };
        let url = resolve_sso_url(&mut prompter, &config).unwrap();
        assert_eq!(url, "https://sso.example.com/custom");
    }

    #[test]
    fn organization_builds_canonical_sso_url() {
        let mut prompter = ScriptedPrompter::new(&[], &[]);
        let config = SsoConfig {
            sso_url: None,
            organization: Some("acme".to_string()),
        };
        let url = resolve_sso_url(&mut prompter, &config).unwrap();
        assert_eq!(url, "https://sso.anvil.dev/saml/acme/init?cli=true");
    }

    #[test]
    fn organization_is_prompted_when_unset() {
        let mut prompter = ScriptedPrompter::new(&["acme"], &[]);
        let url = resolve_sso_url(&mut prompter, &SsoConfig::default()).unwrap();
        assert_eq!(url, "https://sso.anvil.dev/saml/acme/init?cli=true");
    }

    #[tokio::test]
    async fn authorize_loops_on_two_factor_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/authorizations"))
            .and(header(TWO_FACTOR_HEADER, "654321"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "auth-1",
                "access_token": { "token": "OAUTH-T" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/authorizations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "id": "two_factor",
                "message": "code required"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::with_base_url(&server.uri()).unwrap();
        let mut prompter = ScriptedPrompter::new(&["654321"], &[]);

        let token = authorize(&api, &mut prompter, "u@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(token, "OAUTH-T");
    }
}
