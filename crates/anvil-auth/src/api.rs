//! HTTP client for the anvil platform API.
//!
//! Thin typed wrapper over the handful of endpoints the auth subsystem
//! consumes. The base URL is injectable so tests can point the client
//! at a local mock server.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.anvil.dev";

/// Hostname credential records for the API are keyed by.
pub const DEFAULT_API_HOST: &str = "api.anvil.dev";

/// Hostname credential records for the git transport are keyed by.
pub const DEFAULT_GIT_HOST: &str = "git.anvil.dev";

/// Header carrying a second-factor code.
pub const TWO_FACTOR_HEADER: &str = "Anvil-Two-Factor-Code";

/// Header carrying the account password for recovery-code regeneration.
pub const PASSWORD_HEADER: &str = "Anvil-Password";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Description attached to CLI-created authorizations.
const AUTHORIZATION_DESCRIPTION: &str = "anvil CLI login";

/// Authorization lifetime: 30 days, in seconds.
const AUTHORIZATION_EXPIRES_SECS: u64 = 60 * 60 * 24 * 30;

const AUTH_FAILED_MESSAGE: &str = "Authentication failed.\n\
    Email or password is not valid.\n\
    Check your credentials on https://dashboard.anvil.dev";

/// Account resource as returned by `GET /account`.
#[derive(Debug, Deserialize)]
pub struct Account {
    pub email: String,
    #[serde(default)]
    pub two_factor_authentication: bool,
}

/// Outcome of one password-grant submission.
#[derive(Debug)]
pub enum PasswordLogin {
    /// The server issued a session token.
    Authorized(String),
    /// The account has multi-factor auth enabled; resubmit with a code.
    SecondFactorRequired,
}

/// Outcome of one OAuth authorization submission.
#[derive(Debug)]
pub enum Authorization {
    Created(String),
    SecondFactorRequired,
}

/// API client. Clone is cheap: `reqwest::Client` is reference-counted
/// and shares its connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the production endpoint.
    pub fn new() -> AuthResult<Self> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Create a client against a custom base URL (used by tests).
    pub fn with_base_url(base_url: &str) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit the password grant, optionally with a second-factor code.
    ///
    /// Only 200 and 403 return to the caller as states of the login
    /// state machine; every other status is a terminal error.
    pub async fn password_login(
        &self,
        email: &str,
        password: &str,
        second_factor: Option<&str>,
    ) -> AuthResult<PasswordLogin> {
        let mut request = self
            .client
            .post(format!("{}/login", self.base_url))
            .form(&[("username", email), ("password", password)]);
        if let Some(code) = second_factor {
            request = request.header(TWO_FACTOR_HEADER, code);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, "Password login response");

        match status.as_u16() {
            200 => {
                #[derive(Deserialize)]
                struct LoginOk {
                    api_key: String,
                }
                let body: LoginOk = response.json().await?;
                Ok(PasswordLogin::Authorized(body.api_key))
            }
            403 => Ok(PasswordLogin::SecondFactorRequired),
            401 => {
                #[derive(Deserialize)]
                struct LoginErr {
                    error: String,
                }
                let body: LoginErr = response.json().await?;
                Err(AuthError::InvalidCredentials(body.error))
            }
            404 => Err(AuthError::InvalidCredentials(AUTH_FAILED_MESSAGE.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AuthError::UnexpectedStatus { status, body })
            }
        }
    }

    /// Fetch the account behind a token.
    ///
    /// Any non-200 means the token does not resolve to an account;
    /// callers decide whether that is "not logged in" or "token invalid".
    pub async fn account(&self, token: &str) -> AuthResult<Option<Account>> {
        let response = self
            .client
            .get(format!("{}/account", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "Account lookup rejected");
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }

    /// Disable two-factor authentication on the account.
    ///
    /// A non-200 response surfaces the server's message as the one
    /// recoverable error in the subsystem.
    pub async fn disable_two_factor(&self, token: &str, password: &str) -> AuthResult<()> {
        let response = self
            .client
            .patch(format!("{}/account", self.base_url))
            .bearer_auth(token)
            .json(&json!({
                "two_factor_authentication": "false",
                "password": password,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        #[derive(Deserialize)]
        struct Failure {
            #[serde(default)]
            message: String,
        }
        let message = response
            .json::<Failure>()
            .await
            .map(|f| f.message)
            .unwrap_or_else(|_| "two-factor update rejected".to_string());
        Err(AuthError::TwoFactor(message))
    }

    /// Generate a fresh set of recovery codes, replacing the old ones.
    pub async fn regenerate_recovery_codes(
        &self,
        token: &str,
        password: &str,
        second_factor: &str,
    ) -> AuthResult<Vec<String>> {
        let response = self
            .client
            .post(format!("{}/account/recovery-codes", self.base_url))
            .bearer_auth(token)
            .header(PASSWORD_HEADER, password)
            .header(TWO_FACTOR_HEADER, second_factor)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Create an OAuth authorization via basic auth.
    ///
    /// Reserved for the next API version; no CLI entry point invokes
    /// this yet. The password grant above is the load-bearing path.
    pub async fn create_authorization(
        &self,
        email: &str,
        password: &str,
        second_factor: Option<&str>,
    ) -> AuthResult<Authorization> {
        let mut request = self
            .client
            .post(format!("{}/oauth/authorizations", self.base_url))
            .basic_auth(email, Some(password))
            .json(&json!({
                "scope": ["global"],
                "description": AUTHORIZATION_DESCRIPTION,
                "expires_in": AUTHORIZATION_EXPIRES_SECS,
            }));
        if let Some(code) = second_factor {
            request = request.header(TWO_FACTOR_HEADER, code);
        }

        let response = request.send().await?;
        let status = response.status();

        #[derive(Debug, Default, Deserialize)]
        struct AccessToken {
            #[serde(default)]
            token: String,
        }
        #[derive(Debug, Default, Deserialize)]
        struct Doc {
            #[serde(default)]
            id: String,
            #[serde(default)]
            message: String,
            #[serde(default)]
            access_token: AccessToken,
        }

        let doc: Doc = response.json().await?;
        if doc.id == "two_factor" {
            return Ok(Authorization::SecondFactorRequired);
        }
        if status != StatusCode::CREATED {
            return Err(AuthError::InvalidCredentials(doc.message));
        }
        Ok(Authorization::Created(doc.access_token.token))
    }
}
