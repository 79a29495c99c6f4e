//! OAuth2 service account flow: a signed JWT is exchanged for an access token.
use crate::error::{Error, Result};
use crate::http::{Body, Request, Transport};
use crate::retry::RetryPolicy;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use url::Url;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

/// The fields of a service account JSON key this tool needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Escapes raw control characters found inside string literals. Keys pasted into CI
/// secrets often keep real line breaks in `private_key`.
fn escape_control_characters(contents: &str) -> String {
    let mut escaped = String::with_capacity(contents.len());
    let mut in_string = false;
    let mut after_backslash = false;
    for c in contents.chars() {
        if in_string {
            if after_backslash {
                after_backslash = false;
            } else if c == '\\' {
                after_backslash = true;
            } else if c == '"' {
                in_string = false;
            } else if c < ' ' {
                match c {
                    '\n' => escaped.push_str("\\n"),
                    '\r' => escaped.push_str("\\r"),
                    '\t' => escaped.push_str("\\t"),
                    other => escaped.push_str(&format!("\\u{:04x}", other as u32)),
                }
                continue;
            }
        } else if c == '"' {
            in_string = true;
        }
        escaped.push(c);
    }
    escaped
}

impl ServiceAccountKey {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(&escape_control_characters(contents))
            .map_err(|e| Error::Configuration(format!("invalid Google key file: {}", e)))
    }

    pub fn claims(&self, issued_at: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: SPREADSHEETS_SCOPE.to_owned(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }

    /// RS256 signed JWT asserting the service account identity.
    pub fn assertion(&self, issued_at: i64) -> Result<String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &self.claims(issued_at),
            &key,
        )?)
    }

    pub fn access_token(&self, transport: &dyn Transport, retry: &RetryPolicy) -> Result<String> {
        let url = Url::parse(&self.token_uri)
            .map_err(|e| Error::Configuration(format!("invalid token URI {}: {}", self.token_uri, e)))?;
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let request = Request::post(
            url,
            Body::Form(vec![
                ("grant_type".to_owned(), JWT_BEARER_GRANT.to_owned()),
                ("assertion".to_owned(), assertion),
            ]),
        );
        debug!("Requesting access token for {}", self.client_email);
        let response = retry
            .run(|| transport.send(&request)?.error_for_status(&request.url))
            .map_err(|err| {
                if matches!(err.status(), Some(400) | Some(401)) {
                    error!("The token request was rejected, check the service account key passed as google-key-file.");
                }
                err
            })?;
        let token: TokenResponse = response.json("access token response")?;
        Ok(token.access_token)
    }
}
