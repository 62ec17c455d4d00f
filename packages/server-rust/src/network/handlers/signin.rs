//! Browser-facing pages of the editor's native-app sign-in flow.
//!
//! The editor opens `/native_app_signin` in a browser with a local callback
//! port and its PKCS#1 public key. The server seals an access token for that
//! key (RSA-OAEP, SHA-256) and redirects the browser back to the editor's
//! loopback listener, which later presents `"<user_id> <token>"` on
//! `/handle-rpc`.

use axum::extract::Query;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::rand_core::OsRng;
use rsa::{Oaep, RsaPublicKey};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info};

/// Identity handed to every signed-in editor.
pub const SIGNIN_USER_ID: u64 = 1;

/// Plaintext sealed into the access token. The RPC upgrade does not verify it.
pub const SIGNIN_ACCESS_TOKEN: &str = "a";

/// URL-safe base64 that encodes with padding and decodes either way.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const SIGNIN_SUCCEEDED_PAGE: &str = r#"<html>
  <body style="background-color: #1e1e2e; color: #ffffff; text-align: center; display: flex; justify-content: center; align-items: center">
    <p>You should now be signed into Zed. You can close this tab.</p>
  </body>
</html>"#;

#[derive(Debug, Error)]
pub enum SigninError {
    #[error("missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid native_app_port: {0}")]
    InvalidPort(String),

    #[error("public key is not URL-safe base64: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    #[error("public key is not a PKCS#1 RSA key: {0}")]
    KeyFormat(#[from] rsa::pkcs1::Error),

    #[error("token encryption failed: {0}")]
    Encrypt(#[from] rsa::Error),
}

impl IntoResponse for SigninError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            SigninError::Encrypt(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            _ => (StatusCode::BAD_REQUEST, "Bad Request"),
        };
        let body = serde_json::json!({
            "error": error,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SigninQuery {
    native_app_port: Option<String>,
    native_app_public_key: Option<String>,
}

/// Encrypts [`SIGNIN_ACCESS_TOKEN`] for the editor's public key.
///
/// `public_key` is the URL-safe base64 of a PKCS#1 DER `RSAPublicKey`; the
/// result is URL-safe base64 with padding.
///
/// # Errors
///
/// Returns [`SigninError`] if the key cannot be decoded or parsed, or if
/// encryption fails.
pub fn encrypt_access_token(public_key: &str) -> Result<String, SigninError> {
    let der = URL_SAFE_LENIENT.decode(public_key.trim())?;
    let key = RsaPublicKey::from_pkcs1_der(&der)?;
    let sealed = key.encrypt(
        &mut OsRng,
        Oaep::new::<Sha256>(),
        SIGNIN_ACCESS_TOKEN.as_bytes(),
    )?;
    Ok(URL_SAFE_LENIENT.encode(sealed))
}

/// Where the browser is sent back to: the editor's loopback listener.
#[must_use]
pub fn callback_location(port: u16, access_token: &str) -> String {
    format!(
        "http://127.0.0.1:{port}/native_app_signin?user_id={SIGNIN_USER_ID}&access_token={access_token}"
    )
}

/// `GET /native_app_signin?native_app_port=&native_app_public_key=`
///
/// # Errors
///
/// Rejects with [`SigninError`] on missing or malformed parameters.
pub async fn native_app_signin_handler(
    Query(query): Query<SigninQuery>,
) -> Result<Response, SigninError> {
    let port = query
        .native_app_port
        .as_deref()
        .ok_or(SigninError::MissingParameter("native_app_port"))?;
    let port: u16 = port
        .parse()
        .map_err(|_| SigninError::InvalidPort(port.to_string()))?;
    let public_key = query
        .native_app_public_key
        .as_deref()
        .ok_or(SigninError::MissingParameter("native_app_public_key"))?;

    let token = encrypt_access_token(public_key).inspect_err(|e| {
        debug!(error = %e, "rejecting native app sign-in");
    })?;
    info!(port, user_id = SIGNIN_USER_ID, "native app signed in");
    Ok((StatusCode::FOUND, [(LOCATION, callback_location(port, &token))]).into_response())
}

/// `GET /native_app_signin_succeeded`
pub async fn native_app_signin_succeeded_handler() -> Html<&'static str> {
    Html(SIGNIN_SUCCEEDED_PAGE)
}

/// `GET /favicon.ico`: empty body so browsers stop asking.
pub async fn favicon_handler() -> Response {
    (StatusCode::OK, [(CONTENT_TYPE, "text/plain")], "").into_response()
}
