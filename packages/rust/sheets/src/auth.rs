//! Service-account OAuth: sign an RS256 JWT assertion and exchange it for an
//! access token at the key's token URI.

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};
use sheet2xml_shared::{Result, Sheet2XmlError};
use tracing::{debug, instrument};

use crate::credentials::ServiceAccountKey;
use crate::{ensure_success, network_error};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Google caps assertion lifetime at one hour.
const ASSERTION_LIFETIME_HOURS: i64 = 1;

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".into()
}

/// Build the signed JWT assertion for `key` requesting `scopes`, issued at `now`.
pub fn sign_assertion(
    key: &ServiceAccountKey,
    scopes: &[String],
    now: DateTime<Utc>,
) -> Result<String> {
    let header = JwtHeader {
        alg: "RS256",
        typ: "JWT",
        kid: key.private_key_id.as_deref(),
    };
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: scopes.join(" "),
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ASSERTION_LIFETIME_HOURS)).timestamp(),
    };

    let header_json = serde_json::to_string(&header)
        .map_err(|e| Sheet2XmlError::Auth(format!("failed to encode jwt header: {e}")))?;
    let claims_json = serde_json::to_string(&claims)
        .map_err(|e| Sheet2XmlError::Auth(format!("failed to encode jwt claims: {e}")))?;
    let signing_input = format!(
        "{}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(header_json),
        BASE64_URL_SAFE_NO_PAD.encode(claims_json)
    );

    let key_pair = parse_private_key(&key.private_key)?;
    let mut signature = vec![0; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            signing_input.as_bytes(),
            &mut signature,
        )
        .map_err(|_| Sheet2XmlError::Auth("failed to sign jwt assertion".into()))?;

    Ok(format!(
        "{signing_input}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(&signature)
    ))
}

/// Parse the first PKCS#8 or PKCS#1 RSA key in a PEM string.
fn parse_private_key(pem: &str) -> Result<RsaKeyPair> {
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    loop {
        let item = rustls_pemfile::read_one(&mut reader)
            .map_err(|e| Sheet2XmlError::Auth(format!("invalid PEM private key: {e}")))?;
        match item {
            Some(rustls_pemfile::Item::Pkcs8Key(der)) => {
                return RsaKeyPair::from_pkcs8(der.secret_pkcs8_der()).map_err(|e| {
                    Sheet2XmlError::Auth(format!("rejected pkcs8 private key: {e}"))
                });
            }
            Some(rustls_pemfile::Item::Pkcs1Key(der)) => {
                return RsaKeyPair::from_der(der.secret_pkcs1_der()).map_err(|e| {
                    Sheet2XmlError::Auth(format!("rejected pkcs1 private key: {e}"))
                });
            }
            Some(_) => continue,
            None => {
                return Err(Sheet2XmlError::Auth(
                    "no RSA private key found in service-account key".into(),
                ));
            }
        }
    }
}

/// Exchange a signed assertion for an access token.
#[instrument(skip_all, fields(client_email = %key.client_email))]
pub async fn fetch_access_token(
    client: &Client,
    key: &ServiceAccountKey,
    scopes: &[String],
) -> Result<AccessToken> {
    let assertion = sign_assertion(key, scopes, Utc::now())?;
    let url = &key.token_uri;

    let response = client
        .post(url)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| network_error(url, e))?;

    let response = ensure_success(response).await.map_err(|e| match e {
        Sheet2XmlError::Fetch {
            status, message, ..
        } => Sheet2XmlError::Auth(format!("token exchange rejected (HTTP {status}): {message}")),
        other => other,
    })?;

    let token: AccessToken = response
        .json()
        .await
        .map_err(|e| Sheet2XmlError::Auth(format!("malformed token response: {e}")))?;

    debug!(expires_in = token.expires_in, "obtained access token");
    Ok(token)
}
