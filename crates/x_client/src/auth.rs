//! OAuth 1.0a (HMAC-SHA1) request signing for the X API.
//!
//! Signature base string: `METHOD&enc(url)&enc(sorted params)`, keyed with
//! `enc(consumer_secret)&enc(token_secret)`. The `url` must NOT include
//! query parameters; JSON bodies are not part of the signature.

use std::fmt;

use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use common::config::SocialCredentials;
use common::Error;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is, everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const NONCE_LEN: usize = 32;

/// Holds the four user-context credentials.
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &"<redacted>")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, OAUTH_ENCODE_SET).to_string()
}

fn new_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

impl OAuth1Signer {
    pub fn new(creds: &SocialCredentials) -> Result<Self, Error> {
        if !creds.is_complete() {
            return Err(Error::Auth(
                "X credentials incomplete (api key, api key secret, access token, access token secret)"
                    .into(),
            ));
        }

        Ok(Self {
            consumer_key: creds.api_key.trim().to_string(),
            consumer_secret: creds.api_key_secret.trim().to_string(),
            access_token: creds.access_token.trim().to_string(),
            access_token_secret: creds.access_token_secret.trim().to_string(),
        })
    }

    /// Build the `Authorization` header value for a request.
    pub fn authorization_header(&self, method: &str, url: &str) -> Result<String, Error> {
        let timestamp = Utc::now().timestamp().to_string();
        self.header_with(method, url, &[], &timestamp, &new_nonce())
    }

    /// Deterministic variant; `extra_params` are query/form parameters that
    /// take part in the signature but not in the header.
    pub fn header_with(
        &self,
        method: &str,
        url: &str,
        extra_params: &[(&str, &str)],
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, Error> {
        let mut oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_token".into(), self.access_token.clone()),
            ("oauth_version".into(), "1.0".into()),
        ];

        let signature = self.signature(method, url, &oauth_params, extra_params)?;
        oauth_params.push(("oauth_signature".into(), signature));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {fields}"))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        oauth_params: &[(String, String)],
        extra_params: &[(&str, &str)],
    ) -> Result<String, Error> {
        // Strip query parameters.
        let base_url = url.split('?').next().unwrap_or(url);

        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (encode(k), encode(v)))
            .chain(extra_params.iter().map(|(k, v)| (encode(k), encode(v))))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(base_url),
            encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.access_token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .map_err(|e| Error::Auth(format!("Invalid signing key: {e}")))?;
        mac.update(base_string.as_bytes());

        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}
