//! Canonical request signing.
//!
//! Every authenticated request carries an `Authorization` header derived
//! from a fixed-format canonical string:
//!
//! ```text
//! METHOD \n content_md5 \n content_type \n http_date \n resource_path
//! ```
//!
//! Fields may be empty but the newline positions are fixed; reordering or
//! omitting one invalidates every signature. The canonical string is
//! HMAC-SHA256 signed with the secret key and base64url-encoded.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use md5::Md5;
use reqwest::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// Headers produced for a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// RFC 7231 HTTP-date the signature was computed over.
    pub date: String,
    /// `"{scheme} {entity_id}:{public_key}:{signature}"`.
    pub authorization: String,
    /// MD5 of the JSON body, present for non-GET requests with a body.
    pub content_md5: Option<String>,
}

/// Current wall-clock time in HTTP-date format.
pub fn http_date_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Sign one request. Pure: same inputs and date yield identical headers.
///
/// Malformed inputs (empty keys) are not rejected here; they produce a
/// signature the service will refuse, surfaced as a remote auth error.
pub fn sign_request(
    method: &Method,
    resource_path: &str,
    body: Option<&Value>,
    entity_id: &str,
    credentials: &Credentials,
    date: &str,
) -> SignedHeaders {
    let content_type = if *method == Method::POST || *method == Method::PUT {
        "application/json"
    } else {
        ""
    };

    let content_md5 = match body {
        Some(body) if *method != Method::GET && !is_empty_body(body) => {
            let serialized = body.to_string();
            let digest = Md5::digest(serialized.as_bytes());
            format!("{:x}", digest)
        }
        _ => String::new(),
    };

    let canonical = [
        method.as_str(),
        content_md5.as_str(),
        content_type,
        date,
        resource_path,
    ]
    .join("\n");

    let scheme = if credentials.is_public_only() {
        "FSP"
    } else {
        "FS"
    };

    let signature = hmac_signature(&canonical, &credentials.secret_key);

    SignedHeaders {
        date: date.to_string(),
        authorization: format!(
            "{} {}:{}:{}",
            scheme, entity_id, credentials.public_key, signature
        ),
        content_md5: if content_md5.is_empty() {
            None
        } else {
            Some(content_md5)
        },
    }
}

/// HMAC-SHA256 over the canonical string, base64url-encoded without padding.
fn hmac_signature(canonical: &str, secret_key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
