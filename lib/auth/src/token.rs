//! Bearer token decoding.
//!
//! Tokens are JWT-shaped: `base64url(header).base64url(payload).signature`.
//! Only the payload is read. The signature is NOT verified on the client;
//! the backend remains the only authority on whether a token is genuine.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Role claim key emitted by ASP.NET Identity.
pub const LEGACY_ROLE_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Short role claim key.
pub const SHORT_ROLE_CLAIM: &str = "role";

const LEGACY_SUBJECT_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
const LEGACY_EMAIL_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";

/// Role claim keys, in lookup order.
const ROLE_CLAIM_KEYS: [&str; 2] = [LEGACY_ROLE_CLAIM, SHORT_ROLE_CLAIM];

/// Standard alphabet, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried in a token payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Wraps an already-parsed claim map.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the raw value of a claim.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the role names carried by the token.
    ///
    /// The legacy URI key is consulted first; the short `role` key is used
    /// when the legacy key is absent or yields nothing. A single string is
    /// treated as a one-element sequence. Never fails: an unusable or missing
    /// claim yields an empty list.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        ROLE_CLAIM_KEYS
            .iter()
            .map(|key| string_list(self.0.get(*key)))
            .find(|roles| !roles.is_empty())
            .unwrap_or_default()
    }

    /// Returns the subject (user id) claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.string_claim(&["sub", LEGACY_SUBJECT_CLAIM])
    }

    /// Returns the email claim.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.string_claim(&["email", LEGACY_EMAIL_CLAIM])
    }

    /// Returns the expiry instant from the `exp` claim, if present.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.0.get("exp")?;
        let secs = exp
            .as_i64()
            .or_else(|| exp.as_f64().map(|f| f as i64))
            .or_else(|| exp.as_str().and_then(|s| s.parse().ok()))?;
        DateTime::from_timestamp(secs, 0)
    }

    /// Returns true if the token carries an `exp` claim in the past.
    ///
    /// Tokens without an `exp` claim are never considered expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    fn string_claim(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.0.get(*key).and_then(Value::as_str))
            .find(|value| !value.is_empty())
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Decodes the payload segment of a bearer token into claims.
///
/// # Errors
///
/// Returns a `DecodeError` naming the step that failed: segment count,
/// base64, UTF-8 or JSON.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::MalformedToken {
            segments: segments.len(),
        });
    }

    // Accept both alphabets: url-safe characters are mapped onto the standard ones.
    let payload: String = segments[1]
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .map_err(|e| DecodeError::InvalidBase64 {
            reason: e.to_string(),
        })?;

    let text = String::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
        reason: e.to_string(),
    })?;

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(Claims(map)),
        Ok(_) => Err(DecodeError::NotAnObject),
        Err(e) => Err(DecodeError::InvalidJson {
            reason: e.to_string(),
        }),
    }
}

/// Decodes a token and returns its roles.
///
/// Decode failures are logged and treated as "no claims".
#[must_use]
pub fn roles_of(token: &str) -> Vec<String> {
    match decode(token) {
        Ok(claims) => claims.roles(),
        Err(error) => {
            tracing::warn!(%error, "failed to decode bearer token");
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::Value;

    /// Builds an unsigned token around the given payload.
    pub fn token_with(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.signature")
    }
}
