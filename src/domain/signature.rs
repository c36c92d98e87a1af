//! Webhook signature verification.
//!
//! The provider signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex hmac>`, where the HMAC-SHA256 covers
//! `"<t>.<raw body>"` under the shared signing secret.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "mux-signature";
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("invalid signing key")]
    Key,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("no matching signature")]
    Mismatch,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn verify(&self, header: &str, body: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(header, body, Utc::now().timestamp())
    }

    pub fn verify_at(&self, header: &str, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?)
                }
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
        if candidates.is_empty() {
            return Err(SignatureError::Malformed);
        }
        // `t` is attacker-controlled; an age that does not fit is expired.
        let age = now
            .checked_sub(timestamp)
            .map(i64::unsigned_abs)
            .ok_or(SignatureError::Expired)?;
        if age > self.tolerance_secs.max(0) as u64 {
            return Err(SignatureError::Expired);
        }

        let mac = self.mac(timestamp, body)?;
        let matched = candidates
            .into_iter()
            .filter_map(|candidate| hex::decode(candidate).ok())
            .any(|signature| mac.clone().verify_slice(&signature).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Header value the provider would send for `body` at `timestamp`.
    pub fn sign(&self, body: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let signature = self.mac(timestamp, body)?.finalize().into_bytes();
        Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Key)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}
