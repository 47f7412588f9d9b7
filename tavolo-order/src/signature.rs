use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use tavolo_core::payment::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signature timestamp before the event is rejected.
pub const TOLERANCE_SECS: i64 = 300;

/// Verify a `t=<unix>,v1=<hex>` signature header against the raw request
/// body. The MAC covers `"{t}.{body}"`, so verification is byte-exact:
/// re-serializing the body in any way invalidates it.
pub fn verify(secret: &str, payload: &[u8], header: &str) -> Result<(), SignatureError> {
    verify_at(secret, payload, header, Utc::now().timestamp())
}

pub fn verify_at(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let parsed = parse_header(header)?;

    if (now - parsed.timestamp).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let expected = compute(secret, parsed.timestamp, payload);
    let provided = hex::decode(&parsed.v1).map_err(|_| SignatureError::Malformed)?;

    if constant_time_eq::constant_time_eq(&expected, &provided) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Produce a signature header for a payload. Used by test harnesses and the
/// mock gateway to emit events the verifier accepts.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(compute(secret, timestamp, payload))
    )
}

fn compute(secret: &str, timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

struct ParsedHeader {
    timestamp: i64,
    v1: String,
}

fn parse_header(header: &str) -> Result<ParsedHeader, SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut v1: Option<String> = None;

    for part in header.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or(SignatureError::Malformed)?;
        match key.trim() {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
            }
            "v1" => {
                v1 = Some(value.to_string());
            }
            // Gateways may include additional scheme versions; ignore them.
            _ => {}
        }
    }

    Ok(ParsedHeader {
        timestamp: timestamp.ok_or(SignatureError::Malformed)?,
        v1: v1.ok_or(SignatureError::Malformed)?,
    })
}
