use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signatures older than this are refused.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a `t=<unix>,v0=<hex hmac of "t.body">` header.
pub fn verify_signature(
    header: &str,
    secret: &str,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut provided = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v0", value)) => provided = Some(value),
            _ => {}
        }
    }
    let (Some(timestamp), Some(provided)) = (timestamp, provided) else {
        return Err(SignatureError::Malformed);
    };

    let within_tolerance = now
        .checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|skew| skew <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if !within_tolerance {
        return Err(SignatureError::Expired);
    }

    let expected = sign(secret, timestamp, body).ok_or(SignatureError::Mismatch)?;
    if ConstantTimeEq::ct_eq(expected.as_bytes(), provided.to_ascii_lowercase().as_bytes()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "wsec_test";

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"post_call_transcription"}"#;
        let header = format!("t=1700000000,v0={}", sign(SECRET, 1_700_000_000, body).unwrap());
        assert_eq!(verify_signature(&header, SECRET, body, 1_700_000_100), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = format!("t=1700000000,v0={}", sign(SECRET, 1_700_000_000, b"a").unwrap());
        assert_eq!(
            verify_signature(&header, SECRET, b"b", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_and_malformed() {
        let header = format!("t=1700000000,v0={}", sign(SECRET, 1_700_000_000, b"a").unwrap());
        assert_eq!(
            verify_signature(&header, SECRET, b"a", 1_700_000_000 + 3600),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_signature("v0=abc", SECRET, b"a", 0),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn extreme_timestamps_are_expired_not_overflowed() {
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v0=00", t);
            assert_eq!(
                verify_signature(&header, SECRET, b"a", 1_700_000_000),
                Err(SignatureError::Expired)
            );
        }
        assert_eq!(
            verify_signature("t=0,v0=00", SECRET, b"a", i64::MIN),
            Err(SignatureError::Expired)
        );
    }
}
