//! Small shared utilities: URL-safe base64, random tokens, JWK parameter
//! decoding and escaping.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use rsa::BigUint;
use subtle::ConstantTimeEq;
use url::form_urlencoded;

use crate::types::Error;

const RANDOM_POOL: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Characters `path_escape` leaves alone: unreserved plus the sub-delims
/// allowed in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@')
    .remove(b'!')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// Unix timestamp in seconds.
pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Generates `len` characters drawn uniformly from `[A-Za-z0-9]` using the
/// thread-local CSPRNG.
pub fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..len)
        .map(|_| RANDOM_POOL[rng.gen_range(0..RANDOM_POOL.len())] as char)
        .collect()
}

/// Encodes bytes with the URL-safe base64 alphabet, no padding.
pub fn base64_url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes URL-safe base64, tolerating missing padding the way JWT segments
/// are shipped.
pub fn base64_url_decode(s: &str) -> Result<Vec<u8>, Error> {
    let mut padded = s.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    URL_SAFE
        .decode(padded)
        .map_err(|e| Error::InvalidToken(format!("base64url decode: {e}")))
}

/// Decodes a JWK `n`, `x` or `y` parameter into a big-endian unsigned
/// integer. Malformed parameters make the key unusable.
pub(crate) fn parse_modulus(s: &str) -> Result<BigUint, Error> {
    let bytes = base64_url_decode(s).map_err(|_| Error::UnknownKey)?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Decodes a JWK `e` parameter. The ubiquitous `AQAB` short-circuits to
/// 65537.
pub(crate) fn parse_exponent(s: &str) -> Result<BigUint, Error> {
    if s == "AQAB" {
        return Ok(BigUint::from(65537u32));
    }

    parse_modulus(s)
}

/// The elliptic curves a JWK `crv` value can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-224, the fallback for unrecognized curve names.
    P224,
    /// NIST P-256
    P256,
    /// NIST P-384
    P384,
    /// NIST P-521
    P521,
}

impl EcCurve {
    /// Selects the curve from the last three characters of `crv`
    /// (`P-256` and `secp256r1` both end in `256`).
    pub fn from_crv(crv: &str) -> Self {
        let suffix = if crv.len() >= 3 {
            &crv[crv.len() - 3..]
        } else {
            crv
        };

        match suffix {
            "256" => EcCurve::P256,
            "384" => EcCurve::P384,
            "521" => EcCurve::P521,
            _ => EcCurve::P224,
        }
    }

    /// Byte width of a field element on this curve.
    pub(crate) fn field_len(self) -> usize {
        match self {
            EcCurve::P224 => 28,
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }
}

/// Form-urlencodes a single value (space becomes `+`).
pub(crate) fn query_escape(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Percent-escapes a value for use inside a path segment.
pub(crate) fn path_escape(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// Left-pads a big-endian integer to `len` bytes. Coordinates shorter than
/// the field width lose their leading zero bytes in base64url form.
pub(crate) fn pad_be_bytes(bytes: Vec<u8>, len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes;
    }

    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend(bytes);
    padded
}

/// Constant-time equality for nonce comparison.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
#[path = "./tests/helpers_tests.rs"]
mod helpers_tests;
