//! ID-token verification: compact JWS parsing, claim validation and
//! signature checks across the HS/RS/ES algorithm families.

use hmac::{Hmac, Mac};
use rsa::pkcs1v15;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Sha256, Sha384, Sha512};

use crate::helpers::{
    base64_url_decode, constant_time_eq, now, pad_be_bytes, parse_exponent, parse_modulus, EcCurve,
};
use crate::provider::Provider;
use crate::types::{Error, Jwk, JwkSet, Token};

#[derive(Debug, Deserialize)]
struct JwsHeader {
    alg: String,
    kid: Option<String>,
}

/// Verifies `token.id_token` against the provider's credentials and current
/// JWKS, populating `token.claims` on success.
///
/// `expected_nonce` is `None` on the refresh path, where the token is not
/// bound to a browser session and the nonce check does not apply.
pub(crate) fn verify_id_token(
    provider: &Provider,
    jwks: &JwkSet,
    token: &mut Token,
    expected_nonce: Option<&str>,
) -> Result<(), Error> {
    let segments: Vec<&str> = token.id_token.split('.').collect();
    if segments.len() != 3 {
        return Err(Error::InvalidToken(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let header_bytes = base64_url_decode(segments[0])?;
    let header: JwsHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| Error::InvalidToken(format!("invalid JWS header: {e}")))?;

    let payload = base64_url_decode(segments[1])
        .map_err(|_| Error::InvalidClaims("payload is not base64url".to_string()))?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload)
        .map_err(|_| Error::InvalidClaims("payload is not a JSON object".to_string()))?;

    if let Some(expected) = expected_nonce {
        validate_nonce(&claims, expected, provider.require_nonce())?;
    }
    validate_audience(&claims, provider.client_id())?;
    validate_temporal_claims(&claims)?;

    let signature = base64_url_decode(segments[2])?;
    let signing_input = format!("{}.{}", segments[0], segments[1]);

    verify_signature(
        &header,
        provider,
        jwks,
        signing_input.as_bytes(),
        &signature,
    )?;

    token.claims = claims;
    Ok(())
}

fn validate_nonce(
    claims: &Map<String, Value>,
    expected: &str,
    require_nonce: bool,
) -> Result<(), Error> {
    match claims.get("nonce") {
        Some(Value::String(actual)) => {
            if constant_time_eq(actual.as_bytes(), expected.as_bytes()) {
                Ok(())
            } else {
                Err(Error::InvalidNonce)
            }
        }
        Some(_) => Err(Error::InvalidNonce),
        // Some providers never echo the nonce; tolerating that is a
        // per-provider opt-in.
        None if require_nonce => Err(Error::InvalidNonce),
        None => Ok(()),
    }
}

fn validate_audience(claims: &Map<String, Value>, client_id: &str) -> Result<(), Error> {
    match claims.get("aud") {
        None => Ok(()),
        Some(Value::String(aud)) if aud == client_id => Ok(()),
        Some(Value::Array(list)) if list.iter().any(|v| v.as_str() == Some(client_id)) => Ok(()),
        Some(_) => Err(Error::InvalidAudience),
    }
}

/// Validates `exp`, `nbf` and `iat` when present. Each must be numeric.
fn validate_temporal_claims(claims: &Map<String, Value>) -> Result<(), Error> {
    let timestamp = now();

    let numeric = |name: &str| -> Result<Option<i64>, Error> {
        match claims.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::InvalidClaims(format!("{name} must be numeric"))),
        }
    };

    if let Some(exp) = numeric("exp")? {
        if timestamp >= exp {
            return Err(Error::InvalidClaims(format!(
                "token expired, now {timestamp}, exp {exp}"
            )));
        }
    }

    if let Some(nbf) = numeric("nbf")? {
        if nbf > timestamp {
            return Err(Error::InvalidClaims(format!(
                "token not active yet, now {timestamp}, nbf {nbf}"
            )));
        }
    }

    if let Some(iat) = numeric("iat")? {
        if iat > timestamp {
            return Err(Error::InvalidClaims(format!(
                "token issued in the future, now {timestamp}, iat {iat}"
            )));
        }
    }

    Ok(())
}

fn verify_signature(
    header: &JwsHeader,
    provider: &Provider,
    jwks: &JwkSet,
    input: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let alg = header.alg.as_str();

    if alg.starts_with("HS") {
        return verify_hmac(alg, provider.client_secret().as_bytes(), input, signature);
    }

    if alg.starts_with("RS") {
        let jwk = select_key(jwks, header.kid.as_deref(), alg, "RSA")?;
        return verify_rsa(alg, jwk, input, signature);
    }

    if alg.starts_with("ES") {
        let jwk = select_key(jwks, header.kid.as_deref(), alg, "EC")?;
        return verify_ecdsa(alg, jwk, input, signature);
    }

    Err(Error::UnsupportedAlgo(header.alg.clone()))
}

/// Picks the JWK whose `kid` matches the JWS header. Among several matches
/// the one also matching `alg` wins. The key type must fit the algorithm
/// family.
fn select_key<'a>(
    jwks: &'a JwkSet,
    kid: Option<&str>,
    alg: &str,
    kty: &str,
) -> Result<&'a Jwk, Error> {
    let kid = kid.filter(|k| !k.is_empty()).ok_or(Error::UnknownKey)?;

    let candidates: Vec<&Jwk> = jwks
        .keys
        .iter()
        .filter(|key| key.kid == kid && key.kty == kty)
        .collect();

    candidates
        .iter()
        .find(|key| key.alg.as_deref() == Some(alg))
        .or_else(|| candidates.first())
        .copied()
        .ok_or(Error::UnknownKey)
}

fn verify_hmac(alg: &str, secret: &[u8], input: &[u8], signature: &[u8]) -> Result<(), Error> {
    match alg {
        "HS256" => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(secret).map_err(|_| Error::UnknownKey)?;
            mac.update(input);
            mac.verify_slice(signature)
                .map_err(|_| Error::InvalidSignature)
        }
        "HS384" => {
            let mut mac =
                Hmac::<Sha384>::new_from_slice(secret).map_err(|_| Error::UnknownKey)?;
            mac.update(input);
            mac.verify_slice(signature)
                .map_err(|_| Error::InvalidSignature)
        }
        "HS512" => {
            let mut mac =
                Hmac::<Sha512>::new_from_slice(secret).map_err(|_| Error::UnknownKey)?;
            mac.update(input);
            mac.verify_slice(signature)
                .map_err(|_| Error::InvalidSignature)
        }
        _ => Err(Error::UnsupportedAlgo(alg.to_string())),
    }
}

fn verify_rsa(alg: &str, jwk: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), Error> {
    let n = parse_modulus(jwk.n.as_deref().ok_or(Error::UnknownKey)?)?;
    let e = parse_exponent(jwk.e.as_deref().ok_or(Error::UnknownKey)?)?;

    let key = RsaPublicKey::new(n, e).map_err(|_| Error::UnknownKey)?;
    let signature =
        pkcs1v15::Signature::try_from(signature).map_err(|_| Error::InvalidSignature)?;

    match alg {
        "RS256" => pkcs1v15::VerifyingKey::<Sha256>::new(key)
            .verify(input, &signature)
            .map_err(|_| Error::InvalidSignature),
        "RS384" => pkcs1v15::VerifyingKey::<Sha384>::new(key)
            .verify(input, &signature)
            .map_err(|_| Error::InvalidSignature),
        "RS512" => pkcs1v15::VerifyingKey::<Sha512>::new(key)
            .verify(input, &signature)
            .map_err(|_| Error::InvalidSignature),
        _ => Err(Error::UnsupportedAlgo(alg.to_string())),
    }
}

fn verify_ecdsa(alg: &str, jwk: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), Error> {
    let curve = EcCurve::from_crv(jwk.crv.as_deref().ok_or(Error::UnknownKey)?);

    let x = pad_be_bytes(
        base64_url_decode(jwk.x.as_deref().ok_or(Error::UnknownKey)?)
            .map_err(|_| Error::UnknownKey)?,
        curve.field_len(),
    );
    let y = pad_be_bytes(
        base64_url_decode(jwk.y.as_deref().ok_or(Error::UnknownKey)?)
            .map_err(|_| Error::UnknownKey)?,
        curve.field_len(),
    );

    if x.len() != curve.field_len() || y.len() != curve.field_len() {
        return Err(Error::UnknownKey);
    }

    // Each ES algorithm pairs with exactly one curve; anything else cannot
    // carry this signature. The P-224 fallback curve pairs with none.
    match (alg, curve) {
        ("ES256", EcCurve::P256) => {
            let point = p256::EncodedPoint::from_affine_coordinates(
                p256::FieldBytes::from_slice(&x),
                p256::FieldBytes::from_slice(&y),
                false,
            );
            let key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| Error::UnknownKey)?;
            let signature = p256::ecdsa::Signature::from_slice(signature)
                .map_err(|_| Error::InvalidSignature)?;
            key.verify(input, &signature)
                .map_err(|_| Error::InvalidSignature)
        }
        ("ES384", EcCurve::P384) => {
            let point = p384::EncodedPoint::from_affine_coordinates(
                p384::FieldBytes::from_slice(&x),
                p384::FieldBytes::from_slice(&y),
                false,
            );
            let key = p384::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| Error::UnknownKey)?;
            let signature = p384::ecdsa::Signature::from_slice(signature)
                .map_err(|_| Error::InvalidSignature)?;
            key.verify(input, &signature)
                .map_err(|_| Error::InvalidSignature)
        }
        ("ES512", EcCurve::P521) => {
            let point = p521::EncodedPoint::from_affine_coordinates(
                p521::FieldBytes::from_slice(&x),
                p521::FieldBytes::from_slice(&y),
                false,
            );
            let key = p521::ecdsa::VerifyingKey::from_encoded_point(&point)
                .map_err(|_| Error::UnknownKey)?;
            let signature = p521::ecdsa::Signature::from_slice(signature)
                .map_err(|_| Error::InvalidSignature)?;
            key.verify(input, &signature)
                .map_err(|_| Error::InvalidSignature)
        }
        ("ES256" | "ES384" | "ES512", _) => Err(Error::UnknownKey),
        _ => Err(Error::UnsupportedAlgo(alg.to_string())),
    }
}

#[cfg(test)]
#[path = "./tests/verifier_tests.rs"]
mod verifier_tests;
