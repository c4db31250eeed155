//! Shared fixtures: josekit-minted tokens and JWKS documents.

use josekit::jwk::alg::ec::EcCurve as JoseEcCurve;
use josekit::jwk::Jwk;
use josekit::jws::JwsHeader;
use josekit::jwt::{self, JwtPayload};
use serde_json::{json, Value};

use crate::helpers::now;

pub const CLIENT_ID: &str = "identifier";
pub const CLIENT_SECRET: &str = "larger_than_32_char_client_secret";

pub fn rsa_jwk(kid: &str) -> Jwk {
    let mut jwk = Jwk::generate_rsa_key(2048).unwrap();
    jwk.set_algorithm("RS256");
    jwk.set_key_id(kid);
    jwk
}

pub fn ec_jwk(kid: &str) -> Jwk {
    let mut jwk = Jwk::generate_ec_key(JoseEcCurve::P256).unwrap();
    jwk.set_algorithm("ES256");
    jwk.set_key_id(kid);
    jwk
}

/// Serializes the public halves of `keys` as a JWKS document.
pub fn public_jwks_json(keys: &[&Jwk]) -> String {
    let public: Vec<Value> = keys
        .iter()
        .map(|key| {
            let mut public_key = key.to_public_key().unwrap();
            if let Some(kid) = key.key_id() {
                public_key.set_key_id(kid);
            }
            if let Some(alg) = key.algorithm() {
                public_key.set_algorithm(alg);
            }
            serde_json::to_value(&public_key).unwrap()
        })
        .collect();

    json!({ "keys": public }).to_string()
}

/// A fresh, valid claim set for `https://op.example.com` tokens.
pub fn standard_claims(nonce: Option<&str>) -> Vec<(String, Value)> {
    let iat = now();

    let mut claims = vec![
        ("iss".to_string(), json!("https://op.example.com")),
        ("sub".to_string(), json!("user-1")),
        ("aud".to_string(), json!(CLIENT_ID)),
        ("exp".to_string(), json!(iat + 3600)),
        ("iat".to_string(), json!(iat)),
    ];

    if let Some(nonce) = nonce {
        claims.push(("nonce".to_string(), json!(nonce)));
    }

    claims
}

/// Mints a compact JWS over `claims`. HS256 signs with [`CLIENT_SECRET`];
/// RS256/ES256 sign with the given private JWK.
pub fn sign_token(
    alg: &str,
    key: Option<&Jwk>,
    kid: Option<&str>,
    claims: &[(String, Value)],
) -> String {
    let mut header = JwsHeader::new();
    header.set_claim("alg", Some(json!(alg))).unwrap();
    if let Some(kid) = kid {
        header.set_claim("kid", Some(json!(kid))).unwrap();
    }

    let mut payload = JwtPayload::new();
    for (name, value) in claims {
        payload.set_claim(name, Some(value.clone())).unwrap();
    }

    match alg {
        "HS256" => {
            let signer = josekit::jws::HS256.signer_from_bytes(CLIENT_SECRET).unwrap();
            jwt::encode_with_signer(&payload, &header, &signer).unwrap()
        }
        "RS256" => {
            let signer = josekit::jws::RS256.signer_from_jwk(key.unwrap()).unwrap();
            jwt::encode_with_signer(&payload, &header, &signer).unwrap()
        }
        "ES256" => {
            let signer = josekit::jws::ES256.signer_from_jwk(key.unwrap()).unwrap();
            jwt::encode_with_signer(&payload, &header, &signer).unwrap()
        }
        other => panic!("no test signer for {other}"),
    }
}
