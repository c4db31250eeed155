use rsa::BigUint;

use super::*;

#[test]
fn base64_url_round_trips_arbitrary_bytes() {
    let samples: Vec<Vec<u8>> = vec![
        vec![],
        vec![0],
        vec![0xff],
        b"hello world".to_vec(),
        (0u8..=255).collect(),
    ];

    for bytes in samples {
        let encoded = base64_url_encode(&bytes);
        assert_eq!(bytes, base64_url_decode(&encoded).unwrap());
    }
}

#[test]
fn decode_accepts_unpadded_jwt_segments() {
    assert_eq!(b"hello".to_vec(), base64_url_decode("aGVsbG8").unwrap());
    assert!(base64_url_decode("!!!").is_err());
}

#[test]
fn random_tokens_draw_from_the_alphanumeric_pool() {
    let token = random_token(64);

    assert_eq!(64, token.len());
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(token, random_token(64));
}

#[test]
fn aqab_exponent_is_65537() {
    assert_eq!(BigUint::from(65537u32), parse_exponent("AQAB").unwrap());
}

#[test]
fn exponents_and_moduli_decode_big_endian() {
    assert_eq!(
        BigUint::from(3u32),
        parse_exponent(&base64_url_encode(&[3])).unwrap()
    );
    assert_eq!(
        BigUint::from(0x010203u32),
        parse_modulus(&base64_url_encode(&[1, 2, 3])).unwrap()
    );
}

#[test]
fn curve_selection_uses_the_crv_suffix() {
    assert_eq!(EcCurve::P256, EcCurve::from_crv("P-256"));
    assert_eq!(EcCurve::P384, EcCurve::from_crv("secp384r1"));
    assert_eq!(EcCurve::P521, EcCurve::from_crv("P-521"));
    assert_eq!(EcCurve::P224, EcCurve::from_crv("P-224"));
    assert_eq!(EcCurve::P224, EcCurve::from_crv("Ed25519"));
    assert_eq!(EcCurve::P224, EcCurve::from_crv(""));
}

#[test]
fn short_coordinates_are_left_padded() {
    assert_eq!(vec![0, 0, 1, 2], pad_be_bytes(vec![1, 2], 4));
    assert_eq!(vec![1, 2, 3], pad_be_bytes(vec![1, 2, 3], 2));
}

#[test]
fn escaping_composes_like_basic_auth_expects() {
    assert_eq!("a+b%2Bc", query_escape("a b+c"));
    assert_eq!("a%25b", path_escape("a%b"));
    // Plain client ids survive both escapes untouched.
    assert_eq!("plain-id_1.2", path_escape(&query_escape("plain-id_1.2")));
}
