use super::*;
use crate::helpers::base64_url_encode;
use crate::types::WellKnown;

#[test]
fn scope_always_contains_openid_as_a_member() {
    let scope = |s: &str| Provider::new("t", "https://op.example.com").with_scope(s);

    assert_eq!("email profile openid", scope("email profile").scope());
    assert_eq!("openid email", scope("openid email").scope());
    // Substring matches do not count.
    assert_eq!("openid2 email openid", scope("openid2 email").scope());
    assert_eq!("openid", scope("").scope());
    assert_eq!("openid", Provider::new("t", "https://op.example.com").scope());
}

#[test]
fn empty_credentials_are_rejected() {
    let provider = Provider::new("t", "https://op.example.com");
    assert_eq!(
        Err(Error::Credentials),
        provider.with_credential("", "secret").map(|_| ())
    );

    let provider = Provider::new("t", "https://op.example.com");
    assert_eq!(
        Err(Error::Credentials),
        provider.with_credential("id", "").map(|_| ())
    );
}

#[test]
fn presets_are_independent_values() {
    let one = Provider::google().with_credential("id-one", "secret").unwrap();
    let two = Provider::google().with_credential("id-two", "secret").unwrap();

    assert_eq!("id-one", one.client_id());
    assert_eq!("id-two", two.client_id());
    assert_eq!("google", one.name());
    assert!(one.scope().split_whitespace().any(|s| s == "openid"));
}

#[test]
fn facebook_preset_ships_a_metadata_stub() {
    let facebook = Provider::facebook();

    assert!(facebook.discovered());
    assert!(facebook.skip_discovery());
    assert!(facebook.endpoint(Endpoint::Token).is_ok());
    assert!(facebook.endpoint(Endpoint::Auth).is_ok());
}

#[test]
fn auth_basic_header_encodes_the_escaped_pair() {
    let provider = Provider::new("t", "https://op.example.com")
        .with_credential("foo", "bar")
        .unwrap();

    assert_eq!(
        format!("Basic {}", base64_url_encode(b"foo:bar")),
        provider.auth_basic_header()
    );

    // The query escape runs first, the path escape then re-escapes '%'.
    let provider = Provider::new("t", "https://op.example.com")
        .with_credential("a b", "c&d")
        .unwrap();

    assert_eq!(
        format!("Basic {}", base64_url_encode(b"a+b:c%2526d")),
        provider.auth_basic_header()
    );
}

#[test]
fn endpoints_resolve_by_action_with_matching_error_kinds() {
    let provider = Provider::new("t", "https://op.example.com");

    assert!(matches!(
        provider.well_known(),
        Err(Error::Discovery(_))
    ));

    provider.apply_snapshot(WellKnown {
        issuer: "https://op.example.com".to_string(),
        authorization_endpoint: Some("https://op.example.com/auth".to_string()),
        token_endpoint: Some("https://op.example.com/token".to_string()),
        ..WellKnown::default()
    });

    assert_eq!(
        "https://op.example.com/token",
        provider.endpoint(Endpoint::Token).unwrap()
    );
    assert_eq!(
        Err(Error::RevocationUnsupported),
        provider.endpoint(Endpoint::Revoke)
    );
    assert!(matches!(
        provider.endpoint(Endpoint::SignOut),
        Err(Error::InvalidSignOutRedirect(_))
    ));
    assert!(!provider.can_revoke());
    assert!(!provider.can_sign_out());
}

#[test]
fn response_type_override_switches_the_flow_kind() {
    let provider = Provider::new("t", "https://op.example.com");
    assert!(provider.is_code_flow());

    let provider = provider.with_response_type("id_token token");
    assert!(!provider.is_code_flow());

    let hybrid =
        Provider::new("t", "https://op.example.com").with_response_type("code id_token");
    assert!(hybrid.is_code_flow());
}
