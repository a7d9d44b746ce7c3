use super::{authorization, sign_get};
use crate::{example_credential, example_time};
use awsauth_aws_v4::{RequestSigner, SigningKeyCache};
use awsauth_core::hash::RingHash;
use awsauth_core::{Context, SignRequest};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use regex::Regex;
use std::sync::Arc;

const URL: &str = "https://dynamodb.us-east-1.amazonaws.com/tables/a";

#[test]
fn test_signing_is_deterministic() {
    let signer = RequestSigner::new().with_time(example_time());
    let cred = example_credential();

    let first = sign_get(&signer, URL, &cred, None);
    let second = sign_get(&signer, URL, &cred, None);
    assert_eq!(authorization(&first), authorization(&second));
}

#[test]
fn test_different_path_different_signature() {
    let signer = RequestSigner::new().with_time(example_time());
    let cred = example_credential();

    let a = sign_get(&signer, URL, &cred, None);
    let b = sign_get(
        &signer,
        "https://dynamodb.us-east-1.amazonaws.com/tables/b",
        &cred,
        None,
    );
    assert_ne!(authorization(&a), authorization(&b));
}

#[test]
fn test_signed_headers_shape() {
    let req = sign_get(&RequestSigner::new(), URL, &example_credential(), None);

    let auth = authorization(&req);
    assert!(auth.starts_with("AWS4-HMAC-SHA256 "), "{auth}");
    assert!(auth.contains("Credential=AKIDEXAMPLE/"), "{auth}");
    assert!(auth.contains("/us-east-1/dynamodb/aws4_request"), "{auth}");
    assert!(auth.contains("SignedHeaders="), "{auth}");
    assert!(auth.contains("Signature="), "{auth}");

    let date = req.headers()["x-amz-date"].to_str().unwrap();
    let re = Regex::new(r"^\d{8}T\d{6}Z$").unwrap();
    assert!(re.is_match(date), "{date}");

    assert!(!req.uri().to_string().contains("X-Amz-Signature"));
}

#[test]
fn test_session_token_is_signed() {
    let signer = RequestSigner::new().with_time(example_time());
    let cred = example_credential().with_session_token("session-token");

    let req = sign_get(&signer, URL, &cred, None);
    assert_eq!(req.headers()["x-amz-security-token"], "session-token");
    assert!(authorization(&req).contains("x-amz-security-token"));
}

#[test]
fn test_cold_and_warm_cache_agree() {
    let cache = Arc::new(SigningKeyCache::new());
    let signer = RequestSigner::new()
        .with_time(example_time())
        .with_key_cache(cache.clone());
    let cred = example_credential();

    let cold = sign_get(&signer, URL, &cred, None);
    assert_eq!(cache.len(), 1);
    let warm = sign_get(&signer, URL, &cred, None);
    assert_eq!(cache.len(), 1);
    assert_eq!(authorization(&cold), authorization(&warm));

    cache.clear();
    let again = sign_get(&signer, URL, &cred, None);
    assert_eq!(authorization(&cold), authorization(&again));
}

#[test]
fn test_cache_evicts_first_inserted() {
    let cache = SigningKeyCache::new();
    let capacity = cache.capacity();
    let date = |i: usize| format!("{:08}", 20240000 + i);
    for i in 0..=capacity {
        cache.insert("secret", &date(i), "r", "s", [0; 32]);
    }

    assert_eq!(cache.len(), capacity);
    assert!(cache.get("secret", &date(0), "r", "s").is_none());
    assert!(cache.get("secret", &date(1), "r", "s").is_some());
    assert!(cache.get("secret", &date(capacity), "r", "s").is_some());
}

#[tokio::test]
async fn test_sync_and_async_paths_agree() -> anyhow::Result<()> {
    let cred = example_credential();
    let rust_crypto = RequestSigner::new().with_time(example_time());
    let ring = RequestSigner::new()
        .with_time(example_time())
        .with_hash(RingHash);

    let expected = authorization(&sign_get(&rust_crypto, URL, &cred, None));
    assert_eq!(expected, authorization(&sign_get(&ring, URL, &cred, None)));

    for signer in [rust_crypto, ring] {
        let mut req = http::Request::get(URL).body(Bytes::new())?;
        signer
            .sign_request(&Context::new(), &mut req, &cred, None)
            .await?;
        assert_eq!(expected, authorization(&req));
    }
    Ok(())
}

#[test]
fn test_non_s3_path_is_encoded_twice() {
    let signer = RequestSigner::new()
        .with_service("execute-api")
        .with_region("us-east-1")
        .with_time(example_time());
    let cred = example_credential();

    let req = sign_get(
        &signer,
        "https://abc.execute-api.us-east-1.amazonaws.com/documents%20and%20settings/",
        &cred,
        None,
    );
    assert_eq!(
        authorization(&req),
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/execute-api/aws4_request, SignedHeaders=host;x-amz-date, Signature=5b87698c1897fb3902def7bbb3d639abf4fba848991d265fa941f81b40192e46"
    );
    assert_eq!(req.uri().path(), "/documents%20and%20settings/");

    let signer = RequestSigner::new()
        .with_service("service")
        .with_region("us-east-1")
        .with_time(example_time());
    let req = sign_get(&signer, "https://example.amazonaws.com/a(b)*c!", &cred, None);
    assert!(
        authorization(&req).ends_with(
            "Signature=c3f633c4ba81fa6d60aeefa484544dd94394d3366e1cc2767ace0b8bf5f1c92f"
        ),
        "{}",
        authorization(&req)
    );
}

#[test]
fn test_s3_key_is_encoded_once() {
    let signer = RequestSigner::new()
        .with_service("s3")
        .with_region("us-east-1")
        .with_time(example_time());

    let req = sign_get(
        &signer,
        "https://examplebucket.s3.amazonaws.com/my%20photo.jpg",
        &example_credential(),
        None,
    );
    assert_eq!(
        authorization(&req),
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/s3/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature=4c5677b5b727ead5ef794761d6088256a6ad622b6a4cc4900492f8b7e4455e60"
    );
}
