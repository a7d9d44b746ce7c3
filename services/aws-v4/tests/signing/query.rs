use super::sign_get;
use crate::{example_credential, example_time};
use awsauth_aws_v4::RequestSigner;
use std::time::Duration;

#[test]
fn test_query_signing_has_no_authorization() {
    let signer = RequestSigner::new().with_time(example_time());
    let req = sign_get(
        &signer,
        "https://bucket.s3.eu-west-1.amazonaws.com/key?versionId=1",
        &example_credential(),
        Some(Duration::from_secs(3600)),
    );

    assert!(req.headers().get(http::header::AUTHORIZATION).is_none());

    let url = req.uri().to_string();
    assert!(url.contains("versionId=1"), "{url}");
    assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"), "{url}");
    assert!(
        url.contains("X-Amz-Credential=AKIDEXAMPLE%2F20150830%2Feu-west-1%2Fs3%2Faws4_request"),
        "{url}"
    );
    assert!(url.contains("X-Amz-Date=20150830T123600Z"), "{url}");
    assert!(url.contains("X-Amz-Expires=3600"), "{url}");
    assert!(url.contains("X-Amz-SignedHeaders=host"), "{url}");
    assert!(url.contains("X-Amz-Content-Sha256=UNSIGNED-PAYLOAD"), "{url}");
    assert!(url.contains("&X-Amz-Signature="), "{url}");
}

#[test]
fn test_query_signing_non_s3() {
    let signer = RequestSigner::new().with_time(example_time());
    let req = sign_get(
        &signer,
        "https://sqs.us-east-1.amazonaws.com/?Action=ListQueues",
        &example_credential().with_session_token("token"),
        Some(Duration::from_secs(60)),
    );

    let url = req.uri().to_string();
    assert!(!url.contains("X-Amz-Content-Sha256"), "{url}");
    assert!(url.contains("X-Amz-Security-Token=token"), "{url}");
    assert!(url.contains("X-Amz-Expires=60"), "{url}");
}
