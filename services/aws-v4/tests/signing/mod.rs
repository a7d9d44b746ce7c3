mod header;
mod query;

use awsauth_aws_v4::{Credential, RequestSigner};
use bytes::Bytes;
use http::Request;
use std::time::Duration;

/// Sign a GET request on `url` and return it.
pub fn sign_get(
    signer: &RequestSigner,
    url: &str,
    cred: &Credential,
    expires_in: Option<Duration>,
) -> Request<Bytes> {
    let mut req = Request::get(url)
        .body(Bytes::new())
        .expect("request must be valid");
    signer
        .sign(&mut req, cred, expires_in)
        .expect("sign must succeed");
    req
}

pub fn authorization(req: &Request<Bytes>) -> String {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .expect("authorization must be set")
        .to_str()
        .expect("authorization must be ascii")
        .to_string()
}
