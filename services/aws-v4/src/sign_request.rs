use crate::constants::*;
use crate::detect::{detect_with_headers, ServiceRegion};
use crate::key_cache::SigningKeyCache;
use crate::Credential;
use async_trait::async_trait;
use awsauth_core::hash::{RustCryptoHash, SigningHash};
use awsauth_core::time::{format_date, format_iso8601, now, DateTime};
use awsauth_core::{Context, Error, Result, SignRequest, SigningRequest};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Uri};
use log::debug;
use percent_encoding::utf8_percent_encode;
use std::fmt::Write;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

/// Query parameters owned by query signing, replaced on every signing.
const PRESIGN_QUERY_KEYS: [&str; 8] = [
    X_AMZ_ALGORITHM_QUERY,
    X_AMZ_CREDENTIAL_QUERY,
    X_AMZ_DATE_QUERY,
    X_AMZ_EXPIRES_QUERY,
    X_AMZ_SIGNED_HEADERS_QUERY,
    X_AMZ_SECURITY_TOKEN_QUERY,
    X_AMZ_CONTENT_SHA_256_QUERY,
    X_AMZ_SIGNATURE_QUERY,
];

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// Service and region are detected from the request url when they are not
/// set. Signing keys are shared through a [`SigningKeyCache`]; clones of a
/// signer share the same cache.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: Option<String>,
    region: Option<String>,
    time: Option<DateTime>,

    key_cache: Arc<SigningKeyCache>,
    hash: Arc<dyn SigningHash>,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestSigner {
    /// Create a new signer that detects service and region from the url.
    pub fn new() -> Self {
        Self {
            service: None,
            region: None,
            time: None,
            key_cache: Arc::new(SigningKeyCache::new()),
            hash: Arc::new(RustCryptoHash),
        }
    }

    /// Set the service to sign for.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the region to sign for.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Share a signing key cache with other signers.
    pub fn with_key_cache(mut self, key_cache: Arc<SigningKeyCache>) -> Self {
        self.key_cache = key_cache;
        self
    }

    /// Use another hash backend, e.g. [`awsauth_core::hash::RingHash`].
    pub fn with_hash(mut self, hash: impl SigningHash) -> Self {
        self.hash = Arc::new(hash);
        self
    }

    /// The signing key cache used by this signer.
    pub fn key_cache(&self) -> &Arc<SigningKeyCache> {
        &self.key_cache
    }

    /// Resolve service and region for this request.
    pub fn resolve_scope(&self, uri: &Uri, headers: &HeaderMap) -> Result<ServiceRegion> {
        let service = self.service.clone().filter(|v| !v.is_empty());
        let region = self.region.clone().filter(|v| !v.is_empty());
        let detected = match (&service, &region) {
            (Some(_), Some(_)) => ServiceRegion::default(),
            _ => detect_with_headers(uri, headers),
        };

        let service = service
            .or_else(|| Some(detected.service).filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                Error::service_undetectable("service is not set and can't be detected from url")
                    .with_context(format!("uri: {uri}"))
            })?;
        let region = region
            .or_else(|| Some(detected.region).filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                Error::region_undetectable("region is not set and can't be detected from url")
                    .with_context(format!("uri: {uri}"))
                    .with_context(format!("service: {service}"))
            })?;

        Ok(ServiceRegion { service, region })
    }

    /// Sign the request in place.
    ///
    /// With `expires_in` the signature is carried by the query string and no
    /// `authorization` header is added.
    pub fn sign(
        &self,
        req: &mut http::Request<Bytes>,
        cred: &Credential,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let now = self.time.unwrap_or_else(now);
        let scope = self.resolve_scope(req.uri(), req.headers())?;

        let (mut parts, body) = mem::replace(req, http::Request::new(Bytes::new())).into_parts();
        let result = self.sign_parts(&mut parts, &body, cred, expires_in, now, &scope);
        *req = http::Request::from_parts(parts, body);
        result
    }

    fn sign_parts(
        &self,
        parts: &mut http::request::Parts,
        body: &Bytes,
        cred: &Credential,
        expires_in: Option<Duration>,
        now: DateTime,
        scope: &ServiceRegion,
    ) -> Result<()> {
        let mut signed_req = SigningRequest::build(parts)?;
        let is_s3 = scope.service == "s3";

        // Scope: "20220313/<region>/<service>/aws4_request"
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            scope.region,
            scope.service
        );
        debug!("calculated scope: {credential_scope}");

        let (canonical_headers, signed_headers, payload_hash) = match expires_in {
            Some(expires_in) => {
                let payload_hash = if is_s3 {
                    UNSIGNED_PAYLOAD.to_string()
                } else {
                    self.hash.hex_sha256(body)
                };
                canonicalize_presign_query(
                    &mut signed_req,
                    cred,
                    &credential_scope,
                    expires_in,
                    now,
                    is_s3,
                );

                let host = signed_req.authority.as_str().to_string();
                (format!("host:{host}\n"), "host".to_string(), payload_hash)
            }
            None => {
                canonicalize_header(&mut signed_req, body, cred, now, is_s3, &*self.hash)?;

                let payload_hash = match signed_req.headers.get(X_AMZ_CONTENT_SHA_256) {
                    Some(v) => v.to_str()?.to_string(),
                    None => self.hash.hex_sha256(body),
                };
                let (canonical_headers, signed_headers) = canonical_headers(&signed_req)?;
                (canonical_headers, signed_headers, payload_hash)
            }
        };
        canonicalize_query(&mut signed_req);

        // build canonical request and string to sign.
        let creq = canonical_request_string(
            &signed_req,
            is_s3,
            &canonical_headers,
            &signed_headers,
            &payload_hash,
        )?;
        debug!("calculated canonical request: {creq}");
        let encoded_req = self.hash.hex_sha256(creq.as_bytes());

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{ALGORITHM}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{credential_scope}")?;
            write!(f, "{encoded_req}")?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = self.key_cache.get_or_derive(
            &*self.hash,
            &cred.secret_access_key,
            &format_date(now),
            &scope.region,
            &scope.service,
        );
        let signature = self
            .hash
            .hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        if expires_in.is_some() {
            signed_req.query_push(X_AMZ_SIGNATURE_QUERY, signature);
        } else {
            let mut authorization = HeaderValue::from_str(&format!(
                "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
                cred.access_key_id,
            ))?;
            authorization.set_sensitive(true);

            signed_req
                .headers
                .insert(header::AUTHORIZATION, authorization);
        }

        // Apply to the request.
        signed_req.apply(parts)
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut http::Request<Bytes>,
        credential: &Self::Credential,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        self.sign(req, credential, expires_in)
    }
}

fn canonical_request_string(
    ctx: &SigningRequest,
    is_s3: bool,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)?;
    // Insert encoded path. S3 encodes the decoded path once, every other
    // service encodes the path as sent, so `%20` becomes `%2520`.
    if is_s3 {
        let path = ctx.path_percent_decoded()?;
        writeln!(f, "{}", utf8_percent_encode(&path, &AWS_URI_ENCODE_SET))?;
    } else {
        writeln!(f, "{}", utf8_percent_encode(&ctx.path, &AWS_URI_ENCODE_SET))?;
    }
    // Insert query, already encoded and sorted.
    writeln!(
        f,
        "{}",
        ctx.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    writeln!(f, "{canonical_headers}")?;
    writeln!(f, "{signed_headers}")?;
    write!(f, "{payload_hash}")?;

    Ok(f)
}

/// Returns the canonical headers block (each line ending with `\n`) and the
/// signed header list.
fn canonical_headers(ctx: &SigningRequest) -> Result<(String, String)> {
    let names = ctx.header_name_to_vec_sorted();
    let mut headers = Vec::with_capacity(names.len());
    for name in names.iter() {
        let values = ctx
            .headers
            .get_all(*name)
            .iter()
            .map(|v| v.to_str())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        headers.push((name.to_string(), values.join(",")));
    }

    let mut canonical = SigningRequest::header_to_string(headers, ":", "\n");
    canonical.push('\n');
    Ok((canonical, names.join(";")))
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    body: &Bytes,
    cred: &Credential,
    now: DateTime,
    is_s3: bool,
    hash: &dyn SigningHash,
) -> Result<()> {
    // A previous signature must not be signed again.
    ctx.headers.remove(header::AUTHORIZATION);

    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)?;
    }

    // Insert HOST header if not present.
    if !ctx.headers.contains_key(header::HOST) {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // The date header always follows the signing time.
    ctx.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to valid leaking.
        value.set_sensitive(true);

        ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    if !body.is_empty() && !ctx.headers.contains_key(header::CONTENT_TYPE) {
        ctx.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(DEFAULT_JSON_CONTENT_TYPE),
        );
    }

    if is_s3 && !ctx.headers.contains_key(X_AMZ_CONTENT_SHA_256) {
        ctx.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::try_from(hash.hex_sha256(body))?,
        );
    }

    Ok(())
}

fn canonicalize_presign_query(
    ctx: &mut SigningRequest,
    cred: &Credential,
    credential_scope: &str,
    expires_in: Duration,
    now: DateTime,
    is_s3: bool,
) {
    ctx.query
        .retain(|(k, _)| !PRESIGN_QUERY_KEYS.contains(&k.as_str()));

    ctx.query_push(X_AMZ_ALGORITHM_QUERY, ALGORITHM);
    ctx.query_push(
        X_AMZ_CREDENTIAL_QUERY,
        format!("{}/{credential_scope}", cred.access_key_id),
    );
    ctx.query_push(X_AMZ_DATE_QUERY, format_iso8601(now));
    ctx.query_push(X_AMZ_EXPIRES_QUERY, expires_in.as_secs().to_string());
    ctx.query_push(X_AMZ_SIGNED_HEADERS_QUERY, "host");

    if let Some(token) = &cred.session_token {
        ctx.query_push(X_AMZ_SECURITY_TOKEN_QUERY, token);
    }
    if is_s3 {
        ctx.query_push(X_AMZ_CONTENT_SHA_256_QUERY, UNSIGNED_PAYLOAD);
    }
}

/// Encode every query pair, then sort them by key and value.
fn canonicalize_query(ctx: &mut SigningRequest) {
    if ctx.query.is_empty() {
        return;
    }

    let mut query = mem::take(&mut ctx.query)
        .into_iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(&v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    query.sort();

    ctx.query = query;
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsauth_core::hash::RingHash;
    use awsauth_core::ErrorKind;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const ACCESS_KEY: &str = "AKIDEXAMPLE";
    const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    fn test_cred() -> Credential {
        Credential::new(ACCESS_KEY, SECRET_KEY)
    }

    fn signer() -> RequestSigner {
        RequestSigner::new()
            .with_service("service")
            .with_region("us-east-1")
            .with_time(test_time())
    }

    fn request(method: &str, uri: &str, body: &'static str) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    fn authorization(req: &http::Request<Bytes>) -> &str {
        req.headers()[header::AUTHORIZATION].to_str().unwrap()
    }

    #[test]
    fn test_get_vanilla() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut req = request("GET", "https://example.amazonaws.com/", "");
        signer().sign(&mut req, &test_cred(), None)?;

        assert_eq!(
            authorization(&req),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(req.headers()[X_AMZ_DATE], "20150830T123600Z");
        assert!(req.headers()[header::AUTHORIZATION].is_sensitive());
        Ok(())
    }

    #[test]
    fn test_get_vanilla_query_order() -> Result<()> {
        let mut req = request(
            "GET",
            "https://example.amazonaws.com/?Param2=value2&Param1=value1",
            "",
        );
        signer().sign(&mut req, &test_cred(), None)?;

        assert_eq!(
            authorization(&req),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=b97d918cfa904a5beff61c982a1b6f458b799221646efd99d3219ec94cdf2500"
        );
        assert_eq!(req.uri().query(), Some("Param1=value1&Param2=value2"));
        Ok(())
    }

    #[test]
    fn test_query_plus_is_sent_encoded() -> Result<()> {
        let mut req = request("GET", "https://example.amazonaws.com/?q=a+b", "");
        signer().sign(&mut req, &test_cred(), None)?;

        assert_eq!(req.uri().query(), Some("q=a%2Bb"));
        assert!(authorization(&req).ends_with(
            "Signature=e6944a72739df54de065943a2df52b1b1fa41d9c64bfe314bdc6d9730bbcfb13"
        ));

        // `%2B` on input signs the same way, `%20` does not.
        let mut req = request("GET", "https://example.amazonaws.com/?q=a%2Bb", "");
        signer().sign(&mut req, &test_cred(), None)?;
        assert!(authorization(&req).ends_with(
            "Signature=e6944a72739df54de065943a2df52b1b1fa41d9c64bfe314bdc6d9730bbcfb13"
        ));
        let mut req = request("GET", "https://example.amazonaws.com/?q=a%20b", "");
        signer().sign(&mut req, &test_cred(), None)?;
        assert_eq!(req.uri().query(), Some("q=a%20b"));
        assert!(authorization(&req).ends_with(
            "Signature=87ff43fc767921116dce7f8d6f2b33a53470d1f0784a931ee9319fdc2d81e9e2"
        ));
        Ok(())
    }

    #[test]
    fn test_header_value_is_trimmed() -> Result<()> {
        let mut spaced = request("GET", "https://example.amazonaws.com/", "");
        spaced
            .headers_mut()
            .insert("my-header1", HeaderValue::from_static("  value1   with  spaces "));
        signer().sign(&mut spaced, &test_cred(), None)?;

        let mut plain = request("GET", "https://example.amazonaws.com/", "");
        plain
            .headers_mut()
            .insert("my-header1", HeaderValue::from_static("value1 with spaces"));
        signer().sign(&mut plain, &test_cred(), None)?;

        assert_eq!(authorization(&spaced), authorization(&plain));
        assert!(authorization(&plain).contains("SignedHeaders=host;my-header1;x-amz-date,"));
        Ok(())
    }

    #[test]
    fn test_default_content_type() -> Result<()> {
        let mut req = request("POST", "https://example.amazonaws.com/", "{}");
        signer().sign(&mut req, &test_cred(), None)?;
        assert_eq!(req.headers()[header::CONTENT_TYPE], DEFAULT_JSON_CONTENT_TYPE);
        assert!(authorization(&req).contains("SignedHeaders=content-type;host;x-amz-date,"));

        let mut req = request("POST", "https://example.amazonaws.com/", "a=b");
        req.headers_mut().insert(
            "Content-Type",
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        signer().sign(&mut req, &test_cred(), None)?;
        assert_eq!(
            req.headers()[header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );

        let mut req = request("GET", "https://example.amazonaws.com/", "");
        signer().sign(&mut req, &test_cred(), None)?;
        assert!(req.headers().get(header::CONTENT_TYPE).is_none());
        Ok(())
    }

    #[test]
    fn test_s3_payload_hash_header() -> Result<()> {
        let signer = RequestSigner::new().with_time(test_time());

        let mut req = request("PUT", "https://s3.us-west-2.amazonaws.com/bucket/key", "hello");
        signer.sign(&mut req, &test_cred(), None)?;
        assert_eq!(
            req.headers()[X_AMZ_CONTENT_SHA_256],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(authorization(&req)
            .contains("/20150830/us-west-2/s3/aws4_request, SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date,"));

        let mut req = request("PUT", "https://s3.us-west-2.amazonaws.com/bucket/key", "hello");
        req.headers_mut()
            .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_static(UNSIGNED_PAYLOAD));
        signer.sign(&mut req, &test_cred(), None)?;
        assert_eq!(req.headers()[X_AMZ_CONTENT_SHA_256], UNSIGNED_PAYLOAD);
        Ok(())
    }

    #[test]
    fn test_session_token_header() -> Result<()> {
        let cred = test_cred().with_session_token("session-token");
        let mut req = request("GET", "https://example.amazonaws.com/", "");
        signer().sign(&mut req, &cred, None)?;

        assert_eq!(req.headers()[X_AMZ_SECURITY_TOKEN], "session-token");
        assert!(req.headers()[X_AMZ_SECURITY_TOKEN].is_sensitive());
        assert!(authorization(&req).contains("SignedHeaders=host;x-amz-date;x-amz-security-token,"));
        Ok(())
    }

    #[test]
    fn test_query_signing() -> Result<()> {
        let cred = test_cred().with_session_token("token/with+chars");
        let signer = RequestSigner::new().with_time(test_time());

        let mut req = request("GET", "https://bucket.s3.eu-west-1.amazonaws.com/a%20b.txt?versionId=1", "");
        signer.sign(&mut req, &cred, Some(Duration::from_secs(3600)))?;

        assert!(req.headers().get(header::AUTHORIZATION).is_none());
        let query = req.uri().query().unwrap();
        for expected in [
            "X-Amz-Algorithm=AWS4-HMAC-SHA256",
            "X-Amz-Credential=AKIDEXAMPLE%2F20150830%2Feu-west-1%2Fs3%2Faws4_request",
            "X-Amz-Date=20150830T123600Z",
            "X-Amz-Expires=3600",
            "X-Amz-SignedHeaders=host",
            "X-Amz-Security-Token=token%2Fwith%2Bchars",
            "X-Amz-Content-Sha256=UNSIGNED-PAYLOAD",
            "versionId=1",
        ] {
            assert!(query.contains(expected), "{expected} not in {query}");
        }
        assert!(query.contains("&X-Amz-Signature="));
        Ok(())
    }

    #[test]
    fn test_query_signing_replaces_previous_signature() -> Result<()> {
        let signer = signer();

        let mut req = request("GET", "https://example.amazonaws.com/", "");
        signer.sign(&mut req, &test_cred(), Some(Duration::from_secs(60)))?;
        let first = req.uri().to_string();

        signer.sign(&mut req, &test_cred(), Some(Duration::from_secs(60)))?;
        assert_eq!(req.uri().to_string(), first);
        assert_eq!(first.matches("X-Amz-Signature").count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_hash_backends_are_byte_identical() -> Result<()> {
        let native = signer();
        let platform = signer().with_hash(RingHash);

        let mut a = request("POST", "https://example.amazonaws.com/path?x=1", "payload");
        native.sign(&mut a, &test_cred(), None)?;

        let mut b = request("POST", "https://example.amazonaws.com/path?x=1", "payload");
        platform
            .sign_request(&Context::new(), &mut b, &test_cred(), None)
            .await?;

        assert_eq!(authorization(&a), authorization(&b));
        Ok(())
    }

    #[test]
    fn test_scope_errors() {
        let mut req = request("GET", "https://example.com/", "");
        let err = RequestSigner::new()
            .sign(&mut req, &test_cred(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUndetectable);
        assert_eq!(req.uri(), "https://example.com/");

        let err = RequestSigner::new()
            .with_service("execute-api")
            .sign(&mut req, &test_cred(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegionUndetectable);
    }
}
