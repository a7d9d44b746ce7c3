use crate::{Error, Result};
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::mem;
use std::str::FromStr;

/// Signing context for request.
///
/// Built from `http::request::Parts`, mutated by a signer and applied back.
/// Query pairs are stored decoded until the signer encodes them.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as sent on the wire.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        let path = match paq.path() {
            "" => "/".to_string(),
            v => v.to_string(),
        };

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTPS),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path,
            query: paq.query().map(query_parse).unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Query pairs must have been encoded by the signer at this point.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if self.query.is_empty() {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + self.query.len() * 2);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        s.push('=');
                        s.push_str(v);
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Result<Cow<str>> {
        percent_decode_str(&self.path).decode_utf8().map_err(|e| {
            Error::request_invalid("request path is not valid utf-8")
                .with_source(e)
                .with_context(format!("path: {}", self.path))
        })
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Push a new query pair into query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Returns true if the query contains the given key.
    pub fn query_contains(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k == key)
    }

    /// Normalize header value: trim it and collapse inner runs of
    /// whitespace into a single space.
    pub fn header_value_normalize(v: &mut HeaderValue) -> Result<()> {
        let bs = v.as_bytes();
        let dirty = bs.starts_with(b" ")
            || bs.ends_with(b" ")
            || bs.contains(&b'\t')
            || bs.windows(2).any(|w| w == b"  ");
        if !dirty {
            return Ok(());
        }

        let mut normalized = Vec::with_capacity(bs.len());
        for word in bs
            .split(|b| b.is_ascii_whitespace())
            .filter(|w| !w.is_empty())
        {
            if !normalized.is_empty() {
                normalized.push(b' ');
            }
            normalized.extend_from_slice(word);
        }

        let sensitive = v.is_sensitive();
        *v = HeaderValue::from_bytes(&normalized)?;
        v.set_sensitive(sensitive);
        Ok(())
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }

    /// Convert sorted headers to string.
    ///
    /// ```shell
    /// [(a, b), (c, d)] => "a:b\nc:d"
    /// ```
    pub fn header_to_string(mut headers: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        // Sort via header name.
        headers.sort();

        for (idx, (k, v)) in headers.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            s.push_str(sep);
            s.push_str(&v);
        }

        s
    }
}

/// Split a raw query string into decoded pairs.
///
/// `+` is kept as is: only percent escapes are decoded.
fn query_parse(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|v| !v.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode_str(k).decode_utf8_lossy().into_owned(),
                percent_decode_str(v).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}
