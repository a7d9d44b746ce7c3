// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Hash related utils.
//!
//! Signing only ever needs two primitives: SHA-256 and HMAC-SHA256. They are
//! exposed through [`SigningHash`] so that the backend can be chosen when a
//! signer is constructed:
//!
//! - [`RustCryptoHash`]: pure rust implementation from `sha2` and `hmac`.
//! - [`RingHash`]: implementation backed by `ring`.
//!
//! Both backends produce identical output for identical input.

use hmac::Hmac;
use hmac::Mac;
use sha2::Digest;
use sha2::Sha256;
use std::fmt::Debug;

/// Hashing capability used by signers.
pub trait SigningHash: Debug + Send + Sync + 'static {
    /// SHA256 digest of content.
    fn sha256(&self, content: &[u8]) -> [u8; 32];

    /// HMAC-SHA256 of content with key.
    fn hmac_sha256(&self, key: &[u8], content: &[u8]) -> [u8; 32];

    /// Hex encoded SHA256 digest of content.
    fn hex_sha256(&self, content: &[u8]) -> String {
        hex::encode(self.sha256(content))
    }

    /// Hex encoded HMAC-SHA256 of content with key.
    fn hex_hmac_sha256(&self, key: &[u8], content: &[u8]) -> String {
        hex::encode(self.hmac_sha256(key, content))
    }
}

/// SigningHash implemented with the RustCrypto `sha2` and `hmac` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoHash;

impl SigningHash for RustCryptoHash {
    fn sha256(&self, content: &[u8]) -> [u8; 32] {
        Sha256::digest(content).into()
    }

    fn hmac_sha256(&self, key: &[u8], content: &[u8]) -> [u8; 32] {
        hmac_sha256(key, content)
    }
}

/// SigningHash implemented with `ring`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingHash;

impl SigningHash for RingHash {
    fn sha256(&self, content: &[u8]) -> [u8; 32] {
        let digest = ring::digest::digest(&ring::digest::SHA256, content);
        let mut out = [0u8; 32];
        out.copy_from_slice(digest.as_ref());
        out
    }

    fn hmac_sha256(&self, key: &[u8], content: &[u8]) -> [u8; 32] {
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key);
        let tag = ring::hmac::sign(&key, content);
        let mut out = [0u8; 32];
        out.copy_from_slice(tag.as_ref());
        out
    }
}

/// Hex encoded SHA256 hash.
///
/// Use this function instead of `hex::encode(sha256(content))` can reduce
/// extra copy.
pub fn hex_sha256(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content).as_slice())
}

/// HMAC with SHA256 hash.
pub fn hmac_sha256(key: &[u8], content: &[u8]) -> [u8; 32] {
    // SAFETY: HMAC's new_from_slice always returns Ok - it handles any key length
    let mut h = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts keys of any length");
    h.update(content);

    h.finalize().into_bytes().into()
}

/// Hex encoded HMAC with SHA256 hash.
///
/// Use this function instead of `hex::encode(hmac_sha256(key, content))` can
/// reduce extra copy.
pub fn hex_hmac_sha256(key: &[u8], content: &[u8]) -> String {
    hex::encode(hmac_sha256(key, content))
}
