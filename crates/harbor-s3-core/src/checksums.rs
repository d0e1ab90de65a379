//! Content hashing for parts and assembled objects.
//!
//! - [`compute_md5`]: hex MD5 of a part body.
//! - [`compute_multipart_etag`]: the aggregate hash of a multipart object.
//! - [`OffsetMd5`]: a running MD5 fed by offset-addressed writes.
//! - [`content_md5_matches`]: `Content-MD5` header verification.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use digest::Digest;

/// Compute the hex-encoded MD5 digest of `data`.
///
/// # Examples
///
/// ```
/// use harbor_s3_core::checksums::compute_md5;
///
/// assert_eq!(compute_md5(b"hello"), "5d41402abc4b2a76b9719d911017c592");
/// ```
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    hex::encode(md5::Md5::digest(data))
}

/// Compute the aggregate hash of a multipart object.
///
/// The MD5 of the concatenated raw digests of each part, formatted as the
/// quoted string `"<hex>-<part_count>"`. Entries are unquoted hex MD5s in
/// ascending part-number order; entries that are not valid hex contribute
/// nothing.
///
/// # Examples
///
/// ```
/// use harbor_s3_core::checksums::compute_multipart_etag;
///
/// let etag = compute_multipart_etag(&["5d41402abc4b2a76b9719d911017c592"]);
/// assert!(etag.ends_with("-1\""));
/// ```
#[must_use]
pub fn compute_multipart_etag(part_md5_hexes: &[impl AsRef<str>]) -> String {
    let mut hasher = md5::Md5::new();
    for hex_str in part_md5_hexes {
        if let Ok(raw) = hex::decode(hex_str.as_ref().trim_matches('"')) {
            hasher.update(&raw);
        }
    }
    format!(
        "\"{}-{}\"",
        hex::encode(hasher.finalize()),
        part_md5_hexes.len()
    )
}

/// Whether a base64 `Content-MD5` header value matches `data`.
///
/// Values that are not valid base64 never match.
#[must_use]
pub fn content_md5_matches(header: &str, data: &[u8]) -> bool {
    BASE64_STANDARD
        .decode(header.trim())
        .is_ok_and(|expected| expected.as_slice() == md5::Md5::digest(data).as_slice())
}

/// Running MD5 over a payload written at explicit offsets.
///
/// Writes must arrive contiguously; a write that does not start where the
/// previous one ended is rejected and leaves the digest unchanged.
#[derive(Clone, Default)]
pub struct OffsetMd5 {
    hasher: md5::Md5,
    position: u64,
}

impl std::fmt::Debug for OffsetMd5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetMd5")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl OffsetMd5 {
    /// Start an empty digest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed `data` written at `offset`. Returns `false` if the write is not contiguous.
    pub fn update(&mut self, offset: u64, data: &[u8]) -> bool {
        if offset != self.position {
            return false;
        }
        self.hasher.update(data);
        self.position += data.len() as u64;
        true
    }

    /// Bytes hashed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Hex digest of everything fed so far.
    #[must_use]
    pub fn hex_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_compute_md5_empty() {
        assert_eq!(compute_md5(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_should_hash_concatenated_raw_digests_for_shared_part_digest() {
        let d = compute_md5(b"same part body");
        let raw = hex::decode(&d).unwrap();
        let mut both = raw.clone();
        both.extend_from_slice(&raw);
        let expected = format!("\"{}-2\"", compute_md5(&both));

        assert_eq!(compute_multipart_etag(&[d.clone(), d]), expected);
    }

    #[test]
    fn test_should_ignore_quotes_around_part_hashes() {
        let d = compute_md5(b"x");
        assert_eq!(
            compute_multipart_etag(&[format!("\"{d}\"")]),
            compute_multipart_etag(&[d])
        );
    }

    #[test]
    fn test_should_match_whole_payload_digest_across_offsets() {
        let mut running = OffsetMd5::new();
        assert!(running.update(0, b"hello "));
        assert!(running.update(6, b"world"));
        assert_eq!(running.position(), 11);
        assert_eq!(running.hex_digest(), compute_md5(b"hello world"));
    }

    #[test]
    fn test_should_reject_non_contiguous_write() {
        let mut running = OffsetMd5::new();
        assert!(running.update(0, b"abc"));
        assert!(!running.update(10, b"def"));
        assert_eq!(running.hex_digest(), compute_md5(b"abc"));
    }

    #[test]
    fn test_should_verify_content_md5_header() {
        let header = BASE64_STANDARD.encode(md5::Md5::digest(b"payload"));
        assert!(content_md5_matches(&header, b"payload"));
        assert!(!content_md5_matches(&header, b"other"));
        assert!(!content_md5_matches("not base64!", b"payload"));
    }
}
