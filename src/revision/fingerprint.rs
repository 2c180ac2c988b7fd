//! Content fingerprints for cache-busting filenames.
//!
//! A fingerprint is a pure function of content bytes only - never of path,
//! timestamp, or build order - so unchanged assets keep their filenames
//! across builds and changed assets force a browser re-fetch.

/// Hex characters kept from the content hash.
///
/// 32 bits of blake3 output. Distinct assets colliding is ~n²/2³³ for a
/// site with n assets - negligible at realistic asset counts, so
/// collisions are not detected.
pub const FINGERPRINT_LEN: usize = 8;

/// Compute the fingerprint token for content bytes.
///
/// Deterministic across runs and platforms; zero-length content
/// fingerprints like any other byte sequence.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(bytes: &T) -> String {
    let hash = blake3::hash(bytes.as_ref());
    hex::encode(&hash.as_bytes()[..FINGERPRINT_LEN / 2])
}

/// Splice a fingerprint token into a logical path.
///
/// Fixed naming convention, reproduced identically on every build:
/// `name.ext` -> `name-<token>.ext` (token before the final extension),
/// extensionless `name` -> `name-<token>`. Directory components are kept.
pub fn fingerprinted_path(logical: &str, token: &str) -> String {
    let (dir, file) = match logical.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, logical),
    };

    let renamed = match file.rsplit_once('.') {
        // Dotfile like `.htaccess` has no stem to splice into
        Some(("", _)) => format!("{file}-{token}"),
        Some((stem, ext)) => format!("{stem}-{token}.{ext}"),
        None => format!("{file}-{token}"),
    };

    match dir {
        Some(dir) => format!("{dir}/{renamed}"),
        None => renamed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint(b"body { color: red; }");
        let b = fingerprint(b"body { color: red; }");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_content_sensitive() {
        let a = fingerprint(b"body { color: red; }");
        let b = fingerprint(b"body { color: blue; }");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_empty_is_stable() {
        // Fixed vector: first 8 hex chars of blake3("")
        assert_eq!(fingerprint(b""), "af1349b9");
    }

    #[test]
    fn test_fingerprinted_path_preserves_extension() {
        assert_eq!(
            fingerprinted_path("css/site.css", "a1b2c3"),
            "css/site-a1b2c3.css"
        );
    }

    #[test]
    fn test_fingerprinted_path_nested() {
        assert_eq!(
            fingerprinted_path("img/icons/logo.svg", "deadbeef"),
            "img/icons/logo-deadbeef.svg"
        );
    }

    #[test]
    fn test_fingerprinted_path_no_extension() {
        assert_eq!(fingerprinted_path("fonts/README", "0011aabb"), "fonts/README-0011aabb");
    }

    #[test]
    fn test_fingerprinted_path_multiple_dots() {
        // Only the final extension is preserved after the token
        assert_eq!(
            fingerprinted_path("js/main.min.js", "cafef00d"),
            "js/main.min-cafef00d.js"
        );
    }

    #[test]
    fn test_fingerprinted_path_dotfile() {
        assert_eq!(fingerprinted_path(".htaccess", "12345678"), ".htaccess-12345678");
    }
}
