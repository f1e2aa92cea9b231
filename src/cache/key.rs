//! Cache key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

use super::CACHE_PREFIX;

/// Generate a deterministic cache key from endpoint and parameters.
///
/// The key is `repopress_<endpoint>_<hash>` where the hash covers the
/// scope (usually `owner/repo`, lowercased) and the sorted parameters, so
/// every key this crate writes shares [`CACHE_PREFIX`].
pub fn cache_key(endpoint: &str, scope: Option<&str>, params: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(endpoint.as_bytes());
    hasher.update(b"|");

    if let Some(scope) = scope {
        hasher.update(scope.to_lowercase().as_bytes());
    }
    hasher.update(b"|");

    // Sort params for deterministic keys
    let mut sorted_params: Vec<_> = params.iter().collect();
    sorted_params.sort_by_key(|(k, _)| *k);

    for (k, v) in sorted_params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{}{}_{:x}", CACHE_PREFIX, endpoint, hasher.finalize())
}

/// Short, non-reversible fingerprint of an access token.
///
/// The token changes rate limits and repository visibility, so it is part of
/// any cache signature whose result depends on it. Empty when no token.
pub fn token_fingerprint(token: Option<&str>) -> String {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            let digest = Sha256::digest(token.as_bytes());
            format!("{:x}", digest)[..12].to_string()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_deterministic() {
        let key1 = cache_key(
            "search",
            None,
            &[("q", "seo topic:wordpress-plugin"), ("page", "1")],
        );
        let key2 = cache_key(
            "search",
            None,
            &[("page", "1"), ("q", "seo topic:wordpress-plugin")],
        );

        assert_eq!(key1, key2);
        assert!(key1.starts_with("repopress_search_"));
    }

    #[test]
    fn test_cache_key_different_endpoints() {
        let key1 = cache_key("repo", Some("acme/widget"), &[]);
        let key2 = cache_key("readme_html", Some("acme/widget"), &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_scope_is_case_insensitive() {
        let key1 = cache_key("repo", Some("Acme/Widget"), &[]);
        let key2 = cache_key("repo", Some("acme/widget"), &[]);

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_scopes() {
        let key1 = cache_key("repo", Some("acme/widget"), &[]);
        let key2 = cache_key("repo", Some("acme/gadget"), &[]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_token_fingerprint() {
        assert_eq!(token_fingerprint(None), "");
        assert_eq!(token_fingerprint(Some("")), "");

        let fp = token_fingerprint(Some("ghp_abc"));
        assert_eq!(fp.len(), 12);
        assert!(!fp.contains("ghp_abc"));
        assert_ne!(fp, token_fingerprint(Some("ghp_def")));
    }
}
