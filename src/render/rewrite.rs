//! Asset reference rewriting in rendered HTML.
//!
//! Every rooted `href`/`src` attribute that looks like an asset reference
//! is resolved through the [`AssetResolver`]. Page links (`/about/`),
//! external URLs, and references already under the static prefix pass
//! through untouched, so rewriting is idempotent.

use std::sync::LazyLock;

use regex::Regex;

use crate::revision::AssetResolver;

/// Rooted href/src attribute values in rendered HTML.
static ASSET_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(href|src)="(/[^"]*)""#).unwrap());

/// Rewrite rooted asset references through the resolver.
pub fn rewrite_asset_urls(html: &str, resolver: &AssetResolver) -> String {
    ASSET_ATTR
        .replace_all(html, |caps: &regex::Captures| {
            let attr = &caps[1];
            match rewrite_value(&caps[2], resolver) {
                Some(value) => format!("{attr}=\"{value}\""),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Rewrite one attribute value; `None` leaves the original in place.
fn rewrite_value(value: &str, resolver: &AssetResolver) -> Option<String> {
    // Protocol-relative URLs are external
    if value.starts_with("//") {
        return None;
    }

    let (path, suffix) = match value.find(['?', '#']) {
        Some(idx) => value.split_at(idx),
        None => (value, ""),
    };

    // Only rewrite asset-like references: the final segment carries an
    // extension. Page links (`/about/`, `/posts`) are left to routing.
    let logical = path.strip_prefix('/')?;
    let file = logical.rsplit('/').next().unwrap_or(logical);
    if !file.contains('.') {
        return None;
    }

    // Already-fingerprinted references are final (idempotent rewrite)
    if let Some(prefix) = resolver.static_prefix()
        && path.starts_with(&format!("{prefix}/"))
    {
        return None;
    }

    Some(format!("{}{}", resolver.resolve(logical), suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::Manifest;

    fn fingerprinted_resolver() -> AssetResolver {
        let manifest = Manifest::new();
        manifest.record("css/site.css", "css/site-a1b2c3d4.css").unwrap();
        manifest.record("js/main.js", "js/main-99887766.js").unwrap();
        AssetResolver::fingerprinted(manifest, "static")
    }

    #[test]
    fn test_rewrite_hits_manifest() {
        let html = "<link href=\"/css/site.css\"><script src=\"/js/main.js\"></script>";
        let out = rewrite_asset_urls(html, &fingerprinted_resolver());
        assert_eq!(
            out,
            "<link href=\"/static/css/site-a1b2c3d4.css\">\
             <script src=\"/static/js/main-99887766.js\"></script>"
        );
    }

    #[test]
    fn test_rewrite_preserves_query_suffix() {
        let html = "<link href=\"/css/site.css?v=old\">";
        let out = rewrite_asset_urls(html, &fingerprinted_resolver());
        assert_eq!(out, "<link href=\"/static/css/site-a1b2c3d4.css?v=old\">");
    }

    #[test]
    fn test_rewrite_skips_page_links_and_external() {
        let html = "<a href=\"/about/\">a</a><a href=\"//cdn.example.com/x.css\">b</a>\
                    <a href=\"https://example.com\">c</a>";
        let out = rewrite_asset_urls(html, &fingerprinted_resolver());
        assert_eq!(out, html);
    }

    #[test]
    fn test_rewrite_unrecorded_falls_back_to_logical() {
        let html = "<img src=\"/img/missing.png\">";
        let out = rewrite_asset_urls(html, &fingerprinted_resolver());
        assert_eq!(out, "<img src=\"/img/missing.png\">");
    }

    #[test]
    fn test_rewrite_idempotent() {
        let resolver = fingerprinted_resolver();
        let html = "<link href=\"/css/site.css\">";
        let once = rewrite_asset_urls(html, &resolver);
        let twice = rewrite_asset_urls(&once, &resolver);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_passthrough_is_identity() {
        let resolver = AssetResolver::passthrough();
        let html = "<link href=\"/css/site.css\"><img src=\"/img/logo.png?x=1\">";
        assert_eq!(rewrite_asset_urls(html, &resolver), html);
    }
}
