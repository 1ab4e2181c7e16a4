// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Host of the canonical detail pages.
pub const CANONICAL_HOST: &str = "www.primevideo.com";

/// Query parameter carrying the embedded destination.
const DESTINATION_PARAM: &str = "ru";

/// Marker preceding the item identifier inside the destination.
const TOKEN_MARKER: &str = "gti=";

/// Derive the canonical detail link from a listing redirect URL.
///
/// Returns `None` if the redirect has no `ru` destination or the destination
/// carries no `gti=` token.
///
/// # Examples
/// ```
/// use release_watch::utils::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://x/?ru=https%3A%2F%2Fprime%2F%3Fgti%3DABC123%26x%3D1"),
///     Some("https://www.primevideo.com/detail/ABC123/".to_string())
/// );
/// assert_eq!(canonicalize("https://x/?foo=bar"), None);
/// ```
pub fn canonicalize(redirect_url: &str) -> Option<String> {
    canonicalize_with_host(redirect_url, CANONICAL_HOST)
}

/// Same as [`canonicalize`], building the link on a custom host.
pub fn canonicalize_with_host(redirect_url: &str, host: &str) -> Option<String> {
    let token = extract_item_token(redirect_url)?;
    Some(format!("https://{host}/detail/{token}/"))
}

/// Pull the identifier token out of the redirect's embedded destination.
pub fn extract_item_token(redirect_url: &str) -> Option<String> {
    let destination = embedded_destination(redirect_url)?;
    let (_, tail) = destination.rsplit_once(TOKEN_MARKER)?;
    let token = tail.split('&').next().unwrap_or_default().trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Decode the destination URL stored in the `ru` query parameter.
fn embedded_destination(redirect_url: &str) -> Option<String> {
    let parsed = Url::parse(redirect_url).ok()?;
    let (_, once) = parsed
        .query_pairs()
        .find(|(key, _)| key == DESTINATION_PARAM)?;

    // Destinations are often encoded twice.
    match urlencoding::decode(&once) {
        Ok(twice) => Some(twice.into_owned()),
        Err(_) => Some(once.into_owned()),
    }
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
