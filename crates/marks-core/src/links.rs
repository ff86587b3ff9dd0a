//! URL helpers
//!
//! Normalizes user-entered URLs and derives the icon and a suggested title
//! from the host.

use url::Url;

use crate::error::ValidationError;

/// Icon service used for favorites without an explicit icon
const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

/// Icon size requested from the icon service
const FAVICON_SIZE: u32 = 64;

/// Normalize a user-entered URL
///
/// A URL without a scheme is prefixed with `https://`. The result must parse,
/// and web URLs must carry a host. The text is otherwise kept as entered.
pub fn normalize_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingUrl);
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| ValidationError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl {
            url: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(candidate)
}

/// Icon URI for a URL, derived from its host
pub fn favicon_for(url: &str) -> Option<String> {
    let host = host_of(url)?;
    Some(format!(
        "{}?domain={}&sz={}",
        FAVICON_SERVICE, host, FAVICON_SIZE
    ))
}

/// Suggest a title from a URL's host
///
/// `https://www.github.com/rust-lang` suggests `Github`.
pub fn suggest_title(url: &str) -> Option<String> {
    let host = host_of(url)?;
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let name = host.split('.').next().filter(|s| !s.is_empty())?;

    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Whether the text starts with `scheme://`
fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn host_of(url: &str) -> Option<String> {
    let normalized = normalize_url(url).ok()?;
    let parsed = Url::parse(&normalized).ok()?;
    parsed.host_str().map(|h| h.to_string())
}
