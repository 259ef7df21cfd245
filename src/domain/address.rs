//! Address helpers: the internal scheme, favicon resolution and omnibox input.
//!
//! The `tabshell://` scheme addresses the shell's own pages and static assets.
//! Internal pages never enter history, always carry a fixed synthetic title and the
//! built-in icon, and never take page-supplied favicons.

use url::Url;

/// Scheme prefix reserved for built-in pages and assets.
pub const INTERNAL_PREFIX: &str = "tabshell://";

/// Default target for a tab opened without a URL.
pub const NEW_TAB_URL: &str = "tabshell://new-tab";

/// Built-in settings page.
pub const SETTINGS_URL: &str = "tabshell://settings";

/// Built-in application icon, used as the favicon of every internal page.
pub const APP_ICON_URL: &str = "tabshell://app-icon.png";

/// Title shown for fresh tabs until the page reports its own.
pub const NEW_TAB_TITLE: &str = "New Tab";

const SETTINGS_TITLE: &str = "Settings";
const APP_TITLE: &str = "Tabshell";

/// Well-known root-relative icon path used when a page declares no icon.
const DEFAULT_FAVICON_PATH: &str = "/favicon.ico";

/// Returns `true` for URLs under the internal scheme.
#[must_use]
pub fn is_internal(url: &str) -> bool {
    url.get(..INTERNAL_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(INTERNAL_PREFIX))
}

/// Host part of an internal URL (`settings` for `tabshell://settings/x?y`).
fn internal_host(url: &str) -> &str {
    let rest = url.get(INTERNAL_PREFIX.len()..).unwrap_or_default();
    let end = rest.find(&['/', '?', '#'][..]).unwrap_or(rest.len());
    &rest[..end]
}

/// Fixed title for an internal page.
#[must_use]
pub fn internal_title(url: &str) -> &'static str {
    if !is_internal(url) {
        return APP_TITLE;
    }
    match internal_host(url) {
        "settings" => SETTINGS_TITLE,
        "new-tab" => NEW_TAB_TITLE,
        _ => APP_TITLE,
    }
}

/// Resolves a favicon candidate against the URL of the page that declared it.
///
/// Absolute `http`, `https` and `data` candidates are returned unchanged. Protocol-
/// relative (`//cdn/x.ico`), root-relative (`/x.ico`) and path-relative (`x.ico`)
/// candidates are joined onto `page_url` with standard URL resolution. Returns `None`
/// when the candidate is blank or the page URL cannot serve as a base.
#[must_use]
pub fn resolve_favicon(candidate: &str, page_url: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
        return Some(candidate.to_string());
    }

    let base = Url::parse(page_url).ok()?;
    if base.cannot_be_a_base() {
        return None;
    }
    base.join(candidate).ok().map(String::from)
}

/// Well-known `/favicon.ico` at the page's origin, for `http(s)` pages only.
#[must_use]
pub fn default_favicon(page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
        return None;
    }
    base.join(DEFAULT_FAVICON_PATH).ok().map(String::from)
}

/// Picks the favicon for a finished load: the first candidate that resolves, else the
/// origin's default icon.
#[must_use]
pub fn pick_favicon(candidates: &[String], page_url: &str) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| resolve_favicon(candidate, page_url))
        .or_else(|| default_favicon(page_url))
}

/// Search providers selectable through the `searchEngine` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchEngine {
    #[default]
    Google,
    Brave,
    DuckDuckGo,
}

impl SearchEngine {
    /// Settings key holding the user's search provider.
    pub const SETTING_KEY: &'static str = "searchEngine";

    /// Maps a stored setting value to a provider, defaulting to Google.
    #[must_use]
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("brave") => Self::Brave,
            Some("duckduckgo") => Self::DuckDuckGo,
            _ => Self::Google,
        }
    }

    #[must_use]
    pub fn query_url(self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        match self {
            Self::Google => format!("https://www.google.com/search?q={encoded}"),
            Self::Brave => format!("https://search.brave.com/search?q={encoded}"),
            Self::DuckDuckGo => format!("https://duckduckgo.com/?q={encoded}"),
        }
    }
}

/// Heuristic for omnibox input that should be loaded rather than searched.
///
/// Matches explicit `http(s)://` input, anything mentioning `localhost`, and dotted
/// host names ending in a label of at least two letters (`docs.rs`, `a.b.io/path`).
#[must_use]
pub fn looks_like_address(input: &str) -> bool {
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return false;
    }

    let lower = input.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.contains("localhost") {
        return true;
    }

    let host = lower
        .split(&['/', '?', '#'][..])
        .next()
        .unwrap_or_default()
        .rsplit('@')
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let valid_label = |label: &&str| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    let tld = labels[labels.len() - 1];
    labels.iter().all(valid_label) && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Turns omnibox input into the URL to load.
///
/// Returns `None` for blank input.
#[must_use]
pub fn resolve_input(input: &str, engine: SearchEngine) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if is_internal(input) {
        return Some(input.to_string());
    }

    if looks_like_address(input) {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Some(input.to_string());
        }
        return Some(format!("https://{input}"));
    }

    Some(engine.query_url(input))
}
