//! Page content normalization: charset decoding, encoding recovery and anti-bot detection.
//!
//! Both fetch strategies hand their raw result to this module before anything is
//! extracted. A page is accepted only when its title carries no anti-bot phrase and its
//! visible text looks like real content; otherwise a [`Rejection`] tells the caller
//! whether the attempt is worth retrying.

mod document;

pub use document::{
    descendants, find, find_all, find_text, text_of, AttrPredicate, Document, ElementQuery,
};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use tracing::{info, warn};

use crate::error::RetryReason;

/// Title phrases of challenge and block pages
pub const ANTI_BOT_INDICATORS: &[&str] = &[
    "checking your browser",
    "cloudflare",
    "captcha",
    "bot detection",
    "access denied",
    "blocked",
    "security check",
];

/// Character sequences that only show up when a page was decoded with the wrong charset
const MOJIBAKE_MARKERS: &[&str] = &["\u{FFFD}", "Ž", "äo", "MûÓ", "Ã©", "Ã¨"];

const GARBLE_SAMPLE_CHARS: usize = 500;
const MIN_VISIBLE_CHARS: usize = 100;
const PLAUSIBLE_PREFIX_CHARS: usize = 200;

/// Page content that passed normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub html: String,
    pub title: String,
    /// Charset the HTML was finally decoded with
    pub encoding: &'static str,
}

impl PageContent {
    pub fn document(&self) -> Document {
        Document::parse(&self.html)
    }
}

/// Why normalization refused a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    AntiBot(String),
    Garbled,
}

impl From<Rejection> for RetryReason {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::AntiBot(title) => Self::AntiBot(title),
            Rejection::Garbled => Self::Garbled,
        }
    }
}

/// Decode a response body using the charset of its Content-Type, UTF-8 otherwise.
/// A byte order mark takes precedence over the declared charset.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> (String, &'static str) {
    let encoding = content_type
        .and_then(charset_of)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, used, _had_errors) = encoding.decode(bytes);
    (text.into_owned(), used.name())
}

fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// The anti-bot phrase contained in `title`, if any. Matching ignores case.
pub fn detect_anti_bot(title: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    ANTI_BOT_INDICATORS
        .iter()
        .copied()
        .find(|indicator| title.contains(indicator))
}

/// Heuristic for pages decoded with the wrong charset or carrying no real content
pub fn looks_garbled(visible_text: &str) -> bool {
    let sample: String = visible_text.chars().take(GARBLE_SAMPLE_CHARS).collect();
    sample.trim().chars().count() < MIN_VISIBLE_CHARS
        || MOJIBAKE_MARKERS.iter().any(|marker| sample.contains(marker))
        || sample.chars().any(|c| c.is_control() && !c.is_whitespace())
}

/// Re-decode raw bytes under each fallback charset in turn and return the first result
/// that looks like an HTML page.
pub fn redecode(bytes: &[u8]) -> Option<(&'static str, String)> {
    let candidates: [(&'static str, fn(&[u8]) -> Option<String>); 3] = [
        ("utf-8", |b: &[u8]| std::str::from_utf8(b).ok().map(str::to_owned)),
        ("iso-8859-1", |b: &[u8]| Some(b.iter().copied().map(char::from).collect())),
        ("windows-1252", |b: &[u8]| {
            WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(b)
                .map(|text| text.into_owned())
        }),
    ];

    candidates.into_iter().find_map(|(name, decode)| {
        let decoded = decode(bytes)?;
        is_plausible_html(&decoded).then(|| {
            info!("Successfully decoded with {}", name);
            (name, decoded)
        })
    })
}

fn is_plausible_html(decoded: &str) -> bool {
    let prefix: String = decoded.chars().take(PLAUSIBLE_PREFIX_CHARS).collect();
    prefix.to_lowercase().contains("html") && decoded.trim().chars().count() > MIN_VISIBLE_CHARS
}

/// Normalize the body of an HTTP response.
pub fn normalize_response(bytes: &[u8], content_type: Option<&str>) -> Result<PageContent, Rejection> {
    let (html, encoding) = decode_body(bytes, content_type);
    let doc = Document::parse(&html);
    let title = doc.title().unwrap_or_default();

    if let Some(indicator) = detect_anti_bot(&title) {
        warn!("Anti-bot page detected ({}): {}", indicator, title);
        return Err(Rejection::AntiBot(title));
    }

    if !looks_garbled(&doc.visible_text()) {
        info!("Page title: {}", title);
        return Ok(PageContent { html, title, encoding });
    }

    warn!("Detected garbled content");
    let Some((encoding, html)) = redecode(bytes) else {
        warn!("Could not properly decode response");
        return Err(Rejection::Garbled);
    };
    let title = Document::parse(&html).title().unwrap_or_default();
    Ok(PageContent { html, title, encoding })
}

/// Normalize the page source of a browser-rendered page. The browser already decoded the
/// bytes, so garbled content cannot be recovered here.
pub fn normalize_rendered(html: String) -> Result<PageContent, Rejection> {
    let doc = Document::parse(&html);
    let title = doc.title().unwrap_or_default();

    if let Some(indicator) = detect_anti_bot(&title) {
        warn!("Anti-bot page detected ({}): {}", indicator, title);
        return Err(Rejection::AntiBot(title));
    }
    if looks_garbled(&doc.visible_text()) {
        warn!("Detected garbled content in rendered page");
        return Err(Rejection::Garbled);
    }

    info!("Page title: {}", title);
    Ok(PageContent {
        html,
        title,
        encoding: "utf-8",
    })
}
