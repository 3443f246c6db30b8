//! Text-level parsing for individual fields

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PRICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+[,.]?\d*)").expect("price pattern is valid"));

/// Unit-of-sale tokens standing on their own (digits may touch them: `25kg`, `10L`).
/// An apostrophe after the token is French elision (`l'italienne`), not a unit.
pub(crate) static UNIT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\p{L}])(m²|m2|pièces?|unités?|kg|kit|lot|l)(?:[^\p{L}\p{N}'’]|$)")
        .expect("unit pattern is valid")
});

static PACK_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^\p{L}])(kit|lot|pack|set)(?:[^\p{L}]|$)").expect("pack pattern is valid")
});

/// Parse a displayed price into a positive amount.
///
/// Spaces (including the non-breaking kinds used as French thousands separators) are
/// removed first, then the first `digits[,.]digits` run is read with comma as the decimal
/// separator: `"12,50 €"` is 12.5 and `"1 234,00"` is 1234.0.
pub fn parse_price(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\u{2009}'))
        .collect();
    let number = PRICE_NUMBER.captures(&compact)?.get(1)?.as_str();
    let price: f64 = number.replace(',', ".").parse().ok()?;
    (price.is_finite() && price > 0.0).then_some(price)
}

/// First unit-of-sale token in `text`, lowercased
pub fn find_unit(text: &str) -> Option<String> {
    UNIT_TOKEN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Kit/lot/pack/set marker in a product name, lowercased
pub fn find_pack_unit(name: &str) -> Option<String> {
    PACK_TOKEN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Resolve `href` against the site base URL
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

/// First URL of a responsive `srcset` attribute
pub fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|candidate| candidate.split_whitespace().next())
        .filter(|url| !url.is_empty())
}
