//! Ordered matcher chains, one per product field.
//!
//! Each matcher is a pure function over a product card; a field resolves to the first
//! matcher in its chain that yields a value. Stable `data-testid` markers come first,
//! class-name patterns next, and bare structural fallbacks last.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use super::fields::{find_pack_unit, find_unit, first_srcset_url, parse_price, UNIT_TOKEN};
use crate::normalizer::{find, find_text, text_of, ElementQuery};

static TITLE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)title|name|product").expect("title class pattern is valid"));
static PRICE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)price").expect("price class pattern is valid"));
static BRAND_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)brand|marque|seller").expect("brand class pattern is valid")
});
static CURRENCY_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new("€").expect("currency pattern is valid"));

/// The product card being resolved, plus the name element and its text once known
#[derive(Debug, Clone)]
pub struct Card<'a> {
    pub container: ElementRef<'a>,
    pub name: Option<(ElementRef<'a>, String)>,
}

impl<'a> Card<'a> {
    pub fn new(container: ElementRef<'a>) -> Self {
        Self {
            container,
            name: None,
        }
    }

    fn find(&self, query: &ElementQuery<'_>) -> Option<ElementRef<'a>> {
        find(self.container, query)
    }
}

pub type ElementMatcher = for<'a, 'c> fn(&'c Card<'a>) -> Option<ElementRef<'a>>;
pub type ValueMatcher<T> = for<'a, 'c> fn(&'c Card<'a>) -> Option<T>;

/// Evaluate a chain in order and return the first value produced
pub fn first_value<T>(card: &Card<'_>, chain: &[ValueMatcher<T>]) -> Option<T> {
    chain.iter().find_map(|matcher| matcher(card))
}

/// Evaluate an element chain in order and return every element it produces, in order
pub fn candidates<'a>(card: &Card<'a>, chain: &[ElementMatcher]) -> Vec<ElementRef<'a>> {
    chain.iter().filter_map(|matcher| matcher(card)).collect()
}

// Name

pub const NAME: &[ElementMatcher] = &[name_by_test_id, name_by_class, first_anchor];

fn name_by_test_id<'a>(card: &Card<'a>) -> Option<ElementRef<'a>> {
    card.find(&ElementQuery::tags(&["p"]).with_attr("data-testid", "product-name"))
}

fn name_by_class<'a>(card: &Card<'a>) -> Option<ElementRef<'a>> {
    card.find(&ElementQuery::tags(&["h3", "h2", "h4", "span", "a"]).with_class_matching(&TITLE_CLASS))
}

fn first_anchor<'a>(card: &Card<'a>) -> Option<ElementRef<'a>> {
    card.find(&ElementQuery::tags(&["a"]))
}

// Price

pub const PRICE: &[ValueMatcher<f64>] = &[
    price_by_test_id,
    price_in_primary_wrapper,
    price_by_class,
    price_near_currency_symbol,
];

fn price_of(element: ElementRef<'_>) -> Option<f64> {
    parse_price(&text_of(element))
}

fn price_by_test_id(card: &Card<'_>) -> Option<f64> {
    card.find(&ElementQuery::tags(&["span"]).with_attr("data-testid", "product-price"))
        .and_then(price_of)
}

fn price_in_primary_wrapper(card: &Card<'_>) -> Option<f64> {
    let wrapper =
        card.find(&ElementQuery::tags(&["span"]).with_attr("data-testid", "primary-price"))?;
    let nested = find(
        wrapper,
        &ElementQuery::tags(&["span"]).with_attr("data-testid", "product-price"),
    );
    nested.and_then(price_of).or_else(|| price_of(wrapper))
}

fn price_by_class(card: &Card<'_>) -> Option<f64> {
    card.find(&ElementQuery::tags(&["span", "div"]).with_class_matching(&PRICE_CLASS))
        .and_then(price_of)
}

fn price_near_currency_symbol(card: &Card<'_>) -> Option<f64> {
    let (parent, _) = find_text(card.container, &CURRENCY_SYMBOL)?;
    price_of(parent)
}

// Product link (raw href, resolved by the extractor)

pub const LINK: &[ValueMatcher<String>] = &[link_by_test_id, link_from_name, link_first_anchor];

fn href_of(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_owned)
}

fn link_by_test_id(card: &Card<'_>) -> Option<String> {
    card.find(&ElementQuery::tags(&["a"]).with_attr("data-testid", "product-link"))
        .and_then(href_of)
}

fn link_from_name(card: &Card<'_>) -> Option<String> {
    let (element, _) = card.name.as_ref()?;
    if element.value().name() == "a" {
        href_of(*element)
    } else {
        None
    }
}

fn link_first_anchor(card: &Card<'_>) -> Option<String> {
    card.find(&ElementQuery::tags(&["a"]).with_attr_present("href"))
        .and_then(href_of)
}

// Brand

pub const BRAND: &[ValueMatcher<String>] = &[brand_by_test_id, brand_by_class];

fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    Some(text_of(element)).filter(|text| !text.is_empty())
}

fn brand_by_test_id(card: &Card<'_>) -> Option<String> {
    card.find(&ElementQuery::tags(&["p"]).with_attr("data-testid", "seller-info"))
        .and_then(non_empty_text)
}

fn brand_by_class(card: &Card<'_>) -> Option<String> {
    card.find(&ElementQuery::tags(&["span", "div", "p"]).with_class_matching(&BRAND_CLASS))
        .and_then(non_empty_text)
}

// Image (raw source, resolved by the extractor)

pub const IMAGE: &[ValueMatcher<String>] = &[image_by_test_id, image_first];

/// `src` unless it is an inline placeholder, then the lazy-load attribute, then `srcset`
fn image_source(element: ElementRef<'_>) -> Option<String> {
    let attrs = element.value();
    let usable = |value: &&str| {
        let value = value.trim();
        !value.is_empty() && !value.starts_with("data:")
    };
    attrs
        .attr("src")
        .filter(usable)
        .or_else(|| attrs.attr("data-src").filter(usable))
        .or_else(|| attrs.attr("srcset").and_then(first_srcset_url))
        .map(|src| src.trim().to_owned())
}

fn image_by_test_id(card: &Card<'_>) -> Option<String> {
    card.find(&ElementQuery::tags(&["img"]).with_attr("data-testid", "product-image"))
        .and_then(image_source)
}

fn image_first(card: &Card<'_>) -> Option<String> {
    card.find(&ElementQuery::tags(&["img"])).and_then(image_source)
}

// Unit of sale

pub const UNIT: &[ValueMatcher<String>] = &[unit_in_card_text, unit_in_name];

fn unit_in_card_text(card: &Card<'_>) -> Option<String> {
    let (_, text) = find_text(card.container, &UNIT_TOKEN)?;
    find_unit(text)
}

fn unit_in_name(card: &Card<'_>) -> Option<String> {
    let (_, name) = card.name.as_ref()?;
    find_pack_unit(name)
}
