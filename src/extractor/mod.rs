//! Product extraction from search result pages.
//!
//! Containers are located first, then each one is resolved field by field through the
//! matcher chains in [`matchers`]. A container that yields no name or no price is skipped
//! without affecting its siblings.

pub mod fields;
pub mod matchers;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::ProductRecord;
use crate::normalizer::{find_all, text_of, Document, ElementQuery};
use fields::resolve_url;
use matchers::{candidates, first_value, Card};

static PRODUCT_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)product").expect("product class pattern is valid"));
static CARD_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)product.*card|item.*product").expect("card class pattern is valid")
});
static TILE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)tile.*product|product.*tile").expect("tile class pattern is valid")
});

/// Container patterns, most specific first
fn container_queries() -> [ElementQuery<'static>; 5] {
    [
        ElementQuery::tags(&["div"]).with_attr("data-testid", "product"),
        ElementQuery::tags(&["article"]).with_class_matching(&PRODUCT_CLASS),
        ElementQuery::tags(&["div"]).with_class_matching(&CARD_CLASS),
        ElementQuery::tags(&["div"]).with_class_matching(&TILE_CLASS),
        ElementQuery::tags(&["li"]).with_class_matching(&PRODUCT_CLASS),
    ]
}

/// Product containers of a page: the matches of the first pattern that matches anything
pub fn find_containers<'a>(root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    for query in container_queries() {
        let containers = find_all(root, &query);
        if !containers.is_empty() {
            return containers;
        }
    }
    Vec::new()
}

/// Turns product cards into [`ProductRecord`]s for one site
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    base_url: Url,
    currency: String,
}

impl ProductExtractor {
    pub fn new(base_url: &str, currency: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            currency: currency.to_string(),
        })
    }

    /// Build a record from one product card.
    ///
    /// Returns `None` when the card has no non-empty name or no positive price. Optional
    /// fields that cannot be resolved are left empty.
    pub fn extract(&self, container: ElementRef<'_>, category: &str) -> Option<ProductRecord> {
        let mut card = Card::new(container);
        card.name = candidates(&card, matchers::NAME)
            .into_iter()
            .find_map(|element| {
                let text = text_of(element);
                (!text.is_empty()).then_some((element, text))
            });
        let name = card.name.as_ref()?.1.clone();
        let price = first_value(&card, matchers::PRICE)?;

        let resolve = |raw: Option<String>| {
            raw.and_then(|href| resolve_url(&self.base_url, &href))
                .unwrap_or_default()
        };

        Some(ProductRecord {
            name,
            category: category.to_string(),
            price,
            currency: self.currency.clone(),
            product_url: resolve(first_value(&card, matchers::LINK)),
            brand: first_value(&card, matchers::BRAND).unwrap_or_default(),
            unit: first_value(&card, matchers::UNIT).unwrap_or_default(),
            image_url: resolve(first_value(&card, matchers::IMAGE)),
        })
    }

    /// Extract every product on a page, up to `limit` records
    pub fn extract_page(
        &self,
        document: &Document,
        category: &str,
        limit: Option<usize>,
    ) -> Vec<ProductRecord> {
        let containers = find_containers(document.root());
        if containers.is_empty() {
            warn!("No product containers found");
            return Vec::new();
        }
        info!("Found {} product containers", containers.len());

        let mut products = Vec::new();
        for container in containers {
            if limit.is_some_and(|limit| products.len() >= limit) {
                break;
            }
            match self.extract(container, category) {
                Some(product) => products.push(product),
                None => debug!("Skipping product card without name or price"),
            }
        }
        products
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.test";

    fn extractor() -> ProductExtractor {
        ProductExtractor::new(BASE, "EUR").unwrap()
    }

    fn first_card(html: &str) -> (Document, usize) {
        let doc = Document::parse(html);
        let count = find_containers(doc.root()).len();
        (doc, count)
    }

    const TEST_ID_CARD: &str = r#"
        <div data-testid="product">
          <a data-testid="product-link" href="/p/123">
            <img data-testid="product-image" src="data:image/gif;base64,R0lG" data-src="/img/123.jpg">
          </a>
          <p data-testid="product-name">  Carrelage   sol gris 60x60 </p>
          <p data-testid="seller-info">GoodHome</p>
          <span data-testid="primary-price"><span data-testid="product-price">24,90 €</span></span>
          <span>Prix au m²</span>
        </div>
    "#;

    #[test]
    fn extracts_all_fields_from_test_id_markup() {
        let (doc, count) = first_card(TEST_ID_CARD);
        assert_eq!(count, 1);
        let card = find_containers(doc.root())[0];
        let product = extractor().extract(card, "carrelage").unwrap();

        assert_eq!(product.name, "Carrelage sol gris 60x60");
        assert_eq!(product.category, "carrelage");
        assert_eq!(product.price, 24.90);
        assert_eq!(product.currency, "EUR");
        assert_eq!(product.product_url, "https://example.test/p/123");
        assert_eq!(product.brand, "GoodHome");
        assert_eq!(product.unit, "m²");
        assert_eq!(product.image_url, "https://example.test/img/123.jpg");
    }

    #[test]
    fn falls_back_to_class_patterns() {
        let html = r#"
            <article class="product-tile">
              <h3 class="ProductTitle"><a href="/p/kit-wc">Kit de fixation WC</a></h3>
              <div class="brand-name">Cooke &amp; Lewis</div>
              <div class="product-price">9,99 €</div>
              <img srcset="//cdn.example.test/kit.jpg 1x, //cdn.example.test/kit@2x.jpg 2x">
            </article>
        "#;
        let doc = Document::parse(html);
        let card = find_containers(doc.root())[0];
        let product = extractor().extract(card, "toilettes").unwrap();

        assert_eq!(product.name, "Kit de fixation WC");
        assert_eq!(product.price, 9.99);
        assert_eq!(product.product_url, "https://example.test/p/kit-wc");
        assert_eq!(product.brand, "Cooke & Lewis");
        assert_eq!(product.unit, "kit");
        assert_eq!(product.image_url, "https://cdn.example.test/kit.jpg");
    }

    #[test]
    fn price_found_next_to_currency_symbol() {
        let html = r#"
            <li class="product">
              <a href="/p/9">Peinture blanche 10L</a>
              <div><strong>1 099,00 €</strong></div>
            </li>
        "#;
        let doc = Document::parse(html);
        let card = find_containers(doc.root())[0];
        let product = extractor().extract(card, "peinture").unwrap();
        assert_eq!(product.price, 1099.0);
        assert_eq!(product.unit, "l");
        assert_eq!(product.brand, "");
    }

    #[test]
    fn card_without_price_is_skipped() {
        let html = r#"
            <div data-testid="product">
              <p data-testid="product-name">Evier inox</p>
              <span data-testid="product-price">Prix indisponible</span>
            </div>
        "#;
        let doc = Document::parse(html);
        let card = find_containers(doc.root())[0];
        assert!(extractor().extract(card, "evier").is_none());
    }

    #[test]
    fn card_with_blank_name_is_skipped() {
        let html = r#"
            <div data-testid="product">
              <p data-testid="product-name">   </p>
              <span data-testid="product-price">12,50 €</span>
            </div>
        "#;
        let doc = Document::parse(html);
        let card = find_containers(doc.root())[0];
        assert!(extractor().extract(card, "evier").is_none());
    }

    #[test]
    fn empty_name_candidate_falls_through_to_next_matcher() {
        let html = r#"
            <div data-testid="product">
              <p data-testid="product-name"></p>
              <a href="/p/5">Douche à l'italienne</a>
              <span data-testid="product-price">349 €</span>
            </div>
        "#;
        let doc = Document::parse(html);
        let card = find_containers(doc.root())[0];
        let product = extractor().extract(card, "douche").unwrap();
        assert_eq!(product.name, "Douche à l'italienne");
        assert_eq!(product.product_url, "https://example.test/p/5");
    }

    #[test]
    fn elision_in_name_is_not_read_as_unit() {
        let html = r#"
            <div data-testid="product">
              <a data-testid="product-link" href="/p/8">
                <p data-testid="product-name">Receveur de douche à l'italienne</p>
              </a>
              <span data-testid="product-price">189,00 €</span>
            </div>
        "#;
        let doc = Document::parse(html);
        let card = find_containers(doc.root())[0];
        let product = extractor().extract(card, "douche").unwrap();
        assert_eq!(product.name, "Receveur de douche à l'italienne");
        assert_eq!(product.unit, "");
    }

    #[test]
    fn extraction_is_repeatable() {
        let doc = Document::parse(TEST_ID_CARD);
        let card = find_containers(doc.root())[0];
        let extractor = extractor();
        assert_eq!(
            extractor.extract(card, "carrelage"),
            extractor.extract(card, "carrelage")
        );
    }

    #[test]
    fn extract_page_skips_bad_cards_and_honours_limit() {
        let html = r#"
            <div class="product-card"><a href="/p/1">Un</a><span class="price">1,00 €</span></div>
            <div class="product-card"><a href="/p/2">Deux</a></div>
            <div class="product-card"><a href="/p/3">Trois</a><span class="price">3,00 €</span></div>
            <div class="product-card"><a href="/p/4">Quatre</a><span class="price">4,00 €</span></div>
        "#;
        let doc = Document::parse(html);
        let extractor = extractor();

        let all = extractor.extract_page(&doc, "evier", None);
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Un", "Trois", "Quatre"]);

        let capped = extractor.extract_page(&doc, "evier", Some(2));
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_id_containers_take_precedence() {
        let html = r#"
            <div class="product-card"><div data-testid="product">A</div></div>
            <div class="product-card"><div data-testid="product">B</div></div>
            <div class="product-card">C</div>
        "#;
        let doc = Document::parse(html);
        let containers = find_containers(doc.root());
        assert_eq!(containers.len(), 2);
        assert!(containers.iter().all(|c| c.value().attr("data-testid") == Some("product")));
    }

    #[test]
    fn page_without_containers_yields_nothing() {
        let doc = Document::parse("<html><body><p>Aucun résultat</p></body></html>");
        assert!(extractor().extract_page(&doc, "evier", None).is_empty());
    }
}
