//! Persisting a sweep as a JSON report and printing the console summary

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::models::{ProductRecord, ScrapeReport, ScraperKind};

const SAMPLE_SIZE: usize = 3;

impl ScrapeReport {
    /// Wrap a sweep's records, stamped with the current local time
    pub fn new(products: Vec<ProductRecord>, kind: ScraperKind) -> Self {
        Self {
            scrape_timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_products: products.len(),
            scraper_type: kind.report_tag().map(str::to_string),
            products,
        }
    }

    /// Write the report as pretty-printed UTF-8 JSON, replacing any existing file
    pub async fn save_to_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved {} products to {}", self.total_products, path.display());
        Ok(())
    }
}

/// Per-category counts in first-seen order
pub fn count_by_category(products: &[ProductRecord]) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for product in products {
        match counts.iter_mut().find(|(category, _)| *category == product.category) {
            Some((_, count)) => *count += 1,
            None => counts.push((product.category.as_str(), 1)),
        }
    }
    counts
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

/// Console summary: products per category followed by the first few records
pub fn render_summary(products: &[ProductRecord]) -> String {
    let mut out = String::from("\nProducts by category:\n");
    for (category, count) in count_by_category(products) {
        let _ = writeln!(out, "  {category}: {count} products");
    }

    out.push_str("\nSample products:\n");
    for (i, product) in products.iter().take(SAMPLE_SIZE).enumerate() {
        let _ = writeln!(out, "\n{}. {}", i + 1, product.name);
        let _ = writeln!(out, "   Category: {}", product.category);
        let _ = writeln!(out, "   Price: {} {}", product.price, product.currency);
        let _ = writeln!(out, "   Brand: {}", or_na(&product.brand));
        let _ = writeln!(out, "   Unit: {}", or_na(&product.unit));
    }
    out
}

pub fn print_summary(products: &[ProductRecord]) {
    print!("{}", render_summary(products));
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn product(name: &str, category: &str, price: f64) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            category: category.to_string(),
            price,
            currency: "EUR".to_string(),
            product_url: format!("https://www.castorama.fr/p/{name}"),
            brand: String::new(),
            unit: "m²".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn counts_keep_first_seen_order() {
        let products = vec![
            product("a", "evier", 1.0),
            product("b", "carrelage", 2.0),
            product("c", "evier", 3.0),
        ];
        assert_eq!(count_by_category(&products), [("evier", 2), ("carrelage", 1)]);
    }

    #[test]
    fn summary_lists_three_samples_with_placeholders() {
        let products: Vec<_> = (1..=5)
            .map(|i| product(&format!("Produit {i}"), "douche", 10.5))
            .collect();
        let summary = render_summary(&products);

        assert!(summary.contains("  douche: 5 products"));
        assert!(summary.contains("3. Produit 3"));
        assert!(!summary.contains("4. Produit 4"));
        assert!(summary.contains("   Price: 10.5 EUR"));
        assert!(summary.contains("   Brand: N/A"));
        assert!(summary.contains("   Unit: m²"));
    }

    #[test]
    fn http_report_has_no_scraper_type() {
        let report = ScrapeReport::new(vec![product("a", "evier", 1.0)], ScraperKind::Http);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_products"], 1);
        assert!(json.get("scraper_type").is_none());

        let browser = ScrapeReport::new(Vec::new(), ScraperKind::Browser);
        assert_eq!(browser.scraper_type.as_deref(), Some("browser"));
        assert_eq!(browser.scrape_timestamp.len(), "2024-01-01 00:00:00".len());
    }

    #[tokio::test]
    async fn saves_pretty_json_with_non_ascii_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("products.json");
        let report = ScrapeReport::new(vec![product("Évier céramique", "evier", 129.0)], ScraperKind::Http);

        report.save_to_json(&path).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"total_products\": 1"));
        assert!(written.contains("Évier céramique"));

        let parsed: ScrapeReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.products, report.products);
    }
}
