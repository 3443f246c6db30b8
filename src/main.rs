use anyhow::Result;
use tracing::{error, info};

use material_scraper::material_finder::{FinderSettings, MaterialFinder};
use material_scraper::output::print_summary;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting Material Scraper for Castorama");

    let settings = FinderSettings::from_env()?;
    info!("Using {:?} strategy", settings.strategy);
    let finder = MaterialFinder::new(settings);

    let Some(sweep) = finder.run().await? else {
        error!("No products were successfully scraped");
        println!("No products were successfully scraped");
        std::process::exit(1);
    };

    let path = finder.save(&sweep).await?;
    info!("Results written to {}", path.display());
    print_summary(&sweep.products);

    Ok(())
}
