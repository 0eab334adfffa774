use clap::{Parser, ValueEnum};
use parts_scout::{
    BrowseApiSource, ListingSource, ScrapeSource, SearchMode, SearchQuery, SearchResponse,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Sold,
    Active,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sold => SearchMode::Sold,
            ModeArg::Active => SearchMode::Active,
        }
    }
}

/// Estimate resale value of used auto parts from marketplace listings
#[derive(Debug, Parser)]
#[command(name = "parts-scout", version)]
struct Cli {
    /// Vehicle year, e.g. 2008
    year: String,
    /// Vehicle make, e.g. Honda
    make: String,
    /// Vehicle model, e.g. Civic
    model: String,
    /// Part description, e.g. "brake caliper"
    #[arg(default_value = "")]
    details: String,

    /// Sold (resale estimation) or active listings
    #[arg(long, value_enum, default_value = "sold")]
    mode: ModeArg,

    /// Restrict to the junkyard price band
    #[arg(long)]
    junkyard: bool,

    /// Override the band's lower bound (requires --junkyard)
    #[arg(long)]
    price_min: Option<f64>,

    /// Override the band's upper bound (requires --junkyard)
    #[arg(long)]
    price_max: Option<f64>,

    /// Maximum number of records to return
    #[arg(long, default_value_t = 40)]
    limit: usize,

    /// Use the official Browse API (needs EBAY_CLIENT_ID/EBAY_CLIENT_SECRET)
    #[arg(long)]
    api: bool,

    /// Print raw upstream diagnostics instead of listings
    #[arg(long)]
    probe: bool,

    /// Write the full response as JSON to this path
    #[arg(long)]
    out: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let query = SearchQuery {
        year: cli.year.clone(),
        make: cli.make.clone(),
        model: cli.model.clone(),
        details: cli.details.clone(),
        mode: cli.mode.into(),
        junkyard: cli.junkyard,
        price_min: cli.price_min,
        price_max: cli.price_max,
        limit: cli.limit,
    };

    info!("Searching {} listings for \"{}\"", query_mode(&query), query.keywords());

    if cli.probe {
        let source = ScrapeSource::new()?;
        let report = source.probe(&query).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let response = if cli.api {
        let source = BrowseApiSource::from_env()?;
        source.search(&query).await
    } else {
        let source = ScrapeSource::new()?;
        source.search(&query).await
    };

    print_response(&response);

    if let Some(path) = cli.out {
        let json = serde_json::to_string_pretty(&response)?;
        tokio::fs::write(&path, json).await?;
        info!("Saved response to {}", path.display());
    }

    Ok(())
}

fn query_mode(query: &SearchQuery) -> &'static str {
    match query.mode {
        SearchMode::Sold => "sold",
        SearchMode::Active => "active",
    }
}

fn print_response(response: &SearchResponse) {
    if let Some(reason) = response.meta.reason {
        println!("No listings ({})", reason);
        if let Some(last) = &response.meta.last_tried {
            println!("  last tried: {}", last);
        }
        return;
    }

    for (i, item) in response.items.iter().enumerate() {
        let price = if item.price.is_empty() {
            "price unknown".to_string()
        } else {
            format!(
                "{}{}",
                item.currency.as_deref().unwrap_or("$"),
                item.price
            )
        };
        println!("{}. {} ({})", i + 1, item.title, price);
        if let Some(date) = &item.sold_date {
            println!("   sold: {}", date);
        }
        println!("   {}", item.link);
    }
    println!();
    println!("{} listings", response.meta.count);
}
