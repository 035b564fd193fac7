use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use design_client::DesignClient;
use ripple_cascade::assets::{LocalAssetStore, PdftoppmConverter};
use ripple_cascade::cascade::{CascadeRunner, JobReadout};
use ripple_cascade::store::MemoryStore;
use ripple_common::{Catalog, Config, Source};

/// Input article file: `{"title": ..., "body": ..., "pillar": ...,
/// "variation_count": 3}`.
#[derive(Deserialize)]
struct ArticleFile {
    title: String,
    body: String,
    pillar: String,
    #[serde(default = "default_variations")]
    variation_count: u32,
}

fn default_variations() -> u32 {
    1
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ripple_cascade=info".parse()?),
        )
        .init();

    let article_path = std::env::args()
        .nth(1)
        .context("usage: ripple-cascade <article.json> <catalog.json>")?;
    let catalog_path = std::env::args()
        .nth(2)
        .context("usage: ripple-cascade <article.json> <catalog.json>")?;

    let config = Config::from_env();

    let article: ArticleFile = serde_json::from_str(
        &std::fs::read_to_string(&article_path)
            .with_context(|| format!("reading {article_path}"))?,
    )
    .with_context(|| format!("parsing {article_path}"))?;
    let catalog: Catalog = serde_json::from_str(
        &std::fs::read_to_string(&catalog_path)
            .with_context(|| format!("reading {catalog_path}"))?,
    )
    .with_context(|| format!("parsing {catalog_path}"))?;

    info!(
        title = %article.title,
        platforms = catalog.platforms.len(),
        templates = catalog.enabled_template_count(),
        variations = article.variation_count,
        "Ripple cascade starting"
    );

    let source = Source::new(article.title, article.body, article.pillar)
        .with_variations(article.variation_count);
    let source_id = source.id;

    let store = Arc::new(MemoryStore::new());
    store.add_source(source);

    let generator = Claude::new(
        config.anthropic_api_key.clone(),
        config.anthropic_model.clone(),
    );
    let mut renderer = DesignClient::new(config.design_api_key.clone());
    if let Some(base_url) = &config.design_base_url {
        renderer = renderer.with_base_url(base_url);
    }
    let assets = LocalAssetStore::new(&config.data_dir, config.asset_base_url.clone());

    let mut runner = CascadeRunner::new(
        store.clone(),
        Arc::new(generator),
        Arc::new(renderer),
        Arc::new(PdftoppmConverter::new()),
        Arc::new(assets),
        catalog,
    );
    if let Some(voice) = &config.brand_voice {
        runner = runner.with_brand_voice(voice);
    }

    let job = runner.run(source_id).await?;
    println!("{}", JobReadout::from(&job));

    for derivative in store.all_derivatives() {
        println!(
            "  {} / {} v{}  images: {}  {}",
            derivative.platform_id,
            derivative.template_slug,
            derivative.variation_index,
            derivative.content.image_urls.len(),
            derivative
                .content
                .generation_error
                .as_deref()
                .unwrap_or("ok"),
        );
    }

    Ok(())
}
