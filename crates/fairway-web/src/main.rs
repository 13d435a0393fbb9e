//! Service entry point.
//!
//! The only place that reads process environment: credentials and endpoints
//! are assembled here into the typed configuration the core expects.

mod error;
mod routes;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use fairway_core::{
    ApolloAdapter, Credential, DirectoryAdapter, EnrichmentConfig, FirecrawlAdapter, HunterAdapter,
    JinaAdapter, Orchestrator, PerplexityAdapter, ProviderConfig, ProviderSet, ReqwestHttpClient,
};
use fairway_warehouse::{Warehouse, WarehouseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env();
    let warehouse = Warehouse::open(WarehouseConfig {
        db_path: env::var("FAIRWAY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("fairway.duckdb")),
        ..WarehouseConfig::default()
    })?;

    let providers = build_providers(&config);
    let orchestrator = Arc::new(Orchestrator::new(providers, Arc::new(warehouse), config));

    let bind = env::var("FAIRWAY_BIND").unwrap_or_else(|_| String::from("0.0.0.0:8080"));
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "fairway service listening");

    axum::serve(listener, routes::router(orchestrator)).await?;
    Ok(())
}

fn config_from_env() -> EnrichmentConfig {
    let mut config = EnrichmentConfig::new();

    config.directory = Some(ProviderConfig::new(
        env::var("DIRECTORY_BASE_URL").unwrap_or_else(|_| String::from("https://vsga.org")),
        Credential::default(),
    ));
    config.jina = Some(ProviderConfig::new(
        env::var("JINA_BASE_URL").unwrap_or_else(|_| String::from("https://r.jina.ai")),
        Credential::new(env::var("JINA_API_KEY").unwrap_or_default()),
    ));
    config.apollo = provider_from_env("APOLLO_API_KEY", "https://api.apollo.io/api/v1");
    config.hunter = provider_from_env("HUNTER_API_KEY", "https://api.hunter.io/v2");
    config.perplexity = provider_from_env("PERPLEXITY_API_KEY", "https://api.perplexity.ai");
    config.firecrawl = provider_from_env("FIRECRAWL_API_KEY", "https://api.firecrawl.dev");

    config
}

/// Providers that need a key are wired only when one is present; the
/// cascade disables the matching stages otherwise.
fn provider_from_env(key_var: &str, base_url: &str) -> Option<ProviderConfig> {
    let key = env::var(key_var).ok()?;
    if key.trim().is_empty() {
        return None;
    }
    Some(ProviderConfig::new(base_url, Credential::new(key)))
}

fn build_providers(config: &EnrichmentConfig) -> ProviderSet {
    let http = Arc::new(ReqwestHttpClient::new());

    ProviderSet {
        directory: config
            .directory
            .as_ref()
            .map(|c| Arc::new(DirectoryAdapter::new(http.clone(), c)) as _),
        people: config
            .apollo
            .as_ref()
            .map(|c| Arc::new(ApolloAdapter::new(http.clone(), c)) as _),
        email: config
            .hunter
            .as_ref()
            .map(|c| Arc::new(HunterAdapter::new(http.clone(), c)) as _),
        reader: config
            .jina
            .as_ref()
            .map(|c| Arc::new(JinaAdapter::new(http.clone(), c)) as _),
        search: config
            .perplexity
            .as_ref()
            .map(|c| Arc::new(PerplexityAdapter::new(http.clone(), c)) as _),
        scraper: config
            .firecrawl
            .as_ref()
            .map(|c| Arc::new(FirecrawlAdapter::new(http.clone(), c)) as _),
    }
}
