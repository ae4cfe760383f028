use anyhow::{Result, bail};
use tarifa::Config;
use tarifa::logging::init_logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let arg = std::env::args().nth(1);
    if matches!(arg.as_deref(), Some("--version") | Some("-V")) {
        println!("tarifa {}", env!("APP_VERSION"));
        return Ok(());
    }

    let mut config = match &arg {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    config.apply_env_overrides();
    config.validate()?;
    init_logging(&config.logging)?;

    info!("Tarifa {} starting up", env!("APP_VERSION"));
    run(config).await
}

#[cfg(feature = "http")]
async fn run(config: Config) -> Result<()> {
    use serde_json::json;
    use tarifa::RetrievalCoordinator;
    use tarifa::cache::{FileStore, TtlCache};
    use tarifa::gateway::HttpGateway;
    use tarifa::logging::{LogContext, get_logger_with_context};

    if config.api.token.trim().is_empty() {
        bail!("No API token configured; set api.token or TARIFA_TOKEN");
    }
    let tz = config.timezone()?;
    let contract_query = config.supply.contract_query()?;
    let consumption_query = config
        .supply
        .consumption_query(tarifa::MonthKey::current_in(tz))?;

    let store = FileStore::open(&config.cache.path, config.cache.max_bytes);
    let gateway = HttpGateway::new(&config.api)?;
    let mut coordinator =
        RetrievalCoordinator::new(Box::new(gateway), TtlCache::new(store), &config.cache);

    let logger =
        get_logger_with_context(LogContext::new("session").with_cups(config.supply.cups.clone()));
    logger.info(&format!(
        "Fetching {}..{} (cache {})",
        consumption_query.start, consumption_query.end, config.cache.path
    ));

    let token = config.api.token.as_str();
    let contract = coordinator
        .fetch_contract(token, &contract_query)
        .await
        .map_err(describe)?;
    let summary = coordinator
        .monthly_summary(token, &consumption_query, tz)
        .await
        .map_err(describe)?;

    for notice in [contract.notice(), summary.notice()].into_iter().flatten() {
        logger.warn(&notice);
    }

    let out = json!({
        "contract": contract.value,
        "contractProvenance": contract.provenance,
        "summary": summary.value,
        "provenance": summary.provenance,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[cfg(feature = "http")]
fn describe(err: tarifa::TarifaError) -> anyhow::Error {
    match err.failure_kind() {
        Some(kind) => anyhow::anyhow!("Retrieval failed ({}): {}", kind.as_str(), err),
        None => anyhow::anyhow!("Retrieval failed: {}", err),
    }
}

#[cfg(not(feature = "http"))]
async fn run(_config: Config) -> Result<()> {
    bail!("Built without the `http` feature; no provider client available")
}
