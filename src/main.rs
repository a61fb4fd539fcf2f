use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use janus_dns::config::{HandlerSource, ServerConfig};
use janus_dns::graceful_shutdown::GracefulShutdown;
use janus_dns::handlers::{DiscoveryHandler, Handler, HttpJsonHandler, Mux, RecursiveHandler, RequestLoggerHandler};
use janus_dns::health::{HealthChecker, HealthTable};
use janus_dns::recursor::{ExchangeClient, RecursorPool};
use janus_dns::records::RecordStore;
use janus_dns::server::Server;
use janus_dns::DnsError;

/// Discovery DNS server for a distributed orchestration platform: answers
/// authoritative job-instance lookups against a records snapshot and
/// forwards everything else to a recursor pool with failover and caching.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON server configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Tracing filter, e.g. "info" or "janus_dns=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log_level)
        .init();

    let config = ServerConfig::from_file(&args.config).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?;

    if let Err(e) = run(config).await {
        error!("fatal error: {e}");
        return Err(std::io::Error::other(e.to_string()));
    }
    Ok(())
}

async fn run(config: ServerConfig) -> Result<(), DnsError> {
    let store = Arc::new(RecordStore::new());
    for alias_file in &config.alias_files {
        store.load_aliases_from_file(alias_file)?;
        info!("loaded aliases from {}", alias_file.display());
    }

    let health_table = match &config.health {
        Some(health_config) if health_config.enabled => Arc::new(HealthTable::with_startup_grace(
            health_config.max_failures,
            health_config.startup_grace,
        )),
        _ => Arc::new(HealthTable::new(3)),
    };

    let shutdown = Arc::new(GracefulShutdown::new());

    let health_checker: Option<Arc<HealthChecker>> = match &config.health {
        Some(health_config) if health_config.enabled => {
            let checker = HealthChecker::new(health_config, health_table.clone())
                .map_err(|e| DnsError::InternalError(format!("building health checker: {e}")))?;
            let checker = Arc::new(checker);
            let checker_for_sweep = checker.clone();
            let sweep_shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                checker_for_sweep.run(sweep_shutdown).await;
            });
            info!("health checker started on port {}", health_config.port);
            Some(checker)
        }
        _ => None,
    };

    let excluded: std::collections::HashSet<_> = config.excluded_recursors.iter().collect();
    let recursors: Vec<_> = config
        .recursors
        .iter()
        .filter(|r| !excluded.contains(r))
        .copied()
        .collect();

    let pool = Arc::new(RecursorPool::new(recursors, config.recursor_selection, config.recursor_max_retries));
    let exchange = Arc::new(ExchangeClient::new(config.recursor_timeout));
    let cache = if config.cache.enabled {
        Some(Arc::new(janus_dns::cache::RecursionCache::new(
            config.cache.min_ttl,
            config.cache.max_ttl,
        )))
    } else {
        None
    };

    let recursive_handler: Arc<dyn Handler> = Arc::new(RecursiveHandler::new(pool, exchange, cache));
    let mut mux = Mux::new(Arc::new(RequestLoggerHandler::new(recursive_handler)));

    for handler_config in &config.handlers {
        let handler: Arc<dyn Handler> = match &handler_config.source {
            HandlerSource::Discovery => {
                let resolver = janus_dns::resolver::LocalDomainResolver::new(
                    store.clone(),
                    health_table.clone(),
                    health_checker.clone(),
                );
                Arc::new(DiscoveryHandler::new(resolver, &handler_config.zone))
            }
            HandlerSource::Recursor { recursors } => {
                let pool = Arc::new(RecursorPool::new(
                    recursors.clone(),
                    config.recursor_selection,
                    config.recursor_max_retries,
                ));
                let exchange = Arc::new(ExchangeClient::new(config.recursor_timeout));
                Arc::new(RecursiveHandler::new(pool, exchange, None))
            }
            HandlerSource::HttpJson { url } => Arc::new(HttpJsonHandler::new(url.clone())),
        };
        mux.register(&handler_config.zone, Arc::new(RequestLoggerHandler::new(handler)));
        info!("registered handler for zone {}", handler_config.zone);
    }

    let server = Arc::new(Server::new(
        Arc::new(mux),
        config.bind_addr(),
        config.recursor_timeout.max(std::time::Duration::from_secs(5)),
    ));

    let server_task = {
        let server = server.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(&shutdown).await })
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
    }
    info!("received shutdown signal");
    if let Err(e) = shutdown.shutdown().await {
        error!("error during shutdown: {e}");
    }

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("server exited with error: {e}"),
        Err(e) => error!("server task panicked: {e}"),
    }

    Ok(())
}
