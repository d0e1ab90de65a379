//! Harbor S3 Server - S3-compatible multipart upload gateway.
//!
//! This binary serves the Harbor gateway over HTTP/1.1 and HTTP/2, verifying
//! SigV4 signatures against credentials taken from the environment, and
//! exposes a health check endpoint for orchestration systems.
//!
//! # Usage
//!
//! ```text
//! ACCESS_KEY=admin SECRET_KEY=secret GATEWAY_LISTEN=0.0.0.0:4566 harbor-s3-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4566` | Bind address |
//! | `S3_SKIP_SIGNATURE_VALIDATION` | `false` | Skip SigV4 verification and ownership checks |
//! | `S3_MIN_PART_SIZE` | `5242880` | Minimum size of every part but the last |
//! | `S3_MAX_PART_SIZE` | `2147483648` | Maximum size of one part |
//! | `S3_KEEP_ALIVE_INTERVAL_SECS` | `10` | Keep-alive cadence of streamed completions |
//! | `S3_DEFAULT_POOL` | `harbor` | Pool assigned to new buckets |
//! | `ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | *(unset)* | Access key accepted by the gateway |
//! | `SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Secret for that access key |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use harbor_s3_auth::{SigV4Authenticator, StaticCredentialStore};
use harbor_s3_core::{HarborHandler, HarborS3, S3Config};
use harbor_s3_http::dispatch::S3Handler;
use harbor_s3_http::service::{S3HttpConfig, S3HttpService};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the [`S3HttpConfig`] from the application [`S3Config`].
fn build_http_config(config: &S3Config) -> S3HttpConfig {
    let authenticator = credentials_from_env().map(|(access_key, secret_key)| {
        info!(access_key = %access_key, "configured credentials from environment");
        let store = StaticCredentialStore::from_pairs([(access_key, secret_key)]);
        SigV4Authenticator::new(Arc::new(store))
    });

    if authenticator.is_none() && !config.s3_skip_signature_validation {
        warn!("no credentials configured; every signed request will be rejected");
    }

    S3HttpConfig {
        skip_signature_validation: config.s3_skip_signature_validation,
        authenticator,
    }
}

/// Read `ACCESS_KEY` / `SECRET_KEY`, falling back to the AWS variable names.
fn credentials_from_env() -> Option<(String, String)> {
    let access_key = std::env::var("ACCESS_KEY")
        .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
        .ok()?;
    let secret_key = std::env::var("SECRET_KEY")
        .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
        .ok()?;
    Some((access_key, secret_key))
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<H: S3Handler>(listener: TcpListener, service: S3HttpService<H>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests, streamed completions included.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the gateway and requesting the health endpoint.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /_health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = S3Config::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = S3Config::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        s3_skip_signature_validation = config.s3_skip_signature_validation,
        s3_min_part_size = config.s3_min_part_size,
        s3_default_pool = %config.s3_default_pool,
        region = %config.default_region,
        version = VERSION,
        "starting Harbor S3 Server",
    );

    let http_config = build_http_config(&config);
    let handler = HarborHandler(HarborS3::new(config.clone()));
    let service = S3HttpService::new(handler, http_config);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
