use anyhow::{anyhow, Context};
use jwts_service::grpc::{reflection_server, JwtsGrpc};
use jwts_service::http::{build_router, AppState, RouterOptions};
use jwts_service::{metrics, observability, shutdown, Config, Jwts};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tonic::transport::Server;
use tracing::{error, info};

type ServerTask = JoinHandle<anyhow::Result<()>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("load configuration")?;
    let tracing_guard = observability::init_tracing(
        &config.log_level,
        config.debug,
        config.tracing_endpoint.as_deref(),
    )
    .context("initialize tracing")?;
    metrics::init(&config.namespace);

    info!("Starting JWT service");

    let core = match Jwts::bootstrap(&config).await {
        Ok(core) => Arc::new(core),
        Err(e) => {
            error!(error = %e, fatal = e.is_startup_fatal(), "Startup failed");
            return Err(e.into());
        }
    };

    let (trigger, signal) = shutdown::channel();

    let grpc_addr: SocketAddr = format!("{}:{}", config.host, config.grpc_port)
        .parse()
        .context("gRPC listen address")?;
    let handlers = JwtsGrpc::new(core.clone());
    let reflection = reflection_server().context("gRPC reflection")?;
    let grpc_signal = signal.clone();
    let mut grpc: ServerTask = tokio::spawn(async move {
        Server::builder()
            .trace_fn(|request| observability::request_span("grpc", request))
            .add_service(reflection)
            .add_service(handlers.jwk_server())
            .add_service(handlers.jwt_server())
            .serve_with_shutdown(grpc_addr, grpc_signal.recv())
            .await
            .context("gRPC server")
    });

    let http_addr: SocketAddr = format!("{}:{}", config.host, config.http_port)
        .parse()
        .context("HTTP listen address")?;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("bind HTTP listener on {http_addr}"))?;
    let router = build_router(
        AppState { core },
        RouterOptions {
            cors: config.http_cors,
            metrics: config.with_metrics,
        },
    );
    let http_signal = signal.clone();
    let mut http: ServerTask = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(http_signal.recv())
            .await
            .context("HTTP server")
    });

    info!(%grpc_addr, %http_addr, "JWT service listening");

    let stopped_early = tokio::select! {
        _ = shutdown::wait_for_signal() => None,
        res = &mut grpc => Some(res),
        res = &mut http => Some(res),
    };

    trigger.trigger();

    if let Some(res) = stopped_early {
        grpc.abort();
        http.abort();
        let err = match res {
            Ok(Ok(())) => anyhow!("server stopped unexpectedly"),
            Ok(Err(e)) => e,
            Err(e) => anyhow::Error::from(e).context("server task"),
        };
        error!(error = %err, "Server failure");
        tracing_guard.shutdown();
        return Err(err);
    }

    let servers = async {
        let (grpc, http) = tokio::join!(grpc, http);
        for (name, res) in [("grpc", grpc), ("http", http)] {
            match res {
                Ok(Ok(())) => info!(server = name, "Server stopped"),
                Ok(Err(e)) => error!(server = name, error = %e, "Server error during shutdown"),
                Err(e) => error!(server = name, error = %e, "Server task failed"),
            }
        }
    };
    shutdown::drain(servers, config.shutdown_timeout).await;

    info!("Shutdown complete");
    tracing_guard.shutdown();
    Ok(())
}
