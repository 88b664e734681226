use core::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use builder_desk_backend::Desk;
use futures_util::pin_mut;
use http::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug_span, error, info, warn, Instrument as _};

use crate::error::AppError;
use crate::router::route;

// https://github.com/tokio-rs/axum/blob/af13c539386463b04b82f58155ee04702527212b/axum/src/serve.rs#L279

/// Serves until ctrl-c or SIGTERM, then lets open connections finish.
#[allow(clippy::redundant_pub_crate)]
pub async fn run_server(listen: SocketAddr, desk: Desk) -> Result<(), AppError> {
    let listener = TcpListener::bind(listen).await?;

    // tell the connections to shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    // wait for the connections to finish shutdown
    let (closed_tx, closed_rx) = watch::channel(());

    info!(%listen, "started up server");

    let shutdown = shutdown_signal();
    pin_mut!(shutdown);

    loop {
        select! {
            accept = listener.accept() => {
                let (socket, remote_addr) = match accept {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        warn!(%error, "failed to accept connection");
                        continue;
                    }
                };

                let desk = desk.clone();
                let shutdown_tx = Arc::clone(&shutdown_tx);
                let closed_rx = closed_rx.clone();

                let connection = async move {
                    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                        let desk = desk.clone();
                        async move { Ok::<_, Infallible>(route(&desk, request).await) }
                    });

                    let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                    let connection = builder.serve_connection(TokioIo::new(socket), service);
                    pin_mut!(connection);

                    let result = select! {
                        result = connection.as_mut() => result,
                        () = shutdown_tx.closed() => {
                            connection.as_mut().graceful_shutdown();
                            connection.as_mut().await
                        }
                    };
                    if let Err(err) = result {
                        error!("failed to serve connection: {err:#}");
                    }

                    drop(closed_rx);
                };
                tokio::spawn(connection.instrument(debug_span!("connection", %remote_addr)));
            }
            () = &mut shutdown => {
                warn!("shutting down, waiting for open connections");
                drop(shutdown_rx); // initiate shutdown
                drop(closed_rx);
                closed_tx.closed().await;
                break;
            }
        }
    }

    info!("server stopped");
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to listen for ctrl-c");
            core::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to listen for SIGTERM");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
