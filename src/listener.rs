//! TCP accept loop.
//!
//! Each accepted connection is handed to its own task immediately; the
//! accept loop never waits on a session's lifetime. Per-connection
//! failures are logged and dropped — nothing a client does can take the
//! listener down.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::audit::AuditSink;
use crate::config::ServerConfig;
use crate::transport::{self, SessionBootstrap};

pub async fn run(
    server: &ServerConfig,
    bootstrap: Arc<SessionBootstrap>,
    sink: Arc<AuditSink>,
) -> Result<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    // max_sessions = 0 keeps the historical unbounded behavior
    let cap = server.max_sessions;
    let semaphore = (cap > 0).then(|| Arc::new(Semaphore::new(cap)));
    match &semaphore {
        Some(_) => info!("Session cap: {cap}"),
        None => warn!(
            "No session cap configured — unbounded concurrent sessions \
             can exhaust file descriptors under load"
        ),
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("Accept failed: {e}");
                continue;
            }
        };
        let client = peer.ip().to_string();

        let permit = match &semaphore {
            Some(semaphore) => match semaphore.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!("Session cap reached, dropping connection from {client}");
                    sink.alert(&format!(
                        "Session cap ({cap}) reached, dropped connection from {client}"
                    ))
                    .await;
                    continue;
                }
            },
            None => None,
        };

        info!("{client} connected");
        let bootstrap = bootstrap.clone();
        tokio::spawn(async move {
            // Held for the session's lifetime
            let _permit = permit;
            if let Err(e) = transport::handle_connection(bootstrap, stream, client.clone()).await {
                debug!("Session for {client} ended with error: {e}");
            }
        });
    }
}
