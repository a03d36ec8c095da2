//! `mediavault <root> serve [--port N] [--bind ADDR]`

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use tracing::{info, warn};

use mediavault::Archive;
use mediavault::server;

/// Execute the serve command. Runs until Ctrl+C.
pub async fn execute(archive: &Archive) -> Result<()> {
    let config = &archive.config().server;
    let ip: IpAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind))?;
    let addr = SocketAddr::new(ip, config.port);

    let listener = server::bind(addr).await?;
    println!("Serving {} on http://{addr}", archive.root().display());
    println!("Press Ctrl+C to stop");

    server::serve(listener, archive.store().clone(), shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl+C, serving until killed");
            std::future::pending::<()>().await;
        },
    }
}
