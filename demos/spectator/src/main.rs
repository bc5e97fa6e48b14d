use std::time::Duration;

use agar::prelude::*;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

const REPORT_EVERY: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn report(world: &WorldStore) -> Result<(), serde_json::Error> {
    let snapshot = world.snapshot();
    let largest = snapshot
        .entities()
        .values()
        .max_by_key(|e| e.radius)
        .map(|e| e.name.as_str())
        .unwrap_or("-");
    tracing::info!(
        entities = snapshot.len(),
        owned = ?world.owned_ids(),
        largest,
        "world"
    );
    tracing::debug!(snapshot = %serde_json::to_string(&snapshot)?, "world snapshot");
    Ok(())
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let nickname = std::env::args().nth(1).unwrap_or_else(|| "agar-rs".to_string());
    let handshake = HttpHandshake::new(HandshakeConfig {
        region: std::env::var("AGAR_REGION").ok(),
        ..HandshakeConfig::default()
    });

    let manager = TransportManager::new(handshake, TransportConfig::default());
    let mut events = manager.subscribe();
    let client = AgarClient::attach(&manager, ClientConfig::default())?;

    manager.start().await?;
    client.start_processing_loop()?;
    let token = manager
        .session()
        .map(|s| s.token.clone())
        .ok_or("no session after start")?;
    client.start_initialization(&token)?;
    client.submit(Command::Spawn { name: nickname })?;

    let world = client.world();
    let mut ticker = tokio::time::interval(REPORT_EVERY);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(TransportEvent::Closed { reason }) => {
                    tracing::warn!(%reason, "session ended");
                    break;
                }
                Ok(TransportEvent::Connected { .. }) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => report(&world)?,
        }
    }

    client.stop_processing_loop().await;
    manager.stop().await?;
    Ok(())
}
