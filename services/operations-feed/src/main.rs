use std::sync::Arc;

use operations_feed::age::SystemClock;
use operations_feed::config::FeedConfig;
use operations_feed::controller::SyncController;
use operations_feed::emitter::EventEmitter;
use operations_feed::horizon::HorizonClient;
use operations_feed::source::Scope;
use operations_feed::stream::OperationStream;
use operations_feed::SERVICE_VERSION;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = FeedConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        version = SERVICE_VERSION,
        horizon = %config.horizon_url,
        limit = config.limit,
        "Starting operations feed"
    );

    let client = HorizonClient::new(config.horizon_url.clone());
    let emitter = EventEmitter::new();

    let stream = if config.stream_live {
        let scope = Scope::from_filter(config.account_filter.as_ref());
        Some(OperationStream::new(client.clone(), scope, emitter.clone(), config.event_name.clone()).spawn())
    } else {
        None
    };

    let mut controller = SyncController::new(
        config,
        Arc::new(client),
        Arc::new(emitter.clone()),
        Arc::new(SystemClock),
    )?;
    let mut snapshots = controller.subscribe_snapshots();

    if let Err(e) = controller.start().await {
        tracing::error!(error = %e, "Feed did not go live");
    }

    let title = controller.heading();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                tracing::info!(version = snapshot.version, rows = snapshot.len(), "{}", title);
                for row in &snapshot.rows {
                    println!("{}", row);
                }
            }
        }
    }

    tracing::info!("Shutting down operations feed");
    controller.stop().await;
    if let Some(stream) = stream {
        stream.abort();
    }

    Ok(())
}
