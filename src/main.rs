use std::sync::Arc;

use anyhow::Result;
use dryuntil_core::{AppError, Config, SinkKind};
use dryuntil_weather::{
    ConsoleSink, FixedPositionSource, JsonSink, NotificationSink, PositionEvent, WeatherAggregator,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dryuntil_core::init()?;

    if let Err(e) = run().await {
        let app_err = AppError::from_anyhow(e);
        tracing::error!("{}", app_err);
        eprintln!("dryuntil: {}", app_err.user_message());
        return Err(app_err.into());
    }

    Ok(())
}

async fn run() -> Result<()> {
    let (config, _validation) = Config::load_validated()?;

    let sink: Arc<dyn NotificationSink> = match config.notifier.sink {
        SinkKind::Console => Arc::new(ConsoleSink),
        SinkKind::Json => Arc::new(JsonSink),
    };
    let aggregator = WeatherAggregator::from_config(&config, sink)?;

    let source = FixedPositionSource::from_config(&config.location);
    let options = source.options();
    tracing::info!(
        timeout_ms = options.timeout.as_millis() as u64,
        maximum_age_ms = options.maximum_age.as_millis() as u64,
        "dryuntil started"
    );
    let mut events = source.watch();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PositionEvent::Resolved(position)) => {
                    aggregator.on_position_resolved(position);
                }
                Some(PositionEvent::Failed(e)) => {
                    tracing::debug!("Position source error: {}", e);
                    aggregator.on_position_failed(e.code());
                }
                None => break,
            },
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
