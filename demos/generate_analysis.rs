use anyhow::{Context, Result};
use local_model_session::{
    setup_logging, CandleEngineFactory, CandleSettings, Features, LogConfig, SessionConfig, SessionEvent,
    SessionManager,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a recovery coach. Reply with one JSON object \
containing \"status\" and \"advice\".";

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging(LogConfig::default())?;

    // usage: generate_analysis <bundle-dir> [summary-json] [config.json]
    let mut args = std::env::args().skip(1);
    let bundle_dir = PathBuf::from(args.next().context("missing bundle directory argument")?);
    let summary = args
        .next()
        .unwrap_or_else(|| r#"{"resting_hr": 58, "hrv_ms": 72, "sleep_hours": 7.5}"#.to_string());

    let mut config = match args.next() {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };
    config.asset.bundle_dir = bundle_dir.clone();

    info!("{}", Features::detect());

    let factory = CandleEngineFactory::new(CandleSettings::new(bundle_dir.join("tokenizer.json")));
    let manager = SessionManager::builder()
        .with_config(config)
        .with_factory(Arc::new(factory))
        .build()?;

    let mut events = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Ready { load_time } => info!(?load_time, "Model ready"),
                SessionEvent::Response { latency, .. } => info!(?latency, "Response received"),
                SessionEvent::Failed { kind, message } => info!(?kind, %message, "Request failed"),
            }
        }
    });

    let outcome = manager.generate_analysis(SYSTEM_PROMPT, &summary).await;
    match (&outcome.response, &outcome.error) {
        (Some(text), None) => println!("{}", text),
        (_, Some(err)) => eprintln!("analysis failed: {}", err),
        (None, None) => eprintln!("no response"),
    }

    let metrics = manager.metrics();
    info!(
        load_time = ?metrics.model.load_time,
        latency = ?metrics.processing.last_latency,
        "Session metrics"
    );

    Ok(())
}
