//! Walkthrough of one worker generation going offline and being updated.
//!
//! Run with: RUST_LOG=debug cargo run --example offline_walkthrough

use offline_kit::backend::{CacheStorage, InMemoryStorage};
use offline_kit::fetcher::InMemoryFetcher;
use offline_kit::observability::CountingMetrics;
use offline_kit::{
    Destination, EventOutcome, OfflineWorker, Registration, Request, Response, Result,
    UpdateOutcome, WorkerConfig,
};
use std::sync::Arc;

const ORIGIN: &str = "https://portfolio.example";

fn describe(outcome: &EventOutcome) -> String {
    match outcome {
        EventOutcome::Respond(served) => format!(
            "{} from {:?}: {}",
            served.response.status,
            served.source,
            served.response.text()
        ),
        EventOutcome::Passthrough(reason) => format!("passthrough ({})", reason),
        other => format!("{:?}", other),
    }
}

fn config(version: &str) -> Result<WorkerConfig> {
    Ok(WorkerConfig::for_origin(ORIGIN)?
        .with_version(version)
        .with_static_assets(["/", "/offline.html", "/favicon.svg"])
        .with_skip_waiting_on_install(false))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    println!("\n=== offline-kit walkthrough ===\n");

    let storage = InMemoryStorage::new();
    let fetcher = InMemoryFetcher::new();
    fetcher.respond(&format!("{}/", ORIGIN), Response::ok("<h1>Portfolio</h1>"));
    fetcher.respond(&format!("{}/offline.html", ORIGIN), Response::ok("<h1>You are offline</h1>"));
    fetcher.respond(&format!("{}/favicon.svg", ORIGIN), Response::ok("<svg/>"));
    fetcher.respond(&format!("{}/img/me.webp", ORIGIN), Response::ok(vec![0u8; 2048]));
    fetcher.respond(&format!("{}/api/projects", ORIGIN), Response::ok(r#"[{"id":1}]"#));

    // 1. First generation installs and takes control
    println!("1. Registering v1...");
    let metrics = Arc::new(CountingMetrics::new());
    let v1 = OfflineWorker::<InMemoryStorage, InMemoryFetcher>::builder(config("1")?)
        .metrics(metrics.clone())
        .build(storage.clone(), fetcher.clone())?;
    let registration = Registration::new();
    registration.update(v1).await?;
    println!("   ✓ Stores: {:?}\n", storage.keys().await?);

    // 2. Online requests
    println!("2. Online:");
    let image = || {
        Request::get(&format!("{}/img/me.webp", ORIGIN)).map(|r| r.with_destination(Destination::Image))
    };
    let api = || Request::get(&format!("{}/api/projects", ORIGIN));
    let page = || {
        Request::get(&format!("{}/about", ORIGIN)).map(|r| r.with_destination(Destination::Document))
    };
    println!("   image: {}", describe(&registration.fetch(image()?).await?));
    println!("   image: {}", describe(&registration.fetch(image()?).await?));
    println!("   api:   {}\n", describe(&registration.fetch(api()?).await?));

    // 3. Offline requests
    println!("3. Offline:");
    fetcher.set_offline(true);
    println!("   image: {}", describe(&registration.fetch(image()?).await?));
    println!("   api:   {}", describe(&registration.fetch(api()?).await?));
    println!("   page:  {}\n", describe(&registration.fetch(page()?).await?));
    fetcher.set_offline(false);

    // 4. Update flow
    println!("4. Registering v2...");
    let v2 = OfflineWorker::new(config("2")?, storage.clone(), fetcher.clone())?;
    if let UpdateOutcome::Waiting = registration.update(v2).await? {
        println!("   ✓ v2 waiting: {}", registration.has_update_waiting().await);
    }
    registration
        .post_message(&serde_json::json!({ "type": "SKIP_WAITING" }))
        .await?;
    println!("   ✓ Stores after activation: {:?}\n", storage.keys().await?);

    let snapshot = metrics.snapshot();
    println!(
        "v1 metrics: {} hits, {} misses, {} fallbacks (hit ratio {:.2})",
        snapshot.cache_hits,
        snapshot.cache_misses,
        snapshot.fallbacks,
        snapshot.hit_ratio()
    );

    Ok(())
}
