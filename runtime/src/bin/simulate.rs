//! Box Office load simulator
//!
//! Drives a [`DefaultTicketService`] with random traffic: each simulated
//! customer repeatedly asks for 1 to N seats in a random level range and
//! confirms about half of the holds it gets. Unconfirmed holds expire and
//! their seats go back on sale.
//!
//! # Usage
//!
//! ```bash
//! BOX_OFFICE_SIM_WORKERS=8 BOX_OFFICE_SIM_DURATION_SECS=20 \
//!     cargo run --bin box-office-simulate
//! ```
//!
//! Settings are read from the environment (and `.env`); see
//! [`box_office_runtime::config`].

use box_office_core::{LevelId, SeatHold, Venue};
use box_office_runtime::metrics::MetricsRecorder;
use box_office_runtime::{DefaultTicketService, SimulationConfig, TicketService};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default)]
struct Stats {
    requests: AtomicU64,
    holds: AtomicU64,
    rejected: AtomicU64,
    reserved: AtomicU64,
    failed: AtomicU64,
    expired: AtomicU64,
}

impl Stats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

async fn customer(
    worker: usize,
    service: DefaultTicketService,
    config: Arc<SimulationConfig>,
    stats: Arc<Stats>,
    deadline: Instant,
) -> anyhow::Result<()> {
    let mut rng = StdRng::from_entropy();
    let email = format!("customer{worker}@example.com");
    let venue = service.venue();
    let (first, last) = (venue.min_level().get(), venue.max_level().get());

    while Instant::now() < deadline {
        let num_seats = rng.gen_range(1..=config.max_seats_per_request);
        let a = rng.gen_range(first..=last);
        let b = rng.gen_range(first..=last);
        let (min, max) = (LevelId::new(a.min(b)), LevelId::new(a.max(b)));

        Stats::bump(&stats.requests);
        match service
            .find_and_hold_seats(num_seats, Some(min), Some(max), &email)
            .await?
        {
            Some(hold) => {
                Stats::bump(&stats.holds);
                if rng.gen_bool(0.5) {
                    let think = rng.gen_range(0..=config.request_interval.as_millis().max(1));
                    tokio::time::sleep(Duration::from_millis(u64::try_from(think).unwrap_or(0))).await;
                    match service.reserve_seats(hold.id(), &email).await {
                        Ok(_) => Stats::bump(&stats.reserved),
                        Err(e) => {
                            tracing::debug!(worker, error = %e, "reservation failed");
                            Stats::bump(&stats.failed);
                        },
                    }
                }
            },
            None => Stats::bump(&stats.rejected),
        }

        tokio::time::sleep(config.request_interval).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(SimulationConfig::from_env()?);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut recorder = MetricsRecorder::new();
    recorder.install()?;

    let stats = Arc::new(Stats::default());
    let venue = Arc::new(Venue::grand_hall()?);

    let expired = Arc::clone(&stats);
    let service = DefaultTicketService::builder(Arc::clone(&venue))
        .config(config.service)
        .expiry_listener(move |hold: &SeatHold| {
            Stats::bump(&expired.expired);
            tracing::debug!(hold_id = %hold.id(), seats = hold.seat_count(), "seats released");
        })
        .build()?;

    tracing::info!(
        workers = config.workers,
        duration_secs = config.duration.as_secs(),
        hold_timeout_ms = u64::try_from(config.service.hold_timeout.as_millis()).unwrap_or(u64::MAX),
        total_seats = venue.total_seats(),
        "Starting simulation"
    );

    let deadline = Instant::now() + config.duration;
    let mut workers = Vec::with_capacity(config.workers);
    for worker in 0..config.workers {
        workers.push(tokio::spawn(customer(
            worker,
            service.clone(),
            Arc::clone(&config),
            Arc::clone(&stats),
            deadline,
        )));
    }
    for worker in workers {
        worker.await??;
    }

    let released = service.shutdown().await;

    println!("\n=== Box Office simulation ===");
    println!("requests : {}", stats.requests.load(Ordering::Relaxed));
    println!("holds    : {}", stats.holds.load(Ordering::Relaxed));
    println!("rejected : {}", stats.rejected.load(Ordering::Relaxed));
    println!("reserved : {}", stats.reserved.load(Ordering::Relaxed));
    println!("failed   : {}", stats.failed.load(Ordering::Relaxed));
    println!("expired  : {} ({released} at shutdown)", stats.expired.load(Ordering::Relaxed));
    println!();
    for level in venue.levels() {
        let counts = service.availability(level.id()).await?;
        println!(
            "{:<10} {:>5} reserved / {:>5} total ({} each)",
            level.name(),
            counts.reserved,
            counts.total,
            level.price()
        );
    }

    if let Some(rendered) = recorder.render() {
        println!("\n{rendered}");
    }

    Ok(())
}
