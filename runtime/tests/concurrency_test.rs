//! Concurrency tests for the ticket service.
//!
//! Many tasks hit one service on a multi-threaded runtime. Whatever the
//! interleaving, no seat may be handed out twice and, once every timer has
//! run, no seat may be left held.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use box_office_core::{LevelId, SeatKey, TicketError};
use box_office_runtime::{DefaultTicketService, TicketService};
use box_office_testing::RecordingExpiryListener;
use box_office_testing::fixtures::{self, TEST_EMAIL};
use std::collections::HashSet;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_holds_never_share_seats() {
    let venue = fixtures::venue_from_layout(&[(2, 5), (2, 5)]);
    let service = DefaultTicketService::builder(venue)
        .hold_timeout(Duration::from_secs(60))
        .build()
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.find_and_hold_seats(1, None, None, TEST_EMAIL).await
        }));
    }

    let mut seats = HashSet::new();
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            Some(hold) => {
                for seat in hold.seats() {
                    assert!(seats.insert(seat.key()), "{seat} was held twice");
                }
            },
            None => rejected += 1,
        }
    }

    assert_eq!(seats.len(), 20);
    assert_eq!(rejected, 30);
    assert_eq!(service.num_seats_available(None).await.unwrap(), 0);
    assert_eq!(service.shutdown().await, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_traffic_leaves_no_orphaned_holds() {
    let listener = RecordingExpiryListener::new();
    let venue = fixtures::standard_venue();
    let service = DefaultTicketService::builder(venue.clone())
        .hold_timeout(Duration::from_millis(200))
        .expiry_listener(listener.clone())
        .build()
        .unwrap();

    let mut tasks = Vec::new();
    for worker in 0..16_u32 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let mut reserved: Vec<SeatKey> = Vec::new();
            let mut held = 0_usize;
            for round in 0..20_u32 {
                let num_seats = 1 + (worker + round) % 10;
                let min = LevelId::new(1 + (worker + round) % 4);
                let Some(hold) = service
                    .find_and_hold_seats(num_seats, Some(min), None, TEST_EMAIL)
                    .await
                    .unwrap()
                else {
                    continue;
                };
                held += 1;

                if round % 2 == 0 {
                    match service.reserve_seats(hold.id(), TEST_EMAIL).await {
                        Ok(_) => reserved.extend(hold.seats().iter().map(|seat| seat.key())),
                        // the timer may win on a slow machine
                        Err(TicketError::HoldNotFound(_)) => {},
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                tokio::task::yield_now().await;
            }
            (reserved, held)
        }));
    }

    let mut reserved = HashSet::new();
    let mut holds = 0;
    for task in tasks {
        let (seats, held) = task.await.unwrap();
        holds += held;
        for key in seats {
            assert!(reserved.insert(key), "{key} was reserved twice");
        }
    }

    // every unconfirmed hold expires
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(service.pending_holds().await, 0);

    let mut available = 0_u64;
    let mut total_reserved = 0_u64;
    for level in venue.levels() {
        let counts = service.availability(level.id()).await.unwrap();
        assert_eq!(counts.held, 0, "level {} has orphaned holds", level.id());
        assert_eq!(counts.available + counts.reserved, counts.total);
        available += u64::from(counts.available);
        total_reserved += u64::from(counts.reserved);
    }
    assert_eq!(available + total_reserved, venue.total_seats());
    assert_eq!(total_reserved, reserved.len() as u64);
    assert!(listener.count() <= holds);
}
