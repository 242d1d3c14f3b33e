//! Subscription Handshake Tests
//!
//! A subscriber obtains a single-use ticket out of band, redeems it, and
//! joins the broadcast group its entitlement allows. Covers ticket
//! consumption, expiry, and the open/gated split of published signals.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use signal_engine::distribution::{DistributionGateway, SignalHub, TicketGate};
use signal_engine::domain::filter::standard_catalog;
use signal_engine::storage::FilterRepository;
use signal_engine::storage::memory::{InMemoryFilterRepository, InMemoryKeyValueStore};

struct Stack {
    filters: Arc<InMemoryFilterRepository>,
    hub: Arc<SignalHub>,
    gateway: DistributionGateway,
    tickets: TicketGate,
}

fn stack() -> Stack {
    let (categories, definitions) = standard_catalog();
    let filters = Arc::new(InMemoryFilterRepository::seeded(categories, definitions));
    let kv = Arc::new(InMemoryKeyValueStore::new());
    let hub = Arc::new(SignalHub::new(16));
    let gateway = DistributionGateway::new(filters.clone(), kv.clone(), hub.clone());
    let tickets = TicketGate::new(kv, Duration::from_secs(120));
    Stack {
        filters,
        hub,
        gateway,
        tickets,
    }
}

// ============================================
// Handshake
// ============================================

#[tokio::test]
async fn entitled_holder_joins_the_gated_group() {
    let stack = stack();

    // server side: look the filter up, issue a ticket for its entitlement
    let entitlement = stack
        .filters
        .entitlement("swing_break")
        .await
        .unwrap()
        .expect("catalog filter");
    assert!(!entitlement.is_free);
    let token = stack.tickets.issue(!entitlement.is_free).await.unwrap();

    // subscriber side: redeem and subscribe accordingly
    let entitled = stack
        .tickets
        .consume(&token)
        .await
        .unwrap()
        .expect("fresh ticket");
    assert!(entitled);
    let mut gated = stack.hub.subscribe_gated();

    stack
        .gateway
        .publish("swing_break", vec![vec![json!("FOO")]])
        .await
        .unwrap();

    let envelope = gated.recv().await.unwrap();
    assert_eq!(envelope.filter_code, "swing_break");
    assert_eq!(envelope.rows, vec![vec![json!("FOO")]]);
}

#[tokio::test]
async fn a_ticket_cannot_be_replayed() {
    let stack = stack();
    let token = stack.tickets.issue(true).await.unwrap();

    assert_eq!(stack.tickets.consume(&token).await.unwrap(), Some(true));
    // a second redeemer presenting the same token is turned away
    assert_eq!(stack.tickets.consume(&token).await.unwrap(), None);
}

#[tokio::test]
async fn unredeemed_tickets_expire() {
    let tickets = TicketGate::new(
        Arc::new(InMemoryKeyValueStore::new()),
        Duration::from_millis(10),
    );

    let token = tickets.issue(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(tickets.consume(&token).await.unwrap(), None);
}

// ============================================
// Open vs gated fan-out
// ============================================

#[tokio::test]
async fn free_signals_reach_unentitled_subscribers() {
    let stack = stack();
    let mut open = stack.hub.subscribe_open();
    let mut gated = stack.hub.subscribe_gated();

    stack
        .gateway
        .publish("ceiling_queue", vec![vec![json!("FOO")]])
        .await
        .unwrap();

    assert_eq!(open.recv().await.unwrap().filter_code, "ceiling_queue");
    assert!(gated.try_recv().is_err());
}

#[tokio::test]
async fn gated_signals_reach_both_groups() {
    let stack = stack();
    let mut open = stack.hub.subscribe_open();
    let mut gated = stack.hub.subscribe_gated();

    stack
        .gateway
        .publish("unusual_money_flow", vec![vec![
            json!("10:00:00"),
            json!("FOO"),
            json!("buy"),
            json!("2 B"),
            json!("1 B"),
            json!("0.5 B"),
            json!("2"),
            json!("5,000"),
        ]])
        .await
        .unwrap();

    assert_eq!(open.recv().await.unwrap().filter_code, "unusual_money_flow");
    assert_eq!(gated.recv().await.unwrap().filter_code, "unusual_money_flow");
}

#[tokio::test]
async fn late_subscribers_can_fetch_the_cached_table() {
    let stack = stack();

    stack
        .gateway
        .publish("ceiling_queue", vec![vec![json!("FOO"), json!("5,000")]])
        .await
        .unwrap();

    // no live subscription existed at publish time
    let cached = stack.gateway.cached("ceiling_queue").await.unwrap();
    assert_eq!(cached, vec![vec![json!("FOO"), json!("5,000")]]);
}
