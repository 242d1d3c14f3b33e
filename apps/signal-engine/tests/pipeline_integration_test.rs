//! Pipeline Integration Tests
//!
//! End-to-end runs against a mocked upstream source: symbol bootstrap,
//! live-tick ingestion with dedup, filter evaluation and publishing, and
//! end-of-day compaction.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::unreadable_literal)]

use std::sync::Arc;

use signal_engine::config::{CompactionSettings, IngestSettings, SourceSettings};
use signal_engine::distribution::{DistributionGateway, SignalHub};
use signal_engine::domain::Symbol;
use signal_engine::domain::filter::standard_catalog;
use signal_engine::error::SourceError;
use signal_engine::filters::FilterEngine;
use signal_engine::ingest::{
    DailyBootstrapper, HistoryCompactor, IngestOutcome, SnapshotIngestor,
};
use signal_engine::source::SourceClient;
use signal_engine::storage::memory::{
    InMemoryBaselineRepository, InMemoryFilterRepository, InMemoryHistoryRepository,
    InMemoryKeyValueStore, InMemorySnapshotRepository, InMemorySymbolRepository,
};
use signal_engine::storage::{
    BaselineRepository, ChartStore, HistoryRepository, KeyValueStore, SnapshotRepository,
    SymbolRepository,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SYMBOL_ID: &str = "46348559193224090";

/// Reference page: ceiling 5000 so the live tick below sits pinned at it.
const INSTRUMENT_PAGE: &str = "<html><body><script>var TopInst=1,PSGelStaMax='5000',\
PSGelStaMin='4500',ZTitad=1000000000,BaseVol=3200000,KAjCapValCpsIdx='18.5',\
QTotTran5JAvg='2500000',EstimatedEPS='312',SectorPE='7.8',CSecVal='34',LSecVal='Metals',\
Title='Foo Industries - Main Market';</script></body></html>";

/// Live tick: last price 5000 (at the ceiling), previous close 4750.
const LIVE_PAYLOAD: &str = "12:29:38,A,5000,4980,4900,4750,5100,4850,1200,3400000,16900000000;;\
1@1000@4990@5000@500@2,3@2000@4980@5010@700@4,5@1500@4970@5020@300@1,;;\
2500000,900000,,2100000,1300000,410,12,,380,9";

struct Rig {
    symbols: Arc<dyn SymbolRepository>,
    baselines: Arc<dyn BaselineRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    history: Arc<dyn HistoryRepository>,
    kv: Arc<dyn KeyValueStore>,
    charts: ChartStore,
    client: SourceClient,
}

fn rig(server: &MockServer) -> Rig {
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let client = SourceClient::new(&SourceSettings {
        base_url: server.uri(),
        ..SourceSettings::default()
    })
    .expect("client should build");
    Rig {
        symbols: Arc::new(InMemorySymbolRepository::new()),
        baselines: Arc::new(InMemoryBaselineRepository::new()),
        snapshots: Arc::new(InMemorySnapshotRepository::new()),
        history: Arc::new(InMemoryHistoryRepository::new()),
        kv: kv.clone(),
        charts: ChartStore::new(kv),
        client,
    }
}

async fn mount_source(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Loader.aspx"))
        .and(query_param("ParTree", "151311"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INSTRUMENT_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tsev2/data/instinfodata.aspx"))
        .and(query_param("i", SYMBOL_ID))
        .respond_with(ResponseTemplate::new(200).set_body_string(LIVE_PAYLOAD))
        .mount(server)
        .await;
}

fn ingestor(rig: &Rig) -> SnapshotIngestor {
    SnapshotIngestor::new(
        rig.client.clone(),
        rig.symbols.clone(),
        rig.baselines.clone(),
        rig.snapshots.clone(),
        rig.kv.clone(),
        rig.charts.clone(),
        IngestSettings::default(),
    )
}

async fn seed_and_bootstrap(rig: &Rig) -> Symbol {
    rig.symbols
        .insert_many(vec![Symbol::discovered(SYMBOL_ID, "FOO", "Foo Industries")])
        .await
        .unwrap();
    let bootstrapper = DailyBootstrapper::new(
        rig.client.clone(),
        rig.symbols.clone(),
        rig.baselines.clone(),
        rig.charts.clone(),
    );
    assert!(bootstrapper.bootstrap_symbol(SYMBOL_ID).await.unwrap());
    rig.symbols.get(SYMBOL_ID).await.unwrap().expect("seeded")
}

#[tokio::test]
async fn bootstrap_resolves_reference_data_and_is_idempotent() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let rig = rig(&server);

    rig.symbols
        .insert_many(vec![Symbol::discovered(SYMBOL_ID, "FOO", "Foo Industries")])
        .await
        .unwrap();
    let bootstrapper = DailyBootstrapper::new(
        rig.client.clone(),
        rig.symbols.clone(),
        rig.baselines.clone(),
        rig.charts.clone(),
    );

    assert_eq!(bootstrapper.run().await.unwrap(), 1);
    // second sweep finds nothing left to do
    assert_eq!(bootstrapper.run().await.unwrap(), 0);

    let symbol = rig.symbols.get(SYMBOL_ID).await.unwrap().unwrap();
    assert_eq!(symbol.script, Some(34));
    assert_eq!(symbol.group_name, "Metals");
    assert_eq!(symbol.market, "Main Market");
    assert!(symbol.is_ingestible());

    // static reference figures land in the daily chart section
    let blob = rig.charts.fetch(SYMBOL_ID).await.unwrap().expect("chart");
    assert_eq!(blob["daily"]["stock_number"], "1 B");
    assert_eq!(blob["daily"]["base_volume"], "3.2 M");
    assert_eq!(blob["daily"]["group_name"], "Metals");
    assert_eq!(blob["daily"]["market"], "Main Market");
}

#[tokio::test]
async fn identical_ticks_are_deduplicated() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let rig = rig(&server);
    let symbol = seed_and_bootstrap(&rig).await;
    let ingestor = ingestor(&rig);

    let first = ingestor.ingest(&symbol).await.unwrap();
    assert!(matches!(first, IngestOutcome::Accepted { .. }));

    let second = ingestor.ingest(&symbol).await.unwrap();
    assert_eq!(second, IngestOutcome::Duplicate);
}

#[tokio::test]
async fn ticks_older_than_the_latest_snapshot_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Loader.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INSTRUMENT_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tsev2/data/instinfodata.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LIVE_PAYLOAD))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // same day, earlier checksum time, different content hash
    Mock::given(method("GET"))
        .and(path("/tsev2/data/instinfodata.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "09:10:00,A,4990,4975,4900,4750,5100,4850,1100,3300000,16800000000;;;;\
2400000,900000,,2000000,1300000,400,12,,370,9",
        ))
        .mount(&server)
        .await;
    let rig = rig(&server);
    let symbol = seed_and_bootstrap(&rig).await;
    let ingestor = ingestor(&rig);

    let first = ingestor.ingest(&symbol).await.unwrap();
    assert!(matches!(first, IngestOutcome::Accepted { .. }));

    let second = ingestor.ingest(&symbol).await.unwrap();
    assert_eq!(second, IngestOutcome::OutOfOrder);
}

#[tokio::test]
async fn ingestion_requires_a_baseline() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let rig = rig(&server);

    rig.symbols
        .insert_many(vec![Symbol::discovered(SYMBOL_ID, "FOO", "Foo Industries")])
        .await
        .unwrap();
    let mut symbol = rig.symbols.get(SYMBOL_ID).await.unwrap().unwrap();
    symbol.script = Some(34);

    let outcome = ingestor(&rig).ingest(&symbol).await.unwrap();
    assert_eq!(outcome, IngestOutcome::MissingBaseline);
}

#[tokio::test]
async fn accepted_ticks_update_the_chart_blob() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let rig = rig(&server);
    let symbol = seed_and_bootstrap(&rig).await;

    ingestor(&rig).ingest(&symbol).await.unwrap();

    let blob = rig.charts.fetch(SYMBOL_ID).await.unwrap().expect("chart");
    let live = &blob["sections"];
    assert_eq!(live["order_status_table"].as_array().unwrap().len(), 3);
    assert_eq!(live["order_status_table"][0][2], "4,990");
    assert_eq!(live["money_entry_graph"].as_array().unwrap().len(), 1);
    assert_eq!(live["tval"], "16.9 B");
    assert!(live["money_entry_data"]["buy_per_i"].is_string());
}

#[tokio::test]
async fn filter_round_publishes_the_pinned_symbol() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let rig = rig(&server);
    let symbol = seed_and_bootstrap(&rig).await;
    ingestor(&rig).ingest(&symbol).await.unwrap();

    let engine = FilterEngine::standard();
    let results = engine
        .run(&rig.symbols, &rig.snapshots, &rig.history)
        .await
        .unwrap();

    let ceiling = &results["ceiling_queue"];
    assert_eq!(ceiling.len(), 1);
    assert_eq!(ceiling[0][0], "FOO");
    assert_eq!(ceiling[0][1], "5,000");

    let (categories, definitions) = standard_catalog();
    let filters = Arc::new(InMemoryFilterRepository::seeded(categories, definitions));
    let hub = Arc::new(SignalHub::new(16));
    let mut open = hub.subscribe_open();
    let gateway = DistributionGateway::new(filters, rig.kv.clone(), hub.clone());

    let mut published = 0;
    for (code, rows) in results {
        published += gateway.publish(code, rows).await.unwrap();
    }
    assert!(published >= 1);

    let envelopes: Vec<_> = std::iter::from_fn(|| open.try_recv().ok()).collect();
    assert!(envelopes.iter().any(|e| e.filter_code == "ceiling_queue"));
    // empty filter results were not broadcast
    assert!(envelopes.iter().all(|e| !e.rows.is_empty()));
}

#[tokio::test]
async fn compaction_rolls_the_day_into_history() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    let rig = rig(&server);
    let symbol = seed_and_bootstrap(&rig).await;
    ingestor(&rig).ingest(&symbol).await.unwrap();

    let compactor = HistoryCompactor::new(
        rig.snapshots.clone(),
        rig.history.clone(),
        rig.symbols.clone(),
        rig.charts.clone(),
        CompactionSettings::default(),
    );

    let report = compactor.run().await.unwrap();
    assert_eq!(report.records_inserted, 1);
    assert_eq!(report.snapshots_deleted, 1);

    let records = rig.history.latest_per_symbol().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pl, 5000);
    // single-snapshot day: opening book set, closing book left unset
    assert!(!records[0].opening_book.is_empty());
    assert!(records[0].closing_book.is_empty());

    // chart rolled over: daily series written, live section cleared
    let blob = rig.charts.fetch(SYMBOL_ID).await.unwrap().expect("chart");
    assert_eq!(blob["daily"]["price_volume_graph"].as_array().unwrap().len(), 1);
    assert_eq!(blob["sections"], serde_json::json!({}));

    // re-running the compaction is a no-op
    let again = compactor.run().await.unwrap();
    assert_eq!(again.records_inserted, 0);
    assert_eq!(again.snapshots_deleted, 0);
}

#[tokio::test]
async fn halted_status_disallows_the_symbol() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Loader.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INSTRUMENT_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tsev2/data/instinfodata.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "12:29:38,I,5000,4980,4900,4750,5100,4850,1200,3400000,16900000000;;;;",
        ))
        .mount(&server)
        .await;
    let rig = rig(&server);
    let symbol = seed_and_bootstrap(&rig).await;

    let outcome = ingestor(&rig).ingest(&symbol).await.unwrap();

    assert_eq!(outcome, IngestOutcome::Disallowed);
    let stored = rig.symbols.get(SYMBOL_ID).await.unwrap().unwrap();
    assert!(!stored.is_allowed);
    assert!(!stored.is_ingestible());
}

#[tokio::test]
async fn server_errors_surface_as_transient_source_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let client = SourceClient::new(&SourceSettings {
        base_url: server.uri(),
        ..SourceSettings::default()
    })
    .unwrap();

    let err = client
        .live_snapshot(SYMBOL_ID, 34)
        .await
        .expect_err("should fail");
    assert!(matches!(err, SourceError::Status { status: 502 }));
    assert!(err.is_transient());
}
