mod support;

use std::str::FromStr;

use axum::http::StatusCode;
use chrono::NaiveDate;
use ledgerdb_core::{RunCounters, ScrapeError, StatementRecord};
use ledgerdb_session::MergeSession;
use rust_decimal::Decimal;
use support::{StubServer, StubState};
use tracing::Span;

fn record(account_id: i64, date: (i32, u32, u32), amount: &str, description: &str) -> StatementRecord {
    StatementRecord::new(
        "capitalone",
        account_id,
        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        Decimal::from_str(amount).unwrap(),
        description,
    )
}

async fn open(server: &StubServer) -> MergeSession {
    MergeSession::open(&server.url, "scraper", "s3cret", Span::none())
        .await
        .expect("session should open")
}

#[tokio::test]
async fn test_identical_records_get_sequences_one_to_three() {
    let server = StubServer::start(StubState::default()).await;
    let mut session = open(&server).await;

    let mut sequences = Vec::new();
    for _ in 0..3 {
        let outcome = session
            .merge(record(5, (2024, 1, 1), "10.00", "STORE"))
            .await
            .unwrap();
        sequences.push(outcome.sequence);
    }

    assert_eq!(sequences, vec![1, 2, 3]);
    let sent = server.statements();
    assert_eq!(sent.len(), 3);
    let wire: Vec<_> = sent.iter().map(|s| s["sequence"].as_u64().unwrap()).collect();
    assert_eq!(wire, vec![1, 2, 3]);
    assert_eq!(sent[0]["statementDate"], "2024-01-01");
    assert_eq!(sent[0]["accountId"], 5);
    assert_eq!(sent[0]["amount"], "10.00");
    assert_eq!(sent[0]["description"], "STORE");
    assert_eq!(sent[0]["source"], "");
}

#[tokio::test]
async fn test_distinct_records_each_start_at_one() {
    let server = StubServer::start(StubState::default()).await;
    let mut session = open(&server).await;

    let a = session.merge(record(5, (2024, 1, 1), "10.00", "STORE")).await.unwrap();
    let b = session.merge(record(5, (2024, 1, 1), "10.00", "CAFE")).await.unwrap();
    let c = session.merge(record(5, (2024, 1, 2), "10.00", "STORE")).await.unwrap();
    let a2 = session.merge(record(5, (2024, 1, 1), "10.00", "STORE")).await.unwrap();
    let d = session.merge(record(7, (2024, 1, 1), "10.00", "STORE")).await.unwrap();

    assert_eq!(
        [a.sequence, b.sequence, c.sequence, a2.sequence, d.sequence],
        [1, 1, 1, 2, 1]
    );
}

#[tokio::test]
async fn test_counters_follow_server_duplicate_count() {
    let state = StubState::default()
        .with_merge_reply(StatusCode::OK, "0")
        .with_merge_reply(StatusCode::OK, "2")
        .with_merge_reply(StatusCode::OK, "1");
    let server = StubServer::start(state).await;
    let mut session = open(&server).await;

    let first = session.merge(record(5, (2024, 1, 1), "1.00", "A")).await.unwrap();
    assert!(first.is_new());
    assert_eq!(session.counters(), RunCounters { processed: 1, inserted: 1 });

    let second = session.merge(record(5, (2024, 1, 1), "2.00", "B")).await.unwrap();
    assert_eq!(second.duplicates, 2);
    assert_eq!(session.counters(), RunCounters { processed: 2, inserted: 1 });

    session.merge(record(5, (2024, 1, 1), "3.00", "C")).await.unwrap();
    assert_eq!(session.close(), RunCounters { processed: 3, inserted: 1 });
}

#[tokio::test]
async fn test_merge_rejects_non_numeric_body() {
    let state = StubState::default().with_merge_reply(StatusCode::OK, "inserted");
    let server = StubServer::start(state).await;
    let mut session = open(&server).await;

    let err = session
        .merge(record(5, (2024, 1, 1), "1.00", "A"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::ServerRequest { status: 200, .. }));
    assert_eq!(session.counters(), RunCounters::default());
}

#[tokio::test]
async fn test_failed_merge_does_not_advance_sequence() {
    let state = StubState::default().with_merge_reply(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    let server = StubServer::start(state).await;
    let mut session = open(&server).await;

    let err = session
        .merge(record(5, (2024, 1, 1), "1.00", "A"))
        .await
        .unwrap_err();
    match err {
        ScrapeError::ServerRequest { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body.as_deref(), Some("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let retry = session.merge(record(5, (2024, 1, 1), "1.00", "A")).await.unwrap();
    assert_eq!(retry.sequence, 1);
    assert_eq!(session.counters(), RunCounters { processed: 1, inserted: 1 });
}

#[tokio::test]
async fn test_merge_sends_basic_auth_and_accepts_text() {
    let server = StubServer::start(StubState::default()).await;
    let mut session = open(&server).await;
    session.merge(record(5, (2024, 1, 1), "1.00", "A")).await.unwrap();

    let state = server.state.lock().unwrap();
    assert_eq!(state.statement_accepts, vec![Some("text/plain".to_string())]);
    let auth = state.authorization.last().cloned().flatten().unwrap();
    // base64("scraper:s3cret")
    assert_eq!(auth, "Basic c2NyYXBlcjpzM2NyZXQ=");
}

#[tokio::test]
async fn test_resolve_account_id_is_never_cached() {
    let state = StubState::default().with_link("rbc", "123451234567", 42);
    let server = StubServer::start(state).await;
    let mut session = open(&server).await;

    let first = session.resolve_account_id("rbc", "123451234567").await.unwrap();
    let second = session.resolve_account_id("rbc", "123451234567").await.unwrap();

    assert_eq!((first, second), (42, 42));
    assert_eq!(server.link_requests(), 2);
}

#[tokio::test]
async fn test_resolve_unknown_reference_is_server_request_error() {
    let server = StubServer::start(StubState::default()).await;
    let mut session = open(&server).await;

    let err = session.resolve_account_id("capitalone", "1234").await.unwrap_err();
    match err {
        ScrapeError::ServerRequest { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body.as_deref(), Some("institution link not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_open_ignores_reachability_status() {
    // The stub answers GET / with 401.
    let server = StubServer::start(StubState::default()).await;
    assert!(MergeSession::open(&server.url, "x", "y", Span::none()).await.is_ok());
}

#[tokio::test]
async fn test_open_unreachable_server_is_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = MergeSession::open(&url, "x", "y", Span::none()).await.unwrap_err();
    match err {
        ScrapeError::Connectivity { url: got, .. } => assert_eq!(got, url),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_connectivity_error_hides_url_userinfo() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://scraper:hunter2@{addr}/");
    let err = MergeSession::open(&url, "x", "y", Span::none()).await.unwrap_err();
    assert!(!err.to_string().contains("hunter2"));
    match err {
        ScrapeError::Connectivity { url: got, .. } => assert_eq!(got, format!("http://{addr}/")),
        other => panic!("unexpected error: {other:?}"),
    }
}
