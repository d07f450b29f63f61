//! Contract Test: Error Handling
//!
//! Constraints verified:
//! - No active interface is a hard failure
//! - An apply or read failure aborts the run; later interfaces are untouched
//! - Persistence failures are logged and the run still succeeds
//! - A malformed snapshot file is fatal

mod common;

use common::*;
use drip_core::traits::ConfigStore;
use drip_core::{CsvConfigStore, Error, MemoryConfigStore, Outcome, RunRequest, SnapshotKind};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn no_active_interface_is_an_error() {
    let probe = FakeNetworkProbe::empty();
    let store = MemoryConfigStore::new();

    let err = assert_err!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert!(matches!(err, Error::NoActiveInterface));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn apply_failure_stops_before_the_next_interface() {
    let probe = FakeNetworkProbe::single(lease(), true)
        .with_interface(prod(), false)
        .failing_apply_of(prod().address);
    let store = store_with(Some(prod()), None, None).await;

    let err = assert_err!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert!(matches!(err, Error::Apply { .. }));
    assert!(!probe.calls().contains(&ProbeCall::Read(2)));
    // The aborted pass did not record previous
    assert_eq!(store.load(1, SnapshotKind::Previous).await.unwrap(), None);
}

#[tokio::test]
async fn earlier_interfaces_keep_their_changes() {
    let probe = FakeNetworkProbe::single(lease(), true)
        .with_interface(lease(), true)
        .failing_read_of(2);
    let store = store_with(Some(prod()), None, None).await;

    assert_err!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert_eq!(probe.live(1).snapshot, prod());
    assert_eq!(
        store.load(1, SnapshotKind::Previous).await.unwrap(),
        Some(prod())
    );
}

#[tokio::test]
async fn read_failure_is_fatal() {
    let probe = FakeNetworkProbe::single(prod(), false).failing_read_of(1);
    let store = MemoryConfigStore::new();

    let err = assert_err!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert!(matches!(err, Error::ProbeRead { .. }));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn persistence_failure_does_not_fail_the_run() {
    let probe = FakeNetworkProbe::single(prod(), false);
    let store = ReadOnlyStore::default();

    let report = assert_ok!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert_eq!(report.passes[0].outcome, Outcome::ProductionCaptured);
    assert!(!report.passes[0].previous_recorded);
}

#[tokio::test]
async fn persistence_failure_after_apply_keeps_the_change() {
    let probe = FakeNetworkProbe::single(lease(), true);
    let store = ReadOnlyStore::default();
    store
        .inner
        .save(1, SnapshotKind::Production, &prod())
        .await
        .unwrap();

    let report = assert_ok!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert_eq!(report.passes[0].outcome, Outcome::DhcpCorrected);
    assert!(!report.passes[0].previous_recorded);
    assert_eq!(probe.live(1).snapshot, prod());
}

#[tokio::test]
async fn malformed_snapshot_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("ipconfig-1.csv"),
        "IPAddress,PrefixLength,IPv4DefaultGateway,PrimaryDNSServer,SecondaryDNSServer\n\
         not-an-address,24,,,\n",
    )
    .unwrap();

    let probe = FakeNetworkProbe::single(prod(), false);
    let store = CsvConfigStore::new(dir.path());

    let err = assert_err!(orchestrator(&probe, &store).run(RunRequest::automatic()).await);

    assert!(matches!(err, Error::InvalidSnapshot(_)));
    assert!(probe.applies().is_empty());
    assert_eq!(probe.read_count(), 0);
}
