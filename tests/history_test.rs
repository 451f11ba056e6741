mod common;

use common::*;
use lamport_wallet::error::{DecodeError, ErrorKind, LedgerError};
use lamport_wallet::history::HistoryAggregator;
use lamport_wallet::ledger::transfer::transfer_instruction_data;
use lamport_wallet::ledger::wire::CompiledInstruction;
use lamport_wallet::ledger::SYSTEM_PROGRAM_ID;
use lamport_wallet::LAMPORTS_PER_SOL;
use std::sync::Arc;
use std::time::{Duration, Instant};

const BLOCK_TIME: i64 = 1_700_000_000;

fn aggregator(ledger: &Arc<MockLedger>, concurrency: usize, timeout: Duration) -> HistoryAggregator {
    HistoryAggregator::with_limits(ledger.clone(), concurrency, timeout)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test]
async fn test_one_event_per_transfer_regardless_of_completion_order() {
    init_logging();
    let owner = key(1);
    let peer = key(2);

    // later signatures finish first
    let ledger = Arc::new(
        MockLedger::new()
            .with_transaction("sig-1", transfer_bytes(&owner, &peer, LAMPORTS_PER_SOL), BLOCK_TIME, ms(60))
            .with_transaction("sig-2", transfer_bytes(&peer, &owner, 2 * LAMPORTS_PER_SOL), BLOCK_TIME + 1, ms(30))
            .with_transaction("sig-3", transfer_bytes(&owner, &peer, 3 * LAMPORTS_PER_SOL), BLOCK_TIME + 2, ms(0)),
    );

    let events = aggregator(&ledger, 50, ms(1_000))
        .fetch_transfers(&owner)
        .await
        .unwrap();

    assert_eq!(events.len(), 3);
    let mut amounts: Vec<u64> = events.iter().map(|e| e.amount).collect();
    amounts.sort();
    assert_eq!(
        amounts,
        vec![LAMPORTS_PER_SOL, 2 * LAMPORTS_PER_SOL, 3 * LAMPORTS_PER_SOL]
    );

    let received = events
        .iter()
        .find(|e| e.amount == 2 * LAMPORTS_PER_SOL)
        .unwrap();
    assert!(!received.is_sender);
    assert_eq!(received.from, peer);
    assert_eq!(received.timestamp.timestamp(), BLOCK_TIME + 1);
    assert_eq!(
        events.iter().filter(|e| e.is_sender).count(),
        2,
        "owner sent sig-1 and sig-3"
    );
}

#[tokio::test]
async fn test_no_signatures_yields_no_events() {
    init_logging();
    let ledger = Arc::new(MockLedger::new());

    let events = aggregator(&ledger, 50, ms(1_000))
        .fetch_transfers(&key(1))
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(ledger.fetch_count(), 0);
}

#[tokio::test]
async fn test_single_failure_fails_whole_call() {
    init_logging();
    let owner = key(1);
    let mut ledger = MockLedger::new();
    for i in 0..5 {
        ledger = ledger.with_transaction(
            &format!("sig-{}", i),
            transfer_bytes(&owner, &key(2), 1_000 + i),
            BLOCK_TIME,
            ms(10 * i),
        );
    }
    let ledger = Arc::new(ledger.failing_on("sig-3"));

    let err = aggregator(&ledger, 50, ms(1_000))
        .fetch_transfers(&owner)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    match &err {
        LedgerError::Signature { signature, source } => {
            assert_eq!(signature, "sig-3");
            assert!(matches!(**source, LedgerError::Rpc { code: -32603, .. }));
        }
        other => panic!("expected signature context, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_cancels_queued_work() {
    init_logging();
    let owner = key(1);
    let mut ledger = MockLedger::new();
    for i in 0..20 {
        let signature = format!("sig-{}", i);
        ledger = ledger
            .with_transaction(&signature, transfer_bytes(&owner, &key(2), 1), BLOCK_TIME, ms(5))
            .failing_on(&signature);
    }
    let ledger = Arc::new(ledger);

    let result = aggregator(&ledger, 1, ms(1_000)).fetch_transfers(&owner).await;

    assert!(result.is_err());
    assert!(
        ledger.fetch_count() < 20,
        "queued tasks should not start after the first failure, {} ran",
        ledger.fetch_count()
    );
}

#[tokio::test]
async fn test_timeout_fails_fast() {
    init_logging();
    let owner = key(1);
    let ledger = Arc::new(
        MockLedger::new()
            .with_transaction("slow", transfer_bytes(&owner, &key(2), 1), BLOCK_TIME, ms(200))
            .with_transaction("slower", transfer_bytes(&owner, &key(2), 1), BLOCK_TIME, ms(5_000))
            .with_transaction("fast", transfer_bytes(&owner, &key(2), 1), BLOCK_TIME, ms(0)),
    );

    let started = Instant::now();
    let err = aggregator(&ledger, 50, ms(50))
        .fetch_transfers(&owner)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(err.kind(), ErrorKind::Remote);
    match err {
        LedgerError::Signature { source, .. } => {
            assert!(matches!(*source, LedgerError::Timeout(t) if t == ms(50)));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_in_flight_bounded_by_budget() {
    init_logging();
    let owner = key(1);
    let mut ledger = MockLedger::new();
    for i in 0..12 {
        ledger = ledger.with_transaction(
            &format!("sig-{}", i),
            transfer_bytes(&owner, &key(2), i + 1),
            BLOCK_TIME,
            ms(15),
        );
    }
    let ledger = Arc::new(ledger);

    let events = aggregator(&ledger, 3, ms(1_000))
        .fetch_transfers(&owner)
        .await
        .unwrap();

    assert_eq!(events.len(), 12);
    assert!(ledger.peak() <= 3, "peak in flight was {}", ledger.peak());
    assert_eq!(ledger.fetch_count(), 12);
}

#[tokio::test]
async fn test_mixed_instructions_counts_and_tags() {
    init_logging();
    let owner = key(1);
    let peer = key(2);
    let token_program = key(9);

    // keys: 0 owner, 1 peer, 2 system, 3 foreign program
    let keys = vec![owner, peer, SYSTEM_PROGRAM_ID, token_program];
    let instructions = vec![
        // owner -> peer
        CompiledInstruction {
            program_id_index: 2,
            accounts: vec![0, 1],
            data: transfer_instruction_data(10),
        },
        // transfer-shaped data on a foreign program
        CompiledInstruction {
            program_id_index: 3,
            accounts: vec![0, 1],
            data: transfer_instruction_data(20),
        },
        // System CreateAccount
        CompiledInstruction {
            program_id_index: 2,
            accounts: vec![0, 1],
            data: vec![0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
        },
        // peer -> owner
        CompiledInstruction {
            program_id_index: 2,
            accounts: vec![1, 0],
            data: transfer_instruction_data(30),
        },
    ];

    let no_transfers = transaction_bytes(
        keys.clone(),
        vec![CompiledInstruction {
            program_id_index: 3,
            accounts: vec![0],
            data: vec![1, 2, 3],
        }],
    );

    let ledger = Arc::new(
        MockLedger::new()
            .with_transaction("many", transaction_bytes(keys.clone(), instructions), BLOCK_TIME, ms(0))
            .with_transaction("none", no_transfers, BLOCK_TIME, ms(0))
            .with_transaction("one", transfer_bytes(&peer, &owner, 40), BLOCK_TIME, ms(0)),
    );

    let mut events = aggregator(&ledger, 50, ms(1_000))
        .fetch_transfers(&owner)
        .await
        .unwrap();
    events.sort_by_key(|e| e.amount);

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].amount, 10);
    assert!(events[0].is_sender);
    assert_eq!(events[1].amount, 30);
    assert!(!events[1].is_sender);
    assert_eq!(events[2].amount, 40);
    assert!(!events[2].is_sender);
}

#[tokio::test]
async fn test_short_transfer_data_is_malformed() {
    init_logging();
    let owner = key(1);
    let bytes = transaction_bytes(
        vec![owner, key(2), SYSTEM_PROGRAM_ID],
        vec![CompiledInstruction {
            program_id_index: 2,
            accounts: vec![0, 1],
            data: vec![2, 0, 0, 0, 1],
        }],
    );
    let ledger = Arc::new(MockLedger::new().with_transaction("short", bytes, BLOCK_TIME, ms(0)));

    let err = aggregator(&ledger, 50, ms(1_000))
        .fetch_transfers(&owner)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
    match err {
        LedgerError::Signature { signature, source } => {
            assert_eq!(signature, "short");
            assert!(matches!(
                *source,
                LedgerError::Decode(DecodeError::InstructionTooShort { expected: 12, actual: 5 })
            ));
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_truncated_transaction_is_malformed() {
    init_logging();
    let owner = key(1);
    let mut bytes = transfer_bytes(&owner, &key(2), 5);
    bytes.truncate(bytes.len() - 6);
    let ledger = Arc::new(MockLedger::new().with_transaction("cut", bytes, BLOCK_TIME, ms(0)));

    let err = aggregator(&ledger, 50, ms(1_000))
        .fetch_transfers(&owner)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
}
