//! Link Queue Integration Tests
//!
//! Tests for the queue that carries frames from blocking submitters to the
//! link thread.
//!
//! # Test Scenarios
//! - Frames from many submitter threads all reach the link thread
//! - Injected inbound bytes keep their order relative to transmitted frames
//! - Shutdown semantics and dropped ends
//!
//! Run with: `cargo test -p common --test link_queue_tests`

use common::test_utils::{DEFAULT_TEST_TIMEOUT, adc_reply_frame, raw_frame, with_timeout};
use common::{LinkCommand, create_link};
use std::collections::HashSet;
use std::thread;

// ============================================================================
// Frame Flow Tests
// ============================================================================

#[test]
fn test_concurrent_submitters() {
    let (sender, receiver) = create_link();

    let submitters: Vec<_> = (0..8u8)
        .map(|id| {
            let sender = sender.clone();
            thread::spawn(move || sender.transmit(raw_frame(id, &[b'a', id])))
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap().expect("Failed to transmit");
    }

    let mut seen = HashSet::new();
    for _ in 0..8 {
        match receiver.recv_blocking() {
            LinkCommand::Transmit(frame) => {
                assert_eq!(frame[3], b'a');
                seen.insert(frame[0]);
            }
            other => panic!("Unexpected command {:?}", other),
        }
    }
    assert_eq!(seen.len(), 8);
    assert!(receiver.try_recv().is_none());
}

#[test]
fn test_inject_keeps_order() {
    let (sender, receiver) = create_link();

    sender.transmit(raw_frame(1, &[b'a', 0])).unwrap();
    sender.inject(adc_reply_frame(1, 512)).unwrap();

    assert!(matches!(receiver.recv_blocking(), LinkCommand::Transmit(_)));
    assert_eq!(
        receiver.recv_blocking(),
        LinkCommand::Inject(adc_reply_frame(1, 512))
    );
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn test_dropped_sender_reads_as_shutdown() {
    let (sender, receiver) = create_link();
    drop(sender);
    assert_eq!(receiver.recv_blocking(), LinkCommand::Shutdown);
}

#[test]
fn test_dropped_receiver_fails_transmit() {
    let (sender, receiver) = create_link();
    drop(receiver);
    assert!(sender.transmit(raw_frame(1, &[])).is_err());
    assert!(sender.is_closed());
}

#[test]
fn test_shutdown_is_idempotent() {
    let (sender, receiver) = create_link();
    sender.shutdown();
    sender.shutdown();
    assert_eq!(receiver.recv_blocking(), LinkCommand::Shutdown);
    assert!(receiver.try_recv().is_none());
}

#[tokio::test]
async fn test_link_thread_drains_until_shutdown() {
    let (sender, receiver) = create_link();

    let link_thread = thread::spawn(move || {
        let mut transmitted = 0;
        loop {
            match receiver.recv_blocking() {
                LinkCommand::Transmit(_) => transmitted += 1,
                LinkCommand::Inject(_) => {}
                LinkCommand::Shutdown => break transmitted,
            }
        }
    });

    for id in 0..5u8 {
        sender
            .transmit_async(raw_frame(id, &[b'a', 1]))
            .await
            .expect("Failed to transmit");
    }
    sender.shutdown();

    let transmitted = with_timeout(DEFAULT_TEST_TIMEOUT, async move {
        tokio::task::spawn_blocking(move || link_thread.join().unwrap())
            .await
            .unwrap()
    })
    .await
    .expect("Link thread did not stop");
    assert_eq!(transmitted, 5);
}
