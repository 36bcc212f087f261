/*!
 * Scenario Tests
 *
 * End-to-end coordination patterns built from several primitives
 */

use coord_kit::{Barrier, Channel, Lock, SyncConfig};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_capacity_two_third_send_blocks() {
    let ch = Channel::with_config(2, SyncConfig::park());

    // Two sends fit without a receiver
    ch.send(1).unwrap();
    ch.send(2).unwrap();
    assert_eq!(ch.len(), 2);

    let third_done = Arc::new(AtomicBool::new(false));
    let sender = {
        let ch = ch.clone();
        let third_done = third_done.clone();
        thread::spawn(move || {
            ch.send(3).unwrap();
            third_done.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!third_done.load(Ordering::SeqCst), "third send did not block");

    let mut received = vec![ch.receive().unwrap()];
    sender.join().unwrap();
    assert!(third_done.load(Ordering::SeqCst));

    received.push(ch.receive().unwrap());
    received.push(ch.receive().unwrap());
    assert_eq!(received, vec![1, 2, 3]);
}

#[test]
fn test_ping_pong() {
    let ch = Channel::<i32>::unbuffered();
    let barrier = Arc::new(Barrier::new(2));

    let first = {
        let (ch, barrier) = (ch.clone(), barrier.clone());
        thread::spawn(move || {
            let got = ch.receive();
            ch.send(12).unwrap();
            barrier.done();
            got
        })
    };

    let second = {
        let (ch, barrier) = (ch.clone(), barrier.clone());
        thread::spawn(move || {
            ch.send(10).unwrap();
            let got = ch.receive();
            barrier.done();
            got
        })
    };

    barrier.wait();
    assert_eq!(first.join().unwrap(), Some(10));
    assert_eq!(second.join().unwrap(), Some(12));
}

#[test]
fn test_producer_closes_consumer_ranges() {
    let ch = Channel::bounded(2);
    let tx = ch.sender();
    let rx = ch.receiver();
    drop(ch);

    let producer = thread::spawn(move || {
        for i in 10..20 {
            tx.send(i).unwrap();
        }
        tx.close().unwrap();
    });

    let seen: Vec<i32> = rx.iter().collect();
    producer.join().unwrap();
    assert_eq!(seen, (10..20).collect::<Vec<_>>());
}

#[test]
fn test_locked_counter_joined_by_barrier() {
    let counter = Arc::new(Lock::new(0u32));
    let barrier = Arc::new(Barrier::new(0));

    for _ in 0..10 {
        barrier.add(1);
        let (counter, barrier) = (counter.clone(), barrier.clone());
        thread::spawn(move || {
            counter.with(|n| *n += 1);
            barrier.done();
        });
    }

    barrier.wait();
    assert_eq!(*counter.lock(), 10);
}
