/*!
 * Lock Integration Tests
 *
 * Exclusion between workers, hand-over on release and holder checks
 */

use coord_kit::{Lock, LockError, SyncConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_second_acquirer_blocks_until_release() {
    let lock = Arc::new(Lock::with_config((), SyncConfig::park()));
    let acquired = Arc::new(AtomicBool::new(false));

    lock.acquire();

    let contender = {
        let lock = lock.clone();
        let acquired = acquired.clone();
        thread::spawn(move || {
            lock.acquire();
            acquired.store(true, Ordering::SeqCst);
            lock.release()
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!acquired.load(Ordering::SeqCst), "lock was not exclusive");

    lock.release().unwrap();
    assert_eq!(contender.join().unwrap(), Ok(()));
    assert!(acquired.load(Ordering::SeqCst));
    assert!(!lock.is_locked());

    // A third worker that never acquired cannot release
    let bystander = {
        let lock = lock.clone();
        thread::spawn(move || lock.release())
    };
    assert_eq!(bystander.join().unwrap(), Err(LockError::NotHeld));
    assert!(!lock.is_locked());
}

#[test]
fn test_release_by_other_worker_is_not_held() {
    let lock = Arc::new(Lock::new(()));
    lock.acquire();

    let intruder = {
        let lock = lock.clone();
        thread::spawn(move || lock.release())
    };

    assert_eq!(intruder.join().unwrap(), Err(LockError::NotHeld));
    assert!(lock.is_locked());
    assert_eq!(lock.release(), Ok(()));
}

#[test]
fn test_release_free_lock() {
    let lock = Lock::new(());
    assert_eq!(lock.release(), Err(LockError::NotHeld));
}

#[test]
fn test_guard_cannot_be_released_raw() {
    let lock = Lock::new(0);
    let guard = lock.lock();
    assert_eq!(lock.release(), Err(LockError::NotHeld));
    drop(guard);
    assert!(!lock.is_locked());
}

#[test]
fn test_guard_released_on_panic() {
    let lock = Arc::new(Lock::new(Vec::<u32>::new()));

    let worker = {
        let lock = lock.clone();
        thread::spawn(move || {
            let mut items = lock.lock();
            items.push(1);
            panic!("worker failed while holding the lock");
        })
    };
    assert!(worker.join().is_err());

    assert!(!lock.is_locked());
    assert_eq!(*lock.lock(), vec![1]);
}

#[test]
fn test_counter_consistency() {
    let counter = Arc::new(Lock::new(0u64));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    counter.with(|n| *n += 1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*counter.lock(), 8000);
}
