//! Tests for connection pool management.

use std::sync::Arc;

use sysupdate_mock::ipc::{ConnectionConfig, ConnectionPool};

fn pool(max_connections: usize) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(ConnectionConfig { max_connections }))
}

#[test]
fn test_acquire_within_limit() {
    let pool = pool(2);

    let guard1 = pool.try_acquire();
    assert!(guard1.is_some());
    assert_eq!(pool.active_count(), 1);

    let guard2 = pool.try_acquire();
    assert!(guard2.is_some());
    assert_eq!(pool.active_count(), 2);
}

#[test]
fn test_acquire_at_limit() {
    let pool = pool(1);

    let _guard = pool.try_acquire();
    assert_eq!(pool.active_count(), 1);

    // Should fail - at limit
    assert!(pool.try_acquire().is_none());
    assert_eq!(pool.active_count(), 1);
}

#[test]
fn test_release_on_drop() {
    let pool = pool(1);

    {
        let _guard = pool.try_acquire().unwrap();
        assert_eq!(pool.active_count(), 1);
    }

    assert_eq!(pool.active_count(), 0);
    assert!(pool.try_acquire().is_some());
}

#[test]
fn test_default_limit() {
    let pool = Arc::new(ConnectionPool::new(ConnectionConfig::default()));
    assert_eq!(pool.max_connections(), 32);
}

#[test]
fn test_concurrent_acquire_never_exceeds_limit() {
    let pool = pool(4);
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.try_acquire())
        })
        .collect();

    let guards: Vec<_> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(guards.len(), 4);
    assert_eq!(pool.active_count(), 4);

    drop(guards);
    assert_eq!(pool.active_count(), 0);
}
