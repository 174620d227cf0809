//! Connection pool management with limits.
//!
//! Caps concurrent client connections. Guards are owned so they can move
//! into the per-connection task and release the slot when it ends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Configuration for connection pool.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub max_connections: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { max_connections: 32 }
    }
}

/// Global connection pool with atomic counting.
pub struct ConnectionPool {
    active: AtomicUsize,
    config: ConnectionConfig,
}

impl ConnectionPool {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            active: AtomicUsize::new(0),
            config,
        }
    }

    /// Try to acquire a connection slot. Returns guard if available.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.active.load(Ordering::Relaxed);
            if current >= self.config.max_connections {
                return None;
            }

            // CAS to atomically increment
            if self
                .active
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    pool: Arc::clone(self),
                });
            }
        }
    }

    /// Current number of active connections.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Maximum allowed connections.
    pub fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    fn release(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard that releases connection on drop.
pub struct ConnectionGuard {
    pool: Arc<ConnectionPool>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.pool.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_up_to_limit() {
        let pool = Arc::new(ConnectionPool::new(ConnectionConfig { max_connections: 2 }));
        let a = pool.try_acquire();
        let b = pool.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.active_count(), 2);

        drop(a);
        assert_eq!(pool.active_count(), 1);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn test_guard_released_from_other_thread() {
        let pool = Arc::new(ConnectionPool::new(ConnectionConfig { max_connections: 1 }));
        let guard = pool.try_acquire().unwrap();
        std::thread::spawn(move || drop(guard)).join().unwrap();
        assert_eq!(pool.active_count(), 0);
    }
}
