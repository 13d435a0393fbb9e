//! Bounded `DuckDB` connection pool.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ::duckdb::Connection;

use crate::WarehouseError;

struct PoolState {
    idle: Vec<Connection>,
    outstanding: usize,
}

struct PoolInner {
    db_path: PathBuf,
    max_size: usize,
    state: Mutex<PoolState>,
}

/// Connection pool bounded at `max_size` concurrent connections; acquiring
/// past the bound waits up to the caller's timeout and then fails the course.
#[derive(Clone)]
pub struct DuckPool {
    inner: Arc<PoolInner>,
}

impl DuckPool {
    pub fn new(path: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                db_path: path.into(),
                max_size: max_size.max(1),
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    outstanding: 0,
                }),
            }),
        }
    }

    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    pub fn acquire(&self, timeout: Duration) -> Result<PooledConnection, WarehouseError> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut state = self
                    .inner
                    .state
                    .lock()
                    .expect("duckdb pool mutex is not poisoned");

                if let Some(connection) = state.idle.pop() {
                    state.outstanding += 1;
                    return Ok(PooledConnection {
                        pool: Arc::clone(&self.inner),
                        connection: Some(connection),
                    });
                }

                if state.outstanding < self.inner.max_size {
                    state.outstanding += 1;
                    drop(state);

                    match Connection::open(self.inner.db_path.as_path()) {
                        Ok(connection) => {
                            let _ = connection.execute_batch("PRAGMA disable_progress_bar;");
                            return Ok(PooledConnection {
                                pool: Arc::clone(&self.inner),
                                connection: Some(connection),
                            });
                        }
                        Err(error) => {
                            self.inner
                                .state
                                .lock()
                                .expect("duckdb pool mutex is not poisoned")
                                .outstanding -= 1;
                            return Err(WarehouseError::DuckDb(error));
                        }
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(WarehouseError::PoolTimeout(timeout));
            }
            std::thread::sleep(Duration::from_millis(25));
        }
    }
}

/// Connection that returns to the pool when dropped.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut state = self
            .pool
            .state
            .lock()
            .expect("duckdb pool mutex is not poisoned");
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.idle.len() < self.pool.max_size {
            state.idle.push(connection);
        }
    }
}
