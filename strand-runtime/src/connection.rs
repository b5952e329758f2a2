//! Outbound connection pool.
//!
//! Keeps at most one TCP connection per peer address. Connections are
//! opened lazily, with a timeout, and dropped from the pool when a write on
//! them fails so the next use reconnects.
//!
//! Frames on the wire are a big-endian `u32` length followed by the payload.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::ConnectionPoolConfig;
use crate::error::{ConnectionError, ConnectionResult};

/// A pooled connection. Writers lock it for the duration of one frame.
pub type Connection = Arc<tokio::sync::Mutex<TcpStream>>;

/// Cache of outbound connections keyed by peer address.
#[derive(Debug)]
pub struct ConnectionPool {
    config: ConnectionPoolConfig,
    connections: Mutex<HashMap<String, Connection>>,
    closed: AtomicBool,
}

impl ConnectionPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self {
            config,
            connections: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the pool configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionPoolConfig {
        &self.config
    }

    /// Returns the cached connection to `addr`, connecting if needed.
    ///
    /// # Errors
    /// Returns an error if the pool is closed or full, or the connection
    /// cannot be established within the timeout.
    pub async fn get_or_connect(&self, addr: &str) -> ConnectionResult<Connection> {
        if let Some(conn) = self.cached(addr)? {
            return Ok(conn);
        }

        let stream = self.connect(addr).await?;

        let mut connections = self.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        // Another caller may have connected while we were waiting.
        if let Some(existing) = connections.get(addr) {
            return Ok(Arc::clone(existing));
        }
        if connections.len() >= self.config.max_connections {
            return Err(ConnectionError::PoolExhausted {
                max: self.config.max_connections,
            });
        }

        let conn: Connection = Arc::new(tokio::sync::Mutex::new(stream));
        connections.insert(addr.to_string(), Arc::clone(&conn));
        drop(connections);

        debug!(addr, "Opened pooled connection");
        Ok(conn)
    }

    fn cached(&self, addr: &str) -> ConnectionResult<Option<Connection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        let connections = self.lock();
        if let Some(conn) = connections.get(addr) {
            return Ok(Some(Arc::clone(conn)));
        }
        if connections.len() >= self.config.max_connections {
            return Err(ConnectionError::PoolExhausted {
                max: self.config.max_connections,
            });
        }
        Ok(None)
    }

    async fn connect(&self, addr: &str) -> ConnectionResult<TcpStream> {
        match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                Ok(stream)
            }
            Ok(Err(e)) => Err(ConnectionError::ConnectFailed {
                addr: addr.to_string(),
                source: e,
            }),
            Err(_) => Err(ConnectionError::Timeout {
                addr: addr.to_string(),
            }),
        }
    }

    /// Writes one length-prefixed frame to `addr`.
    ///
    /// A failed write evicts the connection.
    ///
    /// # Errors
    /// Returns an error if no connection can be obtained or the write fails.
    pub async fn send(&self, addr: &str, payload: &[u8]) -> ConnectionResult<()> {
        let len = u32::try_from(payload.len())
            .map_err(|_| ConnectionError::FrameTooLarge { size: payload.len() })?;
        let conn = self.get_or_connect(addr).await?;

        let result = {
            let mut stream = conn.lock().await;
            write_frame(&mut stream, len, payload).await
        };

        if let Err(e) = result {
            warn!(addr, error = %e, "Write failed, dropping connection");
            self.evict(addr, &conn);
            return Err(e.into());
        }
        Ok(())
    }

    /// Removes `conn` from the pool if it is still the one cached for `addr`.
    /// A connection opened by another caller in the meantime is kept.
    fn evict(&self, addr: &str, conn: &Connection) -> bool {
        let mut connections = self.lock();
        if connections
            .get(addr)
            .is_some_and(|cached| Arc::ptr_eq(cached, conn))
        {
            connections.remove(addr);
            return true;
        }
        false
    }

    /// Removes the connection to `addr` from the pool. Returns true if one
    /// was cached.
    pub fn release(&self, addr: &str) -> bool {
        self.lock().remove(addr).is_some()
    }

    /// Returns the number of cached connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no connections are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every connection and refuses new ones.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let count = {
            let mut connections = self.lock();
            let count = connections.len();
            connections.clear();
            count
        };
        info!(connections = count, "Closed connection pool");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn write_frame(stream: &mut TcpStream, len: u32, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}
