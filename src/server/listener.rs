//! TCP listener bootstrap and accept loop
//!
//! One-shot startup: resolve the configured host and port, bind and
//! listen with a fixed backlog, initialize both pools, then accept
//! connections until the process exits.

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::connection::LifecycleManager;
use crate::context::AppContext;
use crate::metrics::METRICS;
use crate::pool::PoolError;
use crate::util;

/// Interval between pool/metrics occupancy log lines
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Pooled TCP listening service
pub struct Server {
    listener: TcpListener,
    manager: Rc<LifecycleManager>,
}

impl Server {
    /// Bootstrap the server: resolve, bind, listen, initialize pools.
    ///
    /// Resolution and bind failures abort startup; pool capacities are
    /// fixed here, before the first connection.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let addr = resolve(&config.host, config.port).await?;

        let std_listener = util::bind_tcp_listener(addr, config.backlog)?;
        let listener = TcpListener::from_std(std_listener)
            .context("failed to register listener with the runtime")?;
        info!(
            host = %config.host,
            port = config.port,
            backlog = config.backlog,
            "server listening"
        );

        let ctx = AppContext::new(config).context("failed to initialize pools")?;
        info!(
            connection_slots = ctx.config.pool.connection_slots,
            buffer_slots = ctx.config.pool.buffer_slots,
            "pools initialized"
        );

        let manager = LifecycleManager::new(Rc::new(ctx));
        Ok(Self { listener, manager })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop.
    ///
    /// Must be called inside a `LocalSet`; every connection is driven by
    /// a task on the same thread. A record slot is reserved the moment a
    /// connection arrives; exhaustion rejects it at admission.
    pub async fn run(&self) -> Result<()> {
        self.spawn_stats_task();

        loop {
            let (stream, _) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    METRICS.connection_failed();
                    continue;
                }
            };

            let handle = match self.manager.reserve() {
                Ok(handle) => handle,
                Err(PoolError::Exhausted) => {
                    warn!("connection rejected: at capacity");
                    METRICS.connection_rejected();
                    drop(stream);
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "connection slot reservation failed");
                    drop(stream);
                    continue;
                }
            };

            let manager = self.manager.clone();
            tokio::task::spawn_local(async move {
                manager.drive(handle, stream).await;
            });
        }
    }

    fn spawn_stats_task(&self) {
        let manager = self.manager.clone();
        tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(STATS_INTERVAL);
            interval.tick().await; // immediate first tick
            loop {
                interval.tick().await;
                let ctx = manager.context();
                let snapshot = METRICS.snapshot();
                debug!(
                    connections_live = ctx.conn_pool.borrow().len(),
                    buffers_live = ctx.buf_pool.borrow().len(),
                    connections_total = snapshot.connections_total,
                    connections_rejected = snapshot.connections_rejected,
                    bytes_received = snapshot.bytes_received,
                    read_errors = snapshot.read_errors,
                    "server stats"
                );
            }
        });
    }
}

/// Resolve a host name and port to a concrete bind address
async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}:{port}"))?;
    addrs
        .next()
        .ok_or_else(|| anyhow!("no addresses found for {host}:{port}"))
}
