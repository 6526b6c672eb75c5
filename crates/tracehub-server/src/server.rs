//! Listener: accepts client connections and spawns one handler task each.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracehub_store::TraceStore;
use tracing::{debug, info, warn};

use crate::connection::handle_connection;
use crate::notifier::EntryNotifier;
use crate::{ServerConfig, ServerError};

pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    store: TraceStore,
    notifier: EntryNotifier,
    max_frame_bytes: usize,
}

impl Server {
    /// Bind the listening socket. Failure is fatal and not retried.
    pub async fn bind(config: &ServerConfig, store: TraceStore) -> Result<Self, ServerError> {
        let addr = SocketAddr::new(config.bind, config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            local_addr,
            store,
            notifier: EntryNotifier::default(),
            max_frame_bytes: config.max_frame_bytes,
        })
    }

    /// The address actually bound (resolves port 0 to the assigned port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for registering subscribers to stored entries.
    pub fn notifier(&self) -> EntryNotifier {
        self.notifier.clone()
    }

    /// Accept connections until the process ends.
    pub async fn serve(self) {
        self.serve_with_shutdown(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` resolves, then stop accepting.
    /// Connections already open keep their handler tasks and run until
    /// their own close.
    pub async fn serve_with_shutdown<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "trace connection accepted");
                        let store = self.store.clone();
                        let notifier = self.notifier.clone();
                        let max_frame_bytes = self.max_frame_bytes;
                        tokio::spawn(async move {
                            if let Err(err) =
                                handle_connection(stream, peer, store, notifier, max_frame_bytes).await
                            {
                                warn!(%peer, %err, "trace connection terminated");
                            }
                        });
                    }
                    Err(err) => warn!(%err, "accept failed"),
                },
            }
        }
    }
}
