//! Dashboard session: the snapshot flow and the change stream flow
//!
//! Both flows write the same [`StateHandle`]. Each mutation happens under
//! the write lock, so concurrent writers never interleave, but a snapshot
//! that lands after change events still replaces them. Teardown cancels both
//! flows and releases the subscription; it can be called any number of times.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ClientFactory;
use crate::realtime::SubscriptionHandle;
use crate::state::{Notice, StateHandle};
use crate::status::ConnectionStatus;

/// One running dashboard session
pub struct Session {
    factory: Arc<ClientFactory>,
    state: StateHandle,
    cancel: CancellationToken,
    subscription: Arc<Mutex<Option<SubscriptionHandle>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Session {
    pub fn new(factory: Arc<ClientFactory>, state: StateHandle) -> Self {
        Self {
            factory,
            state,
            cancel: CancellationToken::new(),
            subscription: Arc::new(Mutex::new(None)),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> StateHandle {
        Arc::clone(&self.state)
    }

    /// Spawn the snapshot flow and the change stream flow.
    ///
    /// Only the first call on a live session has an effect.
    pub async fn start(&self) {
        if self.cancel.is_cancelled() || self.started.swap(true, Ordering::SeqCst) {
            debug!("Session already started or torn down");
            return;
        }

        let snapshot = tokio::spawn(snapshot_flow(
            Arc::clone(&self.factory),
            Arc::clone(&self.state),
            self.cancel.clone(),
        ));
        let stream = tokio::spawn(change_stream_flow(
            Arc::clone(&self.factory),
            Arc::clone(&self.state),
            self.cancel.clone(),
            Arc::clone(&self.subscription),
        ));
        self.tasks.lock().await.extend([snapshot, stream]);
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop both flows and release the subscription if one was acquired
    pub async fn teardown(&self) {
        self.cancel.cancel();

        let handle = self.subscription.lock().await.take();
        if let Some(handle) = handle {
            handle.release().await;
        }

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                debug!("Session task ended abnormally: {}", e);
            }
        }
    }
}

async fn snapshot_flow(factory: Arc<ClientFactory>, state: StateHandle, cancel: CancellationToken) {
    let client = match factory.client().await {
        Ok(client) => client,
        Err(e) => {
            warn!("Cannot load snapshot: {}", e);
            if !cancel.is_cancelled() {
                state.write().await.snapshot_failed(Notice::ConfigurationMissing);
            }
            return;
        }
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Session ended before the snapshot arrived");
            return;
        }
        result = client.load_snapshot() => result,
    };

    let mut guard = state.write().await;
    if cancel.is_cancelled() {
        debug!("Discarding snapshot that arrived after teardown");
        return;
    }
    match result {
        Ok(rows) => {
            info!("Snapshot loaded with {} rows", rows.len());
            guard.snapshot_loaded(rows);
        }
        Err(e) => {
            warn!("{}", e);
            guard.snapshot_failed(Notice::SnapshotQueryFailed);
        }
    }
}

async fn change_stream_flow(
    factory: Arc<ClientFactory>,
    state: StateHandle,
    cancel: CancellationToken,
    slot: Arc<Mutex<Option<SubscriptionHandle>>>,
) {
    let subscribed = match factory.client().await {
        Ok(client) => tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            subscribed = client.subscribe() => subscribed,
        },
        Err(e) => Err(e),
    };

    let mut subscription = match subscribed {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Cannot subscribe to changes: {}", e);
            if !cancel.is_cancelled() {
                state.write().await.status = ConnectionStatus::Error;
            }
            return;
        }
    };

    {
        let mut slot = slot.lock().await;
        if cancel.is_cancelled() {
            drop(slot);
            subscription.handle().release().await;
            return;
        }
        *slot = Some(subscription.handle());
    }

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = subscription.next_event() => event,
        };
        let Some(event) = event else { break };
        let mut guard = state.write().await;
        if cancel.is_cancelled() {
            break;
        }
        guard.apply_feed_event(event);
    }
    debug!("Change stream consumer stopped");
}
