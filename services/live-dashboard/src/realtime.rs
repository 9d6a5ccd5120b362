//! Change stream subscription over the Realtime websocket
//!
//! The backend speaks Phoenix channels: JSON text frames carrying a topic,
//! an event name, a payload and a message ref. One channel is joined per
//! subscription, filtered to INSERT and UPDATE row events. Frames are turned
//! into [`FeedEvent`]s and queued in arrival order for a single consumer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, RealtimeConfig, TableConfig};
use crate::io::{FrameReader, FrameWriter, SocketConnector, SocketPair};
use crate::measurement::Measurement;
use crate::status::ChannelStatus;

const PHOENIX_TOPIC: &str = "phoenix";

/// A Phoenix channel frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

/// Kind of row change reported by the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    record: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    data: ChangeData,
}

/// Event delivered to the subscription consumer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Post-change image of an inserted or updated row
    Change(Measurement),
    Status(ChannelStatus),
}

/// Build the `phx_join` frame for the table's INSERT and UPDATE events
pub fn join_message(table: &TableConfig, access_token: &str, join_ref: &str) -> PhoenixMessage {
    let filters: Vec<serde_json::Value> = ["INSERT", "UPDATE"]
        .iter()
        .map(|event| {
            json!({
                "event": event,
                "schema": table.schema,
                "table": table.name,
            })
        })
        .collect();

    PhoenixMessage {
        topic: table.topic(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": filters,
                "private": false,
            },
            "access_token": access_token,
        }),
        msg_ref: Some(join_ref.to_string()),
        join_ref: Some(join_ref.to_string()),
    }
}

pub fn leave_message(topic: &str, msg_ref: &str, join_ref: &str) -> PhoenixMessage {
    PhoenixMessage {
        topic: topic.to_string(),
        event: "phx_leave".to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref.to_string()),
        join_ref: Some(join_ref.to_string()),
    }
}

pub fn heartbeat_message(msg_ref: &str) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        msg_ref: Some(msg_ref.to_string()),
        join_ref: None,
    }
}

/// Translate an incoming frame of `topic` into a consumer event.
///
/// Returns `None` for frames that carry nothing for the consumer: heartbeat
/// replies, other topics, DELETE events and rows that do not decode.
pub fn interpret(message: &PhoenixMessage, topic: &str, join_ref: &str) -> Option<FeedEvent> {
    if message.topic != topic {
        return None;
    }

    match message.event.as_str() {
        "phx_reply" => {
            if message.msg_ref.as_deref() != Some(join_ref) {
                return None;
            }
            match message.payload.get("status").and_then(|s| s.as_str()) {
                Some("ok") => Some(FeedEvent::Status(ChannelStatus::Subscribed)),
                Some("error") => {
                    warn!("Join of {} rejected: {}", topic, message.payload);
                    Some(FeedEvent::Status(ChannelStatus::ChannelError))
                }
                other => {
                    debug!("Unhandled join reply status {:?}", other);
                    None
                }
            }
        }
        "phx_error" => Some(FeedEvent::Status(ChannelStatus::ChannelError)),
        "phx_close" => Some(FeedEvent::Status(ChannelStatus::Closed)),
        "system" => {
            debug!("System message on {}: {}", topic, message.payload);
            match message.payload.get("status").and_then(|s| s.as_str()) {
                Some("error") => Some(FeedEvent::Status(ChannelStatus::ChannelError)),
                _ => None,
            }
        }
        "postgres_changes" => {
            let payload: ChangePayload = match serde_json::from_value(message.payload.clone()) {
                Ok(payload) => payload,
                Err(e) => {
                    debug!("Failed to parse change payload: {}", e);
                    return None;
                }
            };
            match payload.data.kind {
                ChangeKind::Insert | ChangeKind::Update => {
                    match serde_json::from_value::<Measurement>(payload.data.record) {
                        Ok(row) => Some(FeedEvent::Change(row)),
                        Err(e) => {
                            debug!("Skipping {:?} with undecodable row: {}", payload.data.kind, e);
                            None
                        }
                    }
                }
                ChangeKind::Delete => None,
            }
        }
        other => {
            debug!("Ignoring '{}' on {}", other, topic);
            None
        }
    }
}

/// Monotonic message ref source shared by all writers of one socket
#[derive(Debug, Clone, Default)]
struct RefCounter(Arc<AtomicU64>);

impl RefCounter {
    fn next(&self) -> String {
        (self.0.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

type SharedWriter = Arc<Mutex<Box<dyn FrameWriter>>>;

async fn send(writer: &SharedWriter, message: &PhoenixMessage) -> crate::Result<()> {
    let frame = serde_json::to_string(message)?;
    writer.lock().await.send_frame(frame).await
}

/// Opens change stream subscriptions for one table
pub struct ChangeStreamSubscriber {
    backend: BackendConfig,
    table: TableConfig,
    realtime: RealtimeConfig,
    sockets: Arc<dyn SocketConnector>,
}

impl ChangeStreamSubscriber {
    pub fn new(
        backend: BackendConfig,
        table: TableConfig,
        realtime: RealtimeConfig,
        sockets: Arc<dyn SocketConnector>,
    ) -> Self {
        Self {
            backend,
            table,
            realtime,
            sockets,
        }
    }

    /// Connect, join the table channel and start delivering events
    pub async fn subscribe(&self) -> crate::Result<Subscription> {
        let url = self.backend.realtime_url()?;
        let SocketPair { reader, writer } = self.sockets.connect(url.as_str()).await?;
        let writer: SharedWriter = Arc::new(Mutex::new(writer));

        let refs = RefCounter::default();
        let topic = self.table.topic();
        let join_ref = refs.next();

        send(
            &writer,
            &join_message(&self.table, &self.backend.api_key, &join_ref),
        )
        .await?;
        info!("Joining {}", topic);

        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        spawn_reader_task(
            reader,
            topic.clone(),
            join_ref.clone(),
            events_tx,
            cancel.clone(),
        );
        spawn_heartbeat_task(
            Arc::clone(&writer),
            refs.clone(),
            Duration::from_secs(self.realtime.heartbeat_interval_seconds.max(1)),
            cancel.clone(),
        );

        Ok(Subscription {
            events: events_rx,
            handle: SubscriptionHandle {
                inner: Arc::new(HandleInner {
                    topic,
                    join_ref,
                    refs,
                    writer,
                    cancel,
                    released: AtomicBool::new(false),
                }),
            },
        })
    }
}

fn spawn_reader_task(
    mut reader: Box<dyn FrameReader>,
    topic: String,
    join_ref: String,
    events: mpsc::UnboundedSender<FeedEvent>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Reader for {} cancelled", topic);
                    return;
                }
                frame = reader.read_frame() => frame,
            };

            let event = match frame {
                Ok(Some(text)) => match serde_json::from_str::<PhoenixMessage>(&text) {
                    Ok(message) => interpret(&message, &topic, &join_ref),
                    Err(e) => {
                        debug!("Failed to parse frame: {}: {}", e, text);
                        None
                    }
                },
                Ok(None) => {
                    info!("Realtime socket for {} closed", topic);
                    let _ = events.send(FeedEvent::Status(ChannelStatus::Closed));
                    return;
                }
                Err(e) => {
                    warn!("Realtime socket for {} failed: {}", topic, e);
                    let _ = events.send(FeedEvent::Status(ChannelStatus::ChannelError));
                    return;
                }
            };

            if let Some(event) = event {
                let terminal = matches!(
                    event,
                    FeedEvent::Status(ChannelStatus::ChannelError | ChannelStatus::Closed)
                );
                if events.send(event).is_err() {
                    debug!("Consumer for {} gone, stopping reader", topic);
                    return;
                }
                if terminal {
                    debug!("Channel {} ended, stopping reader", topic);
                    return;
                }
            }
        }
    })
}

fn spawn_heartbeat_task(
    writer: SharedWriter,
    refs: RefCounter,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if let Err(e) = send(&writer, &heartbeat_message(&refs.next())).await {
                debug!("Heartbeat failed, stopping: {}", e);
                return;
            }
        }
    })
}

struct HandleInner {
    topic: String,
    join_ref: String,
    refs: RefCounter,
    writer: SharedWriter,
    cancel: CancellationToken,
    released: AtomicBool,
}

/// Releases a subscription; cheap to clone
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.inner.topic)
            .field("released", &self.is_released())
            .finish()
    }
}

impl SubscriptionHandle {
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// Leave the channel and close the socket.
    ///
    /// Idempotent. No event is delivered after this returns.
    pub async fn release(&self) {
        if self.inner.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel.cancel();

        let leave = leave_message(
            &self.inner.topic,
            &self.inner.refs.next(),
            &self.inner.join_ref,
        );
        if let Err(e) = send(&self.inner.writer, &leave).await {
            debug!("Leaving {} failed: {}", self.inner.topic, e);
        }
        if let Err(e) = self.inner.writer.lock().await.close().await {
            debug!("Closing socket for {} failed: {}", self.inner.topic, e);
        }
        info!("Released subscription to {}", self.inner.topic);
    }
}

/// A live change stream
pub struct Subscription {
    events: mpsc::UnboundedReceiver<FeedEvent>,
    handle: SubscriptionHandle,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .finish()
    }
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next event in arrival order; `None` once released or the stream ended
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        let cancel = self.handle.inner.cancel.clone();
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.inner.cancel.cancel();
    }
}
