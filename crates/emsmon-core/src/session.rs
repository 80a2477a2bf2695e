// ── Session lifecycle ──
//
// One background worker per running session: connect, subscribe to the
// menu, resubscribe to values whenever a menu arrives, and reconnect
// after a fixed delay whenever the transport goes away. Consumers observe
// through the state watch, the event broadcast, and the read-only store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use emsmon_api::protocol::{self, Inbound};
use emsmon_api::websocket::{self, Frame, WsReader, WsWriter};
use emsmon_api::{Error as ApiError, Outbound};

use crate::config::SessionConfig;
use crate::convert::rtv_to_value;
use crate::error::CoreError;
use crate::model::{PointId, Topology};
use crate::query::Query;
use crate::store::DataStore;

// ── SessionState ─────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected; either never started or waiting out the reconnect delay.
    Disconnected,
    /// Handshake in progress. `attempt` counts since the last successful open.
    Connecting { attempt: u32 },
    /// Transport open, menu requested, no menu yet.
    AwaitingMenu,
    /// Menu applied and value subscription sent.
    Subscribed,
    /// `stop()` was called. A later `start()` leaves this state.
    Stopped,
}

// ── SessionEvent ─────────────────────────────────────────────────

/// Change notifications pushed to every subscriber.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A menu was applied. Carries the topology now in the cache.
    TopologyChanged(Arc<Topology>),
    /// A value batch was applied (ids in batch order), or the values were
    /// reset (empty).
    ValuesChanged(Arc<[PointId]>),
    /// Human-readable status line.
    Log(String),
}

/// Upper bound on flushing the close frame once a stop is requested.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Refresh,
    Reset,
}

// ── Session ──────────────────────────────────────────────────────

/// Handle to one telemetry session.
///
/// Cheaply cloneable. `new` does not connect; call [`start`](Self::start).
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    store: Arc<DataStore>,
    state: watch::Sender<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    control_tx: mpsc::UnboundedSender<Control>,
    /// Locked by the running worker; the guard is released when the
    /// worker exits, including by panic.
    control_rx: Arc<Mutex<mpsc::UnboundedReceiver<Control>>>,
    cancel: CancellationToken,
    /// Child token for the current worker; replaced on every start.
    cancel_child: Mutex<CancellationToken>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(SessionInner {
                config,
                store: Arc::new(DataStore::new()),
                state,
                event_tx,
                control_tx,
                control_rx: Arc::new(Mutex::new(control_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Read facade over this session's caches.
    pub fn query(&self) -> Query {
        Query::new(Arc::clone(&self.inner.store))
    }

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the worker. Returns immediately; connection happens in the
    /// background and never surfaces as an error here.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut worker = self.inner.worker.lock().await;
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(CoreError::AlreadyRunning);
        }
        if let Some(stale) = worker.take() {
            if let Err(e) = stale.await {
                warn!(error = %e, "previous session worker failed");
            }
        }

        let mut control_rx = Arc::clone(&self.inner.control_rx).lock_owned().await;
        // Requests made while stopped are moot: every connect sends a menu.
        while control_rx.try_recv().is_ok() {}

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        info!(endpoint = %self.inner.config.endpoint.base(), "starting session");
        *worker = Some(tokio::spawn(run_worker(
            Arc::clone(&self.inner),
            control_rx,
            child,
        )));
        Ok(())
    }

    /// Stop the worker and wait for it to exit. Safe at any time,
    /// including mid-handshake and during the reconnect delay.
    pub async fn stop(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let handle = self.inner.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "session worker did not exit cleanly");
            }
        }

        self.inner.state.send_replace(SessionState::Stopped);
        debug!("session stopped");
    }

    /// Re-send the menu subscription on the open connection. Ignored
    /// while disconnected: the next connect subscribes anyway.
    pub fn request_refresh(&self) {
        let _ = self.inner.control_tx.send(Control::Refresh);
    }

    /// Clear cached values, then re-send the menu subscription. The
    /// topology is replaced when the new menu arrives.
    pub fn request_reset(&self) {
        let _ = self.inner.control_tx.send(Control::Reset);
    }
}

impl SessionInner {
    fn set_state(&self, state: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn log(&self, message: String) {
        self.emit(SessionEvent::Log(message));
    }

    fn reset_values(&self) {
        self.store.values.reset();
        self.emit(SessionEvent::ValuesChanged(Arc::from([])));
    }
}

// ── Worker ───────────────────────────────────────────────────────

enum ConnectionEnd {
    Cancelled,
    Lost(ApiError),
}

/// Connect / receive / back off, until cancelled.
async fn run_worker(
    inner: Arc<SessionInner>,
    mut control: OwnedMutexGuard<mpsc::UnboundedReceiver<Control>>,
    cancel: CancellationToken,
) {
    let config = &inner.config;
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        inner.set_state(SessionState::Connecting { attempt });
        debug!(attempt, endpoint = %config.endpoint.base(), "connecting");

        let connected = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = websocket::connect(&config.endpoint, config.connect_timeout) => result,
        };

        match connected {
            Ok((writer, reader)) => {
                attempt = 0;
                info!(endpoint = %config.endpoint.base(), "connected");
                inner.log(format!("Connected to {}", config.endpoint.base()));

                match run_connection(&inner, writer, reader, &mut control, &cancel).await {
                    ConnectionEnd::Cancelled => break,
                    ConnectionEnd::Lost(e) => {
                        warn!(error = %e, "connection lost");
                        inner.log(format!("Connection lost: {e}"));
                    }
                }
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(error = %e, attempt, "connect failed");
                } else {
                    error!(error = %e, attempt, "endpoint unusable, retrying anyway");
                }
                inner.log(format!("Connection failed: {e}"));
            }
        }

        inner.set_state(SessionState::Disconnected);
        if !backoff(&inner, config.reconnect_delay, &mut control, &cancel).await {
            break;
        }
    }

    inner.set_state(SessionState::Stopped);
}

/// Wait out the reconnect delay. Resets still apply meanwhile; refreshes
/// are dropped. Returns `false` if cancelled.
async fn backoff(
    inner: &SessionInner,
    delay: Duration,
    control: &mut mpsc::UnboundedReceiver<Control>,
    cancel: &CancellationToken,
) -> bool {
    debug!(delay_ms = delay.as_millis(), "waiting before reconnect");
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return false,
            () = &mut sleep => return true,
            Some(request) = control.recv() => {
                if request == Control::Reset {
                    inner.reset_values();
                }
            }
        }
    }
}

/// Drive one open connection until it ends. On cancellation the close
/// frame is attempted for at most [`CLOSE_TIMEOUT`].
async fn run_connection(
    inner: &SessionInner,
    mut writer: WsWriter,
    mut reader: WsReader,
    control: &mut mpsc::UnboundedReceiver<Control>,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    let end = drive_connection(inner, &mut writer, &mut reader, control, cancel).await;
    if matches!(end, ConnectionEnd::Cancelled)
        && tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await.is_err()
    {
        debug!("close frame not flushed in time");
    }
    end
}

async fn drive_connection(
    inner: &SessionInner,
    writer: &mut WsWriter,
    reader: &mut WsReader,
    control: &mut mpsc::UnboundedReceiver<Control>,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    if let Err(end) = send(writer, &Outbound::Menu, cancel).await {
        return end;
    }
    inner.set_state(SessionState::AwaitingMenu);

    loop {
        let step = tokio::select! {
            biased;
            () = cancel.cancelled() => return ConnectionEnd::Cancelled,
            Some(request) = control.recv() => {
                if request == Control::Reset {
                    inner.reset_values();
                }
                debug!(?request, "re-requesting menu");
                send(writer, &Outbound::Menu, cancel).await
            }
            frame = reader.recv() => match frame {
                Some(Ok(Frame::Text(text))) => match handle_text(inner, &text) {
                    Some(reply) => send(writer, &reply, cancel)
                        .await
                        .map(|()| inner.set_state(SessionState::Subscribed)),
                    None => Ok(()),
                },
                Some(Ok(Frame::Binary(len))) => {
                    debug!(len, "ignoring binary frame");
                    Ok(())
                }
                Some(Ok(Frame::Close { code, reason })) => {
                    Err(ConnectionEnd::Lost(ApiError::WebSocketClosed { code, reason }))
                }
                Some(Err(e)) => Err(ConnectionEnd::Lost(e)),
                None => Err(ConnectionEnd::Lost(ApiError::WebSocketClosed {
                    code: 1006,
                    reason: "stream ended".into(),
                })),
            },
        };

        if let Err(end) = step {
            return end;
        }
    }
}

/// Send one request unless `cancel` fires first. A peer that stops
/// reading leaves the write pending, so it is never awaited alone.
async fn send(
    writer: &mut WsWriter,
    message: &Outbound,
    cancel: &CancellationToken,
) -> Result<(), ConnectionEnd> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ConnectionEnd::Cancelled),
        result = writer.send(message) => result.map_err(ConnectionEnd::Lost),
    }
}

/// Decode and apply one text frame. Returns the value subscription to
/// send when the frame was a menu.
fn handle_text(inner: &SessionInner, text: &str) -> Option<Outbound> {
    trace!(frame = protocol::frame_preview(text), "received frame");

    match protocol::decode(text) {
        Ok(Inbound::Menu(menu)) => {
            let topology = Arc::new(Topology::from(menu));
            let ids: Vec<i64> = topology
                .all_point_ids()
                .into_iter()
                .map(PointId::get)
                .collect();

            inner.store.topology.replace(Arc::clone(&topology));
            info!(
                groups = topology.groups().len(),
                devices = topology.device_count(),
                points = ids.len(),
                "topology updated"
            );
            inner.log(format!(
                "Topology updated: {} devices, {} points",
                topology.device_count(),
                ids.len()
            ));
            inner.emit(SessionEvent::TopologyChanged(topology));

            Some(Outbound::Rtv {
                ids,
                period: inner.config.rtv_period_secs,
            })
        }
        Ok(Inbound::Rtv(entries)) => {
            let touched = inner
                .store
                .values
                .upsert_many(entries.into_iter().map(rtv_to_value));
            trace!(count = touched.len(), "values updated");
            if !touched.is_empty() {
                inner.emit(SessionEvent::ValuesChanged(touched.into()));
            }
            None
        }
        Err(e) => {
            if e.is_unknown_type() {
                debug!(error = %e, "dropping frame of unknown type");
            } else {
                warn!(error = %e, frame = protocol::frame_preview(text), "dropping undecodable frame");
            }
            inner.log(format!("Dropped frame: {e}"));
            None
        }
    }
}
