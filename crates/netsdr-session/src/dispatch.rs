//! The dispatcher task and the handle callers talk to it through.
//!
//! One task owns the transport. It reads every inbound frame, resolves or
//! ignores control replies, hands data frames to a separate ingest task and
//! drives command deadlines. Callers never touch the transport; they send
//! requests over a bounded channel and await a oneshot reply.
//!
//! Data frames and stream controls share one ordered queue into the ingest
//! task, so a width change queued while resolving a command applies to every
//! data frame received after that reply.

use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use netsdr_codec::{decode, ControlItemCode, Frame, MessageType, MAX_SAMPLE_BITS};
use netsdr_transport::{FrameSink, FrameSource, Transport, TransportError};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::control::{CaptureMode, ReceiverCommand};
use crate::error::{Result, SessionError};
use crate::ingest::{StreamIngest, StreamNotification, StreamStats};
use crate::session::{CommandSession, FrameDisposition, SessionState};

/// A running session: the command handle, the sample notifications and the
/// dispatcher task.
///
/// The dispatcher exits with `Ok(())` once every [`SessionHandle`] clone is
/// dropped, or with [`SessionError::ConnectionLost`] when the transport
/// fails. Either way the notification receiver then yields `None`.
#[derive(Debug)]
pub struct Connection {
    pub handle: SessionHandle,
    pub notifications: mpsc::Receiver<StreamNotification>,
    pub dispatcher: JoinHandle<Result<()>>,
}

/// Start the dispatcher and ingest tasks on the current Tokio runtime.
pub fn spawn<T: Transport>(transport: T, config: &SessionConfig) -> Result<Connection> {
    config.validate()?;

    let (sink, source) = transport.split();
    let (requests_tx, requests_rx) = mpsc::channel(config.request_queue_capacity);
    let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
    let (notifications_tx, notifications_rx) = mpsc::channel(config.notification_capacity);

    let ingest = StreamIngest::new(config.sample_bits);
    tokio::spawn(run_ingest(ingest, ingest_rx, notifications_tx));

    let dispatcher = Dispatcher {
        sink,
        source,
        session: CommandSession::new(config.command_timeout()),
        pending: None,
        requests: requests_rx,
        ingest: ingest_tx,
        ingest_slots: Arc::new(Semaphore::new(config.ingest_queue_capacity)),
        dropped: [0; 4],
    };
    let dispatcher = tokio::spawn(dispatcher.run());

    info!(
        timeout_ms = config.command_timeout_ms,
        sample_bits = ?config.sample_bits,
        "session started"
    );

    Ok(Connection {
        handle: SessionHandle {
            requests: requests_tx,
            next_id: Arc::new(AtomicU64::new(1)),
        },
        notifications: notifications_rx,
        dispatcher,
    })
}

#[derive(Debug)]
enum SessionRequest {
    Send {
        id: u64,
        item_code: ControlItemCode,
        payload: Bytes,
        /// Queued to ingest when the reply arrives, ahead of later data frames.
        on_resolved: Option<StreamControl>,
        reply: oneshot::Sender<Result<Bytes>>,
    },
    Cancel {
        id: u64,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    Stream {
        control: StreamControl,
        queued: oneshot::Sender<()>,
    },
    Stats {
        stream: MessageType,
        reply: oneshot::Sender<Option<StreamStats>>,
    },
}

#[derive(Debug, Clone, Copy)]
enum StreamControl {
    SetSampleWidth { stream: MessageType, bits: u16 },
    Reset { stream: MessageType },
}

#[derive(Debug)]
enum IngestItem {
    /// The permit holds one of the ingest queue's frame slots.
    Frame(Frame, OwnedSemaphorePermit),
    Control(StreamControl),
    Stats {
        stream: MessageType,
        dropped: u64,
        reply: oneshot::Sender<Option<StreamStats>>,
    },
}

#[derive(Debug)]
struct PendingCommand {
    id: u64,
    on_resolved: Option<StreamControl>,
    reply: oneshot::Sender<Result<Bytes>>,
}

struct Dispatcher<K, S> {
    sink: K,
    source: S,
    session: CommandSession,
    pending: Option<PendingCommand>,
    requests: mpsc::Receiver<SessionRequest>,
    ingest: mpsc::UnboundedSender<IngestItem>,
    ingest_slots: Arc<Semaphore>,
    dropped: [u64; 4],
}

impl<K: FrameSink, S: FrameSource> Dispatcher<K, S> {
    async fn run(mut self) -> Result<()> {
        loop {
            let deadline = self.session.deadline();

            tokio::select! {
                biased;

                inbound = self.source.recv_frame() => match inbound {
                    Ok(buf) => self.on_inbound(buf),
                    Err(TransportError::ConnectionLost(reason)) => {
                        warn!(%reason, "connection lost");
                        self.fail_pending(&reason);
                        return Err(SessionError::ConnectionLost(reason));
                    }
                    Err(err) => warn!(%err, "receive failed"),
                },

                request = self.requests.recv() => match request {
                    Some(request) => self.on_request(request).await?,
                    None => {
                        debug!("all session handles dropped, stopping dispatcher");
                        return Ok(());
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_deadline();
                }

                _ = reply_closed(&mut self.pending), if self.pending.is_some() => {
                    self.abandon("caller dropped the request");
                }
            }
        }
    }

    fn on_inbound(&mut self, buf: Bytes) {
        let frame = match decode(buf) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "discarding undecodable frame");
                return;
            }
        };

        if frame.msg_type.is_data_item() {
            self.route_data(frame);
            return;
        }

        if let FrameDisposition::Resolved(body) = self.session.on_frame(&frame) {
            if let Some(pending) = self.pending.take() {
                if let Some(control) = pending.on_resolved {
                    self.queue_ingest(IngestItem::Control(control));
                }
                let _ = pending.reply.send(Ok(body));
            }
        }
    }

    fn route_data(&mut self, frame: Frame) {
        match Arc::clone(&self.ingest_slots).try_acquire_owned() {
            Ok(slot) => self.queue_ingest(IngestItem::Frame(frame, slot)),
            Err(_) => {
                let Some(index) = frame.msg_type.data_stream_index() else {
                    return;
                };
                self.dropped[index] += 1;
                warn!(
                    stream = %frame.msg_type,
                    sequence = ?frame.sequence,
                    dropped = self.dropped[index],
                    "ingest queue full, dropping data frame"
                );
            }
        }
    }

    fn queue_ingest(&self, item: IngestItem) {
        if self.ingest.send(item).is_err() {
            trace!("ingest stopped, item ignored");
        }
    }

    async fn on_request(&mut self, request: SessionRequest) -> Result<()> {
        match request {
            SessionRequest::Send {
                id,
                item_code,
                payload,
                on_resolved,
                reply,
            } => {
                if self.pending.as_ref().is_some_and(|p| p.reply.is_closed()) {
                    self.abandon("caller dropped the request");
                }
                let pending = PendingCommand {
                    id,
                    on_resolved,
                    reply,
                };
                self.start_command(item_code, &payload, pending).await?;
            }
            SessionRequest::Cancel { id } => {
                if self.pending.as_ref().is_some_and(|p| p.id == id) {
                    self.abandon("cancelled");
                }
            }
            SessionRequest::State { reply } => {
                let _ = reply.send(self.session.state());
            }
            SessionRequest::Stream { control, queued } => {
                self.queue_ingest(IngestItem::Control(control));
                let _ = queued.send(());
            }
            SessionRequest::Stats { stream, reply } => {
                let dropped = stream
                    .data_stream_index()
                    .map_or(0, |index| self.dropped[index]);
                self.queue_ingest(IngestItem::Stats {
                    stream,
                    dropped,
                    reply,
                });
            }
        }
        Ok(())
    }

    async fn start_command(
        &mut self,
        item_code: ControlItemCode,
        payload: &[u8],
        pending: PendingCommand,
    ) -> Result<()> {
        let wire = match self.session.begin(item_code, payload, Instant::now()) {
            Ok(wire) => wire,
            Err(err) => {
                let _ = pending.reply.send(Err(err));
                return Ok(());
            }
        };

        match self.sink.send_frame(wire).await {
            Ok(()) => {
                self.pending = Some(pending);
                Ok(())
            }
            Err(TransportError::ConnectionLost(reason)) => {
                self.session.abandon();
                warn!(%item_code, %reason, "connection lost while sending");
                let _ = pending
                    .reply
                    .send(Err(SessionError::ConnectionLost(reason.clone())));
                Err(SessionError::ConnectionLost(reason))
            }
            Err(err) => {
                self.session.abandon();
                warn!(%item_code, %err, "send failed");
                let _ = pending.reply.send(Err(SessionError::Transport(err)));
                Ok(())
            }
        }
    }

    fn on_deadline(&mut self) {
        let Some(item_code) = self.session.expire(Instant::now()) else {
            return;
        };
        let after = self.session.timeout();
        warn!(%item_code, ?after, "command timed out");
        if let Some(pending) = self.pending.take() {
            let _ = pending
                .reply
                .send(Err(SessionError::Timeout { item_code, after }));
        }
    }

    fn abandon(&mut self, reason: &str) {
        if let Some(item_code) = self.session.abandon() {
            debug!(%item_code, reason, "pending command abandoned");
        }
        self.pending = None;
    }

    fn fail_pending(&mut self, reason: &str) {
        self.session.abandon();
        if let Some(pending) = self.pending.take() {
            let _ = pending
                .reply
                .send(Err(SessionError::ConnectionLost(reason.to_string())));
        }
    }
}

async fn reply_closed(pending: &mut Option<PendingCommand>) {
    match pending {
        Some(pending) => pending.reply.closed().await,
        None => future::pending().await,
    }
}

async fn run_ingest(
    mut ingest: StreamIngest,
    mut items: mpsc::UnboundedReceiver<IngestItem>,
    notifications: mpsc::Sender<StreamNotification>,
) {
    let mut consumer_open = true;

    while let Some(item) = items.recv().await {
        let frame = match item {
            IngestItem::Frame(frame, slot) => {
                drop(slot);
                frame
            }
            IngestItem::Control(control) => {
                apply_control(&mut ingest, control);
                continue;
            }
            IngestItem::Stats {
                stream,
                dropped,
                reply,
            } => {
                let stats = ingest
                    .stats(stream)
                    .map(|stats| StreamStats { dropped, ..stats });
                let _ = reply.send(stats);
                continue;
            }
        };

        let Some(notification) = ingest.on_frame(&frame) else {
            continue;
        };
        if consumer_open && notifications.send(notification).await.is_err() {
            debug!("notification receiver dropped, samples are no longer delivered");
            consumer_open = false;
        }
    }

    debug!("ingest stopped");
}

fn apply_control(ingest: &mut StreamIngest, control: StreamControl) {
    match control {
        StreamControl::SetSampleWidth { stream, bits } => {
            ingest.set_sample_width(stream, bits);
        }
        StreamControl::Reset { stream } => ingest.reset(stream),
    }
}

/// Cloneable handle for issuing commands to a running session.
///
/// Every method fails with [`SessionError::ConnectionLost`] once the
/// dispatcher has stopped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<SessionRequest>,
    next_id: Arc<AtomicU64>,
}

impl SessionHandle {
    /// Send a `SetControlItem` and wait for the receiver's reply body.
    pub async fn send(&self, item_code: ControlItemCode, payload: impl Into<Bytes>) -> Result<Bytes> {
        self.request(item_code, payload.into(), None, None).await
    }

    /// Like [`send`](Self::send), but gives up when `cancel` fires.
    ///
    /// A cancelled command returns the session to idle; a reply that arrives
    /// afterwards is discarded.
    pub async fn send_with_cancel(
        &self,
        item_code: ControlItemCode,
        payload: impl Into<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        self.request(item_code, payload.into(), None, Some(cancel))
            .await
    }

    pub async fn execute(&self, command: &ReceiverCommand) -> Result<Bytes> {
        self.send(command.item_code(), command.payload().clone())
            .await
    }

    pub async fn execute_with_cancel(
        &self,
        command: &ReceiverCommand,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        self.send_with_cancel(command.item_code(), command.payload().clone(), cancel)
            .await
    }

    /// Start I/Q streaming. `DataItem0` frames received after the
    /// acknowledgement are decoded at the capture mode's sample width.
    pub async fn start_iq(&self, mode: CaptureMode) -> Result<Bytes> {
        let command = ReceiverCommand::start_iq(mode);
        let width = StreamControl::SetSampleWidth {
            stream: MessageType::DataItem0,
            bits: mode.sample_bits(),
        };
        self.request(
            command.item_code(),
            command.payload().clone(),
            Some(width),
            None,
        )
        .await
    }

    pub async fn stop_iq(&self) -> Result<Bytes> {
        self.execute(&ReceiverCommand::stop_iq()).await
    }

    pub async fn set_frequency(&self, channel: u8, hz: u64) -> Result<Bytes> {
        self.execute(&ReceiverCommand::set_frequency(channel, hz)?)
            .await
    }

    /// Change the width used to decode `stream`. Applies to every frame the
    /// session receives after this returns.
    pub async fn set_sample_width(&self, stream: MessageType, bits: u16) -> Result<()> {
        check_data_stream(stream)?;
        if bits == 0 || bits % 8 != 0 || bits > MAX_SAMPLE_BITS {
            return Err(SessionError::InvalidCommand(format!(
                "sample width {bits} is not a multiple of 8 between 8 and {MAX_SAMPLE_BITS}"
            )));
        }
        self.control_stream(StreamControl::SetSampleWidth { stream, bits })
            .await
    }

    /// Forget the sequence baseline of `stream`.
    pub async fn reset_stream(&self, stream: MessageType) -> Result<()> {
        check_data_stream(stream)?;
        self.control_stream(StreamControl::Reset { stream }).await
    }

    /// Counters for `stream` as of the frames received so far.
    pub async fn stream_stats(&self, stream: MessageType) -> Result<StreamStats> {
        check_data_stream(stream)?;
        let (reply, stats) = oneshot::channel();
        self.submit(SessionRequest::Stats { stream, reply }).await?;
        stats
            .await
            .map_err(|_| dispatcher_stopped())?
            .ok_or_else(|| SessionError::InvalidCommand(format!("{stream} is not a data stream")))
    }

    pub async fn state(&self) -> Result<SessionState> {
        let (reply, state) = oneshot::channel();
        self.submit(SessionRequest::State { reply }).await?;
        state.await.map_err(|_| dispatcher_stopped())
    }

    /// Whether the dispatcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    async fn control_stream(&self, control: StreamControl) -> Result<()> {
        let (queued, done) = oneshot::channel();
        self.submit(SessionRequest::Stream { control, queued })
            .await?;
        done.await.map_err(|_| dispatcher_stopped())
    }

    async fn request(
        &self,
        item_code: ControlItemCode,
        payload: Bytes,
        on_resolved: Option<StreamControl>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Bytes> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(SessionError::Cancelled);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, mut response) = oneshot::channel();
        self.submit(SessionRequest::Send {
            id,
            item_code,
            payload,
            on_resolved,
            reply,
        })
        .await?;

        let Some(cancel) = cancel else {
            return response.await.unwrap_or_else(|_| Err(dispatcher_stopped()));
        };

        tokio::select! {
            biased;

            result = &mut response => result.unwrap_or_else(|_| Err(dispatcher_stopped())),
            _ = cancel.cancelled() => {
                debug!(%item_code, id, "command cancelled");
                // Best effort: a stopped dispatcher has nothing left to cancel.
                let _ = self.requests.send(SessionRequest::Cancel { id }).await;
                Err(SessionError::Cancelled)
            }
        }
    }

    async fn submit(&self, request: SessionRequest) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| dispatcher_stopped())
    }
}

fn check_data_stream(stream: MessageType) -> Result<()> {
    if stream.is_data_item() {
        Ok(())
    } else {
        Err(SessionError::InvalidCommand(format!(
            "{stream} is not a data stream"
        )))
    }
}

fn dispatcher_stopped() -> SessionError {
    SessionError::ConnectionLost("session dispatcher stopped".to_string())
}
