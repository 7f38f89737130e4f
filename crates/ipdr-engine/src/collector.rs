use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use ipdr_frame::{FrameAssembler, FrameWriter};
use ipdr_wire::{ErrorMessage, KeepAlive, Message, ERR_KEEPALIVE_EXPIRED};
use tracing::{debug, error, info, warn};

use crate::config::CollectorConfig;
use crate::dispatch::Dispatcher;
use crate::error::{EngineError, Result};
use crate::liveness::Liveness;
use crate::lock;
use crate::registry::SessionRegistry;
use crate::sink::SinkFactory;

/// Raw read buffer size for the receive thread.
const READ_CHUNK_SIZE: usize = 8 * 1024;
/// Inbound chunk queue depth between receiver and dispatcher.
const CHUNK_QUEUE_DEPTH: usize = 10;
/// Outbound message queue depth feeding the single send thread.
const OUTBOUND_QUEUE_DEPTH: usize = 16;
/// Scheduler wake interval; timer precision is bounded by this.
const SCHEDULER_TICK: Duration = Duration::from_secs(1);
/// How often the dispatcher checks the stop flag while its queue is idle.
const STOP_POLL: Duration = Duration::from_millis(250);

/// One collection link: connects the protocol machinery to a byte stream
/// and runs it to completion.
///
/// Four threads cooperate: a receiver pulling raw chunks off the stream,
/// the dispatcher reassembling and handling frames, a single sender
/// serializing every outbound message in submission order, and a
/// scheduler driving keepalives and time-based acknowledgements.
pub struct Collector {
    config: CollectorConfig,
    factory: Box<dyn SinkFactory>,
}

impl Collector {
    pub fn new(config: CollectorConfig, factory: Box<dyn SinkFactory>) -> Self {
        Self { config, factory }
    }

    /// Run the link until the exporter closes it, a fatal protocol error
    /// occurs, or `stop` is raised.
    ///
    /// The receive thread blocks in `read`; to interrupt a healthy link
    /// from outside, raise `stop` and shut the underlying stream down so
    /// the read returns.
    pub fn run<R, W>(self, reader: R, writer: W, stop: Arc<AtomicBool>) -> Result<()>
    where
        R: Read + Send,
        W: Write + Send,
    {
        let registry = Mutex::new(SessionRegistry::new(
            self.config.session_ids.clone(),
            self.factory,
        ));
        let liveness = Mutex::new(Liveness::new(Instant::now()));
        let mut dispatcher = Dispatcher::new(self.config.clone());

        let (chunk_tx, chunk_rx) = mpsc::sync_channel::<Vec<u8>>(CHUNK_QUEUE_DEPTH);
        let (out_tx, out_rx) = mpsc::sync_channel::<Message>(OUTBOUND_QUEUE_DEPTH);

        let connect = dispatcher.connect_message();
        out_tx
            .send(connect)
            .map_err(|_| EngineError::ChannelClosed("outbound"))?;
        info!(
            vendor = %self.config.vendor_id,
            keepalive = self.config.keepalive_interval,
            sessions = ?self.config.session_ids,
            "link starting"
        );

        let close_on_timeout = self.config.close_on_keepalive_timeout;

        thread::scope(|scope| {
            let receiver = scope.spawn({
                let stop = Arc::clone(&stop);
                move || receive_loop(reader, chunk_tx, &stop)
            });

            let sender = scope.spawn({
                let stop = Arc::clone(&stop);
                let liveness = &liveness;
                move || send_loop(writer, out_rx, liveness, &stop)
            });

            let scheduler = scope.spawn({
                let stop = Arc::clone(&stop);
                let out_tx = out_tx.clone();
                let registry = &registry;
                let liveness = &liveness;
                move || schedule_loop(out_tx, registry, liveness, &stop, close_on_timeout)
            });

            let dispatched = dispatch_loop(
                &mut dispatcher,
                chunk_rx,
                out_tx,
                &registry,
                &liveness,
                &stop,
            );

            stop.store(true, Ordering::SeqCst);
            lock(&registry).flush_all();

            let received = join(receiver);
            let scheduled = join(scheduler);
            let sent = join(sender);

            // The dispatcher's verdict wins; transport errors come next.
            dispatched.and(received).and(scheduled).and(sent)
        })
    }
}

fn join(handle: thread::ScopedJoinHandle<'_, Result<()>>) -> Result<()> {
    handle
        .join()
        .map_err(|_| EngineError::ChannelClosed("worker thread panicked"))?
}

/// Receive thread: raw chunks from the stream into the dispatcher queue.
fn receive_loop<R: Read>(
    mut reader: R,
    chunks: SyncSender<Vec<u8>>,
    stop: &AtomicBool,
) -> Result<()> {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }
        match reader.read(&mut buf) {
            Ok(0) => {
                info!("exporter closed the connection");
                return Err(ipdr_frame::FrameError::ConnectionClosed.into());
            }
            Ok(n) => {
                if chunks.send(buf[..n].to_vec()).is_err() {
                    // Dispatcher went away first; its verdict stands.
                    return Ok(());
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                continue
            }
            Err(e) => {
                if stop.load(Ordering::SeqCst) {
                    // Shutdown raced the read; not a link failure.
                    return Ok(());
                }
                error!(error = %e, "read failed");
                return Err(e.into());
            }
        }
    }
}

/// Send thread: the only writer. Messages go out strictly in the order
/// they were queued; each successful write defers the next keepalive.
fn send_loop<W: Write>(
    writer: W,
    outbound: mpsc::Receiver<Message>,
    liveness: &Mutex<Liveness>,
    stop: &AtomicBool,
) -> Result<()> {
    let mut writer = FrameWriter::new(writer);
    for message in outbound {
        debug!(message = %message.describe(), "sending");
        let frame = message.encode()?;
        if let Err(e) = writer.write_frame(&frame) {
            if stop.load(Ordering::SeqCst) {
                return Ok(());
            }
            stop.store(true, Ordering::SeqCst);
            error!(error = %e, "write failed");
            return Err(e.into());
        }
        lock(liveness).observe_send(Instant::now());
    }
    Ok(())
}

/// Dispatcher loop: reassemble frames from chunks and let the state
/// machine answer them.
fn dispatch_loop(
    dispatcher: &mut Dispatcher,
    chunks: mpsc::Receiver<Vec<u8>>,
    outbound: SyncSender<Message>,
    registry: &Mutex<SessionRegistry>,
    liveness: &Mutex<Liveness>,
    stop: &AtomicBool,
) -> Result<()> {
    let mut assembler = FrameAssembler::default();
    loop {
        let chunk = match chunks.recv_timeout(STOP_POLL) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::SeqCst) {
                    send_disconnect(dispatcher, &outbound);
                    return Ok(());
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Receiver exited; it reports the cause.
                return Ok(());
            }
        };

        assembler.push(&chunk);
        while let Some(frame) = assembler.next_frame()? {
            let now = Instant::now();
            let replies = dispatcher.handle_frame(&frame, now, registry, liveness)?;
            for reply in replies {
                if outbound.send(reply).is_err() {
                    return Err(EngineError::ChannelClosed("outbound"));
                }
            }
        }
    }
}

fn send_disconnect(dispatcher: &Dispatcher, outbound: &SyncSender<Message>) {
    // Best effort; the sender may already be gone.
    let _ = outbound.try_send(dispatcher.disconnect_message());
}

/// Scheduler: wakes every tick to emit due keepalives, receive-silence
/// errors, and time-based acks.
fn schedule_loop(
    outbound: SyncSender<Message>,
    registry: &Mutex<SessionRegistry>,
    liveness: &Mutex<Liveness>,
    stop: &AtomicBool,
    close_on_timeout: bool,
) -> Result<()> {
    loop {
        thread::sleep(SCHEDULER_TICK);
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }
        let now = Instant::now();

        let (keepalive_due, timed_out, silence) = {
            let mut guard = lock(liveness);
            (
                guard.keepalive_due(now),
                guard.receive_timed_out(now),
                guard.silence_budget_secs(),
            )
        };

        if keepalive_due
            && outbound
                .try_send(Message::KeepAlive(KeepAlive { session_id: 0 }))
                .is_err_and(disconnected)
        {
            return Ok(());
        }

        if timed_out {
            warn!(silence_secs = silence, "exporter keepalive expired");
            let notice = Message::Error(ErrorMessage::with_code(ERR_KEEPALIVE_EXPIRED));
            if outbound.try_send(notice).is_err_and(disconnected) {
                return Ok(());
            }
            if close_on_timeout {
                stop.store(true, Ordering::SeqCst);
                return Err(EngineError::KeepaliveExpired(silence));
            }
        }

        for ack in lock(registry).acks_due(now) {
            if outbound
                .try_send(Message::DataAck(ack))
                .is_err_and(disconnected)
            {
                return Ok(());
            }
        }
    }
}

fn disconnected(err: TrySendError<Message>) -> bool {
    matches!(err, TrySendError::Disconnected(_))
}
