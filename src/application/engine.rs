use super::events::{Event, Notifier};
use super::session::{Action, Awaiting, ProtocolMachine, ProtocolState};
use crate::data_link::FrameAssembler;
use crate::error::{PdmError, Result};
use crate::model::Snapshot;
use crate::physical::PhysicalLayer;
use crate::types::Config;
use log::{debug, error, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Protocol engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tick_interval_ms: u32,       // Processing tick period
    pub read_timeout_ms: u32,        // Transport read timeout
    pub handshake_retry_ms: u32,     // BEGIN repeat interval until CONFIRM
    pub ack_timeout_ms: Option<u32>, // Report a ProtocolTimeout after this long
    pub retry_on_checksum_fail: bool,
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            read_timeout_ms: 20,
            handshake_retry_ms: 1000,
            ack_timeout_ms: None,
            retry_on_checksum_fail: false,
            event_queue_capacity: 64,
        }
    }
}

impl Config for EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 || self.read_timeout_ms == 0 || self.handshake_retry_ms == 0
        {
            return Err(PdmError::InvalidParameter(
                "engine intervals must be non-zero".into(),
            ));
        }
        if self.ack_timeout_ms == Some(0) {
            return Err(PdmError::InvalidParameter("ack timeout is zero".into()));
        }
        if self.event_queue_capacity == 0 {
            return Err(PdmError::InvalidParameter(
                "event queue capacity is zero".into(),
            ));
        }
        Ok(())
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// State shared by the client handle, the reader thread and the tick thread
#[derive(Debug)]
struct Shared {
    assembler: FrameAssembler,
    machine: Mutex<ProtocolMachine>,
    notifier: Notifier,
    running: AtomicBool,
}

impl Shared {
    /// Stops both worker threads; only the first caller reports the loss
    fn disconnect(&self, reason: String) {
        if self.running.swap(false, Ordering::SeqCst) {
            error!("link lost: {reason}");
            relock(&self.machine).reset();
            self.assembler.clear();
            self.notifier.publish(Event::Disconnected(reason));
        }
    }
}

// Time since the last transmission, for handshake retry and ack timeout
struct TxClock {
    sent_at: Instant,
    timeout_reported: bool,
}

impl TxClock {
    fn new() -> Self {
        Self {
            sent_at: Instant::now(),
            timeout_reported: false,
        }
    }

    fn mark(&mut self) {
        self.sent_at = Instant::now();
        self.timeout_reported = false;
    }

    fn elapsed_ms(&self) -> u128 {
        self.sent_at.elapsed().as_millis()
    }
}

struct Worker<P> {
    tick: JoinHandle<P>,
    reader: JoinHandle<()>,
}

/// Host-side protocol engine for one PDM.
///
/// `open` performs the handshake and starts polling on two background
/// threads: one moves bytes from the transport into the frame assembler,
/// the other runs the processing tick and owns all writes.
pub struct PdmClient<P: PhysicalLayer + 'static> {
    config: EngineConfig,
    physical: Option<P>,
    shared: Arc<Shared>,
    worker: Option<Worker<P>>,
}

impl<P: PhysicalLayer + 'static> PdmClient<P> {
    pub fn with_physical(config: EngineConfig, physical: P) -> Self {
        let machine = ProtocolMachine::new(config.retry_on_checksum_fail);
        Self {
            config,
            physical: Some(physical),
            shared: Arc::new(Shared {
                assembler: FrameAssembler::new(),
                machine: Mutex::new(machine),
                notifier: Notifier::new(),
                running: AtomicBool::new(false),
            }),
            worker: None,
        }
    }

    pub fn new(config: EngineConfig, physical_config: P::Config) -> Result<Self> {
        Ok(Self::with_physical(config, P::new(physical_config)?))
    }

    pub fn open(&mut self) -> Result<()> {
        self.config.validate()?;
        self.reclaim()?;
        if self.worker.is_some() {
            return Ok(());
        }

        let mut link = self.physical.take().ok_or(PdmError::NotInitialized)?;
        let reader_link = match link
            .open()
            .and_then(|_| link.set_timeout(self.config.read_timeout_ms))
            .and_then(|_| link.try_clone())
        {
            Ok(reader_link) => reader_link,
            Err(e) => {
                let _ = link.close();
                self.physical = Some(link);
                return Err(e);
            }
        };

        self.shared.assembler.clear();
        let begin = relock(&self.shared.machine).begin();
        self.shared.running.store(true, Ordering::SeqCst);
        info!("link open, starting handshake");

        let reader = {
            let shared = self.shared.clone();
            thread::spawn(move || run_reader(shared, reader_link))
        };
        let tick = {
            let shared = self.shared.clone();
            let config = self.config.clone();
            thread::spawn(move || run_ticks(shared, link, config, begin))
        };
        self.worker = Some(Worker { tick, reader });
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.shared.running.store(false, Ordering::SeqCst);
        self.reclaim()?;
        relock(&self.shared.machine).reset();
        self.shared.assembler.clear();
        Ok(())
    }

    // Joins finished worker threads and takes the transport back
    fn reclaim(&mut self) -> Result<()> {
        if self.shared.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        if worker.reader.join().is_err() {
            warn!("reader thread panicked");
        }
        let mut link = worker
            .tick
            .join()
            .map_err(|_| PdmError::Transport("tick thread panicked".into()))?;
        link.close()?;
        debug!("worker threads stopped");
        self.physical = Some(link);
        Ok(())
    }

    /// True once the device has acknowledged the handshake
    pub fn is_connected(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst) && relock(&self.shared.machine).is_connected()
    }

    pub fn state(&self) -> ProtocolState {
        relock(&self.shared.machine).state()
    }

    /// Last snapshot decoded from the device
    pub fn live_snapshot(&self) -> Arc<Snapshot> {
        relock(&self.shared.machine).live()
    }

    pub fn on_snapshot_updated<F>(&self, callback: F)
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.shared.notifier.on_event(move |event| {
            if let Event::SnapshotUpdated(snapshot) = event {
                callback(snapshot.clone());
            }
        });
    }

    pub fn on_disconnected<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.notifier.on_event(move |event| {
            if let Event::Disconnected(reason) = event {
                callback(reason);
            }
        });
    }

    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.notifier.on_event(callback);
    }

    /// Bounded queue of future events; the newest event is dropped when full
    pub fn subscribe(&self) -> Receiver<Event> {
        self.shared
            .notifier
            .subscribe(self.config.event_queue_capacity)
    }

    // Worker threads exist but have stopped on a transport failure
    fn check_link(&self) -> Result<()> {
        if self.worker.is_some() && !self.shared.running.load(Ordering::SeqCst) {
            return Err(PdmError::Disconnected);
        }
        Ok(())
    }

    /// Starts pushing `desired` to the device at the next polling boundary
    pub fn request_config_push(&self, desired: Snapshot) -> Result<()> {
        self.check_link()?;
        relock(&self.shared.machine).request_config_push(Arc::new(desired))
    }

    pub fn abort_config_push(&self) {
        relock(&self.shared.machine).abort_config_push();
    }

    /// Momentarily forces an output channel on or off
    pub fn send_immediate_override(&self, channel: usize, state: bool) -> Result<()> {
        self.check_link()?;
        relock(&self.shared.machine).request_override(channel, state)
    }
}

impl<P: PhysicalLayer + 'static> Drop for PdmClient<P> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("close on drop failed: {e}");
        }
    }
}

fn run_reader<P: PhysicalLayer>(shared: Arc<Shared>, mut link: P) {
    let mut buf = [0u8; 512];
    while shared.running.load(Ordering::SeqCst) {
        let received = match link.read_bytes(&mut buf) {
            Ok(0) => continue,
            Ok(n) => n,
            Err(e) => {
                shared.disconnect(e.to_string());
                break;
            }
        };
        match link.bytes_pending() {
            Ok(pending) => {
                trace!("rx {received} bytes, {pending} pending");
                shared.assembler.feed(&buf[..received], pending > 0);
            }
            Err(e) => {
                shared.disconnect(e.to_string());
                break;
            }
        }
    }
}

fn run_ticks<P: PhysicalLayer>(
    shared: Arc<Shared>,
    mut link: P,
    config: EngineConfig,
    initial: Vec<Action>,
) -> P {
    let tick = Duration::from_millis(config.tick_interval_ms as u64);
    let mut clock = TxClock::new();
    let mut actions = initial;
    loop {
        if let Err(e) = perform(&shared, &mut link, actions, &mut clock) {
            shared.disconnect(e.to_string());
            break;
        }
        thread::sleep(tick);
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        actions = process(&shared, &config, &mut clock);
    }
    link
}

// One processing tick: feed whatever the machine is waiting for, or run timers
fn process(shared: &Shared, config: &EngineConfig, clock: &mut TxClock) -> Vec<Action> {
    let mut machine = relock(&shared.machine);
    let received = match machine.awaiting() {
        Awaiting::Frame => shared
            .assembler
            .try_take_frame()
            .map(|frame| machine.handle_frame(&frame)),
        Awaiting::Acknowledgment => shared
            .assembler
            .take_bytes()
            .map(|bytes| machine.handle_bytes(&bytes)),
        Awaiting::Nothing => Some(machine.dispatch_if_idle()),
    };
    if let Some(actions) = received {
        return actions;
    }

    let elapsed = clock.elapsed_ms();
    if machine.state() == ProtocolState::AwaitingHandshakeAck {
        if elapsed >= config.handshake_retry_ms as u128 {
            return machine.resend_begin();
        }
        return Vec::new();
    }
    if let (Some(timeout), Some(command)) = (config.ack_timeout_ms, machine.outstanding()) {
        if elapsed >= timeout as u128 && !clock.timeout_reported {
            clock.timeout_reported = true;
            warn!("{}: {command:?} after {elapsed} ms", PdmError::ProtocolTimeout);
            return vec![Action::Notify(Event::ProtocolTimeout(command))];
        }
    }
    Vec::new()
}

fn perform<P: PhysicalLayer>(
    shared: &Shared,
    link: &mut P,
    actions: Vec<Action>,
    clock: &mut TxClock,
) -> Result<()> {
    for action in actions {
        match action {
            Action::Transmit(outbound) => {
                let bytes = outbound.to_bytes();
                trace!("tx {:?}, {} bytes", outbound.command(), bytes.len());
                link.write_bytes(&bytes)?;
                clock.mark();
            }
            Action::ClearReceiveBuffer => shared.assembler.clear(),
            Action::Notify(event) => shared.notifier.publish(event),
        }
    }
    Ok(())
}
