use super::PhysicalLayer;
use crate::application::decoder::encode_telemetry;
use crate::application::diff::{decode_update, OVERRIDE_PARAMETER};
use crate::error::{PdmError, Result};
use crate::model::{Address, Domain, Snapshot};
use crate::types::{Command, Config};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Called with every write; the returned bytes become readable
pub type MockHandler = Box<dyn FnMut(&[u8]) -> Result<Vec<u8>> + Send>;

#[derive(Debug, Default)]
pub struct MockConfig {
    pub timeout_ms: u32,
}

impl Config for MockConfig {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MockState {
    rx: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    handler: Option<MockHandler>,
    is_open: bool,
    unplugged: bool,
    timeout_ms: u32,
}

/// In-memory byte channel for testing. Clones share the same channel.
#[derive(Clone)]
pub struct MockPhysical {
    state: Arc<Mutex<MockState>>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPhysical {
    /// Creates a new mock physical layer with a custom write handler
    pub fn new(handler: Option<MockHandler>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                handler,
                timeout_ms: 1,
                ..Default::default()
            })),
        }
    }

    /// Creates a mock link answering like a PDM holding `device`'s state
    pub fn new_device(device: &MockDevice) -> Self {
        let device = device.clone();
        Self::new(Some(Box::new(move |data: &[u8]| Ok(device.respond(data)))))
    }

    /// Creates a new mock physical layer whose writes always fail
    pub fn new_error() -> Self {
        Self::new(Some(Box::new(|_: &[u8]| {
            Err(PdmError::Transport("mock write failure".into()))
        })))
    }

    /// Makes bytes readable as if the device had sent them
    pub fn inject(&self, bytes: &[u8]) {
        relock(&self.state).rx.extend(bytes.iter().copied());
    }

    /// Every write so far, one entry per call
    pub fn written(&self) -> Vec<Vec<u8>> {
        relock(&self.state).written.clone()
    }

    /// All further reads and writes fail
    pub fn unplug(&self) {
        relock(&self.state).unplugged = true;
    }

    fn check(state: &MockState) -> Result<()> {
        if state.unplugged {
            return Err(PdmError::Transport("device unplugged".into()));
        }
        if !state.is_open {
            return Err(PdmError::NotInitialized);
        }
        Ok(())
    }
}

impl PhysicalLayer for MockPhysical {
    type Config = MockConfig;

    fn new(config: Self::Config) -> Result<Self> {
        let mock = MockPhysical::new(None);
        relock(&mock.state).timeout_ms = config.timeout_ms;
        Ok(mock)
    }

    fn open(&mut self) -> Result<()> {
        relock(&self.state).is_open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        relock(&self.state).is_open = false;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut state = relock(&self.state);
        Self::check(&state)?;
        state.written.push(data.to_vec());
        if let Some(handler) = state.handler.as_mut() {
            let reply = handler(data)?;
            state.rx.extend(reply);
        }
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let timeout_ms = {
            let state = relock(&self.state);
            Self::check(&state)?;
            if state.rx.is_empty() {
                state.timeout_ms
            } else {
                0
            }
        };
        if timeout_ms > 0 {
            thread::sleep(Duration::from_millis(timeout_ms as u64));
        }

        let mut state = relock(&self.state);
        Self::check(&state)?;
        let count = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn bytes_pending(&mut self) -> Result<usize> {
        let state = relock(&self.state);
        Self::check(&state)?;
        Ok(state.rx.len())
    }

    fn set_timeout(&mut self, timeout_ms: u32) -> Result<()> {
        relock(&self.state).timeout_ms = timeout_ms;
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

/// What the emulated device has been told so far
#[derive(Debug, Default)]
pub struct DeviceState {
    pub snapshot: Snapshot,
    pub begins: usize,
    pub requests: usize,
    pub updates: Vec<Address>,
    pub skips: usize,
    pub saves: usize,
    pub overrides: Vec<(u8, bool)>,
    /// Number of upcoming BEGINs to leave unanswered
    pub ignore_begins: usize,
    /// Number of upcoming valid updates to answer with CHECKSUM_FAIL
    pub reject_updates: usize,
    /// Number of upcoming updates to leave unanswered
    pub ignore_updates: usize,
}

/// Minimal PDM firmware emulation for driving the engine in tests
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                snapshot,
                ..Default::default()
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, DeviceState> {
        relock(&self.state)
    }

    /// Reply bytes for one host write: command byte plus optional frame
    pub fn respond(&self, data: &[u8]) -> Vec<u8> {
        let confirm = vec![Command::Confirm.code()];
        let fail = vec![Command::ChecksumFail.code()];
        let Some((&code, frame)) = data.split_first() else {
            return Vec::new();
        };

        let mut state = self.state();
        match Command::from_code(code) {
            Some(Command::Begin) => {
                state.begins += 1;
                if state.ignore_begins > 0 {
                    state.ignore_begins -= 1;
                    Vec::new()
                } else {
                    confirm
                }
            }
            Some(Command::Request) => {
                state.requests += 1;
                encode_telemetry(&state.snapshot)
            }
            Some(Command::NewConfig) => match decode_update(frame) {
                Ok(_) if state.ignore_updates > 0 => {
                    state.ignore_updates -= 1;
                    Vec::new()
                }
                Ok(_) if state.reject_updates > 0 => {
                    state.reject_updates -= 1;
                    fail
                }
                Ok((address, slot)) => match state.snapshot.apply(address, slot) {
                    Ok(()) => {
                        state.updates.push(address);
                        confirm
                    }
                    Err(_) => fail,
                },
                Err(_) => fail,
            },
            Some(Command::Skip) => {
                state.skips += 1;
                confirm
            }
            Some(Command::SaveChanges) => {
                state.saves += 1;
                confirm
            }
            Some(Command::Send) => match decode_update(frame) {
                Ok((address, slot))
                    if address.domain == Domain::Channel
                        && address.parameter == OVERRIDE_PARAMETER =>
                {
                    let on = slot[0] != 0;
                    state.snapshot.channels[address.item as usize].override_active = on;
                    state.overrides.push((address.item, on));
                    confirm
                }
                _ => fail,
            },
            _ => Vec::new(),
        }
    }
}
