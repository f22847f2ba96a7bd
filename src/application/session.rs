//! Protocol state machine.
//!
//! The machine is pure: it consumes received frames and acknowledgment
//! bytes and returns the [`Action`]s the engine must perform. At most one
//! command is outstanding at a time, and every transition out of a waiting
//! state is driven by the device's reply.

use super::decoder::{decode, Decoded};
use super::diff::{encode_override, ConfigDiff, Cursor, Step};
use super::events::Event;
use crate::error::{PdmError, Result};
use crate::model::Snapshot;
use crate::types::{Command, Config, FrameData, NUM_OUTPUT_CHANNELS};
use bitflags::bitflags;
use log::{debug, error, info, trace, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    AwaitingHandshakeAck,
    Polling,
    PushingConfig,
    AwaitingSaveAck,
    OverridePending,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SessionFlags: u8 {
        const HANDSHAKE_COMPLETE = 0x01;
        /// A push cycle has been requested or is running
        const CONFIG_PUSH = 0x02;
        const SAVE_PENDING = 0x04;
    }
}

/// Per-connection bookkeeping, reset on disconnect
#[derive(Debug, Clone, Default)]
pub struct ProtocolSession {
    pub last_command: Option<Command>,
    /// `last_command` has not been answered yet
    pub reply_pending: bool,
    pub flags: SessionFlags,
    pub diff: ConfigDiff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Override {
    pub channel: u8,
    pub state: bool,
}

/// Bytes to put on the wire for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Command(Command),
    /// Command byte immediately followed by a frame
    Frame { command: Command, frame: FrameData },
}

impl Outbound {
    pub fn command(&self) -> Command {
        match self {
            Outbound::Command(command) | Outbound::Frame { command, .. } => *command,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Outbound::Command(command) => vec![command.code()],
            Outbound::Frame { command, frame } => {
                let mut bytes = Vec::with_capacity(frame.len() + 1);
                bytes.push(command.code());
                bytes.extend_from_slice(frame);
                bytes
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Transmit(Outbound),
    /// Discard anything buffered from the receive side
    ClearReceiveBuffer,
    Notify(Event),
}

/// What the engine should pull from the receive buffer next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaiting {
    Nothing,
    Frame,
    Acknowledgment,
}

#[derive(Debug, Clone)]
pub struct ProtocolMachine {
    state: ProtocolState,
    session: ProtocolSession,
    live: Arc<Snapshot>,
    desired: Option<Arc<Snapshot>>,
    pending_override: Option<Override>,
    active_override: Option<Override>,
    resume_state: ProtocolState,
    last_outbound: Option<Outbound>,
    retry_on_checksum_fail: bool,
}

impl Default for ProtocolMachine {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ProtocolMachine {
    pub fn new(retry_on_checksum_fail: bool) -> Self {
        Self {
            state: ProtocolState::Idle,
            session: ProtocolSession::default(),
            live: Arc::new(Snapshot::new()),
            desired: None,
            pending_override: None,
            active_override: None,
            resume_state: ProtocolState::Polling,
            last_outbound: None,
            retry_on_checksum_fail,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn session(&self) -> &ProtocolSession {
        &self.session
    }

    pub fn cursor(&self) -> Cursor {
        self.session.diff.cursor()
    }

    pub fn live(&self) -> Arc<Snapshot> {
        self.live.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.session.flags.contains(SessionFlags::HANDSHAKE_COMPLETE)
    }

    /// Command waiting for a reply, if any
    pub fn outstanding(&self) -> Option<Command> {
        match self.state {
            ProtocolState::Idle => None,
            _ if !self.session.reply_pending => None,
            _ => self.session.last_command,
        }
    }

    pub fn awaiting(&self) -> Awaiting {
        match self.outstanding() {
            None => Awaiting::Nothing,
            Some(Command::Request) => Awaiting::Frame,
            Some(_) => Awaiting::Acknowledgment,
        }
    }

    /// Drops all session state. The last live snapshot is kept.
    pub fn reset(&mut self) {
        let live = self.live.clone();
        *self = Self::new(self.retry_on_checksum_fail);
        self.live = live;
    }

    pub fn begin(&mut self) -> Vec<Action> {
        self.reset();
        self.state = ProtocolState::AwaitingHandshakeAck;
        let mut actions = vec![Action::ClearReceiveBuffer];
        self.transmit(Outbound::Command(Command::Begin), &mut actions);
        actions
    }

    /// Repeats BEGIN while the handshake is unanswered
    pub fn resend_begin(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.state == ProtocolState::AwaitingHandshakeAck {
            debug!("handshake unanswered, resending BEGIN");
            self.transmit(Outbound::Command(Command::Begin), &mut actions);
        }
        actions
    }

    /// Handles a complete frame received while a REQUEST is outstanding
    pub fn handle_frame(&mut self, frame: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.awaiting() != Awaiting::Frame {
            debug!("ignoring {} byte frame in {:?}", frame.len(), self.state);
            return actions;
        }
        match decode(frame) {
            Ok(Decoded::Telemetry(snapshot)) => {
                self.live = Arc::new(*snapshot);
                actions.push(Action::Notify(Event::SnapshotUpdated(self.live.clone())));
            }
            Ok(Decoded::Acknowledgment(command)) => {
                debug!("expected telemetry, got frame for command {command:#04x}")
            }
            Err(e) if e.is_frame_error() => warn!("dropping frame: {e}"),
            Err(e) => error!("unexpected decode failure: {e}"),
        }
        self.session.reply_pending = false;
        self.dispatch(&mut actions);
        actions
    }

    /// Scans received bytes for the first acknowledgment
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Vec<Action> {
        for &byte in bytes {
            match Command::from_code(byte) {
                Some(command @ (Command::Confirm | Command::ChecksumFail)) => {
                    return self.handle_ack(command)
                }
                _ => trace!("ignoring byte {byte:#04x}"),
            }
        }
        Vec::new()
    }

    pub fn handle_ack(&mut self, ack: Command) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.awaiting() != Awaiting::Acknowledgment {
            trace!("{ack:?} with no command awaiting one");
            return actions;
        }
        match ack {
            Command::Confirm => self.on_confirm(&mut actions),
            Command::ChecksumFail => self.on_checksum_fail(&mut actions),
            other => debug!("{other:?} is not an acknowledgment"),
        }
        actions
    }

    /// Stores `desired` and starts a push cycle at the next polling boundary
    pub fn request_config_push(&mut self, desired: Arc<Snapshot>) -> Result<()> {
        desired.validate()?;
        if !self.is_connected() {
            return Err(PdmError::NotInitialized);
        }
        if matches!(
            self.state,
            ProtocolState::PushingConfig | ProtocolState::AwaitingSaveAck
        ) || (self.state == ProtocolState::OverridePending
            && self.resume_state == ProtocolState::PushingConfig)
        {
            return Err(PdmError::InvalidParameter(
                "configuration push already in progress".into(),
            ));
        }
        info!("configuration push requested");
        self.desired = Some(desired);
        self.session.flags.insert(SessionFlags::CONFIG_PUSH);
        Ok(())
    }

    /// Cancels a requested or running push. Polling resumes once the
    /// outstanding command, if any, has been answered.
    pub fn abort_config_push(&mut self) {
        if !self
            .session
            .flags
            .intersects(SessionFlags::CONFIG_PUSH | SessionFlags::SAVE_PENDING)
        {
            return;
        }
        info!("configuration push aborted");
        self.session
            .flags
            .remove(SessionFlags::CONFIG_PUSH | SessionFlags::SAVE_PENDING);
        self.session.diff.reset();
        self.desired = None;
        match self.state {
            ProtocolState::PushingConfig | ProtocolState::AwaitingSaveAck => {
                self.state = ProtocolState::Polling
            }
            ProtocolState::OverridePending => self.resume_state = ProtocolState::Polling,
            _ => {}
        }
    }

    /// Queues a momentary override, sent ahead of the next REQUEST or
    /// push step
    pub fn request_override(&mut self, channel: usize, state: bool) -> Result<()> {
        if !self.is_connected() {
            return Err(PdmError::NotInitialized);
        }
        if channel >= NUM_OUTPUT_CHANNELS {
            return Err(PdmError::InvalidParameter(format!(
                "channel {channel} out of range"
            )));
        }
        self.pending_override = Some(Override {
            channel: channel as u8,
            state,
        });
        Ok(())
    }

    /// Restarts polling when nothing is outstanding, as after aborting a
    /// push step the device answered with CHECKSUM_FAIL
    pub fn dispatch_if_idle(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.state == ProtocolState::Polling && self.outstanding().is_none() {
            debug!("nothing outstanding, resuming polling");
            self.dispatch(&mut actions);
        }
        actions
    }

    fn transmit(&mut self, outbound: Outbound, actions: &mut Vec<Action>) {
        self.session.last_command = Some(outbound.command());
        self.session.reply_pending = true;
        self.last_outbound = Some(outbound.clone());
        actions.push(Action::Transmit(outbound));
    }

    fn send_request(&mut self, actions: &mut Vec<Action>) {
        self.state = ProtocolState::Polling;
        self.transmit(Outbound::Command(Command::Request), actions);
    }

    /// Chooses the next command once the device has answered in Polling
    fn dispatch(&mut self, actions: &mut Vec<Action>) {
        if let Some(pending) = self.pending_override.take() {
            self.send_override(pending, ProtocolState::Polling, actions);
        } else if self.session.flags.contains(SessionFlags::CONFIG_PUSH) {
            debug!("starting configuration push");
            self.state = ProtocolState::PushingConfig;
            self.session.diff.reset();
            self.push_step(actions);
        } else {
            self.send_request(actions);
        }
    }

    fn send_override(&mut self, ov: Override, resume: ProtocolState, actions: &mut Vec<Action>) {
        match encode_override(ov.channel, ov.state) {
            Ok(frame) => {
                debug!("override channel {} -> {}", ov.channel, ov.state);
                self.state = ProtocolState::OverridePending;
                self.resume_state = resume;
                self.active_override = Some(ov);
                self.transmit(
                    Outbound::Frame {
                        command: Command::Send,
                        frame,
                    },
                    actions,
                );
            }
            Err(e) => {
                warn!("dropping override: {e}");
                self.resume(resume, actions);
            }
        }
    }

    fn resume(&mut self, resume: ProtocolState, actions: &mut Vec<Action>) {
        if resume == ProtocolState::PushingConfig {
            self.state = ProtocolState::PushingConfig;
            self.push_step(actions);
        } else {
            self.state = ProtocolState::Polling;
            self.dispatch(actions);
        }
    }

    fn push_step(&mut self, actions: &mut Vec<Action>) {
        let Some(desired) = self.desired.clone() else {
            warn!("push cycle without a desired snapshot");
            self.session.flags.remove(SessionFlags::CONFIG_PUSH);
            self.send_request(actions);
            return;
        };
        match self.session.diff.step(&self.live, &desired) {
            Ok(Some(step)) => {
                trace!("{:?} {}", step.command(), step.address());
                let outbound = match step {
                    Step::Send { frame, .. } => Outbound::Frame {
                        command: Command::NewConfig,
                        frame,
                    },
                    Step::Skip { .. } => Outbound::Command(Command::Skip),
                };
                self.transmit(outbound, actions);
            }
            Ok(None) => {
                debug!("push cycle complete, saving");
                self.state = ProtocolState::AwaitingSaveAck;
                self.session.flags.remove(SessionFlags::CONFIG_PUSH);
                self.session.flags.insert(SessionFlags::SAVE_PENDING);
                self.transmit(Outbound::Command(Command::SaveChanges), actions);
            }
            Err(e) => {
                warn!("abandoning push cycle: {e}");
                self.abort_config_push();
                self.send_request(actions);
            }
        }
    }

    fn on_confirm(&mut self, actions: &mut Vec<Action>) {
        self.session.reply_pending = false;
        match self.state {
            ProtocolState::AwaitingHandshakeAck => {
                info!("handshake complete");
                self.session.flags.insert(SessionFlags::HANDSHAKE_COMPLETE);
                actions.push(Action::ClearReceiveBuffer);
                actions.push(Action::Notify(Event::Connected));
                self.send_request(actions);
            }
            // Late acknowledgment of a step from an aborted push
            ProtocolState::Polling => self.dispatch(actions),
            ProtocolState::PushingConfig => {
                self.session.diff.advance();
                if let Some(pending) = self.pending_override.take() {
                    self.send_override(pending, ProtocolState::PushingConfig, actions);
                } else {
                    self.push_step(actions);
                }
            }
            ProtocolState::AwaitingSaveAck => {
                info!("configuration saved");
                self.session.flags.remove(SessionFlags::SAVE_PENDING);
                self.session.diff.reset();
                self.desired = None;
                actions.push(Action::Notify(Event::ConfigSaved));
                self.state = ProtocolState::Polling;
                self.dispatch(actions);
            }
            ProtocolState::OverridePending => {
                if let Some(ov) = self.active_override.take() {
                    actions.push(Action::Notify(Event::OverrideApplied {
                        channel: ov.channel,
                        state: ov.state,
                    }));
                }
                self.resume(self.resume_state, actions);
            }
            ProtocolState::Idle => trace!("CONFIRM while idle"),
        }
    }

    fn on_checksum_fail(&mut self, actions: &mut Vec<Action>) {
        let Some(command) = self.session.last_command else {
            return;
        };
        warn!("device reported checksum failure for {command:?}");
        actions.push(Action::Notify(Event::ChecksumFailed(command)));
        // BEGIN is repeated by the handshake timer
        if self.state == ProtocolState::AwaitingHandshakeAck {
            return;
        }
        self.session.reply_pending = false;
        let retryable = matches!(
            self.state,
            ProtocolState::PushingConfig | ProtocolState::OverridePending
        );
        if retryable && self.retry_on_checksum_fail {
            if let Some(outbound) = self.last_outbound.clone() {
                debug!("retransmitting {command:?}");
                self.transmit(outbound, actions);
                return;
            }
        }
        // Push steps and SAVECHANGES hold until the consumer aborts
        if self.state == ProtocolState::OverridePending {
            if let Some(ov) = self.active_override.take() {
                warn!("override of channel {} dropped", ov.channel);
            }
            self.resume(self.resume_state, actions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::decoder::encode_telemetry;
    use crate::model::{Address, Domain};

    fn transmitted(actions: &[Action]) -> Vec<Outbound> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Transmit(out) => Some(out.clone()),
                _ => None,
            })
            .collect()
    }

    fn connected() -> ProtocolMachine {
        let mut machine = ProtocolMachine::new(false);
        machine.begin();
        machine.handle_ack(Command::Confirm);
        machine
    }

    #[test]
    fn handshake_starts_polling() {
        let mut machine = ProtocolMachine::new(false);
        let actions = machine.begin();
        assert_eq!(
            transmitted(&actions),
            vec![Outbound::Command(Command::Begin)]
        );
        assert_eq!(machine.awaiting(), Awaiting::Acknowledgment);

        let actions = machine.handle_ack(Command::Confirm);
        assert!(actions.contains(&Action::Notify(Event::Connected)));
        assert!(actions.contains(&Action::ClearReceiveBuffer));
        assert_eq!(
            transmitted(&actions),
            vec![Outbound::Command(Command::Request)]
        );
        assert_eq!(machine.state(), ProtocolState::Polling);
        assert_eq!(machine.awaiting(), Awaiting::Frame);
    }

    #[test]
    fn checksum_fail_during_handshake_is_ignored() {
        let mut machine = ProtocolMachine::new(false);
        machine.begin();
        machine.handle_ack(Command::ChecksumFail);
        assert_eq!(machine.state(), ProtocolState::AwaitingHandshakeAck);
        assert_eq!(
            transmitted(&machine.resend_begin()),
            vec![Outbound::Command(Command::Begin)]
        );
    }

    #[test]
    fn bad_frame_keeps_live_and_requests_again() {
        let mut machine = connected();
        let before = machine.live();
        let actions = machine.handle_frame(&[0x84, 0x19, b'r', 0x24, 0x20, 0, 0, 0, 0]);
        assert_eq!(
            transmitted(&actions),
            vec![Outbound::Command(Command::Request)]
        );
        assert!(Arc::ptr_eq(&before, &machine.live()));
    }

    #[test]
    fn telemetry_replaces_live_snapshot() {
        let mut machine = connected();
        let mut device = Snapshot::new();
        device.system.battery_voltage = 12.6;
        let actions = machine.handle_frame(&encode_telemetry(&device));
        assert_eq!(machine.live().system.battery_voltage, 12.6);
        assert!(matches!(
            actions[0],
            Action::Notify(Event::SnapshotUpdated(_))
        ));
    }

    #[test]
    fn push_requires_handshake() {
        let mut machine = ProtocolMachine::new(false);
        assert!(matches!(
            machine.request_config_push(Arc::new(Snapshot::new())),
            Err(PdmError::NotInitialized)
        ));
        assert!(matches!(
            machine.request_override(0, true),
            Err(PdmError::NotInitialized)
        ));
    }

    #[test]
    fn invalid_desired_snapshot_is_rejected() {
        let mut machine = connected();
        let mut desired = Snapshot::new();
        desired.system.channel_data_can_id = 0xFFFF;
        assert!(machine.request_config_push(Arc::new(desired)).is_err());
        assert!(!machine.session().flags.contains(SessionFlags::CONFIG_PUSH));
    }

    #[test]
    fn checksum_fail_holds_cursor() {
        let mut machine = connected();
        let mut desired = Snapshot::new();
        desired.channels[0].current_limit_high = 8.0;
        machine.request_config_push(Arc::new(desired)).unwrap();
        machine.handle_frame(&encode_telemetry(&Snapshot::new()));
        assert_eq!(machine.state(), ProtocolState::PushingConfig);

        // type matches, limit differs
        machine.handle_ack(Command::Confirm);
        let address = Address::new(Domain::Channel, 1, 0).unwrap();
        assert_eq!(machine.cursor().current(), Some(address));

        let actions = machine.handle_ack(Command::ChecksumFail);
        assert_eq!(
            actions,
            vec![Action::Notify(Event::ChecksumFailed(Command::NewConfig))]
        );
        assert_eq!(machine.cursor().current(), Some(address));
        assert_eq!(machine.state(), ProtocolState::PushingConfig);
        assert_eq!(machine.awaiting(), Awaiting::Nothing);
        assert!(machine.dispatch_if_idle().is_empty());
    }

    #[test]
    fn abort_after_checksum_fail_resumes_polling() {
        let mut machine = connected();
        let mut desired = Snapshot::new();
        desired.channels[0].channel_type = crate::model::ChannelType::CanPwm;
        machine.request_config_push(Arc::new(desired.clone())).unwrap();
        machine.handle_frame(&encode_telemetry(&Snapshot::new()));
        machine.handle_ack(Command::ChecksumFail);

        machine.abort_config_push();
        assert_eq!(machine.state(), ProtocolState::Polling);
        assert_eq!(
            transmitted(&machine.dispatch_if_idle()),
            vec![Outbound::Command(Command::Request)]
        );
        assert_eq!(machine.awaiting(), Awaiting::Frame);

        // A fresh push starts from the first address
        machine.request_config_push(Arc::new(desired)).unwrap();
        let sent = transmitted(&machine.handle_frame(&encode_telemetry(&Snapshot::new())));
        assert_eq!(sent[0].command(), Command::NewConfig);
        assert_eq!(machine.cursor().current(), Some(Address::FIRST));
    }

    #[test]
    fn failed_save_is_released_by_abort() {
        let mut machine = connected();
        machine.request_config_push(Arc::new(Snapshot::new())).unwrap();
        machine.handle_frame(&encode_telemetry(&Snapshot::new()));
        while machine.state() == ProtocolState::PushingConfig {
            machine.handle_ack(Command::Confirm);
        }
        assert_eq!(machine.outstanding(), Some(Command::SaveChanges));

        let actions = machine.handle_ack(Command::ChecksumFail);
        assert!(!actions.contains(&Action::Notify(Event::ConfigSaved)));
        assert_eq!(machine.state(), ProtocolState::AwaitingSaveAck);
        assert!(machine.dispatch_if_idle().is_empty());

        machine.abort_config_push();
        assert_eq!(
            transmitted(&machine.dispatch_if_idle()),
            vec![Outbound::Command(Command::Request)]
        );
    }

    #[test]
    fn failed_override_is_dropped_without_retry() {
        let mut machine = connected();
        machine.request_override(2, true).unwrap();
        machine.handle_frame(&encode_telemetry(&Snapshot::new()));
        assert_eq!(machine.state(), ProtocolState::OverridePending);

        let actions = machine.handle_ack(Command::ChecksumFail);
        assert!(actions.contains(&Action::Notify(Event::ChecksumFailed(Command::Send))));
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::Notify(Event::OverrideApplied { .. }))));
        assert_eq!(machine.state(), ProtocolState::Polling);
        assert_eq!(
            transmitted(&actions),
            vec![Outbound::Command(Command::Request)]
        );
    }

    #[test]
    fn confirm_without_outstanding_command_is_ignored() {
        let mut machine = connected();
        assert_eq!(machine.awaiting(), Awaiting::Frame);
        assert!(machine.handle_ack(Command::Confirm).is_empty());
        assert_eq!(machine.outstanding(), Some(Command::Request));
    }

    #[test]
    fn checksum_fail_retries_when_enabled() {
        let mut machine = ProtocolMachine::new(true);
        machine.begin();
        machine.handle_ack(Command::Confirm);
        let mut desired = Snapshot::new();
        desired.channels[0].channel_type = crate::model::ChannelType::CanPwm;
        machine.request_config_push(Arc::new(desired)).unwrap();
        let first = transmitted(&machine.handle_frame(&encode_telemetry(&Snapshot::new())));
        let retry = transmitted(&machine.handle_ack(Command::ChecksumFail));
        assert_eq!(first, retry);
        assert_eq!(retry[0].command(), Command::NewConfig);
    }

    #[test]
    fn abort_waits_for_outstanding_ack() {
        let mut machine = connected();
        machine
            .request_config_push(Arc::new(Snapshot::new()))
            .unwrap();
        machine.handle_frame(&encode_telemetry(&Snapshot::new()));
        assert_eq!(machine.outstanding(), Some(Command::Skip));

        machine.abort_config_push();
        assert_eq!(machine.state(), ProtocolState::Polling);
        assert_eq!(machine.awaiting(), Awaiting::Acknowledgment);

        let actions = machine.handle_ack(Command::Confirm);
        assert_eq!(
            transmitted(&actions),
            vec![Outbound::Command(Command::Request)]
        );
        assert_eq!(machine.cursor().current(), Some(Address::FIRST));
    }

    #[test]
    fn override_preempts_push_step_without_moving_cursor() {
        let mut machine = connected();
        machine
            .request_config_push(Arc::new(Snapshot::new()))
            .unwrap();
        machine.handle_frame(&encode_telemetry(&Snapshot::new()));
        machine.request_override(3, false).unwrap();

        let actions = machine.handle_ack(Command::Confirm);
        let sent = transmitted(&actions);
        assert_eq!(sent[0].command(), Command::Send);
        assert_eq!(machine.state(), ProtocolState::OverridePending);
        let after_first = machine.cursor().current();

        let actions = machine.handle_ack(Command::Confirm);
        assert!(actions.contains(&Action::Notify(Event::OverrideApplied {
            channel: 3,
            state: false
        })));
        assert_eq!(machine.state(), ProtocolState::PushingConfig);
        assert_eq!(machine.cursor().current(), after_first);
        assert_eq!(
            transmitted(&actions),
            vec![Outbound::Command(Command::Skip)]
        );
    }

    #[test]
    fn stray_bytes_before_ack_are_skipped() {
        let mut machine = ProtocolMachine::new(false);
        machine.begin();
        let actions = machine.handle_bytes(&[0x00, 0x55, b'c']);
        assert!(actions.contains(&Action::Notify(Event::Connected)));
        assert!(machine.handle_bytes(&[0x01, 0x02]).is_empty());
    }

    #[test]
    fn reset_keeps_last_snapshot() {
        let mut machine = connected();
        let mut device = Snapshot::new();
        device.system.temperature = 40;
        machine.handle_frame(&encode_telemetry(&device));
        machine.reset();
        assert_eq!(machine.state(), ProtocolState::Idle);
        assert!(!machine.is_connected());
        assert_eq!(machine.live().system.temperature, 40);
        assert_eq!(machine.awaiting(), Awaiting::Nothing);
    }
}
