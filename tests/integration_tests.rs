use pdmlink::application::{
    decode, decode_update, encode_telemetry, next_step, Action, Awaiting, Event, Outbound,
    ProtocolMachine, ProtocolState, Step,
};
use pdmlink::data_link::{checksum, FrameBuilder, CHECKSUM_LEN};
use pdmlink::error::PdmError;
use pdmlink::model::{total_field_count, Address, ChannelType, Domain, FieldValue, Snapshot};
use pdmlink::types::Command;
use std::sync::Arc;

fn transmitted(actions: &[Action]) -> Vec<Outbound> {
    actions
        .iter()
        .filter_map(|action| match action {
            Action::Transmit(outbound) => Some(outbound.clone()),
            _ => None,
        })
        .collect()
}

// Handshake done, one telemetry frame of `device` consumed
fn polling_machine(device: &Snapshot) -> ProtocolMachine {
    let mut machine = ProtocolMachine::new(false);
    machine.begin();
    machine.handle_ack(Command::Confirm);
    machine.handle_frame(&encode_telemetry(device));
    machine
}

#[test]
fn test_single_field_difference() {
    let live = Snapshot::new();
    let mut desired = Snapshot::new();
    desired.channels[0].enabled = true;

    let address = Address::new(Domain::Channel, 4, 0).unwrap();
    let step = next_step(&live, &desired, address).unwrap();
    let Step::Send { frame, .. } = &step else {
        panic!("expected a send step, got {step:?}");
    };
    assert_eq!(step.command(), Command::NewConfig);
    assert_eq!(&frame[..2], &[0x84, 0x19]);
    assert_eq!(&frame[2..9], &[0x00, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00]);
    assert_eq!(&frame[9..11], &[0x24, 0x20]);
    let sum = checksum(&frame[..11]);
    assert_eq!(&frame[11..], &sum.to_le_bytes());
}

#[test]
fn test_cursor_advances_on_confirm_only() {
    let mut machine = ProtocolMachine::new(false);
    machine.begin();
    machine.handle_ack(Command::Confirm);
    let mut desired = Snapshot::new();
    desired.channels[0].enabled = true;
    machine.request_config_push(Arc::new(desired)).unwrap();
    machine.handle_frame(&encode_telemetry(&Snapshot::new()));

    // Walk to (Channel, 4, 0); nothing moves until CONFIRM
    for _ in 0..4 {
        machine.handle_ack(Command::Confirm);
    }
    let enabled = Address::new(Domain::Channel, 4, 0).unwrap();
    assert_eq!(machine.cursor().current(), Some(enabled));
    assert_eq!(machine.outstanding(), Some(Command::NewConfig));

    let actions = machine.handle_ack(Command::Confirm);
    assert_eq!(
        machine.cursor().current(),
        Some(Address::new(Domain::Channel, 5, 0).unwrap())
    );
    assert_eq!(
        transmitted(&actions),
        vec![Outbound::Command(Command::Skip)]
    );
}

#[test]
fn test_corrupted_frame_leaves_live_unchanged() {
    let mut device = Snapshot::new();
    device.system.battery_voltage = 14.1;
    let mut machine = polling_machine(&device);
    let before = machine.live();

    let mut frame = FrameBuilder::new()
        .push(b'r')
        .extend(&[0x55; 11])
        .finish();
    assert_eq!(frame.len(), 20);
    let last = frame.len() - 1;
    frame[last] = frame[last].wrapping_add(1);

    assert!(matches!(decode(&frame), Err(PdmError::Checksum { .. })));
    let actions = machine.handle_frame(&frame);
    assert!(Arc::ptr_eq(&before, &machine.live()));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, Action::Notify(Event::SnapshotUpdated(_)))));
    assert_eq!(
        transmitted(&actions),
        vec![Outbound::Command(Command::Request)]
    );
}

#[test]
fn test_identical_snapshots_push_only_skips() {
    let device = Snapshot::new();
    let mut machine = polling_machine(&device);
    machine
        .request_config_push(Arc::new(device.clone()))
        .unwrap();

    let mut sent = transmitted(&machine.handle_frame(&encode_telemetry(&device)));
    while machine.state() == ProtocolState::PushingConfig {
        sent.extend(transmitted(&machine.handle_ack(Command::Confirm)));
    }

    let skips = sent
        .iter()
        .filter(|o| o.command() == Command::Skip)
        .count();
    assert_eq!(skips, total_field_count());
    assert_eq!(sent.last().map(Outbound::command), Some(Command::SaveChanges));
    assert!(sent.iter().all(|o| o.command() != Command::NewConfig));
    assert_eq!(machine.state(), ProtocolState::AwaitingSaveAck);

    let actions = machine.handle_ack(Command::Confirm);
    assert!(actions.contains(&Action::Notify(Event::ConfigSaved)));
    assert_eq!(machine.state(), ProtocolState::Polling);
    assert_eq!(machine.awaiting(), Awaiting::Frame);
}

#[test]
fn test_override_preempts_polling() {
    let mut machine = polling_machine(&Snapshot::new());
    let cursor = machine.cursor();
    machine.request_override(5, true).unwrap();

    let actions = machine.handle_frame(&encode_telemetry(&Snapshot::new()));
    assert_eq!(machine.state(), ProtocolState::OverridePending);
    let sent = transmitted(&actions);
    assert_eq!(sent.len(), 1);
    let bytes = sent[0].to_bytes();
    assert_eq!(bytes[0], Command::Send.code());
    let (address, slot) = decode_update(&bytes[1..]).unwrap();
    assert_eq!(address, Address::new(Domain::Channel, 1, 5).unwrap());
    assert_eq!(slot, [1, 0, 0, 0]);

    let actions = machine.handle_ack(Command::Confirm);
    assert_eq!(machine.state(), ProtocolState::Polling);
    assert_eq!(machine.cursor(), cursor);
    assert!(actions.contains(&Action::Notify(Event::OverrideApplied {
        channel: 5,
        state: true
    })));
    assert_eq!(
        transmitted(&actions),
        vec![Outbound::Command(Command::Request)]
    );
}

#[test]
fn test_channel_fields_apply_from_update_frames() {
    let mut desired = Snapshot::new();
    let channel = &mut desired.channels[9];
    channel.channel_type = ChannelType::CanDigital;
    channel.current_limit_high = 22.5;
    channel.current_threshold_high = 20.0;
    channel.current_threshold_low = 0.25;
    channel.enabled = true;
    channel.group_number = 3;
    channel.input_control_pin = 7;
    channel.multi_channel = 2;
    channel.retry_count = 5;
    channel.inrush_delay_ms = 1500;
    channel.set_name("HDL");
    channel.run_on = true;
    channel.run_on_time_ms = 30_000;

    let mut device = Snapshot::new();
    for parameter in 0..Domain::Channel.parameter_count() {
        let address = Address::new(Domain::Channel, parameter, 9).unwrap();
        if let Step::Send { frame, .. } = next_step(&device, &desired, address).unwrap() {
            let (decoded, slot) = decode_update(&frame).unwrap();
            assert_eq!(decoded, address);
            device.apply(decoded, slot).unwrap();
        }
    }
    assert_eq!(device.channels[9], desired.channels[9]);
}

#[test]
fn test_second_push_after_save_is_all_skips() {
    let mut device = Snapshot::new();
    let mut desired = Snapshot::new();
    desired.analogue_inputs[2].on_threshold = 3.3;
    desired.system.allow_gps = true;
    desired.digital_inputs[0].active_high = true;

    for address in Address::all() {
        if let Step::Send { frame, .. } = next_step(&device, &desired, address).unwrap() {
            let (address, slot) = decode_update(&frame).unwrap();
            device.apply(address, slot).unwrap();
        }
    }
    for address in Address::all() {
        assert_eq!(
            next_step(&device, &desired, address).unwrap(),
            Step::Skip { address }
        );
    }
}

#[test]
fn test_push_order_covers_every_address() {
    let all: Vec<Address> = Address::all().collect();
    assert_eq!(all.len(), total_field_count());
    assert!(all.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(all[0], Address::new(Domain::Channel, 0, 0).unwrap());
    assert_eq!(
        all.last().copied(),
        Some(Address::new(Domain::DigitalInput, 0, 7).unwrap())
    );
    assert_eq!(
        all.iter()
            .filter(|a| a.domain == Domain::SystemParameter)
            .count(),
        9
    );
}

#[test]
fn test_float_difference_by_bit_pattern() {
    let mut live = Snapshot::new();
    let mut desired = Snapshot::new();
    live.channels[0].current_threshold_low = 0.0;
    desired.channels[0].current_threshold_low = -0.0;
    let address = Address::new(Domain::Channel, 3, 0).unwrap();
    let step = next_step(&live, &desired, address).unwrap();
    assert_eq!(step.command(), Command::NewConfig);

    desired.channels[0].current_threshold_low = 0.0;
    assert!(FieldValue::Float(0.0).same_as(desired.field(address).unwrap()));
    let step = next_step(&live, &desired, address).unwrap();
    assert_eq!(step.command(), Command::Skip);
}

#[test]
fn test_frame_length_constant() {
    let frame = FrameBuilder::new().push(b'c').finish();
    assert_eq!(frame.len(), 5 + CHECKSUM_LEN);
}
