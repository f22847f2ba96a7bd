use crate::data_link::{
    verify_checksum, ByteReader, FrameBuilder, HEADER, HEADER_VALUE, MIN_FRAME_LEN, TRAILER,
};
use crate::error::{PdmError, Result};
use crate::model::{
    AnalogueInput, Channel, ChannelErrorFlags, ChannelType, DistanceUnit, Snapshot, SpeedUnit,
    SystemParameters,
};
use crate::types::{Command, FrameData, NUM_ANALOGUE_INPUTS, NUM_OUTPUT_CHANNELS};
use log::{debug, trace};

// Command byte of a telemetry response frame
pub const TELEMETRY_RESPONSE: u8 = Command::Request.code();

// Record sizes on the wire
pub const CHANNEL_RECORD_LEN: usize = 36;
pub const ANALOGUE_RECORD_LEN: usize = 21;
pub const SYSTEM_RECORD_LEN: usize = 40;

/// Telemetry body length after the command byte
pub const TELEMETRY_BODY_LEN: usize = 1
    + NUM_OUTPUT_CHANNELS * CHANNEL_RECORD_LEN
    + 1
    + NUM_ANALOGUE_INPUTS * ANALOGUE_RECORD_LEN
    + SYSTEM_RECORD_LEN;

/// A validated inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Telemetry(Box<Snapshot>),
    /// Any well-formed frame that is not telemetry, by command byte
    Acknowledgment(u8),
}

/// Splits a checksummed frame into its body, between header and trailer.
/// The checksum is verified before anything else is inspected.
pub fn frame_body(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(PdmError::FrameTooShort(frame.len()));
    }
    let covered = verify_checksum(frame)?;
    let header = u16::from_le_bytes([covered[0], covered[1]]);
    if header != HEADER_VALUE {
        return Err(PdmError::Header(header));
    }
    let inner = &covered[HEADER.len()..];
    let (body, trailer) = inner.split_at(inner.len() - TRAILER.len());
    if trailer != TRAILER {
        return Err(PdmError::Schema(format!(
            "trailer {trailer:02x?} not in front of checksum"
        )));
    }
    Ok(body)
}

/// Validates and decodes one inbound frame.
///
/// A frame that fails any check is reported as an error and nothing it
/// carried should be applied.
pub fn decode(frame: &[u8]) -> Result<Decoded> {
    let body = frame_body(frame)?;
    let command = body[0];
    if command != TELEMETRY_RESPONSE {
        trace!("non-telemetry frame, command {command:#04x}");
        return Ok(Decoded::Acknowledgment(command));
    }

    let mut reader = ByteReader::new(&body[1..]);
    let snapshot = read_telemetry(&mut reader)?;
    if reader.remaining() > 0 {
        debug!(
            "ignoring {} trailing bytes after telemetry",
            reader.remaining()
        );
    }
    Ok(Decoded::Telemetry(Box::new(snapshot)))
}

fn expect_count(reader: &mut ByteReader<'_>, what: &str, expected: usize) -> Result<()> {
    let count = reader.read_u8()? as usize;
    if count != expected {
        return Err(PdmError::Schema(format!(
            "{what} count {count}, expected {expected}"
        )));
    }
    Ok(())
}

fn read_telemetry(reader: &mut ByteReader<'_>) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    expect_count(reader, "channel", NUM_OUTPUT_CHANNELS)?;
    for channel in snapshot.channels.iter_mut() {
        read_channel(reader, channel)?;
    }

    expect_count(reader, "analogue input", NUM_ANALOGUE_INPUTS)?;
    for input in snapshot.analogue_inputs.iter_mut() {
        read_analogue(reader, input)?;
    }

    read_system(reader, &mut snapshot.system)?;
    Ok(snapshot)
}

fn read_channel(reader: &mut ByteReader<'_>, channel: &mut Channel) -> Result<()> {
    channel.channel_type = ChannelType::try_from(reader.read_u8()?)?;
    channel.current_limit_high = reader.read_f32()?;
    channel.current_sense_pin = reader.read_u8()?;
    channel.current_threshold_high = reader.read_f32()?;
    channel.current_threshold_low = reader.read_f32()?;
    channel.current_value = reader.read_f32()?;
    channel.enabled = reader.read_bool()?;
    channel.error_flags = ChannelErrorFlags::from_bits_retain(reader.read_u8()?);
    channel.group_number = reader.read_u8()?;
    channel.input_control_pin = reader.read_u8()?;
    channel.multi_channel = reader.read_u8()?;
    channel.retry_count = reader.read_u8()?;
    channel.inrush_delay_ms = reader.read_i32()?;
    channel.name = reader.read_array()?;
    channel.run_on = reader.read_bool()?;
    channel.run_on_time_ms = reader.read_i32()?;
    Ok(())
}

fn read_analogue(reader: &mut ByteReader<'_>, input: &mut AnalogueInput) -> Result<()> {
    input.pull_up_enable = reader.read_bool()?;
    input.pull_down_enable = reader.read_bool()?;
    input.is_digital = reader.read_bool()?;
    input.on_threshold = reader.read_f32()?;
    input.off_threshold = reader.read_f32()?;
    input.input_scale_low = reader.read_f32()?;
    input.input_scale_high = reader.read_f32()?;
    input.pwm_low_value = reader.read_u8()?;
    input.pwm_high_value = reader.read_u8()?;
    Ok(())
}

fn read_system(reader: &mut ByteReader<'_>, system: &mut SystemParameters) -> Result<()> {
    system.temperature = reader.read_i32()?;
    system.can_termination = reader.read_bool()?;
    system.battery_voltage = reader.read_f32()?;
    system.system_current = reader.read_f32()?;
    system.system_current_limit = reader.read_f32()?;
    system.error_flags = reader.read_u8()?;
    system.channel_data_can_id = reader.read_u16()?;
    system.system_data_can_id = reader.read_u16()?;
    system.config_data_can_id = reader.read_u16()?;
    system.imu_wake_window_ms = reader.read_u32()?;
    system.speed_unit = SpeedUnit::from(reader.read_u8()?);
    system.distance_unit = DistanceUnit::from(reader.read_u8()?);
    system.allow_data = reader.read_bool()?;
    system.allow_gps = reader.read_bool()?;
    system.battery_soc = reader.read_i32()?;
    system.battery_soh = reader.read_i32()?;
    Ok(())
}

/// Builds the telemetry frame a device would send for `snapshot`
pub fn encode_telemetry(snapshot: &Snapshot) -> FrameData {
    let mut builder = FrameBuilder::new()
        .push(TELEMETRY_RESPONSE)
        .push(NUM_OUTPUT_CHANNELS as u8);

    for channel in &snapshot.channels {
        builder = builder
            .push(channel.channel_type as u8)
            .extend(&channel.current_limit_high.to_le_bytes())
            .push(channel.current_sense_pin)
            .extend(&channel.current_threshold_high.to_le_bytes())
            .extend(&channel.current_threshold_low.to_le_bytes())
            .extend(&channel.current_value.to_le_bytes())
            .push(channel.enabled as u8)
            .push(channel.error_flags.bits())
            .push(channel.group_number)
            .push(channel.input_control_pin)
            .push(channel.multi_channel)
            .push(channel.retry_count)
            .extend(&channel.inrush_delay_ms.to_le_bytes())
            .extend(&channel.name)
            .push(channel.run_on as u8)
            .extend(&channel.run_on_time_ms.to_le_bytes());
    }

    builder = builder.push(NUM_ANALOGUE_INPUTS as u8);
    for input in &snapshot.analogue_inputs {
        builder = builder
            .push(input.pull_up_enable as u8)
            .push(input.pull_down_enable as u8)
            .push(input.is_digital as u8)
            .extend(&input.on_threshold.to_le_bytes())
            .extend(&input.off_threshold.to_le_bytes())
            .extend(&input.input_scale_low.to_le_bytes())
            .extend(&input.input_scale_high.to_le_bytes())
            .push(input.pwm_low_value)
            .push(input.pwm_high_value);
    }

    let system = &snapshot.system;
    builder
        .extend(&system.temperature.to_le_bytes())
        .push(system.can_termination as u8)
        .extend(&system.battery_voltage.to_le_bytes())
        .extend(&system.system_current.to_le_bytes())
        .extend(&system.system_current_limit.to_le_bytes())
        .push(system.error_flags)
        .extend(&system.channel_data_can_id.to_le_bytes())
        .extend(&system.system_data_can_id.to_le_bytes())
        .extend(&system.config_data_can_id.to_le_bytes())
        .extend(&system.imu_wake_window_ms.to_le_bytes())
        .push(system.speed_unit as u8)
        .push(system.distance_unit as u8)
        .push(system.allow_data as u8)
        .push(system.allow_gps as u8)
        .extend(&system.battery_soc.to_le_bytes())
        .extend(&system.battery_soh.to_le_bytes())
        .finish()
}
