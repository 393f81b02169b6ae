//! Doom MUS lump reader and writer
//!
//! MUS is the event format MUSX is modelled on. Reading a lump normalizes it
//! into [`MusCommand`]s: channels are remapped so percussion sits on channel
//! 9, implicit press volumes are resolved, and each event's trailing delay
//! becomes its `gap_after`.
//!
//! # Lump Format
//!
//! ```text
//! 0x00: magic "MUS\x1a"
//! 0x04: score length u16 LE
//! 0x06: score start u16 LE
//! 0x08: primary channels u16 LE
//! 0x0A: secondary channels u16 LE
//! 0x0C: instrument count u16 LE
//! 0x0E: reserved u16
//! 0x10: instrument numbers, u16 LE each
//! score: events
//!   descriptor u8: bit 7 = delay follows, bits 4-6 = type, bits 0-3 = channel
//!   0 release   [note]
//!   1 press     [note | 0x80 if volume follows] [volume]
//!   2 pitch     [value]
//!   3 system    [event]
//!   4 control   [controller] [value]
//!   5 measure end
//!   6 score end
//!   delay: big-endian groups of 7 bits, high bit set on all but the last
//! ```

use std::io::{Cursor, Read};

use crate::event::check_commands;
use crate::{MusCommand, MusEvent, MusxError, NUM_CHANNELS, PERCUSSION_CHANNEL};

/// MUS magic bytes
pub const MUS_MAGIC: &[u8; 4] = b"MUS\x1a";

/// Fixed header size before the instrument list
pub const MUS_HEADER_SIZE: usize = 16;

/// MUS channel that carries percussion
pub const MUS_PERCUSSION_CHANNEL: u8 = 15;

/// Volume a channel presses with before any explicit volume
const INITIAL_VOLUME: u8 = 127;

/// Instrument numbers for percussion notes are offset by this
const PERCUSSION_INSTRUMENT_BASE: u16 = 100;

/// Controller that selects the channel instrument
const CONTROLLER_INSTRUMENT: u8 = 0;

/// Map a MUS channel to a MUSX channel
pub fn channel_from_mus(channel: u8) -> u8 {
    match channel {
        MUS_PERCUSSION_CHANNEL => PERCUSSION_CHANNEL,
        c if c >= PERCUSSION_CHANNEL => c + 1,
        c => c,
    }
}

/// Map a MUSX channel back to a MUS channel
pub fn channel_to_mus(channel: u8) -> u8 {
    match channel {
        PERCUSSION_CHANNEL => MUS_PERCUSSION_CHANNEL,
        c if c > PERCUSSION_CHANNEL => c - 1,
        c => c,
    }
}

/// Parse a MUS lump into commands ending with score-end
///
/// Releases of notes that are not playing and measure-end markers are
/// dropped with a warning; their delays move onto the previous command.
/// A score without a score-end event gets one appended.
pub fn parse_mus(data: &[u8]) -> Result<Vec<MusCommand>, MusxError> {
    if data.len() < MUS_HEADER_SIZE {
        return Err(MusxError::InvalidMus(format!(
            "lump is {} bytes, header needs {MUS_HEADER_SIZE}",
            data.len()
        )));
    }
    if &data[0..4] != MUS_MAGIC {
        return Err(MusxError::InvalidMus("missing MUS magic".into()));
    }

    let mut cursor = Cursor::new(data);
    cursor.set_position(4);
    let score_len = read_u16(&mut cursor)? as usize;
    let score_start = read_u16(&mut cursor)? as usize;
    if score_start > data.len() {
        return Err(MusxError::InvalidMus(format!(
            "score starts at {score_start}, past the end of the lump"
        )));
    }
    let score_end = (score_start + score_len).min(data.len());
    let mut cursor = Cursor::new(&data[score_start..score_end]);

    let mut commands: Vec<MusCommand> = Vec::new();
    let mut held = [[0u8; 128]; NUM_CHANNELS];
    let mut volumes = [INITIAL_VOLUME; NUM_CHANNELS];
    let mut dropped_lead = 0u32;

    loop {
        let offset = score_start + cursor.position() as usize;
        let Some(descriptor) = next_byte(&mut cursor) else {
            tracing::warn!(offset, "MUS score has no score-end event, appending one");
            commands.push(MusCommand::new(0, MusEvent::ScoreEnd, 0));
            break;
        };
        let has_delay = descriptor & 0x80 != 0;
        let channel = channel_from_mus(descriptor & 0x0F);
        let ch = channel as usize;

        let event = match (descriptor >> 4) & 7 {
            0 => {
                let note = read_u8(&mut cursor)? & 0x7F;
                let count = &mut held[ch][note as usize];
                if *count == 0 {
                    tracing::warn!(offset, channel, note, "dropping release of a note that is not playing");
                    None
                } else {
                    *count -= 1;
                    Some(MusEvent::ReleaseKey { note })
                }
            }
            1 => {
                let byte = read_u8(&mut cursor)?;
                let note = byte & 0x7F;
                if byte & 0x80 != 0 {
                    volumes[ch] = read_u8(&mut cursor)? & 0x7F;
                }
                let count = &mut held[ch][note as usize];
                *count = count.saturating_add(1);
                Some(MusEvent::PressKey {
                    note,
                    volume: volumes[ch],
                })
            }
            2 => Some(MusEvent::PitchWheel(read_u8(&mut cursor)?)),
            3 => {
                let event = read_u8(&mut cursor)?;
                if event > 15 {
                    return Err(MusxError::InvalidMus(format!(
                        "system event {event} at offset {offset}"
                    )));
                }
                Some(MusEvent::System(event))
            }
            4 => {
                let controller = read_u8(&mut cursor)?;
                let value = read_u8(&mut cursor)?;
                if controller > 15 {
                    return Err(MusxError::InvalidMus(format!(
                        "controller {controller} at offset {offset}"
                    )));
                }
                Some(MusEvent::Controller { controller, value })
            }
            5 => {
                tracing::trace!(offset, "dropping measure end");
                None
            }
            6 => Some(MusEvent::ScoreEnd),
            kind => {
                return Err(MusxError::InvalidMus(format!(
                    "unknown event type {kind} at offset {offset}"
                )));
            }
        };

        let delay = if has_delay { read_delay(&mut cursor)? } else { 0 };
        match event {
            Some(MusEvent::ScoreEnd) => {
                commands.push(MusCommand::new(channel, MusEvent::ScoreEnd, 0));
                break;
            }
            Some(event) => commands.push(MusCommand::new(channel, event, delay)),
            None => match commands.last_mut() {
                Some(previous) => {
                    previous.gap_after = previous.gap_after.saturating_add(delay);
                }
                None => dropped_lead = dropped_lead.saturating_add(delay),
            },
        }
    }

    if dropped_lead > 0 {
        tracing::warn!(ticks = dropped_lead, "dropping delay before the first event");
    }
    let trailing = score_end - score_start - cursor.position() as usize;
    if trailing > 0 {
        tracing::debug!(trailing, "ignoring bytes after score-end");
    }
    tracing::debug!(commands = commands.len(), "parsed MUS lump");
    Ok(commands)
}

/// Write commands (ending with score-end) as a MUS lump
pub fn write_mus(commands: &[MusCommand]) -> Result<Vec<u8>, MusxError> {
    check_commands(commands)?;

    let mut score = Vec::with_capacity(commands.len() * 3);
    let mut volumes = [INITIAL_VOLUME; NUM_CHANNELS];
    let mut instruments: Vec<u16> = Vec::new();
    let mut primary_channels = 0u16;

    for command in commands {
        let channel = channel_to_mus(command.channel);
        if channel < 9 {
            primary_channels = primary_channels.max(channel as u16 + 1);
        }
        let ch = command.channel as usize;
        let has_delay = command.gap_after > 0 && command.event != MusEvent::ScoreEnd;

        let mut payload = [0u8; 2];
        let (kind, len) = match command.event {
            MusEvent::ReleaseKey { note } => {
                payload[0] = note;
                (0, 1)
            }
            MusEvent::PressKey { note, volume } => {
                if command.channel == PERCUSSION_CHANNEL {
                    instruments.push(PERCUSSION_INSTRUMENT_BASE + note as u16);
                }
                if volume == volumes[ch] {
                    payload[0] = note;
                    (1, 1)
                } else {
                    volumes[ch] = volume;
                    payload = [note | 0x80, volume];
                    (1, 2)
                }
            }
            MusEvent::PitchWheel(value) => {
                payload[0] = value;
                (2, 1)
            }
            MusEvent::System(event) => {
                payload[0] = event;
                (3, 1)
            }
            MusEvent::Controller { controller, value } => {
                if controller == CONTROLLER_INSTRUMENT && command.channel != PERCUSSION_CHANNEL {
                    instruments.push(value as u16);
                }
                payload = [controller, value];
                (4, 2)
            }
            MusEvent::ScoreEnd => (6, 0),
        };

        score.push(((has_delay as u8) << 7) | (kind << 4) | channel);
        score.extend_from_slice(&payload[..len]);
        if has_delay {
            write_delay(&mut score, command.gap_after);
        }
    }

    instruments.sort_unstable();
    instruments.dedup();

    let score_len = u16::try_from(score.len()).map_err(|_| {
        MusxError::InvalidMus(format!("score is {} bytes, MUS allows 65535", score.len()))
    })?;
    let score_start = u16::try_from(MUS_HEADER_SIZE + instruments.len() * 2)
        .map_err(|_| MusxError::InvalidMus("too many instruments".into()))?;

    let mut lump = Vec::with_capacity(score_start as usize + score.len());
    lump.extend_from_slice(MUS_MAGIC);
    lump.extend_from_slice(&score_len.to_le_bytes());
    lump.extend_from_slice(&score_start.to_le_bytes());
    lump.extend_from_slice(&primary_channels.to_le_bytes());
    lump.extend_from_slice(&0u16.to_le_bytes());
    lump.extend_from_slice(&(instruments.len() as u16).to_le_bytes());
    lump.extend_from_slice(&0u16.to_le_bytes());
    for instrument in &instruments {
        lump.extend_from_slice(&instrument.to_le_bytes());
    }
    lump.extend_from_slice(&score);
    Ok(lump)
}

// =============================================================================
// Helpers
// =============================================================================

fn next_byte(cursor: &mut Cursor<&[u8]>) -> Option<u8> {
    let mut buf = [0u8; 1];
    cursor.read_exact(&mut buf).ok().map(|_| buf[0])
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, MusxError> {
    next_byte(cursor).ok_or_else(|| MusxError::InvalidMus("score ends inside an event".into()))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, MusxError> {
    let mut buf = [0u8; 2];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| MusxError::InvalidMus("truncated header".into()))?;
    Ok(u16::from_le_bytes(buf))
}

fn read_delay(cursor: &mut Cursor<&[u8]>) -> Result<u32, MusxError> {
    let mut delay = 0u32;
    loop {
        let byte = read_u8(cursor)?;
        delay = delay
            .checked_mul(128)
            .map(|d| d | (byte & 0x7F) as u32)
            .ok_or_else(|| MusxError::InvalidMus("delay overflows 32 bits".into()))?;
        if byte & 0x80 == 0 {
            return Ok(delay);
        }
    }
}

fn write_delay(out: &mut Vec<u8>, delay: u32) {
    let mut groups = [0u8; 5];
    let mut count = 0;
    let mut rest = delay;
    loop {
        groups[count] = (rest & 0x7F) as u8;
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for (i, group) in groups[..count].iter().enumerate().rev() {
        let more = if i > 0 { 0x80 } else { 0 };
        out.push(group | more);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MusEvent::*;

    fn lump(instruments: &[u16], score: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(MUS_MAGIC);
        data.extend_from_slice(&(score.len() as u16).to_le_bytes());
        data.extend_from_slice(&((16 + instruments.len() * 2) as u16).to_le_bytes());
        data.extend_from_slice(&[1, 0, 0, 0]);
        data.extend_from_slice(&(instruments.len() as u16).to_le_bytes());
        data.extend_from_slice(&[0, 0]);
        for i in instruments {
            data.extend_from_slice(&i.to_le_bytes());
        }
        data.extend_from_slice(score);
        data
    }

    #[test]
    fn test_channel_remap() {
        assert_eq!(channel_from_mus(15), 9);
        assert_eq!(channel_from_mus(9), 10);
        assert_eq!(channel_from_mus(14), 15);
        assert_eq!(channel_from_mus(3), 3);
        for channel in 0..16 {
            assert_eq!(channel_from_mus(channel_to_mus(channel)), channel);
        }
    }

    #[test]
    fn test_parse_basic_score() {
        let data = lump(
            &[30],
            &[
                0x40, 0x00, 30, // instrument 30 on channel 0
                0x90, 0xBC, 90, 0x81, 0x00, // press 60 vol 90, delay 128
                0x1F, 36, // press percussion 36 with the initial volume
                0x80, 60, 10, // release 60, delay 10
                0x0F, 36, // release 36
                0x60, // score end
            ],
        );
        let commands = parse_mus(&data).unwrap();
        assert_eq!(
            commands,
            vec![
                MusCommand::new(0, Controller { controller: 0, value: 30 }, 0),
                MusCommand::new(0, PressKey { note: 60, volume: 90 }, 128),
                MusCommand::new(9, PressKey { note: 36, volume: 127 }, 0),
                MusCommand::new(0, ReleaseKey { note: 60 }, 10),
                MusCommand::new(9, ReleaseKey { note: 36 }, 0),
                MusCommand::new(0, ScoreEnd, 0),
            ]
        );
    }

    #[test]
    fn test_implicit_volume_is_per_channel() {
        let data = lump(
            &[],
            &[
                0x10, 0xC0, 50, // channel 0 press 64 vol 50
                0x11, 40, // channel 1 press 40, initial volume
                0x10, 67, // channel 0 press 67, last volume
                0x60,
            ],
        );
        let commands = parse_mus(&data).unwrap();
        assert_eq!(commands[1].event, PressKey { note: 40, volume: 127 });
        assert_eq!(commands[2].event, PressKey { note: 67, volume: 50 });
    }

    #[test]
    fn test_dropped_events_carry_delay() {
        let data = lump(
            &[],
            &[
                0x90, 60, 4, // press 60, delay 4
                0x80, 61, 3, // release of a silent note, delay 3
                0xD0, 5, // measure end, delay 5
                0x00, 60, // release 60
                0x60,
            ],
        );
        let commands = parse_mus(&data).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].gap_after, 12);
        assert_eq!(commands[1].event, ReleaseKey { note: 60 });
    }

    #[test]
    fn test_missing_score_end_is_appended() {
        // Press on channel 2 with no volume byte, then nothing
        let data = lump(&[], &[0x12, 60]);
        let commands = parse_mus(&data).unwrap();
        assert_eq!(
            commands,
            vec![
                MusCommand::new(2, PressKey { note: 60, volume: 127 }, 0),
                MusCommand::new(0, ScoreEnd, 0),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_mus(b"MUS"), Err(MusxError::InvalidMus(_))));
        assert!(matches!(
            parse_mus(&[0u8; 16]),
            Err(MusxError::InvalidMus(_))
        ));
        // Truncated inside a controller event
        let data = lump(&[], &[0x40, 0x03]);
        assert!(matches!(parse_mus(&data), Err(MusxError::InvalidMus(_))));
        // Type 7 is unused
        let data = lump(&[], &[0x70, 0x60]);
        assert!(matches!(parse_mus(&data), Err(MusxError::InvalidMus(_))));
    }

    #[test]
    fn test_delay_encoding() {
        for delay in [1, 127, 128, 300, 16384, u32::MAX] {
            let mut out = Vec::new();
            write_delay(&mut out, delay);
            let mut cursor = Cursor::new(out.as_slice());
            assert_eq!(read_delay(&mut cursor).unwrap(), delay);
            assert_eq!(cursor.position() as usize, out.len());
        }
        let mut out = Vec::new();
        write_delay(&mut out, 128);
        assert_eq!(out, [0x81, 0x00]);
    }

    #[test]
    fn test_write_then_parse() {
        let commands = vec![
            MusCommand::new(0, Controller { controller: 0, value: 48 }, 0),
            MusCommand::new(0, PressKey { note: 60, volume: 100 }, 0),
            MusCommand::new(12, PressKey { note: 62, volume: 127 }, 140),
            MusCommand::new(9, PressKey { note: 38, volume: 100 }, 1),
            MusCommand::new(0, ReleaseKey { note: 60 }, 0),
            MusCommand::new(12, PitchWheel(96), 0),
            MusCommand::new(12, ReleaseKey { note: 62 }, 0),
            MusCommand::new(9, ReleaseKey { note: 38 }, 20000),
            MusCommand::new(3, System(10), 0),
            MusCommand::new(0, ScoreEnd, 0),
        ];
        let data = write_mus(&commands).unwrap();
        assert_eq!(&data[0..4], MUS_MAGIC);
        // Instruments: 48 from the controller, 138 for percussion note 38
        assert_eq!(u16::from_le_bytes([data[12], data[13]]), 2);
        assert_eq!(u16::from_le_bytes([data[16], data[17]]), 48);
        assert_eq!(u16::from_le_bytes([data[18], data[19]]), 138);
        assert_eq!(parse_mus(&data).unwrap(), commands);
    }

    #[test]
    fn test_write_rejects_bad_structure() {
        let commands = [MusCommand::new(0, PitchWheel(1), 0)];
        assert_eq!(write_mus(&commands), Err(MusxError::MissingScoreEnd));
    }
}
