//! Normalized music events

use crate::{CONTROLLER_VIBRATO, CONTROLLER_VOLUME, MusxError, NUM_CHANNELS};

/// Wire kind carried in the low 3 bits of a channel-event symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    ReleaseKey = 0,
    PressKey = 1,
    DeltaPitch = 2,
    SystemEvent = 3,
    ChangeController = 4,
    DeltaVolume = 5,
    DeltaVibrato = 6,
    ScoreEnd = 7,
}

impl EventKind {
    pub fn from_code(code: u8) -> Self {
        match code & 7 {
            0 => Self::ReleaseKey,
            1 => Self::PressKey,
            2 => Self::DeltaPitch,
            3 => Self::SystemEvent,
            4 => Self::ChangeController,
            5 => Self::DeltaVolume,
            6 => Self::DeltaVibrato,
            _ => Self::ScoreEnd,
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Channel-event symbol for `(channel, kind)`
#[inline]
pub(crate) fn channel_event_symbol(channel: u8, kind: EventKind) -> u16 {
    ((channel as u16) << 3) | kind.code() as u16
}

/// Event payload shared by producers and consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusEvent {
    ReleaseKey { note: u8 },
    PressKey { note: u8, volume: u8 },
    /// Pitch wheel position, 128 = centered
    PitchWheel(u8),
    /// System event number (4 bits)
    System(u8),
    Controller { controller: u8, value: u8 },
    ScoreEnd,
}

impl MusEvent {
    /// Wire kind; controllers 2 and 3 are coded as deltas
    pub fn kind(&self) -> EventKind {
        match *self {
            Self::ReleaseKey { .. } => EventKind::ReleaseKey,
            Self::PressKey { .. } => EventKind::PressKey,
            Self::PitchWheel(_) => EventKind::DeltaPitch,
            Self::System(_) => EventKind::SystemEvent,
            Self::Controller {
                controller: CONTROLLER_VOLUME,
                ..
            } => EventKind::DeltaVolume,
            Self::Controller {
                controller: CONTROLLER_VIBRATO,
                ..
            } => EventKind::DeltaVibrato,
            Self::Controller { .. } => EventKind::ChangeController,
            Self::ScoreEnd => EventKind::ScoreEnd,
        }
    }

    /// Check that every field fits its wire width
    pub(crate) fn validate(&self) -> Result<(), MusxError> {
        match *self {
            Self::ReleaseKey { note } => check("note", note as u32, 127),
            Self::PressKey { note, volume } => {
                check("note", note as u32, 127)?;
                check("volume", volume as u32, 127)
            }
            Self::System(event) => check("system event", event as u32, 15),
            Self::Controller { controller, .. } => check("controller", controller as u32, 15),
            Self::PitchWheel(_) | Self::ScoreEnd => Ok(()),
        }
    }
}

fn check(field: &'static str, value: u32, max: u32) -> Result<(), MusxError> {
    if value > max {
        return Err(MusxError::ValueOutOfRange { field, value });
    }
    Ok(())
}

/// Producer-side command: an event and the ticks that follow it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusCommand {
    pub channel: u8,
    pub event: MusEvent,
    /// Delay in ticks before the next command
    pub gap_after: u32,
}

impl MusCommand {
    pub fn new(channel: u8, event: MusEvent, gap_after: u32) -> Self {
        Self {
            channel,
            event,
            gap_after,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), MusxError> {
        if self.channel as usize >= NUM_CHANNELS {
            return Err(MusxError::InvalidChannel(self.channel));
        }
        self.event.validate()
    }
}

/// Consumer-side event: the ticks to wait before it, then the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusxEvent {
    pub delta_ticks: u32,
    pub channel: u8,
    pub event: MusEvent,
}

/// Score-end must be present and last; every field must fit its width
pub(crate) fn check_commands(commands: &[MusCommand]) -> Result<(), MusxError> {
    let last = commands.len().checked_sub(1).ok_or(MusxError::MissingScoreEnd)?;
    for (index, command) in commands.iter().enumerate() {
        command.validate()?;
        if command.event == MusEvent::ScoreEnd && index != last {
            return Err(MusxError::EventsAfterScoreEnd { index: index + 1 });
        }
    }
    if commands[last].event != MusEvent::ScoreEnd {
        return Err(MusxError::MissingScoreEnd);
    }
    Ok(())
}
