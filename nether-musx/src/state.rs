//! Per-channel running values shared by the encoder walk and the decoder

use crate::{NUM_CHANNELS, VOLUME_SAME_CHANNEL, VOLUME_SAME_GLOBAL};

const INITIAL_PITCH: u8 = 128;
const INITIAL_VOLUME: u8 = 100;
const INITIAL_VIBRATO: u8 = 0;
const INITIAL_PRESS_VOLUME: u8 = 127;

/// Previous values that deltas and volume sentinels refer to
#[derive(Debug, Clone)]
pub(crate) struct ChannelState {
    pub pitch: [u8; NUM_CHANNELS],
    pub volume: [u8; NUM_CHANNELS],
    pub vibrato: [u8; NUM_CHANNELS],
    press_volume: [u8; NUM_CHANNELS],
    last_press_volume: u8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            pitch: [INITIAL_PITCH; NUM_CHANNELS],
            volume: [INITIAL_VOLUME; NUM_CHANNELS],
            vibrato: [INITIAL_VIBRATO; NUM_CHANNELS],
            press_volume: [INITIAL_PRESS_VOLUME; NUM_CHANNELS],
            last_press_volume: INITIAL_PRESS_VOLUME,
        }
    }
}

impl ChannelState {
    /// Press-volume symbol for `volume`, preferring the channel sentinel
    pub fn volume_symbol(&self, channel: u8, volume: u8) -> u16 {
        if volume == self.press_volume[channel as usize] {
            VOLUME_SAME_CHANNEL
        } else if volume == self.last_press_volume {
            VOLUME_SAME_GLOBAL
        } else {
            volume as u16
        }
    }

    /// Concrete volume for a press-volume symbol
    pub fn resolve_volume(&self, channel: u8, symbol: u16) -> Option<u8> {
        match symbol {
            0..=127 => Some(symbol as u8),
            VOLUME_SAME_GLOBAL => Some(self.last_press_volume),
            VOLUME_SAME_CHANNEL => Some(self.press_volume[channel as usize]),
            _ => None,
        }
    }

    pub fn record_press(&mut self, channel: u8, volume: u8) {
        self.press_volume[channel as usize] = volume;
        self.last_press_volume = volume;
    }
}
