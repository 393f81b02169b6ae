//! Streaming MUSX decoder
//!
//! All memory is claimed in [`MusxDecoder::new`]: the table scratch sized from
//! the header, the table handles and the note arena. `next_event` then runs
//! without allocating.

use nether_huff::{BitReader, CanonicalTable, DecoderScratch, load_table};

use crate::event::EventKind;
use crate::state::ChannelState;
use crate::{
    CONTROLLER_VIBRATO, CONTROLLER_VOLUME, DecoderConfig, GAP_ESCAPE, MAX_GROUP_SIZE, MusCommand,
    MusEvent, MusxError, MusxEvent, MusxHeader, NUM_CHANNELS, NoteArena, PERCUSSION_CHANNEL,
    Stream, from_zig,
};

/// Single-pass event reader over an encoded MUSX buffer
#[derive(Debug)]
pub struct MusxDecoder<'a> {
    header: MusxHeader,
    scratch: DecoderScratch,
    tables: Vec<CanonicalTable>,
    reader: BitReader<'a>,
    events_start: usize,
    arena: NoteArena,
    state: ChannelState,
    pending_gap: u32,
    group_remaining: u16,
    finished: bool,
}

impl<'a> MusxDecoder<'a> {
    /// Validate the header against `config` and load every table
    pub fn new(bytes: &'a [u8], config: DecoderConfig) -> Result<Self, MusxError> {
        config.validate()?;
        let header = MusxHeader::from_bytes(bytes)?;

        if header.decoder_words as usize > config.max_decoder_words {
            return Err(MusxError::DecoderBudgetExceeded {
                required: header.decoder_words as usize,
                budget: config.max_decoder_words,
            });
        }
        if header.max_simultaneous_notes as usize > config.max_simultaneous_notes {
            return Err(MusxError::NoteBudgetExceeded {
                required: header.max_simultaneous_notes as usize,
                budget: config.max_simultaneous_notes,
            });
        }

        let mut scratch = DecoderScratch::new(header.decoder_words as usize);
        let mut tables = vec![CanonicalTable::default(); Stream::slot_count(header.release_tables)];
        let mut reader = BitReader::new(&bytes[MusxHeader::SIZE..]);
        for stream in Stream::table_order(header.grouped, header.release_tables) {
            tables[stream.slot()] = load_table(&mut reader, &mut scratch, config.prefix_tables)?;
        }

        tracing::debug!(
            grouped = header.grouped,
            tables = tables.len(),
            scratch_used = scratch.used(),
            table_bits = reader.bit_position(),
            "loaded MUSX tables"
        );

        Ok(Self {
            header,
            scratch,
            tables,
            events_start: reader.bit_position(),
            reader,
            arena: NoteArena::new(config.max_simultaneous_notes)?,
            state: ChannelState::default(),
            pending_gap: 0,
            group_remaining: 0,
            finished: false,
        })
    }

    pub fn header(&self) -> &MusxHeader {
        &self.header
    }

    /// Scratch words taken by the loaded tables
    pub fn scratch_used(&self) -> usize {
        self.scratch.used()
    }

    /// Notes currently held across all channels
    pub fn active_notes(&self) -> usize {
        self.arena.active()
    }

    /// Next event, or `None` after score-end
    ///
    /// Any error ends the stream; later calls return `Ok(None)` until
    /// [`restart`](Self::restart).
    pub fn next_event(&mut self) -> Result<Option<MusxEvent>, MusxError> {
        if self.finished {
            return Ok(None);
        }
        match self.read_event() {
            Ok(event) => {
                self.finished = event.event == MusEvent::ScoreEnd;
                Ok(Some(event))
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Rewind to the first event
    pub fn restart(&mut self) {
        self.reader.seek(self.events_start);
        self.arena.reset();
        self.state = ChannelState::default();
        self.pending_gap = 0;
        self.group_remaining = 0;
        self.finished = false;
    }

    /// Restart and decode the whole stream back into commands
    pub fn decode_all(&mut self) -> Result<Vec<MusCommand>, MusxError> {
        self.restart();
        let mut commands: Vec<MusCommand> = Vec::new();
        while let Some(event) = self.next_event()? {
            if let Some(previous) = commands.last_mut() {
                previous.gap_after = event.delta_ticks;
            }
            commands.push(MusCommand::new(event.channel, event.event, 0));
        }
        Ok(commands)
    }

    #[inline]
    fn decode(&mut self, stream: Stream) -> Result<u16, MusxError> {
        let table = &self.tables[stream.slot()];
        Ok(table.decode(&self.scratch, &mut self.reader)?)
    }

    fn read_event(&mut self) -> Result<MusxEvent, MusxError> {
        if self.header.grouped && self.group_remaining == 0 {
            let size = self.decode(Stream::GroupSize)?;
            if size as usize >= MAX_GROUP_SIZE {
                return Err(MusxError::ValueOutOfRange {
                    field: "group size",
                    value: size as u32 + 1,
                });
            }
            self.group_remaining = size + 1;
        }
        let delta_ticks = core::mem::take(&mut self.pending_gap);

        let symbol = self.decode(Stream::ChannelEvent)?;
        let channel = (symbol >> 3) as u8;
        if channel as usize >= NUM_CHANNELS {
            return Err(MusxError::InvalidChannel(channel));
        }
        let ch = channel as usize;
        let kind = EventKind::from_code((symbol & 7) as u8);

        let event = match kind {
            EventKind::ReleaseKey => MusEvent::ReleaseKey {
                note: self.read_release(channel)?,
            },
            EventKind::PressKey => {
                let stream = if channel == PERCUSSION_CHANNEL {
                    Stream::PercussionNote
                } else {
                    Stream::MelodicNote
                };
                let note = self.decode(stream)?;
                if note > 127 {
                    return Err(MusxError::ValueOutOfRange {
                        field: "note",
                        value: note as u32,
                    });
                }
                let symbol = self.decode(Stream::PressVolume)?;
                let volume = self.state.resolve_volume(channel, symbol).ok_or(
                    MusxError::ValueOutOfRange {
                        field: "press volume",
                        value: symbol as u32,
                    },
                )?;
                self.state.record_press(channel, volume);
                self.arena.press(channel, note as u8)?;
                MusEvent::PressKey {
                    note: note as u8,
                    volume,
                }
            }
            EventKind::DeltaPitch => {
                let zig = self.decode(Stream::DeltaPitch)?;
                MusEvent::PitchWheel(apply_delta(&mut self.state.pitch[ch], zig)?)
            }
            EventKind::SystemEvent => MusEvent::System(self.reader.read_bits(4)? as u8),
            EventKind::ChangeController => {
                let controller = self.reader.read_bits(4)? as u8;
                let value = self.reader.read_bits(8)? as u8;
                MusEvent::Controller { controller, value }
            }
            EventKind::DeltaVolume => {
                let zig = self.decode(Stream::DeltaVolume)?;
                MusEvent::Controller {
                    controller: CONTROLLER_VOLUME,
                    value: apply_delta(&mut self.state.volume[ch], zig)?,
                }
            }
            EventKind::DeltaVibrato => {
                let zig = self.decode(Stream::DeltaVibrato)?;
                MusEvent::Controller {
                    controller: CONTROLLER_VIBRATO,
                    value: apply_delta(&mut self.state.vibrato[ch], zig)?,
                }
            }
            EventKind::ScoreEnd => MusEvent::ScoreEnd,
        };

        let ends_run = if self.header.grouped {
            self.group_remaining -= 1;
            self.group_remaining == 0
        } else {
            true
        };
        if ends_run && kind != EventKind::ScoreEnd {
            self.pending_gap = self.read_gap()?;
        }

        Ok(MusxEvent {
            delta_ticks,
            channel,
            event,
        })
    }

    /// Resolve a release position to the pitch it releases
    fn read_release(&mut self, channel: u8) -> Result<u8, MusxError> {
        let held = self.arena.count(channel);
        let distance = match held {
            0 => return Err(MusxError::UnmatchedRelease { channel, note: None }),
            1 => 0,
            _ if held > self.header.release_tables => {
                return Err(MusxError::ValueOutOfRange {
                    field: "held notes",
                    value: held as u32,
                });
            }
            _ => self.decode(Stream::Release(held))?,
        };
        if distance >= held as u16 {
            return Err(MusxError::ValueOutOfRange {
                field: "release distance",
                value: distance as u32,
            });
        }
        self.arena.release(channel, distance as u8)
    }

    fn read_gap(&mut self) -> Result<u32, MusxError> {
        let mut total = 0u32;
        loop {
            let symbol = self.decode(Stream::Gap)?;
            total = total
                .checked_add(symbol as u32)
                .ok_or(MusxError::ValueOutOfRange {
                    field: "gap",
                    value: u32::MAX,
                })?;
            if symbol != GAP_ESCAPE {
                return Ok(total);
            }
        }
    }
}

fn apply_delta(previous: &mut u8, zig: u16) -> Result<u8, MusxError> {
    let value = *previous as i32 + from_zig(zig as u32);
    let value = u8::try_from(value).map_err(|_| MusxError::ValueOutOfRange {
        field: "delta",
        value: zig as u32,
    })?;
    *previous = value;
    Ok(value)
}

impl Iterator for MusxDecoder<'_> {
    type Item = Result<MusxEvent, MusxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
