//! Two-pass MUSX encoder
//!
//! One walk over the commands drives every pass: a profiling pass sizes the
//! release tables, a statistics pass feeds each stream's sink, and an output
//! pass writes codes with the tables built in between. Keeping a single walk
//! guarantees the passes see exactly the same symbols.

use nether_huff::{BitWriter, HuffmanSink, SymbolSink, TableEncoding};

use crate::event::{channel_event_symbol, check_commands};
use crate::state::ChannelState;
use crate::{
    CONTROLLER_VIBRATO, CONTROLLER_VOLUME, EncoderConfig, GAP_ESCAPE, LayoutChoice, MAX_GROUP_SIZE,
    MAX_NOTE_ARENA, MusCommand, MusEvent, MusxError, MusxHeader, NoteArena, PERCUSSION_CHANNEL,
    Stream, to_zig,
};

/// Size breakdown for one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub stream: Stream,
    /// Distinct symbols in the table
    pub symbols: usize,
    /// Symbols coded
    pub coded: u64,
    pub table_bits: usize,
    pub payload_bits: usize,
}

/// Encoded stream plus how its bits were spent
#[derive(Debug, Clone)]
pub struct MusxEncoding {
    pub bytes: Vec<u8>,
    pub header: MusxHeader,
    pub streams: Vec<StreamReport>,
    /// Bits of raw (uncoded) system and controller fields
    pub raw_bits: usize,
}

impl MusxEncoding {
    pub fn table_bits(&self) -> usize {
        self.streams.iter().map(|s| s.table_bits).sum()
    }

    pub fn payload_bits(&self) -> usize {
        self.streams.iter().map(|s| s.payload_bits).sum::<usize>() + self.raw_bits
    }
}

/// Encode `commands` (ending with score-end) into a MUSX stream
pub fn encode(commands: &[MusCommand], config: &EncoderConfig) -> Result<MusxEncoding, MusxError> {
    config.validate()?;
    check_commands(commands)?;

    let mut profile = ProfilePass::default();
    let peak = walk(commands, false, &mut profile)?;
    if peak > config.max_simultaneous_notes {
        return Err(MusxError::NoteBudgetExceeded {
            required: peak,
            budget: config.max_simultaneous_notes,
        });
    }

    let layout = |grouped| encode_layout(commands, grouped, profile.release_tables, peak, config);
    let encoding = match config.layout {
        LayoutChoice::Sequential => layout(false)?,
        LayoutChoice::Grouped => layout(true)?,
        LayoutChoice::Auto => match (layout(false), layout(true)) {
            (Ok(sequential), Ok(grouped)) => {
                tracing::debug!(
                    sequential = sequential.bytes.len(),
                    grouped = grouped.bytes.len(),
                    "compared layouts"
                );
                if grouped.bytes.len() < sequential.bytes.len() {
                    grouped
                } else {
                    sequential
                }
            }
            (Ok(sequential), Err(_)) => sequential,
            (Err(_), Ok(grouped)) => grouped,
            (Err(e), Err(_)) => return Err(e),
        },
    };

    tracing::debug!(
        commands = commands.len(),
        bytes = encoding.bytes.len(),
        grouped = encoding.header.grouped,
        decoder_words = encoding.header.decoder_words,
        "encoded MUSX"
    );
    Ok(encoding)
}

fn encode_layout(
    commands: &[MusCommand],
    grouped: bool,
    release_tables: u8,
    peak: usize,
    config: &EncoderConfig,
) -> Result<MusxEncoding, MusxError> {
    let mut streams = StreamSet::new(release_tables, config.max_code_length);
    walk(
        commands,
        grouped,
        &mut StatsPass {
            streams: &mut streams,
        },
    )?;

    let order: Vec<Stream> = Stream::table_order(grouped, release_tables).collect();
    let mut decoder_words = 0;
    for &stream in &order {
        let sink = streams.get_mut(stream);
        sink.begin_output()?;
        decoder_words += sink.scratch_words();
    }
    if decoder_words > config.max_decoder_words {
        return Err(MusxError::DecoderBudgetExceeded {
            required: decoder_words,
            budget: config.max_decoder_words,
        });
    }

    let mut writer = BitWriter::new();
    let mut table_bits = Vec::with_capacity(order.len());
    for &stream in &order {
        table_bits.push(write_stream_table(&streams, stream, config.table_encoding, &mut writer)?);
    }

    let mut output = OutputPass {
        streams: &mut streams,
        writer: &mut writer,
        raw_bits: 0,
    };
    walk(commands, grouped, &mut output)?;
    let raw_bits = output.raw_bits;
    writer.pad_to_byte();

    let reports = order
        .iter()
        .zip(table_bits)
        .map(|(&stream, table_bits)| {
            let sink = streams.get(stream);
            StreamReport {
                stream,
                symbols: sink.lengths().map_or(0, |l| l.len()),
                coded: sink.stats().total(),
                table_bits,
                payload_bits: sink.payload_bits(),
            }
        })
        .collect();

    let header = MusxHeader {
        grouped,
        max_simultaneous_notes: peak as u8,
        release_tables,
        decoder_words: decoder_words as u16,
    };
    let mut bytes = Vec::with_capacity(MusxHeader::SIZE + writer.as_bytes().len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(writer.as_bytes());

    Ok(MusxEncoding {
        bytes,
        header,
        streams: reports,
        raw_bits,
    })
}

fn write_stream_table(
    streams: &StreamSet,
    stream: Stream,
    encoding: TableEncoding,
    writer: &mut BitWriter,
) -> Result<usize, MusxError> {
    let bits = streams.get(stream).write_table(encoding, writer)?;
    tracing::trace!(%stream, bits, "wrote stream table");
    Ok(bits)
}

// =============================================================================
// Passes
// =============================================================================

/// Destination of one walk over the commands
trait PassSink {
    fn symbol(&mut self, stream: Stream, symbol: u16) -> Result<(), MusxError>;
    fn raw(&mut self, bits: u32, length: u32);
}

/// One Huffman sink per stream slot
struct StreamSet {
    sinks: Vec<HuffmanSink>,
}

impl StreamSet {
    fn new(release_tables: u8, max_code_length: u8) -> Self {
        let mut sinks = vec![HuffmanSink::new("unused"); Stream::slot_count(release_tables)];
        for stream in Stream::table_order(true, release_tables) {
            sinks[stream.slot()] = HuffmanSink::with_max_code_length(stream.name(), max_code_length);
        }
        Self { sinks }
    }

    fn get(&self, stream: Stream) -> &HuffmanSink {
        &self.sinks[stream.slot()]
    }

    fn get_mut(&mut self, stream: Stream) -> &mut HuffmanSink {
        &mut self.sinks[stream.slot()]
    }
}

/// Finds the largest held count at which a release is coded
#[derive(Default)]
struct ProfilePass {
    release_tables: u8,
}

impl PassSink for ProfilePass {
    fn symbol(&mut self, stream: Stream, _symbol: u16) -> Result<(), MusxError> {
        if let Stream::Release(held) = stream {
            self.release_tables = self.release_tables.max(held);
        }
        Ok(())
    }

    fn raw(&mut self, _bits: u32, _length: u32) {}
}

struct StatsPass<'a> {
    streams: &'a mut StreamSet,
}

impl PassSink for StatsPass<'_> {
    fn symbol(&mut self, stream: Stream, symbol: u16) -> Result<(), MusxError> {
        self.streams.get_mut(stream).observe(symbol);
        Ok(())
    }

    fn raw(&mut self, _bits: u32, _length: u32) {}
}

struct OutputPass<'a> {
    streams: &'a mut StreamSet,
    writer: &'a mut BitWriter,
    raw_bits: usize,
}

impl PassSink for OutputPass<'_> {
    fn symbol(&mut self, stream: Stream, symbol: u16) -> Result<(), MusxError> {
        self.streams.get_mut(stream).write(symbol, self.writer)?;
        Ok(())
    }

    fn raw(&mut self, bits: u32, length: u32) {
        self.writer.write(bits, length);
        self.raw_bits += length as usize;
    }
}

// =============================================================================
// Walk
// =============================================================================

/// Emit every command into `sink`, returning the peak held-note count
fn walk<S: PassSink>(commands: &[MusCommand], grouped: bool, sink: &mut S) -> Result<usize, MusxError> {
    let mut state = ChannelState::default();
    let mut arena = NoteArena::new(MAX_NOTE_ARENA)?;

    if grouped {
        let runs = commands
            .split_inclusive(|command| command.gap_after > 0)
            .flat_map(|run| run.chunks(MAX_GROUP_SIZE));
        for run in runs {
            sink.symbol(Stream::GroupSize, (run.len() - 1) as u16)?;
            for command in run {
                emit_event(command, &mut state, &mut arena, sink)?;
            }
            if let Some(last) = run.last() {
                if last.event != MusEvent::ScoreEnd {
                    emit_gap(last.gap_after, sink)?;
                }
            }
        }
    } else {
        for command in commands {
            emit_event(command, &mut state, &mut arena, sink)?;
            if command.event != MusEvent::ScoreEnd {
                emit_gap(command.gap_after, sink)?;
            }
        }
    }
    Ok(arena.peak())
}

fn emit_event<S: PassSink>(
    command: &MusCommand,
    state: &mut ChannelState,
    arena: &mut NoteArena,
    sink: &mut S,
) -> Result<(), MusxError> {
    let channel = command.channel;
    let ch = channel as usize;
    sink.symbol(
        Stream::ChannelEvent,
        channel_event_symbol(channel, command.event.kind()),
    )?;

    match command.event {
        MusEvent::ReleaseKey { note } => {
            let held = arena.count(channel);
            let distance = arena
                .position(channel, note)
                .ok_or(MusxError::UnmatchedRelease {
                    channel,
                    note: Some(note),
                })?;
            if held >= 2 {
                sink.symbol(Stream::Release(held), distance as u16)?;
            }
            arena.release(channel, distance)?;
        }
        MusEvent::PressKey { note, volume } => {
            let stream = if channel == PERCUSSION_CHANNEL {
                Stream::PercussionNote
            } else {
                Stream::MelodicNote
            };
            sink.symbol(stream, note as u16)?;
            sink.symbol(Stream::PressVolume, state.volume_symbol(channel, volume))?;
            state.record_press(channel, volume);
            arena.press(channel, note)?;
        }
        MusEvent::PitchWheel(value) => {
            emit_delta(Stream::DeltaPitch, &mut state.pitch[ch], value, sink)?;
        }
        MusEvent::System(event) => sink.raw(event as u32, 4),
        MusEvent::Controller { controller, value } => match controller {
            CONTROLLER_VOLUME => emit_delta(Stream::DeltaVolume, &mut state.volume[ch], value, sink)?,
            CONTROLLER_VIBRATO => {
                emit_delta(Stream::DeltaVibrato, &mut state.vibrato[ch], value, sink)?
            }
            _ => {
                sink.raw(controller as u32, 4);
                sink.raw(value as u32, 8);
            }
        },
        MusEvent::ScoreEnd => {}
    }
    Ok(())
}

fn emit_delta<S: PassSink>(
    stream: Stream,
    previous: &mut u8,
    value: u8,
    sink: &mut S,
) -> Result<(), MusxError> {
    let delta = value as i32 - *previous as i32;
    *previous = value;
    sink.symbol(stream, to_zig(delta) as u16)
}

fn emit_gap<S: PassSink>(mut gap: u32, sink: &mut S) -> Result<(), MusxError> {
    while gap >= GAP_ESCAPE as u32 {
        sink.symbol(Stream::Gap, GAP_ESCAPE)?;
        gap -= GAP_ESCAPE as u32;
    }
    sink.symbol(Stream::Gap, gap as u16)
}
