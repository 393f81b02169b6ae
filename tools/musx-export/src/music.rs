//! MUS to MUSX conversion, verification and inspection

use anyhow::{Context, Result};
use nether_huff::{BitReader, read_table};
use nether_musx::mus::parse_mus;
use nether_musx::{
    DecoderConfig, EncoderConfig, MusCommand, MusxDecoder, MusxEncoding, MusxHeader, Stream, encode,
};
use std::fmt::Write as _;
use std::path::Path;

/// Encode a MUS lump held in memory
pub fn encode_mus(data: &[u8], config: &EncoderConfig) -> Result<(Vec<MusCommand>, MusxEncoding)> {
    let commands = parse_mus(data).context("Failed to parse MUS lump")?;
    let encoding = encode(&commands, config).context("Failed to encode MUSX")?;
    Ok((commands, encoding))
}

/// Convert a MUS file to a MUSX file
pub fn convert_mus(input: &Path, output: &Path, config: &EncoderConfig) -> Result<MusxEncoding> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let (commands, encoding) = encode_mus(&data, config)?;
    std::fs::write(output, &encoding.bytes)
        .with_context(|| format!("Failed to write {:?}", output))?;

    tracing::info!(
        "{} events: {} bytes MUS -> {} bytes MUSX ({} layout, {} decoder words)",
        commands.len(),
        data.len(),
        encoding.bytes.len(),
        if encoding.header.grouped { "grouped" } else { "sequential" },
        encoding.header.decoder_words,
    );
    for report in &encoding.streams {
        tracing::debug!(
            stream = %report.stream,
            symbols = report.symbols,
            coded = report.coded,
            table_bits = report.table_bits,
            payload_bits = report.payload_bits,
            "stream"
        );
    }
    Ok(encoding)
}

/// Decoder limits that accept anything `config` lets the encoder produce
pub fn decoder_config_for(config: &EncoderConfig) -> DecoderConfig {
    DecoderConfig {
        max_decoder_words: config.max_decoder_words,
        max_simultaneous_notes: config.max_simultaneous_notes,
        ..Default::default()
    }
}

/// Encode a MUS file, decode the result and compare against the parsed lump
///
/// Returns the event count on success.
pub fn verify_mus(input: &Path, config: &EncoderConfig) -> Result<usize> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let (commands, encoding) = encode_mus(&data, config)?;

    for prefix_tables in [true, false] {
        let decoder_config = DecoderConfig {
            prefix_tables,
            ..decoder_config_for(config)
        };
        let mut decoder = MusxDecoder::new(&encoding.bytes, decoder_config)
            .context("Failed to open encoded stream")?;
        let decoded = decoder.decode_all().context("Failed to decode encoded stream")?;

        if decoded.len() != commands.len() {
            anyhow::bail!(
                "Decoded {} events, expected {}",
                decoded.len(),
                commands.len()
            );
        }
        if let Some(index) = decoded.iter().zip(&commands).position(|(a, b)| a != b) {
            anyhow::bail!(
                "Event {} differs: decoded {:?}, expected {:?}",
                index,
                decoded[index],
                commands[index]
            );
        }
    }
    Ok(commands.len())
}

/// Human-readable summary of a MUSX stream
pub fn describe_musx(bytes: &[u8]) -> Result<String> {
    let header = MusxHeader::from_bytes(bytes).context("Invalid MUSX header")?;

    let mut out = String::new();
    writeln!(out, "MUSX v{}, {} bytes", nether_musx::MUSX_VERSION, bytes.len())?;
    writeln!(
        out,
        "  layout: {}",
        if header.grouped { "grouped" } else { "sequential" }
    )?;
    writeln!(out, "  max simultaneous notes: {}", header.max_simultaneous_notes)?;
    writeln!(out, "  release tables: {}", header.release_tables)?;
    writeln!(out, "  decoder words: {}", header.decoder_words)?;
    writeln!(out, "  tables:")?;

    let mut reader = BitReader::new(&bytes[MusxHeader::SIZE..]);
    for stream in Stream::table_order(header.grouped, header.release_tables) {
        let start = reader.bit_position();
        let lengths = read_table(&mut reader).with_context(|| format!("Invalid {stream} table"))?;
        let range = match lengths.symbol_range() {
            Some((first, last)) => format!("{first}..={last}"),
            None => "-".to_string(),
        };
        writeln!(
            out,
            "    {:<20} {:>4} symbols  {:>5} bits  range {}  max length {}",
            stream.to_string(),
            lengths.len(),
            reader.bit_position() - start,
            range,
            lengths.max_length(),
        )?;
    }

    let config = DecoderConfig {
        max_decoder_words: header.decoder_words as usize,
        max_simultaneous_notes: (header.max_simultaneous_notes as usize).max(1),
        ..Default::default()
    };
    let mut decoder = MusxDecoder::new(bytes, config).context("Failed to open stream")?;
    let mut events = 0usize;
    let mut ticks = 0u64;
    while let Some(event) = decoder.next_event().context("Failed to decode events")? {
        events += 1;
        ticks += event.delta_ticks as u64;
    }
    writeln!(out, "  events: {events}, {ticks} ticks")?;
    Ok(out)
}
