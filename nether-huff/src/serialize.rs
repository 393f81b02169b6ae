//! Compact table serialization
//!
//! Only code lengths are stored. Three interchangeable encodings cover the
//! symbol range `first..=first + span`; the writer measures all of them and
//! keeps the smallest unless one is forced.
//!
//! | Encoding | Per symbol |
//! |----------|------------|
//! | Grouped  | groups of 8: `0` all absent, `11` + lengths all present, `10` + flag/length each |
//! | Flat     | presence flag, then length if present |
//! | Sentinel | fixed-width `length - min` or the escape `(1 << bits) - 1` for absent |

use crate::table::CanonicalTable;
use crate::{BitReader, BitWriter, CodeLengths, DecoderScratch, HuffError, MAX_CODE_LENGTH, TABLE_GROUP_SIZE};

/// Length body encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableEncoding {
    /// Pick the smallest of the three
    #[default]
    Auto,
    /// Groups of 8 with a per-group existence code
    Grouped,
    /// Per-symbol presence flag
    Flat,
    /// Fixed width with an "absent" escape value
    Sentinel,
}

impl TableEncoding {
    /// Concrete encodings in tie-break order
    pub const VARIANTS: [TableEncoding; 3] = [Self::Grouped, Self::Flat, Self::Sentinel];

    fn tag(self) -> u32 {
        match self {
            Self::Grouped | Self::Auto => 0,
            Self::Flat => 1,
            Self::Sentinel => 2,
        }
    }

    fn from_tag(tag: u32) -> Result<Self, HuffError> {
        match tag {
            0 => Ok(Self::Grouped),
            1 => Ok(Self::Flat),
            2 => Ok(Self::Sentinel),
            other => Err(HuffError::InvalidTableEncoding(other as u8)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Grouped => "grouped",
            Self::Flat => "flat",
            Self::Sentinel => "sentinel",
        }
    }
}

impl core::str::FromStr for TableEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "grouped" => Ok(Self::Grouped),
            "flat" => Ok(Self::Flat),
            "sentinel" => Ok(Self::Sentinel),
            other => Err(format!(
                "unknown table encoding '{other}' (use auto, grouped, flat or sentinel)"
            )),
        }
    }
}

/// Width in bits needed to hold `value` (0 for 0)
#[inline]
fn bit_width(value: u32) -> u32 {
    32 - value.leading_zeros()
}

// =============================================================================
// Header
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct CodedHeader {
    min_length: u8,
    max_length: u8,
    encoding: TableEncoding,
    first: u16,
    span: u16,
}

impl CodedHeader {
    fn length_bits(&self) -> u32 {
        bit_width((self.max_length - self.min_length) as u32)
    }

    fn sentinel_bits(&self) -> u32 {
        bit_width((self.max_length - self.min_length) as u32 + 1)
    }

    fn symbol_count(&self) -> usize {
        self.span as usize + 1
    }
}

enum Header {
    Empty,
    Single(u16),
    Coded(CodedHeader),
}

fn read_header(reader: &mut BitReader) -> Result<Header, HuffError> {
    let min_length = reader.read_bits(4)? as u8;
    let max_length = reader.read_bits(4)? as u8;

    if max_length == 0 {
        return match min_length {
            0 => Ok(Header::Empty),
            1 => Ok(Header::Single(reader.read_bits(8)? as u16)),
            2 => Ok(Header::Single(reader.read_bits(16)? as u16)),
            other => Err(HuffError::InvalidTableEncoding(other)),
        };
    }
    if min_length == 0 || min_length > max_length {
        return Err(HuffError::InvalidTableEncoding(min_length));
    }

    let encoding = TableEncoding::from_tag(reader.read_bits(2)?)?;
    let width = if reader.read_bit()? == 1 { 16 } else { 8 };
    let first = reader.read_bits(width)?;
    let span = reader.read_bits(width)?;
    if first + span > u16::MAX as u32 {
        return Err(HuffError::SymbolOutOfRange(first + span));
    }

    Ok(Header::Coded(CodedHeader {
        min_length,
        max_length,
        encoding,
        first: first as u16,
        span: span as u16,
    }))
}

// =============================================================================
// Writing
// =============================================================================

/// A table serialized on its own, padded to a byte boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedTable {
    pub bytes: Vec<u8>,
    /// Bits used before padding; data following the table starts at the next byte
    pub header_bits: usize,
    /// Encoding chosen (`None` for 0/1-symbol tables)
    pub encoding: Option<TableEncoding>,
}

impl SerializedTable {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse the lengths back out
    pub fn lengths(&self) -> Result<CodeLengths, HuffError> {
        read_table(&mut BitReader::new(&self.bytes))
    }
}

/// Serialize `lengths` into a standalone byte buffer
pub fn serialize_table(
    lengths: &CodeLengths,
    encoding: TableEncoding,
) -> Result<SerializedTable, HuffError> {
    let mut writer = BitWriter::new();
    let used = write_table(lengths, encoding, &mut writer)?;
    let header_bits = writer.bit_len();
    writer.pad_to_byte();
    Ok(SerializedTable {
        bytes: writer.into_bytes(),
        header_bits,
        encoding: used,
    })
}

/// Append a serialized table to `writer`, returning the encoding used
pub fn write_table(
    lengths: &CodeLengths,
    encoding: TableEncoding,
    writer: &mut BitWriter,
) -> Result<Option<TableEncoding>, HuffError> {
    let Some((first, last)) = lengths.symbol_range() else {
        writer.write(0, 8);
        return Ok(None);
    };

    if lengths.len() == 1 {
        let wide = first > u8::MAX as u16;
        writer.write(if wide { 2 } else { 1 }, 4);
        writer.write(0, 4);
        writer.write(first as u32, if wide { 16 } else { 8 });
        return Ok(None);
    }

    let max_length = lengths.max_length();
    if max_length > MAX_CODE_LENGTH {
        return Err(HuffError::CodeTooLong {
            symbol: 0,
            length: max_length,
            max: MAX_CODE_LENGTH,
        });
    }

    let mut per_symbol = vec![0u8; (last - first) as usize + 1];
    for (symbol, length) in lengths.iter() {
        per_symbol[(symbol - first) as usize] = length;
    }

    let mut header = CodedHeader {
        min_length: lengths.min_length(),
        max_length,
        encoding,
        first,
        span: last - first,
    };

    let body = match encoding {
        TableEncoding::Auto => {
            let mut best: Option<(TableEncoding, BitWriter)> = None;
            for variant in TableEncoding::VARIANTS {
                header.encoding = variant;
                let mut candidate = BitWriter::new();
                write_body(&header, &per_symbol, &mut candidate);
                if best
                    .as_ref()
                    .is_none_or(|(_, b)| candidate.bit_len() < b.bit_len())
                {
                    best = Some((variant, candidate));
                }
            }
            let (variant, body) = best.unwrap_or_default();
            header.encoding = variant;
            body
        }
        forced => {
            let mut body = BitWriter::new();
            write_body(&header, &per_symbol, &mut body);
            header.encoding = forced;
            body
        }
    };

    let wide = last > u8::MAX as u16;
    let width = if wide { 16 } else { 8 };
    writer.write(header.min_length as u32, 4);
    writer.write(header.max_length as u32, 4);
    writer.write(header.encoding.tag(), 2);
    writer.write_bit(wide);
    writer.write(first as u32, width);
    writer.write(header.span as u32, width);
    body.write_to(writer);

    tracing::trace!(
        symbols = lengths.len(),
        encoding = header.encoding.name(),
        bits = 11 + 2 * width as usize + body.bit_len(),
        "wrote table"
    );
    Ok(Some(header.encoding))
}

fn write_body(header: &CodedHeader, per_symbol: &[u8], writer: &mut BitWriter) {
    let min = header.min_length as u32;
    let length_bits = header.length_bits();

    match header.encoding {
        TableEncoding::Grouped | TableEncoding::Auto => {
            for group in per_symbol.chunks(TABLE_GROUP_SIZE) {
                let present = group.iter().filter(|&&len| len > 0).count();
                if present == 0 {
                    writer.write(0, 1);
                } else if present == group.len() {
                    writer.write(0b11, 2);
                    for &len in group {
                        writer.write(len as u32 - min, length_bits);
                    }
                } else {
                    writer.write(0b01, 2);
                    for &len in group {
                        write_flagged(writer, len, min, length_bits);
                    }
                }
            }
        }
        TableEncoding::Flat => {
            for &len in per_symbol {
                write_flagged(writer, len, min, length_bits);
            }
        }
        TableEncoding::Sentinel => {
            let bits = header.sentinel_bits();
            let escape = (1u32 << bits) - 1;
            for &len in per_symbol {
                let value = if len == 0 { escape } else { len as u32 - min };
                writer.write(value, bits);
            }
        }
    }
}

#[inline]
fn write_flagged(writer: &mut BitWriter, len: u8, min: u32, length_bits: u32) {
    if len == 0 {
        writer.write(0, 1);
    } else {
        writer.write(1, 1);
        writer.write(len as u32 - min, length_bits);
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Walk the length body, calling `visit(symbol, length)` for every present
/// symbol in ascending symbol order
fn visit_lengths(
    reader: &mut BitReader,
    header: &CodedHeader,
    mut visit: impl FnMut(u16, u8) -> Result<(), HuffError>,
) -> Result<(), HuffError> {
    let min = header.min_length;
    let length_bits = header.length_bits();
    let count = header.symbol_count();

    let mut emit = |index: usize, value: u32| -> Result<(), HuffError> {
        let length = min as u32 + value;
        if length > header.max_length as u32 {
            return Err(HuffError::InvalidTableEncoding(length as u8));
        }
        visit(header.first + index as u16, length as u8)
    };

    match header.encoding {
        TableEncoding::Grouped | TableEncoding::Auto => {
            let mut start = 0;
            while start < count {
                let end = (start + TABLE_GROUP_SIZE).min(count);
                if reader.read_bit()? == 1 {
                    let all_present = reader.read_bit()? == 1;
                    for index in start..end {
                        if all_present || reader.read_bit()? == 1 {
                            emit(index, reader.read_bits(length_bits)?)?;
                        }
                    }
                }
                start = end;
            }
        }
        TableEncoding::Flat => {
            for index in 0..count {
                if reader.read_bit()? == 1 {
                    emit(index, reader.read_bits(length_bits)?)?;
                }
            }
        }
        TableEncoding::Sentinel => {
            let bits = header.sentinel_bits();
            let escape = (1u32 << bits) - 1;
            for index in 0..count {
                let value = reader.read_bits(bits)?;
                if value != escape {
                    emit(index, value)?;
                }
            }
        }
    }
    Ok(())
}

/// Read a serialized table back into code lengths (encoder/tool side)
pub fn read_table(reader: &mut BitReader) -> Result<CodeLengths, HuffError> {
    match read_header(reader)? {
        Header::Empty => Ok(CodeLengths::empty()),
        Header::Single(symbol) => Ok(CodeLengths::single(symbol)),
        Header::Coded(header) => {
            let mut pairs = Vec::new();
            visit_lengths(reader, &header, |symbol, length| {
                pairs.push((symbol, length));
                Ok(())
            })?;
            CodeLengths::from_pairs(pairs)
        }
    }
}

/// Load a serialized table straight into decoder scratch
///
/// Makes two passes over the length body (count, then place) so no heap
/// memory is touched; the reader ends just past the table.
pub fn load_table(
    reader: &mut BitReader,
    scratch: &mut DecoderScratch,
    with_prefix: bool,
) -> Result<CanonicalTable, HuffError> {
    let header = match read_header(reader)? {
        Header::Empty => return Ok(CanonicalTable::default()),
        Header::Single(symbol) => {
            let at = scratch.alloc(1)?;
            scratch.words_mut(at, 1)[0] = symbol;
            return Ok(CanonicalTable {
                symbol_count: 1,
                symbols_at: at as u32,
                ..CanonicalTable::default()
            });
        }
        Header::Coded(header) => header,
    };

    let body_start = reader.bit_position();
    let mut counts = [0u16; MAX_CODE_LENGTH as usize + 1];
    let mut total = 0usize;
    visit_lengths(reader, &header, |_, length| {
        counts[length as usize] += 1;
        total += 1;
        Ok(())
    })?;
    let body_end = reader.bit_position();

    let mut table = CanonicalTable::with_counts(header.min_length, header.max_length, &counts, total);
    let at = scratch.alloc(total)?;
    table.symbols_at = at as u32;

    let mut next = CanonicalTable::first_indices(&counts);
    reader.seek(body_start);
    {
        let slots = scratch.words_mut(at, total);
        visit_lengths(reader, &header, |symbol, length| {
            let slot = &mut next[length as usize];
            slots[*slot as usize] = symbol;
            *slot += 1;
            Ok(())
        })?;
    }
    debug_assert_eq!(reader.bit_position(), body_end);

    if with_prefix {
        table.attach_prefix(scratch)?;
    }
    Ok(table)
}
