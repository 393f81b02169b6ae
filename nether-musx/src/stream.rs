//! Symbol stream identifiers and table order

use core::fmt;

/// One independently coded symbol stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// `channel << 3 | kind`
    ChannelEvent,
    DeltaVolume,
    DeltaPitch,
    DeltaVibrato,
    MelodicNote,
    PercussionNote,
    PressVolume,
    GroupSize,
    /// Release position when the channel holds this many notes (≥ 2)
    Release(u8),
    Gap,
}

const FIXED_SLOTS: usize = 9;

impl Stream {
    /// Storage slot; independent of the order tables appear in the file
    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::ChannelEvent => 0,
            Self::DeltaVolume => 1,
            Self::DeltaPitch => 2,
            Self::DeltaVibrato => 3,
            Self::MelodicNote => 4,
            Self::PercussionNote => 5,
            Self::PressVolume => 6,
            Self::GroupSize => 7,
            Self::Gap => 8,
            Self::Release(held) => FIXED_SLOTS + held as usize - 2,
        }
    }

    /// Slots needed for `release_tables`
    pub(crate) fn slot_count(release_tables: u8) -> usize {
        FIXED_SLOTS + (release_tables as usize).saturating_sub(1)
    }

    /// Streams in file order for a layout
    pub fn table_order(grouped: bool, release_tables: u8) -> impl Iterator<Item = Stream> {
        let fixed = [
            Self::ChannelEvent,
            Self::DeltaVolume,
            Self::DeltaPitch,
            Self::DeltaVibrato,
            Self::MelodicNote,
            Self::PercussionNote,
            Self::PressVolume,
        ];
        let group = grouped.then_some(Self::GroupSize);
        let releases = (2..=release_tables.max(1)).map(Self::Release);
        fixed
            .into_iter()
            .chain(group)
            .chain(releases)
            .chain(core::iter::once(Self::Gap))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ChannelEvent => "channel-event",
            Self::DeltaVolume => "delta-volume",
            Self::DeltaPitch => "delta-pitch",
            Self::DeltaVibrato => "delta-vibrato",
            Self::MelodicNote => "melodic-note",
            Self::PercussionNote => "percussion-note",
            Self::PressVolume => "press-volume",
            Self::GroupSize => "group-size",
            Self::Release(_) => "release-distance",
            Self::Gap => "gap",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release(held) => write!(f, "release-distance[{held}]"),
            other => f.write_str(other.name()),
        }
    }
}
