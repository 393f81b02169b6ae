//! Per-channel held-note lists in one fixed-capacity arena
//!
//! Each channel keeps its held notes as a singly linked list in press order
//! (oldest first). Links are 8-bit indices into shared arrays; released
//! entries go back on a free list and are reused by the next press.

use crate::{MAX_NOTE_ARENA, MusxError, NUM_CHANNELS};

const NIL: u8 = 0xFF;

/// Fixed-capacity held-note tracker shared by all channels
#[derive(Debug, Clone)]
pub struct NoteArena {
    note: Vec<u8>,
    next: Vec<u8>,
    free: u8,
    head: [u8; NUM_CHANNELS],
    tail: [u8; NUM_CHANNELS],
    count: [u8; NUM_CHANNELS],
    active: usize,
    peak: usize,
}

impl NoteArena {
    /// Arena with room for `capacity` held notes (at most 255)
    pub fn new(capacity: usize) -> Result<Self, MusxError> {
        if capacity == 0 || capacity > MAX_NOTE_ARENA {
            return Err(MusxError::InvalidConfig(format!(
                "note arena capacity {capacity} outside 1..={MAX_NOTE_ARENA}"
            )));
        }
        let mut arena = Self {
            note: vec![0; capacity],
            next: vec![NIL; capacity],
            free: NIL,
            head: [NIL; NUM_CHANNELS],
            tail: [NIL; NUM_CHANNELS],
            count: [0; NUM_CHANNELS],
            active: 0,
            peak: 0,
        };
        arena.reset();
        Ok(arena)
    }

    /// Drop every held note and rebuild the free list
    pub fn reset(&mut self) {
        let capacity = self.note.len();
        for (index, link) in self.next.iter_mut().enumerate() {
            *link = if index + 1 < capacity {
                (index + 1) as u8
            } else {
                NIL
            };
        }
        self.free = 0;
        self.head = [NIL; NUM_CHANNELS];
        self.tail = [NIL; NUM_CHANNELS];
        self.count = [0; NUM_CHANNELS];
        self.active = 0;
        self.peak = 0;
    }

    pub fn capacity(&self) -> usize {
        self.note.len()
    }

    /// Notes held across all channels
    pub fn active(&self) -> usize {
        self.active
    }

    /// Highest `active()` since the last reset
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Notes held on `channel`
    #[inline]
    pub fn count(&self, channel: u8) -> u8 {
        self.count[channel as usize]
    }

    /// Append `note` to the end of the channel's press order
    pub fn press(&mut self, channel: u8, note: u8) -> Result<(), MusxError> {
        let slot = self.free;
        if slot == NIL {
            return Err(MusxError::NoteArenaExhausted {
                capacity: self.capacity(),
            });
        }
        let ch = channel as usize;
        self.free = self.next[slot as usize];
        self.note[slot as usize] = note;
        self.next[slot as usize] = NIL;

        if self.tail[ch] == NIL {
            self.head[ch] = slot;
        } else {
            self.next[self.tail[ch] as usize] = slot;
        }
        self.tail[ch] = slot;
        self.count[ch] += 1;
        self.active += 1;
        self.peak = self.peak.max(self.active);
        Ok(())
    }

    /// Position of the oldest held `note` on `channel` (0 = oldest press)
    pub fn position(&self, channel: u8, note: u8) -> Option<u8> {
        self.iter(channel)
            .position(|held| held == note)
            .map(|position| position as u8)
    }

    /// Remove the note at `distance` in the channel's press order
    pub fn release(&mut self, channel: u8, distance: u8) -> Result<u8, MusxError> {
        let ch = channel as usize;
        if distance >= self.count[ch] {
            return Err(MusxError::ValueOutOfRange {
                field: "release distance",
                value: distance as u32,
            });
        }

        let mut prev = NIL;
        let mut slot = self.head[ch];
        for _ in 0..distance {
            prev = slot;
            slot = self.next[slot as usize];
        }

        let following = self.next[slot as usize];
        if prev == NIL {
            self.head[ch] = following;
        } else {
            self.next[prev as usize] = following;
        }
        if self.tail[ch] == slot {
            self.tail[ch] = prev;
        }

        self.next[slot as usize] = self.free;
        self.free = slot;
        self.count[ch] -= 1;
        self.active -= 1;
        Ok(self.note[slot as usize])
    }

    /// Held notes on `channel`, oldest first
    pub fn iter(&self, channel: u8) -> impl Iterator<Item = u8> + '_ {
        let mut slot = self.head[channel as usize];
        core::iter::from_fn(move || {
            if slot == NIL {
                return None;
            }
            let note = self.note[slot as usize];
            slot = self.next[slot as usize];
            Some(note)
        })
    }
}
