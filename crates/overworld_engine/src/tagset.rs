//! Fixed-width tag bitsets for entity filtering.

use crate::error::EngineError;
use std::fmt;

pub type TagId = u32;

/// Number of distinct tags.
pub const TAG_ID_COUNT: u32 = 256;

const WORD_BITS: u32 = u64::BITS;
const WORDS: usize = (TAG_ID_COUNT / WORD_BITS) as usize;

/// 256-bit set of tag ids. Plain value, no allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tagset {
    words: [u64; WORDS],
}

impl Tagset {
    pub const EMPTY: Tagset = Tagset { words: [0; WORDS] };

    /// Set containing exactly `tags`. Out-of-range ids are logged and skipped.
    pub fn from_tags(tags: &[TagId]) -> Self {
        let mut tagset = Tagset::EMPTY;
        for &tag_id in tags {
            // already logged
            let _ = tagset.set(tag_id, true);
        }
        tagset
    }

    /// Turn a tag on or off. Out-of-range ids leave the set untouched.
    pub fn set(&mut self, tag_id: TagId, enabled: bool) -> Result<(), EngineError> {
        if tag_id >= TAG_ID_COUNT {
            tracing::error!(tag_id, max = TAG_ID_COUNT - 1, "tag id out of range");
            return Err(EngineError::TagOutOfRange {
                tag_id,
                max: TAG_ID_COUNT - 1,
            });
        }
        let (word, mask) = locate(tag_id);
        if enabled {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
        Ok(())
    }

    /// Out-of-range ids read as unset.
    #[inline]
    pub fn get(&self, tag_id: TagId) -> bool {
        if tag_id >= TAG_ID_COUNT {
            return false;
        }
        let (word, mask) = locate(tag_id);
        self.words[word] & mask != 0
    }

    /// Every tag in `required` is also in `self`. The empty set is contained
    /// in everything.
    #[inline]
    pub fn contains_all(&self, required: &Tagset) -> bool {
        self.words
            .iter()
            .zip(required.words.iter())
            .all(|(have, want)| have & want == *want)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set tag ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let base = i as u32 * WORD_BITS;
            BitIter(word).map(move |bit| base + bit)
        })
    }
}

#[inline]
fn locate(tag_id: TagId) -> (usize, u64) {
    ((tag_id / WORD_BITS) as usize, 1u64 << (tag_id % WORD_BITS))
}

struct BitIter(u64);

impl Iterator for BitIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

/// Hex, most significant word first: `0x` followed by 64 digits.
impl fmt::Display for Tagset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for word in self.words.iter().rev() {
            write!(f, "{word:016x}")?;
        }
        Ok(())
    }
}
