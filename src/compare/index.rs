//! Hash-keyed baseline index: fixed-modulus buckets with open chaining.
//!
//! Entries live in a growable arena addressed by stable `u32` handles, and
//! each bucket heads a singly-linked chain through the arena. The index is
//! built once by the loader and is read-mostly afterwards; the only
//! post-load mutation is each entry's matched counter. Two entries may
//! never carry the same record hash — that is a content-hash collision
//! among supposedly unique identities and the caller must abort.

/// Fixed-length binary record identity hash.
pub type RecordHash = [u8; 16];

/// Stable handle into the entry arena.
pub type EntryHandle = u32;

/// End-of-chain / empty-bucket sentinel.
pub const NIL: EntryHandle = EntryHandle::MAX;

/// Fixed bucket modulus.
pub const BUCKET_COUNT: usize = 1 << 16;

/// Entry arena growth step.
const ENTRY_BLOCK: usize = 4096;

/// Where a baseline record's joined text lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadRef {
    /// Record text owned by this entry.
    Owned(Box<str>),
    /// Byte range within the session's mapped backing store.
    Spilled { offset: u64, len: u32 },
}

/// One baseline record in the index.
#[derive(Debug)]
pub struct BaselineEntry {
    hash: RecordHash,
    line_number: u64,
    next: EntryHandle,
    matched: u32,
    payload: PayloadRef,
}

impl BaselineEntry {
    /// Record identity hash.
    #[must_use]
    pub const fn hash(&self) -> &RecordHash {
        &self.hash
    }

    /// Origin line number in the baseline file.
    #[must_use]
    pub const fn line_number(&self) -> u64 {
        self.line_number
    }

    /// How many snapshot records have matched this entry so far.
    #[must_use]
    pub const fn matched(&self) -> u32 {
        self.matched
    }

    /// Payload location.
    #[must_use]
    pub const fn payload(&self) -> &PayloadRef {
        &self.payload
    }
}

/// Outcome of probing for an insertion slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotProbe {
    /// The bucket is empty; insertion becomes the bucket head.
    EmptyBucket(usize),
    /// The bucket chain ends at this entry; insertion links after it.
    ChainTail(EntryHandle),
    /// An entry with this exact hash already exists.
    Duplicate(EntryHandle),
}

/// Bucket selection: low-order 16 bits of the hash.
const fn bucket_of(hash: &RecordHash) -> usize {
    u16::from_le_bytes([hash[0], hash[1]]) as usize
}

/// The baseline hash index.
#[derive(Debug)]
pub struct BaselineIndex {
    buckets: Vec<EntryHandle>,
    entries: Vec<BaselineEntry>,
}

impl BaselineIndex {
    /// Empty index with every bucket head set to the sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: vec![NIL; BUCKET_COUNT],
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk the bucket for `hash` and report where an insertion would land,
    /// or that an exact hash match already exists anywhere in the chain.
    #[must_use]
    pub fn probe(&self, hash: &RecordHash) -> SlotProbe {
        let bucket = bucket_of(hash);
        let mut current = self.buckets[bucket];
        if current == NIL {
            return SlotProbe::EmptyBucket(bucket);
        }
        loop {
            let entry = &self.entries[current as usize];
            if &entry.hash == hash {
                return SlotProbe::Duplicate(current);
            }
            if entry.next == NIL {
                return SlotProbe::ChainTail(current);
            }
            current = entry.next;
        }
    }

    /// Insert a new entry keyed by `hash`, appending at the tail of its
    /// chain. Returns `None` on a duplicate hash — the caller must treat
    /// that as fatal.
    pub fn insert(
        &mut self,
        hash: RecordHash,
        line_number: u64,
        payload: PayloadRef,
    ) -> Option<EntryHandle> {
        let slot = self.probe(&hash);
        if matches!(slot, SlotProbe::Duplicate(_)) {
            return None;
        }

        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(ENTRY_BLOCK);
        }
        let handle = u32::try_from(self.entries.len()).ok()?;
        self.entries.push(BaselineEntry {
            hash,
            line_number,
            next: NIL,
            matched: 0,
            payload,
        });

        match slot {
            SlotProbe::EmptyBucket(bucket) => self.buckets[bucket] = handle,
            SlotProbe::ChainTail(tail) => self.entries[tail as usize].next = handle,
            SlotProbe::Duplicate(_) => unreachable!("duplicate rejected above"),
        }
        Some(handle)
    }

    /// Find the entry whose stored hash exactly matches. Read-only; the
    /// caller bumps the matched counter separately.
    #[must_use]
    pub fn lookup(&self, hash: &RecordHash) -> Option<EntryHandle> {
        let mut current = self.buckets[bucket_of(hash)];
        while current != NIL {
            let entry = &self.entries[current as usize];
            if &entry.hash == hash {
                return Some(current);
            }
            current = entry.next;
        }
        None
    }

    /// Borrow an entry by handle.
    #[must_use]
    pub fn entry(&self, handle: EntryHandle) -> &BaselineEntry {
        &self.entries[handle as usize]
    }

    /// Increment an entry's matched counter and return the new count.
    pub fn record_matched(&mut self, handle: EntryHandle) -> u32 {
        let entry = &mut self.entries[handle as usize];
        entry.matched += 1;
        entry.matched
    }

    /// Enumerate all entries in bucket order, then insertion order within
    /// each bucket's chain. Report output depends on this exact order.
    pub fn iter_bucket_order(&self) -> impl Iterator<Item = EntryHandle> + '_ {
        self.buckets.iter().flat_map(move |&head| ChainIter {
            index: self,
            current: head,
        })
    }
}

impl Default for BaselineIndex {
    fn default() -> Self {
        Self::new()
    }
}

struct ChainIter<'a> {
    index: &'a BaselineIndex,
    current: EntryHandle,
}

impl Iterator for ChainIter<'_> {
    type Item = EntryHandle;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NIL {
            return None;
        }
        let handle = self.current;
        self.current = self.index.entries[handle as usize].next;
        Some(handle)
    }
}

/// Build a deterministic hash whose bucket is fixed by the first two bytes.
#[cfg(test)]
pub(crate) fn test_hash(bucket: u16, discriminant: u8) -> RecordHash {
    let mut hash = [0u8; 16];
    hash[0..2].copy_from_slice(&bucket.to_le_bytes());
    hash[2] = discriminant;
    hash
}
