//! Pattern file storage trait

use core::future::Future;

/// Number of pattern banks
pub const BANK_COUNT: u8 = 3;

/// Pattern slots per bank
pub const SLOTS_PER_BANK: u8 = 5;

/// Total pattern slots on the device
pub const SLOT_COUNT: usize = BANK_COUNT as usize * SLOTS_PER_BANK as usize;

/// Errors from pattern storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Slot holds no finished pattern
    NotFound,
    /// Write would exceed the slot capacity
    Full,
    /// Flash driver reported an error
    Flash,
    /// Read offset past the end of the pattern
    OutOfRange,
    /// Slot header is invalid
    Corrupted,
    /// Append or finish without an open slot
    NotOpen,
}

/// A logical pattern location: bank 0..3, slot 0..5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternSlot {
    pub bank: u8,
    pub slot: u8,
}

impl PatternSlot {
    /// Build a slot, returning `None` if either index is out of range
    pub fn new(bank: u8, slot: u8) -> Option<Self> {
        (bank < BANK_COUNT && slot < SLOTS_PER_BANK).then_some(Self { bank, slot })
    }

    /// Flat index into the slot table
    pub fn index(&self) -> usize {
        self.bank as usize * SLOTS_PER_BANK as usize + self.slot as usize
    }
}

/// Persistent storage for uploaded patterns
///
/// A write session is `create`, any number of `append`s, then `finish`.
/// A slot only becomes readable after `finish`; `abort` discards the
/// session. Only one session may be open at a time.
pub trait PatternStore {
    /// Delete the pattern in `slot`
    ///
    /// Returns `NotFound` if the slot was already empty.
    fn remove(&mut self, slot: PatternSlot) -> impl Future<Output = Result<(), StorageError>>;

    /// Open `slot` for writing, truncating whatever it held
    fn create(&mut self, slot: PatternSlot) -> impl Future<Output = Result<(), StorageError>>;

    /// Append bytes to the open slot
    fn append(&mut self, data: &[u8]) -> impl Future<Output = Result<(), StorageError>>;

    /// Flush buffered bytes and close the open slot, returning its length
    fn finish(&mut self) -> impl Future<Output = Result<u32, StorageError>>;

    /// Discard the open session without committing it
    fn abort(&mut self) -> impl Future<Output = ()>;

    /// Length of the finished pattern in `slot`
    fn len(&mut self, slot: PatternSlot) -> impl Future<Output = Result<u32, StorageError>>;

    /// Read from `slot` at `offset` into `buffer`, returning bytes read
    ///
    /// Reads at or past the end return `OutOfRange`.
    fn read_at(
        &mut self,
        slot: PatternSlot,
        offset: u32,
        buffer: &mut [u8],
    ) -> impl Future<Output = Result<usize, StorageError>>;

    /// Bytes still available for new patterns
    fn free_bytes(&mut self) -> impl Future<Output = u32>;
}
