//! In-memory pattern store for unit tests

use heapless::Vec;

use super::storage::{PatternSlot, PatternStore, StorageError, SLOT_COUNT};

pub const SLOT_CAPACITY: usize = 4096;

type Data = Vec<u8, SLOT_CAPACITY>;

pub struct MemoryStore {
    slots: [Option<Data>; SLOT_COUNT],
    open: Option<(usize, Data)>,
    pub finishes: u32,
    pub fail_create: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            open: None,
            finishes: 0,
            fail_create: false,
        }
    }

    pub fn with_pattern(slot: PatternSlot, data: &[u8]) -> Self {
        let mut store = Self::new();
        store.slots[slot.index()] = Vec::from_slice(data).ok();
        store
    }

    pub fn contents(&self, slot: PatternSlot) -> Option<&[u8]> {
        self.slots[slot.index()].as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

impl PatternStore for MemoryStore {
    async fn remove(&mut self, slot: PatternSlot) -> Result<(), StorageError> {
        self.slots[slot.index()]
            .take()
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn create(&mut self, slot: PatternSlot) -> Result<(), StorageError> {
        if self.fail_create {
            return Err(StorageError::Flash);
        }
        self.slots[slot.index()] = None;
        self.open = Some((slot.index(), Vec::new()));
        Ok(())
    }

    async fn append(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let (_, buf) = self.open.as_mut().ok_or(StorageError::NotOpen)?;
        buf.extend_from_slice(data).map_err(|_| StorageError::Full)
    }

    async fn finish(&mut self) -> Result<u32, StorageError> {
        let (index, buf) = self.open.take().ok_or(StorageError::NotOpen)?;
        let len = buf.len() as u32;
        self.slots[index] = Some(buf);
        self.finishes += 1;
        Ok(len)
    }

    async fn abort(&mut self) {
        self.open = None;
    }

    async fn len(&mut self, slot: PatternSlot) -> Result<u32, StorageError> {
        self.slots[slot.index()]
            .as_ref()
            .map(|d| d.len() as u32)
            .ok_or(StorageError::NotFound)
    }

    async fn read_at(
        &mut self,
        slot: PatternSlot,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<usize, StorageError> {
        let data = self.slots[slot.index()]
            .as_ref()
            .ok_or(StorageError::NotFound)?;
        let offset = offset as usize;
        if offset >= data.len() {
            return Err(StorageError::OutOfRange);
        }
        let n = buffer.len().min(data.len() - offset);
        buffer[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    async fn free_bytes(&mut self) -> u32 {
        let used: usize = self.slots.iter().flatten().map(|d| d.len()).sum();
        (SLOT_COUNT * SLOT_CAPACITY - used) as u32
    }
}
