//! Flash pattern storage for RP2040
//!
//! The pattern partition sits between the radio firmware blobs and the
//! settings partition. Each of the 15 slots is a fixed 40KB region: the
//! first 256-byte page holds the slot header and pattern data follows.
//!
//! A slot is readable only once its header carries the magic and a length.
//! `create` erases the header sector, so an interrupted upload leaves the
//! slot empty rather than half-written.

use core::ops::Range;

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;

use poi_core::traits::{PatternSlot, PatternStore, StorageError, SLOTS_PER_BANK, SLOT_COUNT};

/// 2MB flash on the Pico W
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Program page size
pub const PAGE_SIZE: usize = 256;

/// Start of the pattern partition
pub const PATTERN_PARTITION_START: u32 = 0x15_0000;

/// Size of one pattern slot, header included
pub const SLOT_SIZE: u32 = 40 * 1024;

/// Largest pattern a slot can hold
pub const SLOT_CAPACITY: u32 = SLOT_SIZE - PAGE_SIZE as u32;

/// Flash range for the pattern partition
pub const PATTERN_RANGE: Range<u32> =
    PATTERN_PARTITION_START..PATTERN_PARTITION_START + SLOT_SIZE * SLOT_COUNT as u32;

/// "POI1", little endian
const SLOT_MAGIC: u32 = 0x3149_4F50;

const ERASED_WORD: u32 = 0xFFFF_FFFF;

pub(crate) type RpFlash<'d> = Flash<'d, FLASH, Async, FLASH_SIZE>;

fn slot_base(slot: PatternSlot) -> u32 {
    PATTERN_PARTITION_START + slot.index() as u32 * SLOT_SIZE
}

fn slot_at(index: usize) -> PatternSlot {
    let per_bank = SLOTS_PER_BANK as usize;
    PatternSlot {
        bank: (index / per_bank) as u8,
        slot: (index % per_bank) as u8,
    }
}

/// Decode a slot header into the pattern length
fn decode_header(header: &[u8; 8]) -> Result<u32, StorageError> {
    let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    match magic {
        ERASED_WORD => Err(StorageError::NotFound),
        SLOT_MAGIC if len <= SLOT_CAPACITY => Ok(len),
        _ => Err(StorageError::Corrupted),
    }
}

/// An open write session
///
/// Bytes collect in `page` and are programmed one full page at a time.
/// Sectors are erased lazily as the write cursor reaches them.
struct Session {
    slot: PatternSlot,
    /// Bytes already programmed
    flushed: u32,
    /// First address past the erased region
    erased_to: u32,
    page: [u8; PAGE_SIZE],
    fill: usize,
}

impl Session {
    fn new(slot: PatternSlot) -> Self {
        Self {
            slot,
            flushed: 0,
            erased_to: slot_base(slot) + ERASE_SIZE as u32,
            page: [0xFF; PAGE_SIZE],
            fill: 0,
        }
    }

    fn len(&self) -> u32 {
        self.flushed + self.fill as u32
    }

    async fn flush(&mut self, flash: &mut RpFlash<'_>) -> Result<(), StorageError> {
        if self.fill == 0 {
            return Ok(());
        }

        let addr = slot_base(self.slot) + PAGE_SIZE as u32 + self.flushed;
        let end = addr + PAGE_SIZE as u32;
        while self.erased_to < end {
            flash
                .erase(self.erased_to, self.erased_to + ERASE_SIZE as u32)
                .await
                .map_err(|_| StorageError::Flash)?;
            self.erased_to += ERASE_SIZE as u32;
        }

        self.page[self.fill..].fill(0xFF);
        flash
            .write(addr, &self.page)
            .await
            .map_err(|_| StorageError::Flash)?;

        self.flushed += self.fill as u32;
        self.fill = 0;
        Ok(())
    }
}

/// Pico W flash: pattern slots plus the settings partition
///
/// One instance owns the flash peripheral; the firmware shares it behind an
/// async mutex.
pub struct PoiFlash<'d> {
    pub(crate) flash: RpFlash<'d>,
    session: Option<Session>,
}

impl<'d> PoiFlash<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
            session: None,
        }
    }

    fn read_header(&mut self, slot: PatternSlot) -> Result<u32, StorageError> {
        let mut header = [0u8; 8];
        self.flash
            .blocking_read(slot_base(slot), &mut header)
            .map_err(|_| StorageError::Flash)?;
        decode_header(&header)
    }

    async fn erase_header(&mut self, slot: PatternSlot) -> Result<(), StorageError> {
        let base = slot_base(slot);
        self.flash
            .erase(base, base + ERASE_SIZE as u32)
            .await
            .map_err(|_| StorageError::Flash)
    }
}

impl PatternStore for PoiFlash<'_> {
    async fn remove(&mut self, slot: PatternSlot) -> Result<(), StorageError> {
        if self.session.as_ref().is_some_and(|s| s.slot == slot) {
            self.session = None;
        }
        match self.read_header(slot) {
            Err(StorageError::NotFound) => return Err(StorageError::NotFound),
            Err(StorageError::Flash) => return Err(StorageError::Flash),
            _ => {}
        }
        self.erase_header(slot).await
    }

    async fn create(&mut self, slot: PatternSlot) -> Result<(), StorageError> {
        self.session = None;
        self.erase_header(slot).await?;
        self.session = Some(Session::new(slot));
        #[cfg(feature = "defmt")]
        defmt::debug!("Pattern slot {} open", slot);
        Ok(())
    }

    async fn append(&mut self, mut data: &[u8]) -> Result<(), StorageError> {
        let session = self.session.as_mut().ok_or(StorageError::NotOpen)?;
        if session.len() + data.len() as u32 > SLOT_CAPACITY {
            return Err(StorageError::Full);
        }

        while !data.is_empty() {
            let take = (PAGE_SIZE - session.fill).min(data.len());
            session.page[session.fill..session.fill + take].copy_from_slice(&data[..take]);
            session.fill += take;
            data = &data[take..];

            if session.fill == PAGE_SIZE {
                session.flush(&mut self.flash).await?;
            }
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<u32, StorageError> {
        let mut session = self.session.take().ok_or(StorageError::NotOpen)?;
        session.flush(&mut self.flash).await?;

        let len = session.flushed;
        let mut header = [0xFFu8; PAGE_SIZE];
        header[..4].copy_from_slice(&SLOT_MAGIC.to_le_bytes());
        header[4..8].copy_from_slice(&len.to_le_bytes());
        self.flash
            .write(slot_base(session.slot), &header)
            .await
            .map_err(|_| StorageError::Flash)?;

        #[cfg(feature = "defmt")]
        defmt::info!("Pattern slot {} committed: {} bytes", session.slot, len);
        Ok(len)
    }

    async fn abort(&mut self) {
        // The header sector was erased on create, so the slot reads as empty
        self.session = None;
    }

    async fn len(&mut self, slot: PatternSlot) -> Result<u32, StorageError> {
        self.read_header(slot)
    }

    async fn read_at(
        &mut self,
        slot: PatternSlot,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<usize, StorageError> {
        let len = self.read_header(slot)?;
        if offset >= len {
            return Err(StorageError::OutOfRange);
        }

        let count = buffer.len().min((len - offset) as usize);
        self.flash
            .blocking_read(slot_base(slot) + PAGE_SIZE as u32 + offset, &mut buffer[..count])
            .map_err(|_| StorageError::Flash)?;
        Ok(count)
    }

    async fn free_bytes(&mut self) -> u32 {
        (0..SLOT_COUNT)
            .map(|index| match self.read_header(slot_at(index)) {
                Ok(len) => SLOT_CAPACITY - len,
                Err(_) => SLOT_CAPACITY,
            })
            .sum()
    }
}
