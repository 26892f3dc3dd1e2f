//! Pattern file playback
//!
//! A pattern file is a 3-byte header followed by columns:
//! ```text
//! ┌──────┬─────────┬───────────────────┬───────────────────┬────
//! │ ROWS │ WIDTH   │ COLUMN 0          │ COLUMN 1          │ ...
//! │ 1B   │ 2B BE   │ ROWS × 3B         │ ROWS × 3B         │
//! └──────┴─────────┴───────────────────┴───────────────────┴────
//! ```
//! Playback reads one column per step and loops back to offset 3 at the end.
//! Files taller than [`MAX_ROWS`] play their first `MAX_ROWS` pixels of each
//! column; the rest is skipped.

use poi_protocol::frame::MAX_ROWS;
use poi_protocol::BYTES_PER_PIXEL;

use crate::traits::{PatternSlot, PatternStore, StorageError};

/// Pattern file header length
pub const PATTERN_HEADER_LEN: u32 = 3;

/// Largest column a pattern may declare
pub const MAX_COLUMN_LEN: usize = MAX_ROWS as usize * BYTES_PER_PIXEL;

/// Errors loading a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayerError {
    /// Header declares zero rows
    BadHeader,
    /// File holds no complete column
    Truncated,
    Storage(StorageError),
}

impl From<StorageError> for PlayerError {
    fn from(e: StorageError) -> Self {
        PlayerError::Storage(e)
    }
}

/// Header of a loaded pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternInfo {
    /// Rows drawn per column, capped at [`MAX_ROWS`]
    pub rows: u8,
    /// Rows per column as stored in the file
    pub file_rows: u8,
    /// Declared column count; informational only
    pub width: u16,
    /// File length including the header
    pub len: u32,
}

impl PatternInfo {
    pub fn column_len(&self) -> usize {
        self.rows as usize * BYTES_PER_PIXEL
    }

    /// Distance between column starts in the file
    pub fn stride(&self) -> usize {
        self.file_rows as usize * BYTES_PER_PIXEL
    }
}

#[derive(Debug, Clone, Copy)]
struct Loaded {
    slot: PatternSlot,
    info: PatternInfo,
    offset: u32,
}

/// Steps through the columns of one stored pattern
#[derive(Debug, Default)]
pub struct PatternPlayer {
    loaded: Option<Loaded>,
}

impl PatternPlayer {
    pub const fn new() -> Self {
        Self { loaded: None }
    }

    /// Open `slot` and rewind to the first column
    ///
    /// On error the player is left unloaded and callers should draw the
    /// fallback pattern.
    pub async fn load<S: PatternStore>(
        &mut self,
        store: &mut S,
        slot: PatternSlot,
    ) -> Result<PatternInfo, PlayerError> {
        self.loaded = None;

        let len = store.len(slot).await?;
        let mut header = [0u8; PATTERN_HEADER_LEN as usize];
        if len < PATTERN_HEADER_LEN
            || store.read_at(slot, 0, &mut header).await? < header.len()
        {
            return Err(PlayerError::Truncated);
        }

        let file_rows = header[0];
        if file_rows == 0 {
            return Err(PlayerError::BadHeader);
        }
        let info = PatternInfo {
            rows: file_rows.min(MAX_ROWS),
            file_rows,
            width: u16::from_be_bytes([header[1], header[2]]),
            len,
        };
        if len < PATTERN_HEADER_LEN + info.stride() as u32 {
            return Err(PlayerError::Truncated);
        }

        self.loaded = Some(Loaded {
            slot,
            info,
            offset: PATTERN_HEADER_LEN,
        });
        Ok(info)
    }

    pub fn unload(&mut self) {
        self.loaded = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn info(&self) -> Option<PatternInfo> {
        self.loaded.map(|l| l.info)
    }

    /// Read the next column into `out`, returning the column bytes
    ///
    /// Returns `None` when nothing is loaded or the read failed; a failed
    /// read unloads the pattern.
    pub async fn next_column<'b, S: PatternStore>(
        &mut self,
        store: &mut S,
        out: &'b mut [u8; MAX_COLUMN_LEN],
    ) -> Option<&'b [u8]> {
        let loaded = self.loaded.as_mut()?;
        let column_len = loaded.info.column_len();
        let stride = loaded.info.stride() as u32;

        if loaded.offset + stride > loaded.info.len {
            loaded.offset = PATTERN_HEADER_LEN;
        }

        let column = &mut out[..column_len];
        match store.read_at(loaded.slot, loaded.offset, column).await {
            Ok(n) if n == column_len => {
                loaded.offset += stride;
                Some(&out[..column_len])
            }
            _ => {
                self.loaded = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::memory::MemoryStore;
    use embassy_futures::block_on;

    fn slot() -> PatternSlot {
        PatternSlot::new(1, 0).unwrap()
    }

    #[test]
    fn test_load_and_loop() {
        // 2 rows, 3 columns
        let file = [2, 0, 3, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3];
        let mut store = MemoryStore::with_pattern(slot(), &file);
        let mut player = PatternPlayer::new();
        let mut column = [0u8; MAX_COLUMN_LEN];

        block_on(async {
            let info = player.load(&mut store, slot()).await.unwrap();
            assert_eq!(info.rows, 2);
            assert_eq!(info.width, 3);

            let mut firsts = [0u8; 5];
            for first in firsts.iter_mut() {
                let col = player.next_column(&mut store, &mut column).await.unwrap();
                assert_eq!(col.len(), 6);
                *first = col[0];
            }
            assert_eq!(firsts, [1, 2, 3, 1, 2]);
        });
    }

    #[test]
    fn test_partial_trailing_column_skipped() {
        let file = [1, 0, 2, 5, 5, 5, 6, 6];
        let mut store = MemoryStore::with_pattern(slot(), &file);
        let mut player = PatternPlayer::new();
        let mut column = [0u8; MAX_COLUMN_LEN];

        block_on(async {
            player.load(&mut store, slot()).await.unwrap();
            for _ in 0..3 {
                let col = player.next_column(&mut store, &mut column).await.unwrap();
                assert_eq!(col, &[5, 5, 5]);
            }
        });
    }

    #[test]
    fn test_missing_slot() {
        let mut store = MemoryStore::new();
        let mut player = PatternPlayer::new();
        let result = block_on(player.load(&mut store, slot()));
        assert_eq!(result, Err(PlayerError::Storage(StorageError::NotFound)));
        assert!(!player.is_loaded());
    }

    #[test]
    fn test_zero_rows_rejected() {
        let mut store = MemoryStore::with_pattern(slot(), &[0, 0, 1, 1, 2, 3]);
        let mut player = PatternPlayer::new();
        let result = block_on(player.load(&mut store, slot()));
        assert_eq!(result, Err(PlayerError::BadHeader));
    }

    #[test]
    fn test_tall_pattern_is_capped() {
        // Two columns of 150 rows, each filled with its column number
        let stride = 150 * BYTES_PER_PIXEL;
        let mut file = heapless::Vec::<u8, 1024>::new();
        file.extend_from_slice(&[150, 0, 2]).unwrap();
        for value in 1..=2u8 {
            for _ in 0..stride {
                file.push(value).unwrap();
            }
        }
        let mut store = MemoryStore::with_pattern(slot(), &file);
        let mut player = PatternPlayer::new();
        let mut column = [0u8; MAX_COLUMN_LEN];

        block_on(async {
            let info = player.load(&mut store, slot()).await.unwrap();
            assert_eq!((info.rows, info.file_rows), (MAX_ROWS, 150));

            for expected in [1, 2, 1] {
                let col = player.next_column(&mut store, &mut column).await.unwrap();
                assert_eq!(col.len(), MAX_COLUMN_LEN);
                assert!(col.iter().all(|b| *b == expected));
            }
        });
    }

    #[test]
    fn test_header_only_is_truncated() {
        let mut store = MemoryStore::with_pattern(slot(), &[4, 0, 1, 9, 9]);
        let mut player = PatternPlayer::new();
        let result = block_on(player.load(&mut store, slot()));
        assert_eq!(result, Err(PlayerError::Truncated));
    }

    #[test]
    fn test_unloaded_yields_nothing() {
        let mut store = MemoryStore::new();
        let mut player = PatternPlayer::new();
        let mut column = [0u8; MAX_COLUMN_LEN];
        assert!(block_on(player.next_column(&mut store, &mut column)).is_none());
    }
}
