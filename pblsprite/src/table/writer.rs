use crate::{
    consts::*,
    table::{encode_name, padding_for, TableHeader, TileRecord},
};
use alloc::vec::Vec;
use snafu::{ensure, Snafu};

#[cfg(feature = "std")]
mod std_api;
#[cfg(feature = "std")]
pub use std_api::*;

#[derive(Debug, Snafu)]
pub enum PackError {
    #[snafu(display("The sprite table has already been written"))]
    FinalizedPackerMutation,
    #[snafu(display("Sprite table grew past 4 GiB ({size} bytes)"))]
    PayloadTooLarge { size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerState {
    Empty,
    Accumulating,
    Finalized,
}

/// Collects tile payloads and their records, then writes them out as one container.
#[derive(Debug, Clone)]
pub struct SpriteTableWriter {
    records: Vec<TileRecord>,
    payload: Vec<u8>,
    finalized: bool,
}

impl SpriteTableWriter {
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            payload: Vec::new(),
            finalized: false,
        }
    }

    pub fn state(&self) -> PackerState {
        if self.finalized {
            PackerState::Finalized
        } else if self.records.is_empty() {
            PackerState::Empty
        } else {
            PackerState::Accumulating
        }
    }

    pub fn records(&self) -> &[TileRecord] {
        &self.records
    }

    /// Concatenated payloads including their padding.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of the container as it would be written now.
    pub fn file_size(&self) -> usize {
        HEADER_SIZE + RECORD_SIZE * self.records.len() + self.payload.len()
    }

    /// Appends a payload and records where it lives.
    pub fn add_entry(
        &mut self,
        name: &str,
        local_id: u32,
        bytes: &[u8],
    ) -> Result<TileRecord, PackError> {
        ensure!(!self.finalized, FinalizedPackerMutationSnafu);

        let padding = padding_for(bytes.len());
        let end = self.payload.len() + bytes.len() + padding;
        let total = end + HEADER_SIZE + RECORD_SIZE * (self.records.len() + 1);
        ensure!(
            u32::try_from(total).is_ok(),
            PayloadTooLargeSnafu { size: total }
        );

        let record = TileRecord {
            name: encode_name(name),
            local_id,
            offset: self.payload.len() as u32,
            size: bytes.len() as u32,
        };

        self.payload.extend_from_slice(bytes);
        self.payload.resize(end, 0);
        self.records.push(record);

        log::debug!(
            "record {}: `{name}` #{local_id} at {} ({} bytes + {padding} padding)",
            self.records.len() - 1,
            record.offset,
            record.size
        );

        Ok(record)
    }

    /// Header describing the current contents.
    pub fn header(&self) -> TableHeader {
        TableHeader {
            version: SPRITE_TABLE_VERSION,
            file_size: self.file_size() as u32,
            record_count: self.records.len() as u32,
            reserved: 0,
        }
    }

    /// Serializes the container and closes the writer for further entries.
    pub fn finalize_to_vec(&mut self, w: &mut Vec<u8>) -> Result<(), PackError> {
        ensure!(!self.finalized, FinalizedPackerMutationSnafu);

        w.reserve(self.file_size());
        w.extend_from_slice(&self.header().to_bytes());
        for record in &self.records {
            w.extend_from_slice(&record.to_bytes());
        }
        w.extend_from_slice(&self.payload);

        self.finalized = true;
        Ok(())
    }
}

impl Default for SpriteTableWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::reader::SpriteTable;

    #[test]
    fn offsets_follow_padding() {
        let mut table = SpriteTableWriter::new();
        assert_eq!(table.state(), PackerState::Empty);

        let first = table.add_entry("tiles", 1, &[0xAA; 10]).unwrap();
        assert_eq!(table.state(), PackerState::Accumulating);
        let second = table.add_entry("tiles", 2, &[0xBB; 17]).unwrap();
        let third = table.add_entry("tiles", 3, &[0xCC; 16]).unwrap();

        assert_eq!((first.offset, first.size), (0, 10));
        assert_eq!((second.offset, second.size), (16, 17));
        assert_eq!((third.offset, third.size), (48, 16));
        assert_eq!(table.payload().len(), 80);
        assert_eq!(&table.payload()[10..16], &[0; 6]);
        assert_eq!(&table.payload()[64..80], &[0; 16]);
        assert_eq!(table.file_size(), 16 + 3 * 32 + 80);
    }

    #[test]
    fn alignment_gaps() {
        let mut table = SpriteTableWriter::new();
        for (i, len) in [1usize, 15, 16, 31, 32, 33, 0, 100].into_iter().enumerate() {
            table.add_entry("gap", i as u32 + 1, &vec![1; len]).unwrap();
        }

        for pair in table.records().windows(2) {
            let gap = pair[1].offset - pair[0].offset;
            assert_eq!(gap % 16, 0);
            let padding = gap - pair[0].size;
            assert!((1..=16).contains(&padding));
        }
    }

    #[test]
    fn container_bytes() {
        let mut table = SpriteTableWriter::new();
        table.add_entry("a", 1, &[1, 2, 3]).unwrap();
        table.add_entry("b", 1, &[4; 16]).unwrap();

        let mut out = Vec::new();
        table.finalize_to_vec(&mut out).unwrap();
        assert_eq!(out.len(), 16 + 64 + 16 + 32);
        assert_eq!(&out[..4], &[1, 0, 0, 0]);
        assert_eq!(&out[4..8], &(out.len() as u32).to_le_bytes());
        assert_eq!(&out[8..12], &[2, 0, 0, 0]);
        assert_eq!(&out[12..16], &[0; 4]);
        assert_eq!(out[16], b'a');
        assert_eq!(out[48], b'b');
        assert_eq!(&out[80..83], &[1, 2, 3]);
        assert_eq!(&out[96..112], &[4; 16]);

        let parsed = SpriteTable::parse(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.payload(&parsed.record(1).unwrap()), Some(&[4; 16][..]));
    }

    #[test]
    fn no_entries_after_finalize() {
        let mut table = SpriteTableWriter::new();
        table.add_entry("a", 1, &[1]).unwrap();
        table.finalize_to_vec(&mut Vec::new()).unwrap();
        assert_eq!(table.state(), PackerState::Finalized);

        assert!(matches!(
            table.add_entry("a", 2, &[1]),
            Err(PackError::FinalizedPackerMutation)
        ));
        assert!(matches!(
            table.finalize_to_vec(&mut Vec::new()),
            Err(PackError::FinalizedPackerMutation)
        ));
        assert_eq!(table.records().len(), 1);
    }

    #[test]
    fn empty_table() {
        let mut table = SpriteTableWriter::new();
        let mut out = Vec::new();
        table.finalize_to_vec(&mut out).unwrap();
        assert_eq!(out, [1, 0, 0, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
