//! Zero-copy access to a sprite table held in memory.
use crate::{
    consts::*,
    table::{TableHeader, TileRecord},
};
use snafu::{ensure, Snafu};

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(module)]
pub enum ReadError {
    UnexpectedEof,
    #[snafu(display("Unsupported sprite table version {version}"))]
    UnsupportedVersion { version: u32 },
    #[snafu(display("Header says {expected} bytes, but {actual} bytes were given"))]
    SizeMismatch { expected: u32, actual: usize },
    #[snafu(display("Record {index} points outside of the payload area"))]
    PayloadOutOfBounds { index: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct SpriteTable<'a> {
    header: TableHeader,
    records: &'a [u8],
    payload: &'a [u8],
}

impl<'a> SpriteTable<'a> {
    /// Validates the header and every record against `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self, ReadError> {
        ensure!(data.len() >= HEADER_SIZE, read_error::UnexpectedEofSnafu);

        let (header, rest) = data.split_at(HEADER_SIZE);
        let mut header_bytes = [0; HEADER_SIZE];
        header_bytes.copy_from_slice(header);
        let header = TableHeader::from_bytes(&header_bytes);

        ensure!(
            header.version == SPRITE_TABLE_VERSION,
            read_error::UnsupportedVersionSnafu {
                version: header.version
            }
        );
        ensure!(
            header.file_size as usize == data.len(),
            read_error::SizeMismatchSnafu {
                expected: header.file_size,
                actual: data.len()
            }
        );

        let table_len = (header.record_count as usize)
            .checked_mul(RECORD_SIZE)
            .filter(|&len| len <= rest.len());
        let Some(table_len) = table_len else {
            return Err(ReadError::UnexpectedEof);
        };
        let (records, payload) = rest.split_at(table_len);

        let table = SpriteTable {
            header,
            records,
            payload,
        };

        for (index, record) in table.records().enumerate() {
            ensure!(
                table.payload(&record).is_some(),
                read_error::PayloadOutOfBoundsSnafu { index }
            );
        }

        Ok(table)
    }

    pub fn header(&self) -> TableHeader {
        self.header
    }

    pub fn len(&self) -> usize {
        self.records.len() / RECORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<TileRecord> {
        let start = index.checked_mul(RECORD_SIZE)?;
        let end = start.checked_add(RECORD_SIZE)?;
        let bytes = self.records.get(start..end)?;

        let mut record = [0; RECORD_SIZE];
        record.copy_from_slice(bytes);
        Some(TileRecord::from_bytes(&record))
    }

    pub fn records(&self) -> impl Iterator<Item = TileRecord> + 'a {
        self.records.chunks_exact(RECORD_SIZE).map(|bytes| {
            let mut record = [0; RECORD_SIZE];
            record.copy_from_slice(bytes);
            TileRecord::from_bytes(&record)
        })
    }

    /// Looks a tile up by tileset name and 1-based local id.
    pub fn find(&self, name: &[u8], local_id: u32) -> Option<TileRecord> {
        self.records()
            .find(|record| record.local_id == local_id && record.name_bytes() == name)
    }

    /// The payload bytes a record describes, without padding.
    pub fn payload(&self, record: &TileRecord) -> Option<&'a [u8]> {
        let start = record.offset as usize;
        let end = start.checked_add(record.size as usize)?;
        self.payload.get(start..end)
    }
}
