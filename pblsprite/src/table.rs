//! Sprite table container: record layout, the packer and the reader.
use crate::consts::*;
use byteorder::{ByteOrder, LittleEndian};

pub mod reader;

#[cfg(feature = "alloc")]
mod writer;
#[cfg(feature = "alloc")]
pub use writer::*;

/// One entry of the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRecord {
    pub name: [u8; NAME_SIZE],
    pub local_id: u32,
    /// Offset of the payload relative to the start of the payload area.
    pub offset: u32,
    /// Payload length without padding.
    pub size: u32,
}

impl TileRecord {
    /// Name bytes up to the first NUL.
    pub fn name_bytes(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
        &self.name[..len]
    }

    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(self.name_bytes()).ok()
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0; RECORD_SIZE];
        bytes[..NAME_SIZE].copy_from_slice(&self.name);
        LittleEndian::write_u32(&mut bytes[20..24], self.local_id);
        LittleEndian::write_u32(&mut bytes[24..28], self.offset);
        LittleEndian::write_u32(&mut bytes[28..32], self.size);
        bytes
    }

    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut name = [0; NAME_SIZE];
        name.copy_from_slice(&bytes[..NAME_SIZE]);

        TileRecord {
            name,
            local_id: LittleEndian::read_u32(&bytes[20..24]),
            offset: LittleEndian::read_u32(&bytes[24..28]),
            size: LittleEndian::read_u32(&bytes[28..32]),
        }
    }
}

/// Fixed-size container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableHeader {
    pub version: u32,
    pub file_size: u32,
    pub record_count: u32,
    pub reserved: u32,
}

impl TableHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0; HEADER_SIZE];
        LittleEndian::write_u32_into(
            &[self.version, self.file_size, self.record_count, self.reserved],
            &mut bytes,
        );
        bytes
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut fields = [0u32; 4];
        LittleEndian::read_u32_into(bytes, &mut fields);
        let [version, file_size, record_count, reserved] = fields;

        TableHeader {
            version,
            file_size,
            record_count,
            reserved,
        }
    }
}

/// Fills a name slot: non-ASCII characters are dropped, the rest is truncated to 20 bytes and
/// NUL-padded.
pub fn encode_name(name: &str) -> [u8; NAME_SIZE] {
    let mut slot = [0; NAME_SIZE];
    for (dst, src) in slot.iter_mut().zip(name.bytes().filter(u8::is_ascii)) {
        *dst = src;
    }
    slot
}

/// Zero bytes following a payload of `len` bytes. Always in `1..=16`.
#[inline]
pub const fn padding_for(len: usize) -> usize {
    PAYLOAD_ALIGNMENT - (len % PAYLOAD_ALIGNMENT)
}
