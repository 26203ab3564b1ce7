#![cfg_attr(not(test), no_std)]

use core::mem::size_of;
use pblsprite::{consts::NAME_SIZE, table::TileRecord, SpriteTable};

#[cfg(not(test))]
#[panic_handler]
fn panic_handler(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}

/// One record of a sprite table. `offset` is relative to the first byte after the record table.
#[repr(C)]
pub struct PblSpriteRecord {
    pub name: [u8; NAME_SIZE],
    pub local_id: u32,
    pub offset: u32,
    pub size: u32,
}

const _: () = {
    assert!(size_of::<PblSpriteRecord>() == pblsprite::consts::RECORD_SIZE);
};

impl From<TileRecord> for PblSpriteRecord {
    fn from(record: TileRecord) -> Self {
        Self {
            name: record.name,
            local_id: record.local_id,
            offset: record.offset,
            size: record.size,
        }
    }
}

unsafe fn parse<'a>(input: *const u8, input_len: usize) -> Option<SpriteTable<'a>> {
    if input.is_null() {
        return None;
    }
    let input = unsafe { core::slice::from_raw_parts(input, input_len) };
    SpriteTable::parse(input).ok()
}

/// Returns the number of records in the sprite table, or -1 if the table is invalid.
///
/// - `input`: Pointer to the sprite table
/// - `input_len`: Length of the sprite table, in bytes
///
/// # Safety
///
/// `input` must point to `input_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn pblsprite_record_count(input: *const u8, input_len: usize) -> isize {
    match unsafe { parse(input, input_len) } {
        Some(table) => table.len() as isize,
        None => -1,
    }
}

/// Copies record `index` into `output`.
///
/// - `input`: Pointer to the sprite table
/// - `input_len`: Length of the sprite table, in bytes
/// - `index`: 0-based record index
/// - `output`: Pointer to space for one record
///
/// Returns 0 if successful, or -1 if the table is invalid or `index` is out of range.
///
/// # Safety
///
/// `input` must point to `input_len` readable bytes, `output` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn pblsprite_get_record(
    input: *const u8,
    input_len: usize,
    index: usize,
    output: *mut PblSpriteRecord,
) -> isize {
    if output.is_null() {
        return -1;
    }
    let Some(record) = (unsafe { parse(input, input_len) }).and_then(|t| t.record(index)) else {
        return -1;
    };

    unsafe { output.write(record.into()) };
    0
}

/// Finds the tile `local_id` (1-based) of the tileset called `name`.
///
/// - `input`: Pointer to the sprite table
/// - `input_len`: Length of the sprite table, in bytes
/// - `name`: Pointer to the tileset name, not NUL-terminated
/// - `name_len`: Length of the name, in bytes. Names longer than 20 bytes are truncated.
/// - `local_id`: 1-based tile id within the tileset
/// - `output`: Pointer to space for one record
///
/// Returns the index of the record if found, or -1 otherwise.
///
/// # Safety
///
/// `input` must point to `input_len` readable bytes, `name` to `name_len` readable bytes, and
/// `output` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn pblsprite_find_tile(
    input: *const u8,
    input_len: usize,
    name: *const u8,
    name_len: usize,
    local_id: u32,
    output: *mut PblSpriteRecord,
) -> isize {
    if name.is_null() || output.is_null() {
        return -1;
    }
    let Some(table) = (unsafe { parse(input, input_len) }) else {
        return -1;
    };
    let name = unsafe { core::slice::from_raw_parts(name, name_len) };
    let name = &name[..name.len().min(NAME_SIZE)];

    match table
        .records()
        .position(|record| record.local_id == local_id && record.name_bytes() == name)
    {
        Some(index) => {
            if let Some(record) = table.record(index) {
                unsafe { output.write(record.into()) };
            }
            index as isize
        }
        None => -1,
    }
}
