//! The block store: a file-backed, memory-mapped heap with a first-fit free
//! list. See spec §4.1. Every accessor re-derives its slice from the current
//! mapping on each call — none of them hold a borrow across an `allocate`,
//! since growing the file remaps and invalidates any earlier slice.

use crate::{Handle, Result, TripeError};
use memmap2::{Mmap, MmapMut};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// `T`, `r`, `i`, `p`, `e`, `0`, `0`, `1` read as a little-endian u64.
pub const MAGIC: u64 = u64::from_le_bytes(*b"Tripe001");

const HEADER_SLOTS: u64 = 16;
const HEADER_LEN: u64 = HEADER_SLOTS * 8;
const MAGIC_OFFSET: u64 = 0;
const ROOT_OFFSET: u64 = 8;
const FIRST_FREE_OFFSET: u64 = 16;

enum Mapping {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

/// Where a free-list "next" pointer lives: either the header's `FIRST_FREE`
/// slot, or the first 8 bytes of a free block's own payload.
#[derive(Clone, Copy)]
enum FreeSlot {
    Header,
    Block(Handle),
}

impl FreeSlot {
    fn offset(self) -> u64 {
        match self {
            FreeSlot::Header => FIRST_FREE_OFFSET,
            FreeSlot::Block(handle) => handle.0,
        }
    }
}

/// Owns the file and its memory map. See spec §4.1 / §5.
pub struct Store {
    file: File,
    map: Mapping,
}

fn read_only_error() -> TripeError {
    TripeError::Io(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "store was opened read-only",
    ))
}

impl Store {
    /// Opens `path`. If the file does not exist (or is empty) and `writable`
    /// is true, it is created and initialized with a zeroed 128-byte header
    /// carrying `MAGIC`. Otherwise the file must already exist and its first
    /// 8 bytes must equal `MAGIC`, or this fails with `BadMagic`.
    pub fn open<P: AsRef<Path>>(path: P, writable: bool) -> Result<Store> {
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .create(writable)
            .truncate(false)
            .open(path.as_ref())?;

        if file.metadata()?.len() == 0 {
            if !writable {
                return Err(TripeError::BadMagic);
            }
            return Self::init(file);
        }

        let map = if writable {
            Mapping::ReadWrite(unsafe { MmapMut::map_mut(&file)? })
        } else {
            Mapping::ReadOnly(unsafe { Mmap::map(&file)? })
        };
        let store = Store { file, map };
        if store.read_u64(MAGIC_OFFSET)? != MAGIC {
            return Err(TripeError::BadMagic);
        }
        Ok(store)
    }

    fn init(file: File) -> Result<Store> {
        file.set_len(HEADER_LEN)?;
        let mut map = unsafe { MmapMut::map_mut(&file)? };
        map[..8].copy_from_slice(&MAGIC.to_le_bytes());
        map[8..HEADER_LEN as usize].fill(0);
        map.flush()?;
        tracing::debug!(len = HEADER_LEN, "initialized new tripe store");
        Ok(Store {
            file,
            map: Mapping::ReadWrite(map),
        })
    }

    fn bytes(&self) -> &[u8] {
        match &self.map {
            Mapping::ReadWrite(m) => m,
            Mapping::ReadOnly(m) => m,
        }
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.map {
            Mapping::ReadWrite(m) => Ok(m),
            Mapping::ReadOnly(_) => Err(read_only_error()),
        }
    }

    fn read_u64(&self, offset: u64) -> Result<u64> {
        let offset = offset as usize;
        let slice = self
            .bytes()
            .get(offset..offset + 8)
            .ok_or_else(|| TripeError::Corrupt(format!("offset {offset} out of bounds")))?;
        Ok(u64::from_le_bytes(slice.try_into().unwrap()))
    }

    fn write_u64(&mut self, offset: u64, value: u64) -> Result<()> {
        let offset = offset as usize;
        let slice = self
            .bytes_mut()?
            .get_mut(offset..offset + 8)
            .ok_or_else(|| TripeError::Corrupt(format!("offset {offset} out of bounds")))?;
        slice.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn get_root(&self) -> Result<Handle> {
        Ok(Handle(self.read_u64(ROOT_OFFSET)?))
    }

    pub fn set_root(&mut self, handle: Handle) -> Result<()> {
        self.write_u64(ROOT_OFFSET, handle.0)
    }

    /// The size prefix belonging to `handle`, validated against I3/§7's
    /// `Corrupt` rule: a handle must sit after the header, and its declared
    /// size must be nonzero and fit within the mapped file.
    fn block_size(&self, handle: Handle) -> Result<u64> {
        if handle.is_null() || handle.0 < HEADER_LEN + 8 {
            return Err(TripeError::Corrupt(format!(
                "handle {} does not point into the block region",
                handle.0
            )));
        }
        let size = self.read_u64(handle.0 - 8)?;
        let end = handle
            .0
            .checked_add(size)
            .ok_or_else(|| TripeError::Corrupt(format!("handle {} overflows", handle.0)))?;
        if size == 0 || end > self.bytes().len() as u64 {
            return Err(TripeError::Corrupt(format!(
                "implausible size {size} at handle {}",
                handle.0
            )));
        }
        Ok(size)
    }

    fn free_next(&self, slot: FreeSlot) -> Result<Handle> {
        Ok(Handle(self.read_u64(slot.offset())?))
    }

    fn set_free_next(&mut self, slot: FreeSlot, value: Handle) -> Result<()> {
        self.write_u64(slot.offset(), value.0)
    }

    /// First-fit allocation. Deliberately skips an exact-size match (see
    /// spec §9 note 1): a free block is only reused when its payload is
    /// *strictly larger* than `size`.
    ///
    /// A reused block's size prefix is rewritten down to the requested
    /// `size` (I3: fixed-layout blocks like TrieNodes and TermInstances must
    /// have an exact size prefix, since `load_node`/`load_numbers` derive
    /// their element count from it). The slack between the old and new size
    /// is not reclaimed onto the free list — it is simply abandoned, dead
    /// space, the same way the file never compacts.
    pub fn allocate(&mut self, size: u64) -> Result<Handle> {
        let mut prev = FreeSlot::Header;
        let mut free = self.free_next(prev)?;
        loop {
            if free.is_null() {
                let handle = self.extend(size)?;
                tracing::trace!(size, handle = handle.0, "allocated by extending file");
                return Ok(handle);
            }
            let free_size = self.block_size(free)?;
            if free_size > size {
                let next = self.free_next(FreeSlot::Block(free))?;
                self.set_free_next(prev, next)?;
                self.write_u64(free.0 - 8, size)?;
                tracing::trace!(size, free_size, handle = free.0, "allocated from free list");
                return Ok(free);
            }
            prev = FreeSlot::Block(free);
            free = self.free_next(prev)?;
        }
    }

    fn extend(&mut self, size: u64) -> Result<Handle> {
        let offset = self.bytes().len() as u64;
        let new_len = offset
            .checked_add(8)
            .and_then(|v| v.checked_add(size))
            .ok_or_else(|| TripeError::Corrupt("file length would overflow".into()))?;
        self.grow_to(new_len)?;
        self.write_u64(offset, size)?;
        Ok(Handle(offset + 8))
    }

    fn grow_to(&mut self, new_len: u64) -> Result<()> {
        if matches!(self.map, Mapping::ReadOnly(_)) {
            return Err(read_only_error());
        }
        self.file.set_len(new_len)?;
        let map = unsafe { MmapMut::map_mut(&self.file)? };
        self.map = Mapping::ReadWrite(map);
        Ok(())
    }

    /// Pushes `handle` onto the head of the free list. The block's size
    /// prefix is left untouched; its payload's first 8 bytes are overwritten
    /// with the previous `FIRST_FREE` value (per §9 note 3, the rest of the
    /// payload is left with stale data).
    pub fn free(&mut self, handle: Handle) -> Result<()> {
        let first = self.free_next(FreeSlot::Header)?;
        self.set_free_next(FreeSlot::Block(handle), first)?;
        self.set_free_next(FreeSlot::Header, handle)?;
        tracing::trace!(handle = handle.0, "freed block");
        Ok(())
    }

    fn write_numbers_at(&mut self, handle: Handle, nums: &[u64]) -> Result<()> {
        let bytes = self.bytes_mut()?;
        let start = handle.0 as usize;
        for (i, n) in nums.iter().enumerate() {
            let off = start + i * 8;
            bytes[off..off + 8].copy_from_slice(&n.to_le_bytes());
        }
        Ok(())
    }

    pub fn store_numbers(&mut self, nums: &[u64]) -> Result<Handle> {
        let handle = self.allocate(8 * nums.len() as u64)?;
        self.write_numbers_at(handle, nums)?;
        Ok(handle)
    }

    pub fn load_numbers(&self, handle: Handle) -> Result<Vec<u64>> {
        let size = self.block_size(handle)?;
        if size % 8 != 0 {
            return Err(TripeError::Corrupt(format!(
                "numeric block at {} has size {size}, not a multiple of 8",
                handle.0
            )));
        }
        let start = handle.0 as usize;
        let bytes = &self.bytes()[start..start + size as usize];
        Ok(bytes
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect())
    }

    pub fn update_numbers(&mut self, handle: Handle, nums: &[u64]) -> Result<()> {
        let size = self.block_size(handle)?;
        let actual = nums.len() as u64;
        if size != 8 * actual {
            return Err(TripeError::SizeMismatch {
                expected: size / 8,
                actual,
            });
        }
        self.write_numbers_at(handle, nums)
    }

    pub fn store_text(&mut self, text: &str) -> Result<Handle> {
        let bytes = text.as_bytes();
        let handle = self.allocate(bytes.len() as u64)?;
        let map = self.bytes_mut()?;
        let start = handle.0 as usize;
        map[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(handle)
    }

    pub fn load_text(&self, handle: Handle) -> Result<String> {
        let size = self.block_size(handle)?;
        let start = handle.0 as usize;
        let bytes = &self.bytes()[start..start + size as usize];
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    /// Flushes dirty pages to disk. Best-effort: mmap's `MAP_SHARED` writes
    /// are visible to the filesystem without this, but callers that need the
    /// bytes durable before e.g. handing the path to another process should
    /// call it explicitly.
    pub fn sync(&self) -> Result<()> {
        if let Mapping::ReadWrite(m) = &self.map {
            m.flush()?;
        }
        Ok(())
    }

    /// All handles currently on the free list, head first. Test-only: used
    /// to check the free list never intersects the set reachable from the
    /// root (spec §9 P6).
    #[cfg(test)]
    pub(crate) fn free_list(&self) -> Result<Vec<Handle>> {
        let mut out = Vec::new();
        let mut cur = self.free_next(FreeSlot::Header)?;
        while !cur.is_null() {
            out.push(cur);
            cur = self.free_next(FreeSlot::Block(cur))?;
        }
        Ok(out)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Mapping::ReadWrite(m) = &self.map {
            let _ = m.flush();
        }
    }
}
