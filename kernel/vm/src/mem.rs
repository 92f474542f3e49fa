//! Byte addressable guest memory
//!
//! Guest memory is split into pages of [`PAGE_SIZE`] bytes.
//! Every page is either unmapped or mapped with a set of [`PageFlags`] and every access is checked against them.
use crate::excep::Exception;
use alloc::boxed::Box;
use alloc::vec::Vec;
use bitflags::bitflags;
use regs::{Page, PAGE_SIZE};

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
    pub struct PageFlags: u8 {
        /// The page can be read from.
        const READ = 0b01;
        /// The page can be written to.
        const WRITE = 0b10;
        const RW = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Byte granular access to guest physical memory.
///
/// Every access may fault.
/// The call gate only ever talks to guest memory through this trait, so hosts can plug in their own memory model.
pub trait PhysicalMemory {
    fn read_byte(&self, addr: u32) -> Result<u8, Exception>;
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Exception>;
}

/// Compute `base + index` as a guest address.
///
/// Addresses do not wrap around the end of the address space; doing so is a fault.
#[inline]
pub fn offset_addr(base: u32, index: usize) -> Result<u32, Exception> {
    u32::try_from(index)
        .ok()
        .and_then(|index| base.checked_add(index))
        .ok_or(Exception::OutOfRange { addr: base })
}

struct MappedPage {
    flags: PageFlags,
    page: Box<Page>,
}

/// Paged guest physical memory
pub struct PhysMemory {
    pages: Vec<Option<MappedPage>>,
}

impl PhysMemory {
    /// Create a memory of `npages` pages which are all mapped readable and writable.
    pub fn new(npages: usize) -> Self {
        assert!(
            npages.saturating_mul(PAGE_SIZE) <= u32::MAX as usize + 1,
            "guest memory cannot be larger than the 32-bit address space"
        );
        let pages = (0..npages)
            .map(|_| {
                Some(MappedPage {
                    flags: PageFlags::RW,
                    page: Box::new(Page::new()),
                })
            })
            .collect();
        Self { pages }
    }

    /// Total number of pages, mapped or not
    pub fn npages(&self) -> usize {
        self.pages.len()
    }

    /// Map the page with number `page_no` using the given flags.
    ///
    /// Mapping an already mapped page only updates its flags and keeps its content.
    /// A newly mapped page is zeroed.
    pub fn map(&mut self, page_no: usize, flags: PageFlags) {
        let slot = &mut self.pages[page_no];
        match slot {
            Some(mapped) => mapped.flags = flags,
            None => {
                *slot = Some(MappedPage {
                    flags,
                    page: Box::new(Page::new()),
                })
            }
        }
    }

    /// Remove the page with number `page_no` from guest memory, discarding its content
    pub fn unmap(&mut self, page_no: usize) {
        self.pages[page_no] = None;
    }

    pub fn flags(&self, page_no: usize) -> Option<PageFlags> {
        self.pages
            .get(page_no)
            .and_then(Option::as_ref)
            .map(|mapped| mapped.flags)
    }

    fn lookup(&self, addr: u32, required: PageFlags) -> Result<(&MappedPage, usize), Exception> {
        let page_no = addr as usize / PAGE_SIZE;
        let mapped = self
            .pages
            .get(page_no)
            .and_then(Option::as_ref)
            .ok_or(Exception::OutOfRange { addr })?;
        if !mapped.flags.contains(required) {
            return Err(Exception::Protection { addr });
        }
        Ok((mapped, addr as usize % PAGE_SIZE))
    }

    fn lookup_mut(
        &mut self,
        addr: u32,
        required: PageFlags,
    ) -> Result<(&mut MappedPage, usize), Exception> {
        let page_no = addr as usize / PAGE_SIZE;
        let mapped = self
            .pages
            .get_mut(page_no)
            .and_then(Option::as_mut)
            .ok_or(Exception::OutOfRange { addr })?;
        if !mapped.flags.contains(required) {
            return Err(Exception::Protection { addr });
        }
        Ok((mapped, addr as usize % PAGE_SIZE))
    }

    /// Read a little-endian word. The word may cross a page boundary.
    pub fn read_word(&self, addr: u32) -> Result<u32, Exception> {
        let mut raw = [0u8; 4];
        self.read_bytes(addr, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    pub fn write_word(&mut self, addr: u32, value: u32) -> Result<(), Exception> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    /// Fill `buf` with the bytes starting at `addr`.
    pub fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> Result<(), Exception> {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_byte(offset_addr(addr, i)?)?;
        }
        Ok(())
    }

    /// Write `data` starting at `addr`.
    ///
    /// Bytes are written one after another. When a fault occurs, all bytes before the faulting one have already been
    /// written.
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), Exception> {
        for (i, byte) in data.iter().enumerate() {
            self.write_byte(offset_addr(addr, i)?, *byte)?;
        }
        Ok(())
    }
}

impl PhysicalMemory for PhysMemory {
    fn read_byte(&self, addr: u32) -> Result<u8, Exception> {
        let (mapped, offset) = self.lookup(addr, PageFlags::READ)?;
        Ok(mapped.page.read_byte(offset))
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Exception> {
        let (mapped, offset) = self.lookup_mut(addr, PageFlags::WRITE)?;
        mapped.page.write_byte(offset, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back_written_bytes() {
        let mut mem = PhysMemory::new(2);
        mem.write_bytes(0x0ffe, b"abcd").unwrap();
        let mut buf = [0u8; 4];
        mem.read_bytes(0x0ffe, &mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn words_are_little_endian() {
        let mut mem = PhysMemory::new(1);
        mem.write_word(0x10, 0x0102_0304).unwrap();
        assert_eq!(mem.read_byte(0x10), Ok(0x04));
        assert_eq!(mem.read_word(0x10), Ok(0x0102_0304));
    }

    #[test]
    fn access_beyond_memory_faults() {
        let mut mem = PhysMemory::new(1);
        let addr = PAGE_SIZE as u32;
        assert_eq!(mem.read_byte(addr), Err(Exception::OutOfRange { addr }));
        assert_eq!(mem.write_byte(addr, 1), Err(Exception::OutOfRange { addr }));
    }

    #[test]
    fn unmapped_page_faults() {
        let mut mem = PhysMemory::new(3);
        mem.unmap(1);
        assert_eq!(mem.flags(1), None);
        assert_eq!(
            mem.read_byte(0x1004),
            Err(Exception::OutOfRange { addr: 0x1004 })
        );
        assert!(mem.read_byte(0x2004).is_ok());
    }

    #[test]
    fn read_only_page_rejects_writes() {
        let mut mem = PhysMemory::new(1);
        mem.write_byte(0x20, 9).unwrap();
        mem.map(0, PageFlags::READ);
        assert_eq!(mem.write_byte(0x20, 1), Err(Exception::Protection { addr: 0x20 }));
        assert_eq!(mem.read_byte(0x20), Ok(9));
    }

    #[test]
    fn partial_write_before_fault() {
        let mut mem = PhysMemory::new(1);
        let start = PAGE_SIZE as u32 - 2;
        assert_eq!(
            mem.write_bytes(start, b"xyz"),
            Err(Exception::OutOfRange {
                addr: PAGE_SIZE as u32
            })
        );
        assert_eq!(mem.read_byte(start), Ok(b'x'));
        assert_eq!(mem.read_byte(start + 1), Ok(b'y'));
    }

    #[test]
    fn address_overflow_faults() {
        assert_eq!(
            offset_addr(u32::MAX, 1),
            Err(Exception::OutOfRange { addr: u32::MAX })
        );
        assert_eq!(offset_addr(0x10, 2), Ok(0x12));
    }
}
