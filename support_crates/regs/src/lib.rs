//! Library for modelling memory mapped register blocks that live inside host-owned pages
//!
//! A [`Page`] is a plain block of bytes owned by the host.
//! A [`PageOffset`] selects a window inside such a page and gives byte and word granular access relative to the
//! start of that window.
//! [`Reg`] describes a single typed register at a fixed offset inside a window and restricts which operations are
//! allowed on it.
//!
//! None of these accesses can fault. The page is not guest memory, so there is nothing to validate.
#![no_std]

use core::borrow::{Borrow, BorrowMut};
use core::fmt::{Debug, Formatter};
use core::marker::PhantomData;
use core::mem;

/// Size of one page in bytes
pub const PAGE_SIZE: usize = 4096;

/// Size of one register word in bytes
pub const WORD_SIZE: usize = mem::size_of::<u32>();

/// A single page of host-owned memory.
#[derive(Clone, Eq, PartialEq)]
pub struct Page {
    bytes: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new page that is filled with zeros
    pub const fn new() -> Self {
        Self {
            bytes: [0; PAGE_SIZE],
        }
    }

    #[inline(always)]
    pub fn read_byte(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    #[inline(always)]
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.bytes[offset] = value;
    }

    /// Read the little-endian word starting at `offset`
    #[inline(always)]
    pub fn read_word(&self, offset: usize) -> u32 {
        let mut raw = [0u8; WORD_SIZE];
        raw.copy_from_slice(&self.bytes[offset..offset + WORD_SIZE]);
        u32::from_le_bytes(raw)
    }

    /// Write `value` as a little-endian word starting at `offset`
    #[inline(always)]
    pub fn write_word(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + WORD_SIZE].copy_from_slice(&value.to_le_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Page {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let used = self.bytes.iter().filter(|b| **b != 0).count();
        f.debug_struct("Page")
            .field("non_zero_bytes", &used)
            .finish()
    }
}

/// A window of registers located at a byte offset inside a [`Page`].
///
/// `P` is either `&Page` for a read-only view or `&mut Page` for a view that can also be written to.
/// All offsets passed to the accessors are relative to the start of the window.
///
/// # Panics
/// Accessing bytes beyond the end of the page panics.
/// Register windows are laid out by the host so such an access is a host bug and not something a guest can cause.
pub struct PageOffset<P> {
    page: P,
    offset: usize,
}

impl<P: Borrow<Page>> PageOffset<P> {
    pub fn new(page: P, offset: usize) -> Self {
        assert!(
            offset < PAGE_SIZE,
            "register window offset {:#x} lies outside of the page",
            offset
        );
        Self { page, offset }
    }

    /// The offset of this window inside its page
    pub fn base(&self) -> usize {
        self.offset
    }

    #[inline(always)]
    pub fn read_byte(&self, off: usize) -> u8 {
        self.page.borrow().read_byte(self.offset + off)
    }

    #[inline(always)]
    pub fn read_word(&self, off: usize) -> u32 {
        self.page.borrow().read_word(self.offset + off)
    }
}

impl<P: BorrowMut<Page>> PageOffset<P> {
    #[inline(always)]
    pub fn write_byte(&mut self, off: usize, value: u8) {
        self.page.borrow_mut().write_byte(self.offset + off, value)
    }

    #[inline(always)]
    pub fn write_word(&mut self, off: usize, value: u32) {
        self.page.borrow_mut().write_word(self.offset + off, value)
    }
}

/// A value that can be stored in a register.
///
/// Multi-byte values are always stored in little-endian byte order.
pub trait RegValue: Copy {
    fn load<P: Borrow<Page>>(view: &PageOffset<P>, off: usize) -> Self;
    fn store<P: BorrowMut<Page>>(self, view: &mut PageOffset<P>, off: usize);
}

impl RegValue for u8 {
    #[inline(always)]
    fn load<P: Borrow<Page>>(view: &PageOffset<P>, off: usize) -> Self {
        view.read_byte(off)
    }

    #[inline(always)]
    fn store<P: BorrowMut<Page>>(self, view: &mut PageOffset<P>, off: usize) {
        view.write_byte(off, self)
    }
}

impl RegValue for u32 {
    #[inline(always)]
    fn load<P: Borrow<Page>>(view: &PageOffset<P>, off: usize) -> Self {
        view.read_word(off)
    }

    #[inline(always)]
    fn store<P: BorrowMut<Page>>(self, view: &mut PageOffset<P>, off: usize) {
        view.write_word(off, self)
    }
}

impl RegValue for i32 {
    #[inline(always)]
    fn load<P: Borrow<Page>>(view: &PageOffset<P>, off: usize) -> Self {
        view.read_word(off) as i32
    }

    #[inline(always)]
    fn store<P: BorrowMut<Page>>(self, view: &mut PageOffset<P>, off: usize) {
        view.write_word(off, self as u32)
    }
}

/// A register at a fixed offset inside a register window
///
/// This struct is generic over the operations it supports via `ReadOp` and `WriteOp`.
/// These should be [`ReadAllowed`] or [`ReadDenied`] for `ReadOp` and [`WriteAllowed`] or [`WriteDenied`] for `WriteOp`.
pub struct Reg<ReadOp, WriteOp, T>
where
    T: RegValue,
{
    offset: usize,
    #[allow(dead_code)]
    marker: PhantomData<(ReadOp, WriteOp, T)>,
}

/// Marker struct for configuring a [`Reg`] to allow reading from it
pub struct ReadAllowed;

/// Marker struct for configuring a [`Reg`] to deny reading from it
pub struct ReadDenied;

/// Marker struct for configuring a [`Reg`] to allow writing to it
pub struct WriteAllowed;

/// Marker struct for configuring a [`Reg`] to deny writing to it
pub struct WriteDenied;

/// A Register that allows **read and write** interactions
pub type RW<T> = Reg<ReadAllowed, WriteAllowed, T>;

/// A Register that allows **only write** interactions
pub type WO<T> = Reg<ReadDenied, WriteAllowed, T>;

/// A Register that allows **only read** interactions
pub type RO<T> = Reg<ReadAllowed, WriteDenied, T>;

impl<ReadOp, WriteOp, T: RegValue> Reg<ReadOp, WriteOp, T> {
    /// Describe a register located `offset` bytes after the start of a register window.
    #[inline(always)]
    pub const fn at(offset: usize) -> Self {
        Self {
            offset,
            marker: PhantomData,
        }
    }

    /// The offset of this register relative to its window
    #[inline(always)]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl<WP, T: RegValue> Reg<ReadAllowed, WP, T> {
    /// Read the value of this register from the given window.
    #[inline(always)]
    pub fn read<P: Borrow<Page>>(&self, view: &PageOffset<P>) -> T {
        T::load(view, self.offset)
    }
}

impl<RP, T: RegValue> Reg<RP, WriteAllowed, T> {
    /// Write a value to this register in the given window.
    #[inline(always)]
    pub fn write<P: BorrowMut<Page>>(&self, view: &mut PageOffset<P>, value: T) {
        value.store(view, self.offset)
    }
}

impl<T: RegValue> Reg<ReadAllowed, WriteAllowed, T> {
    /// Modify the value contained in the register by mapping it to another one.
    ///
    /// `f` is called with the current value and should return the new value that will be written back to the register.
    #[inline(always)]
    pub fn modify<P, F>(&self, view: &mut PageOffset<P>, f: F)
    where
        P: BorrowMut<Page>,
        F: FnOnce(T) -> T,
    {
        let value = f(self.read(view));
        self.write(view, value);
    }
}
