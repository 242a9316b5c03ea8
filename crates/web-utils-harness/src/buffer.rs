//! Guest-side allocation for buffers the host hands back
//!
//! The host allocates response and info buffers and expects the module to
//! release them. Where the module exports its own `malloc`, blocks carry
//! their size in a header so they can be freed from the pointer alone. On
//! wasi the C runtime owns `malloc`, and blocks go back through libc `free`.

use std::alloc::{self, Layout};
use std::ffi::CStr;
use std::ptr::{self, NonNull};

const HEADER: usize = 16;
const ALIGN: usize = 16;

fn layout_for(size: usize) -> Option<Layout> {
    let total = size.checked_add(HEADER)?;
    Layout::from_size_align(total, ALIGN).ok()
}

/// Allocate `size` bytes. Returns null on overflow or allocation failure.
pub fn host_alloc(size: usize) -> *mut u8 {
    let Some(layout) = layout_for(size) else {
        return ptr::null_mut();
    };
    // SAFETY: layout has a nonzero size because of the header
    unsafe {
        let base = alloc::alloc(layout);
        if base.is_null() {
            return ptr::null_mut();
        }
        base.cast::<usize>().write(size);
        base.add(HEADER)
    }
}

/// Release a block from [`host_alloc`]. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by [`host_alloc`] that has not
/// been freed yet.
pub unsafe fn host_free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let base = ptr.sub(HEADER);
    let size = base.cast::<usize>().read();
    if let Some(layout) = layout_for(size) {
        alloc::dealloc(base, layout);
    }
}

/// Where a host-filled block was allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocator {
    /// The module's exported `malloc` ([`host_alloc`])
    Module,
    /// The C runtime's `malloc`
    #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
    Libc,
}

impl Allocator {
    /// Allocator behind the `malloc` the host calls
    #[cfg(target_os = "wasi")]
    pub const HOST: Allocator = Allocator::Libc;
    #[cfg(not(target_os = "wasi"))]
    pub const HOST: Allocator = Allocator::Module;

    pub fn alloc(self, size: usize) -> *mut u8 {
        match self {
            Allocator::Module => host_alloc(size),
            #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
            Allocator::Libc => unsafe { libc::malloc(size).cast() },
        }
    }

    /// # Safety
    ///
    /// `ptr` must be null or a live block from this allocator.
    pub unsafe fn release(self, ptr: *mut u8) {
        match self {
            Allocator::Module => host_free(ptr),
            #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
            Allocator::Libc => libc::free(ptr.cast()),
        }
    }
}

/// Owning guard over a host-filled block; releases it on drop.
#[derive(Debug)]
pub struct HostBuffer {
    ptr: NonNull<u8>,
    len: usize,
    allocator: Allocator,
}

impl HostBuffer {
    /// Take ownership of `len` bytes at `ptr`. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a block from `allocator` with at least `len`
    /// initialised bytes, and nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize, allocator: Allocator) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            len,
            allocator,
        })
    }

    /// Take ownership of a NUL-terminated string at `ptr`.
    ///
    /// # Safety
    ///
    /// Same as [`HostBuffer::from_raw`], and the bytes must be NUL-terminated.
    pub unsafe fn from_c_str(ptr: *mut u8, allocator: Allocator) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        let len = CStr::from_ptr(ptr.as_ptr().cast()).to_bytes().len();
        Some(Self {
            ptr,
            len,
            allocator,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: guaranteed by the constructors
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        // SAFETY: the buffer owns the block
        unsafe { self.allocator.release(self.ptr.as_ptr()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(allocator: Allocator, bytes: &[u8]) -> *mut u8 {
        let ptr = allocator.alloc(bytes.len());
        assert!(!ptr.is_null());
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        ptr
    }

    #[test]
    fn test_alloc_alignment_and_free() {
        for size in [0, 1, 7, 64, 4096] {
            let ptr = host_alloc(size);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % ALIGN, 0);
            unsafe { host_free(ptr) };
        }
        unsafe { host_free(ptr::null_mut()) };
    }

    #[test]
    fn test_alloc_overflow_is_null() {
        assert!(host_alloc(usize::MAX).is_null());
    }

    #[test]
    fn test_buffer_from_raw() {
        let ptr = filled(Allocator::Module, b"test data");
        let buffer = unsafe { HostBuffer::from_raw(ptr, 9, Allocator::Module) }.unwrap();
        assert_eq!(buffer.as_bytes(), b"test data");
        assert!(unsafe { HostBuffer::from_raw(ptr::null_mut(), 3, Allocator::Module) }.is_none());
    }

    #[test]
    fn test_buffer_from_c_str() {
        let ptr = filled(Allocator::Module, b"http://localhost\0");
        let buffer = unsafe { HostBuffer::from_c_str(ptr, Allocator::Module) }.unwrap();
        assert_eq!(buffer.to_string_lossy(), "http://localhost");

        let ptr = filled(Allocator::Module, b"\0");
        let empty = unsafe { HostBuffer::from_c_str(ptr, Allocator::Module) }.unwrap();
        assert!(empty.as_bytes().is_empty());
    }

    #[test]
    #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
    fn test_libc_blocks_released_through_libc() {
        let ptr = filled(Allocator::Libc, b"Firefox\0");
        let buffer = unsafe { HostBuffer::from_c_str(ptr, Allocator::Libc) }.unwrap();
        assert_eq!(buffer.to_string_lossy(), "Firefox");
        drop(buffer);

        let ptr = filled(Allocator::Libc, b"test data");
        let buffer = unsafe { HostBuffer::from_raw(ptr, 9, Allocator::Libc) }.unwrap();
        assert_eq!(buffer.as_bytes(), b"test data");
    }

    #[test]
    #[cfg(not(target_os = "wasi"))]
    fn test_host_allocator_is_exported_malloc() {
        assert_eq!(Allocator::HOST, Allocator::Module);
    }

    #[test]
    #[cfg(target_os = "wasi")]
    fn test_host_allocator_is_wasi_libc() {
        assert_eq!(Allocator::HOST, Allocator::Libc);
    }
}
