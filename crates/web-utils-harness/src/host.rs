//! Host capability interface
//!
//! Everything the harness needs from its embedding environment goes through
//! [`WebHost`]. The wasm32 build binds it to the `env` imports, tests bind it
//! to [`crate::mock::MockHost`]. Integer statuses and sentinels are kept
//! exactly as the host reports them.

use std::ffi::c_void;
use std::fmt;

/// Status returned by a host call that succeeded
pub const STATUS_OK: i32 = 0;

/// Sentinel returned for an invalid file operation (read after close, open of
/// a missing path)
pub const STATUS_INVALID: i32 = -1;

/// Opaque, pointer-sized slot that the host writes its file identifier into.
///
/// The slot lives on the heap so its address stays fixed for as long as the
/// handle is alive, which is what the host holds on to between calls.
pub struct FileHandle {
    slot: Box<usize>,
}

impl FileHandle {
    pub fn new() -> Self {
        Self { slot: Box::new(0) }
    }

    /// Identifier last written by the host
    pub fn raw(&self) -> usize {
        *self.slot
    }

    pub fn set_raw(&mut self, id: usize) {
        *self.slot = id;
    }

    /// Address handed to the host as the `void *f` argument
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        (&mut *self.slot as *mut usize).cast()
    }
}

impl Default for FileHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle").field("raw", &self.raw()).finish()
    }
}

/// stdio-style open mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
    Append,
    ReadUpdate,
    WriteUpdate,
    AppendUpdate,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Read => "r",
            FileMode::Write => "w",
            FileMode::Append => "a",
            FileMode::ReadUpdate => "r+",
            FileMode::WriteUpdate => "w+",
            FileMode::AppendUpdate => "a+",
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, FileMode::Read)
    }

    /// Whether opening requires the path to exist already
    pub fn requires_existing(&self) -> bool {
        matches!(self, FileMode::Read | FileMode::ReadUpdate)
    }

    pub fn truncates(&self) -> bool {
        matches!(self, FileMode::Write | FileMode::WriteUpdate)
    }

    pub fn appends(&self) -> bool {
        matches!(self, FileMode::Append | FileMode::AppendUpdate)
    }
}

/// Seek origin, with the C `SEEK_*` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    Start = 0,
    Current = 1,
    End = 2,
}

/// Outgoing HTTPS request
#[derive(Debug, Clone, Copy)]
pub struct HttpsRequest<'a> {
    pub method: &'a str,
    pub server_name: &'a str,
    pub endpoint: &'a str,
    pub header: &'a str,
    pub body: &'a str,
    pub timeout_ms: i32,
}

/// Response as reported by the host. `body` is `None` when the host left the
/// response buffer null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsResponse {
    pub body: Option<Vec<u8>>,
    pub status_code: i32,
}

/// The import surface the harness consumes.
pub trait WebHost {
    /// Fire-and-forget diagnostic output
    fn console_log(&mut self, text: &str);

    /// Host-side assertion with source location
    fn assert(&mut self, expr: bool, line: u32, file_name: &str);

    /// Host clock, in seconds
    fn time(&mut self) -> f64;

    /// Synchronous request; cancellation is entirely up to the host via
    /// `timeout_ms`
    fn https_request(&mut self, request: &HttpsRequest<'_>) -> HttpsResponse;

    /// Host-allocated browser description, already released on the host side
    /// by the time it is returned
    fn browser_info(&mut self) -> Option<String>;

    fn origin_info(&mut self) -> Option<String>;

    /// Returns [`STATUS_OK`] or a nonzero error status
    fn file_open(&mut self, handle: &mut FileHandle, path: &str, mode: FileMode) -> i32;

    fn file_close(&mut self, handle: &mut FileHandle) -> i32;

    /// Returns the number of elements written
    fn file_write(&mut self, handle: &mut FileHandle, content: &[u8], size: usize, count: usize)
        -> usize;

    /// Returns the number of elements read, or [`STATUS_INVALID`] when the
    /// handle is not open
    fn file_read(
        &mut self,
        handle: &mut FileHandle,
        content: &mut [u8],
        size: usize,
        count: usize,
    ) -> i32;

    fn file_seek(&mut self, handle: &mut FileHandle, offset: i64, whence: Whence) -> i32;

    fn file_tell(&mut self, handle: &mut FileHandle) -> i64;

    fn file_remove(&mut self, path: &str) -> i32;
}
