//! Conversions at the import boundary
//!
//! Everything here is target-independent so it builds and tests natively;
//! `wasm.rs` only adds the raw calls.

use std::ffi::{c_char, c_void, CString};

use log::{LevelFilter, Record};

use crate::buffer::{Allocator, HostBuffer};
use crate::host::HttpsResponse;

/// Max level forwarded to the host console. Failure reasons log below it.
pub const CONSOLE_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Text up to the first interior NUL, as a C string
pub fn c_string(text: &str) -> CString {
    let end = text.find('\0').unwrap_or(text.len());
    CString::new(&text[..end]).unwrap_or_default()
}

/// Copy out and release the response block the host filled
///
/// # Safety
///
/// `response` must be null or a block from `allocator` holding at least
/// `response_size` bytes.
pub unsafe fn take_response(
    response: *mut c_void,
    response_size: usize,
    status_code: i32,
    allocator: Allocator,
) -> HttpsResponse {
    let buffer = HostBuffer::from_raw(response.cast(), response_size, allocator);
    HttpsResponse {
        body: buffer.map(|b| b.as_bytes().to_vec()),
        status_code,
    }
}

/// Copy out and release a host-allocated C string
///
/// # Safety
///
/// `raw` must be null or a NUL-terminated block from `allocator`.
pub unsafe fn take_string(raw: *mut c_char, allocator: Allocator) -> Option<String> {
    HostBuffer::from_c_str(raw.cast(), allocator).map(|b| b.to_string_lossy())
}

/// Line written to the host console for a log record
pub fn console_line(record: &Record<'_>) -> String {
    format!("[{}] {}: {}", record.level(), record.target(), record.args())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use std::ptr;

    fn block(bytes: &[u8]) -> *mut u8 {
        let ptr = Allocator::HOST.alloc(bytes.len());
        assert!(!ptr.is_null());
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        ptr
    }

    #[test]
    fn test_c_string_truncates_at_nul() {
        assert_eq!(c_string("test_path").as_bytes(), b"test_path");
        assert_eq!(c_string("con\0tent").as_bytes(), b"con");
        assert_eq!(c_string("").as_bytes(), b"");
    }

    #[test]
    fn test_take_response() {
        let ptr = block(b"test data");
        let response = unsafe { take_response(ptr.cast(), 9, 200, Allocator::HOST) };
        assert_eq!(response.body.as_deref(), Some(&b"test data"[..]));
        assert_eq!(response.status_code, 200);

        // size bounds the copy, not the block
        let ptr = block(b"test data");
        let response = unsafe { take_response(ptr.cast(), 4, 200, Allocator::HOST) };
        assert_eq!(response.body.as_deref(), Some(&b"test"[..]));

        let response = unsafe { take_response(ptr::null_mut(), 0, 404, Allocator::HOST) };
        assert_eq!(response.body, None);
        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn test_take_string() {
        let ptr = block(b"http://localhost:5000\0");
        let origin = unsafe { take_string(ptr.cast(), Allocator::HOST) };
        assert_eq!(origin.as_deref(), Some("http://localhost:5000"));
        assert_eq!(unsafe { take_string(ptr::null_mut(), Allocator::HOST) }, None);
    }

    #[test]
    #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
    fn test_take_string_from_libc_block() {
        let ptr = Allocator::Libc.alloc(8);
        unsafe { ptr::copy_nonoverlapping(b"Firefox\0".as_ptr(), ptr, 8) };
        let browser = unsafe { take_string(ptr.cast(), Allocator::Libc) };
        assert_eq!(browser.as_deref(), Some("Firefox"));
    }

    #[test]
    fn test_console_line_format() {
        assert_eq!(
            console_line(
                &Record::builder()
                    .level(Level::Error)
                    .target("web_utils_harness::wasm")
                    .args(format_args!("Failed to serialize {}", "report"))
                    .build()
            ),
            "[ERROR] web_utils_harness::wasm: Failed to serialize report"
        );
    }

    #[test]
    fn test_failure_reasons_stay_off_console() {
        assert!(Level::Debug > CONSOLE_LOG_LEVEL);
        assert!(Level::Warn <= CONSOLE_LOG_LEVEL);
    }
}
