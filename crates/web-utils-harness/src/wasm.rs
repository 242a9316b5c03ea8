//! wasm32 bindings: the `env` import block, the exported checks, and the
//! allocator pair the host uses for buffers it returns.

use std::cell::RefCell;
use std::ffi::{c_char, c_int, c_long, c_void};
use std::ptr;
use std::sync::Once;

use log::{Log, Metadata, Record};

use crate::buffer::Allocator;
#[cfg(not(target_os = "wasi"))]
use crate::buffer::{host_alloc, host_free};
use crate::checks::{Check, CheckStatus, Harness};
use crate::ffi::{c_string, console_line, take_response, take_string, CONSOLE_LOG_LEVEL};
use crate::host::{
    FileHandle, FileMode, HttpsRequest, HttpsResponse, WebHost, Whence, STATUS_INVALID,
};

#[link(wasm_import_module = "env")]
extern "C" {
    fn pv_console_log_wasm(ch: *const c_char);
    fn pv_assert_wasm(expr: i32, line: i32, file_name: *const c_char);
    fn pv_time_wasm() -> f64;
    fn pv_https_request_wasm(
        http_method: *const c_char,
        server_name: *const c_char,
        endpoint: *const c_char,
        header: *const c_char,
        body: *const c_char,
        timeout_msec: i32,
        response: *mut *mut c_void,
        response_size: *mut usize,
        response_code: *mut i32,
    );
    fn pv_get_browser_info(browser_info: *mut *mut c_char);
    fn pv_get_origin_info(origin_info: *mut *mut c_char);
    fn pv_file_open_wasm(f: *mut c_void, path: *const c_char, mode: *const c_char, status: *mut i32);
    fn pv_file_close_wasm(f: *mut c_void, status: *mut i32);
    fn pv_file_write_wasm(
        f: *mut c_void,
        content: *const c_void,
        size: usize,
        count: usize,
        num_write: *mut usize,
    );
    fn pv_file_read_wasm(
        f: *mut c_void,
        content: *mut c_void,
        size: usize,
        count: usize,
        num_read: *mut i32,
    );
    fn pv_file_seek_wasm(f: *mut c_void, offset: c_long, whence: c_int, status: *mut i32);
    fn pv_file_tell_wasm(f: *mut c_void, offset: *mut c_long);
    fn pv_file_remove_wasm(path: *const c_char, status: *mut i32);
}

fn host_string(fetch: unsafe extern "C" fn(*mut *mut c_char)) -> Option<String> {
    let mut raw: *mut c_char = ptr::null_mut();
    // SAFETY: the host writes a block from its `malloc`, or leaves it null
    unsafe {
        fetch(&mut raw);
        take_string(raw, Allocator::HOST)
    }
}

/// [`WebHost`] over the `env` imports
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmHost;

impl WebHost for WasmHost {
    fn console_log(&mut self, text: &str) {
        let text = c_string(text);
        unsafe { pv_console_log_wasm(text.as_ptr()) }
    }

    fn assert(&mut self, expr: bool, line: u32, file_name: &str) {
        let file_name = c_string(file_name);
        unsafe { pv_assert_wasm(i32::from(expr), line as i32, file_name.as_ptr()) }
    }

    fn time(&mut self) -> f64 {
        unsafe { pv_time_wasm() }
    }

    fn https_request(&mut self, request: &HttpsRequest<'_>) -> HttpsResponse {
        let method = c_string(request.method);
        let server_name = c_string(request.server_name);
        let endpoint = c_string(request.endpoint);
        let header = c_string(request.header);
        let body = c_string(request.body);

        let mut response: *mut c_void = ptr::null_mut();
        let mut response_size: usize = 0;
        let mut response_code: i32 = 0;
        unsafe {
            pv_https_request_wasm(
                method.as_ptr(),
                server_name.as_ptr(),
                endpoint.as_ptr(),
                header.as_ptr(),
                body.as_ptr(),
                request.timeout_ms,
                &mut response,
                &mut response_size,
                &mut response_code,
            );
        }

        // SAFETY: the host filled `response_size` bytes of a block from its `malloc`
        unsafe { take_response(response, response_size, response_code, Allocator::HOST) }
    }

    fn browser_info(&mut self) -> Option<String> {
        host_string(pv_get_browser_info)
    }

    fn origin_info(&mut self) -> Option<String> {
        host_string(pv_get_origin_info)
    }

    fn file_open(&mut self, handle: &mut FileHandle, path: &str, mode: FileMode) -> i32 {
        let path = c_string(path);
        let mode = c_string(mode.as_str());
        let mut status = STATUS_INVALID;
        unsafe { pv_file_open_wasm(handle.as_mut_ptr(), path.as_ptr(), mode.as_ptr(), &mut status) };
        status
    }

    fn file_close(&mut self, handle: &mut FileHandle) -> i32 {
        let mut status = STATUS_INVALID;
        unsafe { pv_file_close_wasm(handle.as_mut_ptr(), &mut status) };
        status
    }

    fn file_write(
        &mut self,
        handle: &mut FileHandle,
        content: &[u8],
        size: usize,
        count: usize,
    ) -> usize {
        if size.saturating_mul(count) > content.len() {
            return 0;
        }
        let mut num_write = usize::MAX;
        unsafe {
            pv_file_write_wasm(
                handle.as_mut_ptr(),
                content.as_ptr().cast(),
                size,
                count,
                &mut num_write,
            )
        };
        num_write
    }

    fn file_read(
        &mut self,
        handle: &mut FileHandle,
        content: &mut [u8],
        size: usize,
        count: usize,
    ) -> i32 {
        if size.saturating_mul(count) > content.len() {
            return STATUS_INVALID;
        }
        let mut num_read = STATUS_INVALID;
        unsafe {
            pv_file_read_wasm(
                handle.as_mut_ptr(),
                content.as_mut_ptr().cast(),
                size,
                count,
                &mut num_read,
            )
        };
        num_read
    }

    fn file_seek(&mut self, handle: &mut FileHandle, offset: i64, whence: Whence) -> i32 {
        let Ok(offset) = c_long::try_from(offset) else {
            return STATUS_INVALID;
        };
        let mut status = STATUS_INVALID;
        unsafe { pv_file_seek_wasm(handle.as_mut_ptr(), offset, whence as c_int, &mut status) };
        status
    }

    fn file_tell(&mut self, handle: &mut FileHandle) -> i64 {
        let mut offset: c_long = -1;
        unsafe { pv_file_tell_wasm(handle.as_mut_ptr(), &mut offset) };
        offset.into()
    }

    fn file_remove(&mut self, path: &str) -> i32 {
        let path = c_string(path);
        let mut status = STATUS_INVALID;
        unsafe { pv_file_remove_wasm(path.as_ptr(), &mut status) };
        status
    }
}

/// Routes `log` records to the host console
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            WasmHost.console_log(&console_line(record));
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;
static LOGGER_INIT: Once = Once::new();

fn init_logging() {
    LOGGER_INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(CONSOLE_LOG_LEVEL);
        }
    });
}

thread_local! {
    static HARNESS: RefCell<Harness<WasmHost>> = RefCell::new(Harness::new(WasmHost));
}

fn run_exported(check: Check) -> i32 {
    init_logging();
    HARNESS.with(|harness| harness.borrow_mut().run(check).into())
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_console_log() -> i32 {
    run_exported(Check::ConsoleLog)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_assert() -> i32 {
    run_exported(Check::Assert)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_time() -> i32 {
    run_exported(Check::Time)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_https_request() -> i32 {
    run_exported(Check::HttpsRequest)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_browser_info() -> i32 {
    run_exported(Check::BrowserInfo)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_origin_info() -> i32 {
    run_exported(Check::OriginInfo)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_file_open() -> i32 {
    run_exported(Check::FileOpen)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_file_write() -> i32 {
    run_exported(Check::FileWrite)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_file_tell() -> i32 {
    run_exported(Check::FileTell)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_file_seek() -> i32 {
    run_exported(Check::FileSeek)
}

#[no_mangle]
pub extern "C" fn pv_web_utils_test_file_read() -> i32 {
    run_exported(Check::FileRead)
}

#[no_mangle]
pub extern "C" fn pv_test_utils_test_file_close() -> i32 {
    run_exported(Check::FileClose)
}

#[no_mangle]
pub extern "C" fn pv_test_utils_test_remove() -> i32 {
    run_exported(Check::FileRemove)
}

/// Run the whole sequence against a fresh harness and log the JSON report
#[no_mangle]
pub extern "C" fn pv_web_utils_run_scenario() -> i32 {
    init_logging();
    let mut harness = Harness::new(WasmHost);
    let report = harness.run_scenario();
    match report.to_json() {
        Ok(json) => WasmHost.console_log(&json),
        Err(e) => log::error!("Failed to serialize scenario report: {e}"),
    }
    if report.is_success() {
        CheckStatus::Success.into()
    } else {
        CheckStatus::Failure.into()
    }
}

// wasi-libc already provides these
#[cfg(not(target_os = "wasi"))]
#[no_mangle]
pub extern "C" fn malloc(size: usize) -> *mut u8 {
    host_alloc(size)
}

/// # Safety
///
/// `ptr` must be null or come from [`malloc`].
#[cfg(not(target_os = "wasi"))]
#[no_mangle]
pub unsafe extern "C" fn free(ptr: *mut u8) {
    host_free(ptr)
}
