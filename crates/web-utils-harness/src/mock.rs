//! In-memory [`WebHost`] for native tests
//!
//! The file shim follows the web host's emulation rather than strict stdio:
//! every open handle is readable regardless of mode, `r` requires the file to
//! exist, `w` truncates or creates, `a` positions at the end. Reads on a
//! handle that is not open return the `-1` sentinel.

use std::collections::HashMap;

use crate::host::{
    FileHandle, FileMode, HttpsRequest, HttpsResponse, WebHost, Whence, STATUS_INVALID, STATUS_OK,
};

/// Scripted HTTPS reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status_code: i32,
    pub body: Option<Vec<u8>>,
}

impl MockResponse {
    pub fn new(status_code: i32, body: &[u8]) -> Self {
        Self {
            status_code,
            body: Some(body.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub server_name: String,
    pub endpoint: String,
    pub header: String,
    pub body: String,
    pub timeout_ms: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertRecord {
    pub expr: bool,
    pub line: u32,
    pub file_name: String,
}

#[derive(Debug)]
struct OpenFile {
    path: String,
    position: usize,
    writable: bool,
}

pub struct MockHost {
    pub clock: f64,
    pub response: MockResponse,
    pub browser_info: Option<String>,
    pub origin_info: Option<String>,
    /// Persistent file contents by path
    pub files: HashMap<String, Vec<u8>>,
    /// Make every open fail with `-1`
    pub fail_open: bool,
    /// Override the result of reading a handle that is not open
    pub read_after_close: Option<i32>,

    pub console: Vec<String>,
    pub assertions: Vec<AssertRecord>,
    pub requests: Vec<RecordedRequest>,

    open_files: HashMap<usize, OpenFile>,
    next_id: usize,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            clock: 1_700_000_000.0,
            response: MockResponse::new(200, b"test data"),
            browser_info: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".to_string()),
            origin_info: Some("http://localhost:5000".to_string()),
            files: HashMap::new(),
            fail_open: false,
            read_after_close: None,
            console: Vec::new(),
            assertions: Vec::new(),
            requests: Vec::new(),
            open_files: HashMap::new(),
            next_id: 1,
        }
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.open_files.len()
    }

    fn open_file(&mut self, handle: &FileHandle) -> Option<&mut OpenFile> {
        self.open_files.get_mut(&handle.raw())
    }
}

impl WebHost for MockHost {
    fn console_log(&mut self, text: &str) {
        self.console.push(text.to_string());
    }

    fn assert(&mut self, expr: bool, line: u32, file_name: &str) {
        self.assertions.push(AssertRecord {
            expr,
            line,
            file_name: file_name.to_string(),
        });
    }

    fn time(&mut self) -> f64 {
        self.clock
    }

    fn https_request(&mut self, request: &HttpsRequest<'_>) -> HttpsResponse {
        self.requests.push(RecordedRequest {
            method: request.method.to_string(),
            server_name: request.server_name.to_string(),
            endpoint: request.endpoint.to_string(),
            header: request.header.to_string(),
            body: request.body.to_string(),
            timeout_ms: request.timeout_ms,
        });
        HttpsResponse {
            body: self.response.body.clone(),
            status_code: self.response.status_code,
        }
    }

    fn browser_info(&mut self) -> Option<String> {
        self.browser_info.clone()
    }

    fn origin_info(&mut self) -> Option<String> {
        self.origin_info.clone()
    }

    fn file_open(&mut self, handle: &mut FileHandle, path: &str, mode: FileMode) -> i32 {
        if self.fail_open || (mode.requires_existing() && !self.files.contains_key(path)) {
            return STATUS_INVALID;
        }

        let content = self.files.entry(path.to_string()).or_default();
        if mode.truncates() {
            content.clear();
        }
        let position = if mode.appends() { content.len() } else { 0 };

        let id = self.next_id;
        self.next_id += 1;
        handle.set_raw(id);
        self.open_files.insert(
            id,
            OpenFile {
                path: path.to_string(),
                position,
                writable: mode.is_writable(),
            },
        );
        STATUS_OK
    }

    fn file_close(&mut self, handle: &mut FileHandle) -> i32 {
        match self.open_files.remove(&handle.raw()) {
            Some(_) => STATUS_OK,
            None => STATUS_INVALID,
        }
    }

    fn file_write(
        &mut self,
        handle: &mut FileHandle,
        content: &[u8],
        size: usize,
        count: usize,
    ) -> usize {
        let Some(total) = size.checked_mul(count) else {
            return 0;
        };
        if size == 0 || total > content.len() {
            return 0;
        }
        let Some(file) = self.open_files.get_mut(&handle.raw()) else {
            return 0;
        };
        if !file.writable {
            return 0;
        }
        let Some(data) = self.files.get_mut(&file.path) else {
            return 0;
        };

        let end = file.position + total;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[file.position..end].copy_from_slice(&content[..total]);
        file.position = end;
        count
    }

    fn file_read(
        &mut self,
        handle: &mut FileHandle,
        content: &mut [u8],
        size: usize,
        count: usize,
    ) -> i32 {
        let Some(file) = self.open_files.get_mut(&handle.raw()) else {
            return self.read_after_close.unwrap_or(STATUS_INVALID);
        };
        if size == 0 {
            return 0;
        }
        let data = self.files.get(&file.path).map(Vec::as_slice).unwrap_or_default();
        let available = data.len().saturating_sub(file.position);
        let wanted = size.saturating_mul(count).min(content.len());
        // whole elements only, like fread
        let elements = wanted.min(available) / size;
        let bytes = elements * size;
        if bytes == 0 {
            return 0;
        }

        content[..bytes].copy_from_slice(&data[file.position..file.position + bytes]);
        file.position += bytes;
        elements as i32
    }

    fn file_seek(&mut self, handle: &mut FileHandle, offset: i64, whence: Whence) -> i32 {
        let length = match self.open_files.get(&handle.raw()) {
            Some(file) => self.files.get(&file.path).map_or(0, Vec::len),
            None => return STATUS_INVALID,
        };
        let Some(file) = self.open_file(handle) else {
            return STATUS_INVALID;
        };
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => file.position as i64,
            Whence::End => length as i64,
        };
        match base.checked_add(offset) {
            Some(target) if target >= 0 => {
                file.position = target as usize;
                STATUS_OK
            }
            _ => STATUS_INVALID,
        }
    }

    fn file_tell(&mut self, handle: &mut FileHandle) -> i64 {
        self.open_file(handle)
            .map_or(i64::from(STATUS_INVALID), |file| file.position as i64)
    }

    fn file_remove(&mut self, path: &str) -> i32 {
        if self.files.remove(path).is_none() {
            return STATUS_INVALID;
        }
        self.open_files.retain(|_, file| file.path != path);
        STATUS_OK
    }
}
