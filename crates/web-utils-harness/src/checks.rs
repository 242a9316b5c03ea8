//! Smoke checks against the host import surface
//!
//! Each [`Check`] calls one host capability and verifies a trivial
//! post-condition. The file checks share the handle held by [`Harness`] and
//! only make sense in the order given by [`Check::ALL`]; running them in any
//! other order is allowed but the results are meaningless.

use serde::Serialize;

use crate::config::HarnessConfig;
use crate::error::{CheckError, CheckResult};
use crate::host::{
    FileHandle, FileMode, HttpsRequest, WebHost, Whence, STATUS_INVALID, STATUS_OK,
};

/// Two-valued check status, as returned across the export boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum CheckStatus {
    Success = 0,
    Failure = 1,
}

impl CheckStatus {
    pub fn is_success(&self) -> bool {
        *self == CheckStatus::Success
    }
}

impl From<CheckResult<()>> for CheckStatus {
    fn from(result: CheckResult<()>) -> Self {
        match result {
            Ok(()) => CheckStatus::Success,
            Err(_) => CheckStatus::Failure,
        }
    }
}

impl From<CheckStatus> for i32 {
    fn from(status: CheckStatus) -> Self {
        status as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    ConsoleLog,
    Assert,
    Time,
    HttpsRequest,
    BrowserInfo,
    OriginInfo,
    FileOpen,
    FileWrite,
    FileTell,
    FileSeek,
    FileRead,
    FileClose,
    FileRemove,
}

impl Check {
    /// Every check, in the order the file lifecycle requires
    pub const ALL: [Check; 13] = [
        Check::ConsoleLog,
        Check::Assert,
        Check::Time,
        Check::HttpsRequest,
        Check::BrowserInfo,
        Check::OriginInfo,
        Check::FileOpen,
        Check::FileWrite,
        Check::FileTell,
        Check::FileSeek,
        Check::FileRead,
        Check::FileClose,
        Check::FileRemove,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Check::ConsoleLog => "console-log",
            Check::Assert => "assert",
            Check::Time => "time",
            Check::HttpsRequest => "https-request",
            Check::BrowserInfo => "browser-info",
            Check::OriginInfo => "origin-info",
            Check::FileOpen => "file-open",
            Check::FileWrite => "file-write",
            Check::FileTell => "file-tell",
            Check::FileSeek => "file-seek",
            Check::FileRead => "file-read",
            Check::FileClose => "file-close",
            Check::FileRemove => "file-remove",
        }
    }

    /// Symbol the check is exported under. The last two keep the
    /// `pv_test_utils` prefix existing runners look up.
    pub fn export_name(&self) -> &'static str {
        match self {
            Check::ConsoleLog => "pv_web_utils_test_console_log",
            Check::Assert => "pv_web_utils_test_assert",
            Check::Time => "pv_web_utils_test_time",
            Check::HttpsRequest => "pv_web_utils_test_https_request",
            Check::BrowserInfo => "pv_web_utils_test_browser_info",
            Check::OriginInfo => "pv_web_utils_test_origin_info",
            Check::FileOpen => "pv_web_utils_test_file_open",
            Check::FileWrite => "pv_web_utils_test_file_write",
            Check::FileTell => "pv_web_utils_test_file_tell",
            Check::FileSeek => "pv_web_utils_test_file_seek",
            Check::FileRead => "pv_web_utils_test_file_read",
            Check::FileClose => "pv_test_utils_test_file_close",
            Check::FileRemove => "pv_test_utils_test_remove",
        }
    }
}

/// Result of one check within a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub check: &'static str,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running every check in order
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub outcomes: Vec<CheckOutcome>,
    pub passed: usize,
    pub failed: usize,
}

impl ScenarioReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn status_of(&self, check: Check) -> Option<CheckStatus> {
        self.outcomes
            .iter()
            .find(|o| o.check == check.export_name())
            .map(|o| o.status)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// C `strncmp(a, b, n) == 0`. Bytes past the end of a slice read as NUL.
pub fn c_strncmp_eq(a: &[u8], b: &[u8], n: usize) -> bool {
    for i in 0..n {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        if x != y {
            return false;
        }
        if x == 0 {
            return true;
        }
    }
    true
}

/// Text up to the first NUL, the way a C consumer would print it
fn c_str_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn allocated(file: &mut Option<FileHandle>) -> CheckResult<&mut FileHandle> {
    match file.as_mut() {
        Some(handle) => Ok(handle),
        None => {
            log::debug!("file check run before file-open allocated a handle");
            Err(CheckError::NoFileHandle)
        }
    }
}

/// Check context: the injected host, the fixed parameters, and the file
/// handle threaded through the lifecycle checks.
pub struct Harness<H: WebHost> {
    host: H,
    config: HarnessConfig,
    file: Option<FileHandle>,
}

impl<H: WebHost> Harness<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, HarnessConfig::default())
    }

    pub fn with_config(host: H, config: HarnessConfig) -> Self {
        Self {
            host,
            config,
            file: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn file_handle(&self) -> Option<&FileHandle> {
        self.file.as_ref()
    }

    pub fn run(&mut self, check: Check) -> CheckStatus {
        self.evaluate(check).into()
    }

    /// Run one check and keep the failure reason
    pub fn evaluate(&mut self, check: Check) -> CheckResult<()> {
        let result = match check {
            Check::ConsoleLog => self.console_log(),
            Check::Assert => self.assert(),
            Check::Time => self.time(),
            Check::HttpsRequest => self.https_request(),
            Check::BrowserInfo => self.browser_info(),
            Check::OriginInfo => self.origin_info(),
            Check::FileOpen => self.file_open(),
            Check::FileWrite => self.file_write(),
            Check::FileTell => self.file_tell(),
            Check::FileSeek => self.file_seek(),
            Check::FileRead => self.file_read(),
            Check::FileClose => self.file_close(),
            Check::FileRemove => self.file_remove(),
        };
        if let Err(e) = &result {
            log::debug!("{} failed: {e}", check.name());
        }
        result
    }

    /// Run every check in [`Check::ALL`] order. A failure does not stop the
    /// run; later checks see whatever state it left behind.
    pub fn run_scenario(&mut self) -> ScenarioReport {
        let mut outcomes = Vec::with_capacity(Check::ALL.len());
        for check in Check::ALL {
            let result = self.evaluate(check);
            outcomes.push(CheckOutcome {
                check: check.export_name(),
                status: CheckStatus::from(result.clone()),
                error: result.err().map(|e| e.to_string()),
            });
        }
        let passed = outcomes.iter().filter(|o| o.status.is_success()).count();
        ScenarioReport {
            failed: outcomes.len() - passed,
            passed,
            outcomes,
        }
    }

    fn console_log(&mut self) -> CheckResult<()> {
        self.host.console_log(&self.config.log_message);
        Ok(())
    }

    fn assert(&mut self) -> CheckResult<()> {
        self.host.assert(true, line!(), file!());
        Ok(())
    }

    fn time(&mut self) -> CheckResult<()> {
        let time = self.host.time();
        if time > 0.0 {
            Ok(())
        } else {
            Err(CheckError::NonPositiveTime(time))
        }
    }

    fn https_request(&mut self) -> CheckResult<()> {
        let config = &self.config;
        let request = HttpsRequest {
            method: &config.http_method,
            server_name: &config.server_name,
            endpoint: &config.endpoint,
            header: &config.header,
            body: &config.body,
            timeout_ms: config.timeout_ms,
        };
        let response = self.host.https_request(&request);

        let raw = response.body.as_deref().map(c_str_lossy).unwrap_or_default();
        self.host.console_log(&raw);

        if response.status_code != config.expected_status_code {
            return Err(CheckError::UnexpectedResponseCode {
                got: response.status_code,
                expected: config.expected_status_code,
            });
        }

        let body = response.body.ok_or(CheckError::MissingResponse)?;
        if c_strncmp_eq(&body, config.expected_response.as_bytes(), body.len()) {
            Ok(())
        } else {
            Err(CheckError::ResponseMismatch)
        }
    }

    fn browser_info(&mut self) -> CheckResult<()> {
        self.host
            .browser_info()
            .map(drop)
            .ok_or(CheckError::MissingHostString("browser info"))
    }

    fn origin_info(&mut self) -> CheckResult<()> {
        self.host
            .origin_info()
            .map(drop)
            .ok_or(CheckError::MissingHostString("origin info"))
    }

    fn file_open(&mut self) -> CheckResult<()> {
        let handle = self.file.insert(FileHandle::new());
        let status = self
            .host
            .file_open(handle, &self.config.test_path, FileMode::Write);
        if status != STATUS_OK {
            return Err(CheckError::HostStatus {
                op: "file_open",
                status: status.into(),
            });
        }
        Ok(())
    }

    fn file_write(&mut self) -> CheckResult<()> {
        let handle = allocated(&mut self.file)?;
        let content = self.config.content_bytes();
        let written = self.host.file_write(handle, &content, 1, content.len());
        if written != content.len() {
            return Err(CheckError::CountMismatch {
                op: "file_write",
                got: written as i64,
                expected: content.len() as i64,
            });
        }
        Ok(())
    }

    fn file_tell(&mut self) -> CheckResult<()> {
        let handle = allocated(&mut self.file)?;
        let expected = self.config.content_bytes().len() as i64;
        let offset = self.host.file_tell(handle);
        if offset != expected {
            return Err(CheckError::CountMismatch {
                op: "file_tell",
                got: offset,
                expected,
            });
        }
        Ok(())
    }

    fn file_seek(&mut self) -> CheckResult<()> {
        let handle = allocated(&mut self.file)?;
        let status = self.host.file_seek(handle, 0, Whence::Start);
        if status != STATUS_OK {
            return Err(CheckError::HostStatus {
                op: "file_seek",
                status: status.into(),
            });
        }
        Ok(())
    }

    fn file_read(&mut self) -> CheckResult<()> {
        let handle = allocated(&mut self.file)?;
        let expected = self.config.content_bytes();
        let mut content = vec![0u8; expected.len()];
        let read = self.host.file_read(handle, &mut content, 1, expected.len());
        if i64::from(read) != expected.len() as i64 {
            return Err(CheckError::CountMismatch {
                op: "file_read",
                got: read.into(),
                expected: expected.len() as i64,
            });
        }
        if !c_strncmp_eq(&content, &expected, expected.len()) {
            return Err(CheckError::ContentMismatch);
        }
        Ok(())
    }

    fn file_close(&mut self) -> CheckResult<()> {
        let handle = allocated(&mut self.file)?;
        let status = self.host.file_close(handle);
        if status != STATUS_OK {
            return Err(CheckError::HostStatus {
                op: "file_close",
                status: status.into(),
            });
        }

        let mut content = [0u8; 1];
        let read = self.host.file_read(handle, &mut content, 1, 1);
        if read != STATUS_INVALID {
            return Err(CheckError::MissingSentinel {
                op: "file_read",
                got: read.into(),
            });
        }
        Ok(())
    }

    fn file_remove(&mut self) -> CheckResult<()> {
        let handle = allocated(&mut self.file)?;
        let status = self.host.file_remove(&self.config.test_path);
        if status != STATUS_OK {
            return Err(CheckError::HostStatus {
                op: "file_remove",
                status: status.into(),
            });
        }

        let status = self
            .host
            .file_open(handle, &self.config.test_path, FileMode::Read);
        if status != STATUS_INVALID {
            return Err(CheckError::MissingSentinel {
                op: "file_open",
                got: status.into(),
            });
        }
        Ok(())
    }
}
