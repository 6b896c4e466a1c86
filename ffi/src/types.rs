//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests go out as plain C data (method enum, URL string, header array,
//! byte body with explicit length so multipart payloads survive). Parsed
//! results come back as a JSON string inside one envelope, `FfiResult`,
//! so the shells decode with their own JSON tooling instead of walking
//! per-type C structs. Every pointer handed out here is released by the
//! matching `nutai_free_*` function.

use std::ffi::CString;
use std::os::raw::c_char;

use nutai_core::{ApiError, HttpMethod, HttpRequest, NutritionClient};

/// Opaque handle to a `NutritionClient`.
pub struct FfiNutritionClient {
    pub(crate) inner: NutritionClient,
}

/// Allocate a C string, dropping interior NULs rather than failing.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    let cs = CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    cs.into_raw()
}

/// Free a string from `c_string`. Null is ignored.
///
/// # Safety
/// `s` must come from `c_string` and not have been freed.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request for the host to execute.
///
/// `body` is null when there is no body; otherwise it points to
/// `body_len` bytes, which may contain NULs (image uploads).
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        let (body, body_len) = match req.body {
            Some(bytes) => {
                let len = bytes.len();
                (Box::into_raw(bytes.into_boxed_slice()) as *mut u8, len)
            }
            None => (std::ptr::null_mut(), 0),
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            headers,
            headers_len,
            body,
            body_len,
        }))
    }

    /// # Safety
    /// `req` must come from `from_core` and not have been freed.
    pub(crate) unsafe fn free(req: *mut Self) {
        if req.is_null() {
            return;
        }
        let req = unsafe { Box::from_raw(req) };
        unsafe { free_c_string(req.url) };
        if !req.headers.is_null() {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                unsafe {
                    free_c_string(h.key);
                    free_c_string(h.value);
                }
            }
        }
        if !req.body.is_null() {
            drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(req.body, req.body_len)) });
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// What the host got back. The FFI layer reads but does not free it.
///
/// `status == 0` means no response arrived; `body` may then carry the
/// host's description of the failure.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidUrl = 1,
    NotAuthenticated = 2,
    Transport = 3,
    Server = 4,
    Api = 5,
    Deserialization = 6,
    Serialization = 7,
    Storage = 8,
    InvalidInput = 9,
    Panic = 10,
    NullArg = 11,
}

/// A failure on its way across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub code: FfiErrorCode,
    pub http_status: u16,
    pub message: String,
}

impl Failure {
    pub(crate) fn new(code: FfiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            http_status: 0,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FfiErrorCode::InvalidInput, message)
    }

    pub(crate) fn null_arg(name: &str) -> Self {
        Self::new(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        let code = match &err {
            ApiError::InvalidUrl(_) => FfiErrorCode::InvalidUrl,
            ApiError::NotAuthenticated => FfiErrorCode::NotAuthenticated,
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::Server { .. } => FfiErrorCode::Server,
            ApiError::Api { .. } => FfiErrorCode::Api,
            ApiError::Deserialization(_) => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::Storage(_) => FfiErrorCode::Storage,
        };
        Self {
            code,
            http_status: err.status().unwrap_or(0),
            message: err.to_string(),
        }
    }
}

/// Result of `nutai_build*`: a request, or why none could be built.
///
/// A `NotAuthenticated` error here means nothing should be sent.
#[repr(C)]
pub struct FfiBuildResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub request: *mut FfiHttpRequest,
}

impl FfiBuildResult {
    pub(crate) fn from_outcome(outcome: Result<HttpRequest, Failure>) -> *mut Self {
        let result = match outcome {
            Ok(req) => FfiBuildResult {
                error_code: FfiErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                request: FfiHttpRequest::from_core(req),
            },
            Err(f) => FfiBuildResult {
                error_code: f.code,
                error_message: c_string(f.message),
                request: std::ptr::null_mut(),
            },
        };
        Box::into_raw(Box::new(result))
    }
}

/// Result envelope for parse and session calls.
///
/// On success `error_code` is `Ok`, `error_message` is null and
/// `data_json` holds the payload as JSON (`null` for "nothing", e.g. a
/// missing profile). On failure `data_json` is null and `http_status` is
/// set when the error came from a response.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_json: *mut c_char,
}

impl FfiResult {
    pub(crate) fn from_outcome(outcome: Result<String, Failure>) -> *mut Self {
        let result = match outcome {
            Ok(json) => FfiResult {
                error_code: FfiErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                http_status: 0,
                data_json: c_string(json),
            },
            Err(f) => FfiResult {
                error_code: f.code,
                error_message: c_string(f.message),
                http_status: f.http_status,
                data_json: std::ptr::null_mut(),
            },
        };
        Box::into_raw(Box::new(result))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::from_outcome(Err(Failure::new(FfiErrorCode::Panic, msg)))
    }
}
