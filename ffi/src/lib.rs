//! C-ABI wrapper around `nutai-core` for the mobile shells.
//!
//! # Overview
//! The shells own networking and UI. They ask this library for a request,
//! execute it with the platform HTTP stack, and hand the response back for
//! parsing, so token handling and error mapping are identical on every
//! platform.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One `nutai_build` / `nutai_parse` pair dispatches on `FfiOperation`;
//!   inputs and outputs are JSON strings shaped like the server's JSON.
//!   Image uploads have their own builder because the payload is binary.
//! - The C caller owns all returned pointers and must call the matching
//!   `nutai_free_*` function to release them.

pub mod ops;
pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use nutai_core::{
    ApiError, FileTokenStore, HttpRequest, HttpResponse, ImageUpload, MemoryTokenStore, NutritionClient, TokenStore,
};

pub use ops::FfiOperation;
use types::*;

/// Borrow a C string as UTF-8. `Ok(None)` for null.
fn read_str<'a>(ptr: *const c_char, name: &str) -> Result<Option<&'a str>, Failure> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(Some)
        .map_err(|_| Failure::invalid_input(format!("{name} is not valid UTF-8")))
}

fn required_str<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, Failure> {
    read_str(ptr, name)?.ok_or_else(|| Failure::null_arg(name))
}

fn client_ref<'a>(client: *const FfiNutritionClient) -> Result<&'a NutritionClient, Failure> {
    if client.is_null() {
        return Err(Failure::null_arg("client"));
    }
    Ok(&unsafe { &*client }.inner)
}

fn operation(raw: u32) -> Result<FfiOperation, Failure> {
    FfiOperation::from_raw(raw).ok_or_else(|| Failure::invalid_input(format!("unknown operation {raw}")))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client bound to `base_url`.
///
/// `token_file` is the path of the JSON key-value file that persists the
/// bearer token; pass null to keep the token in memory only.
/// Returns null if `base_url` is null or not an http(s) URL.
/// The caller must free the returned pointer with `nutai_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_client_new(base_url: *const c_char, token_file: *const c_char) -> *mut FfiNutritionClient {
    catch_unwind(|| {
        let Ok(Some(url)) = read_str(base_url, "base_url") else {
            return std::ptr::null_mut();
        };
        let store: Arc<dyn TokenStore> = match read_str(token_file, "token_file") {
            Ok(Some(path)) => Arc::new(FileTokenStore::new(path)),
            Ok(None) => Arc::new(MemoryTokenStore::new()),
            Err(_) => return std::ptr::null_mut(),
        };
        match NutritionClient::with_token_store(url, store) {
            Ok(inner) => Box::into_raw(Box::new(FfiNutritionClient { inner })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `nutai_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_client_free(client: *mut FfiNutritionClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Build the request for `operation` (an `FfiOperation` value).
///
/// `input_json` is the request payload in the server's JSON shape; for
/// per-user reads it is `{"user_id": "..."}` (plus `date_filter`/`limit`
/// for food logs). It may be null for operations that take no input.
/// A `NotAuthenticated` error means no token is stored and nothing should
/// be sent. Free with `nutai_free_build_result`.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_build(
    client: *const FfiNutritionClient,
    operation_raw: u32,
    input_json: *const c_char,
) -> *mut FfiBuildResult {
    catch_unwind(AssertUnwindSafe(|| {
        let outcome = (|| -> Result<HttpRequest, Failure> {
            let client = client_ref(client)?;
            let op = operation(operation_raw)?;
            let input = read_str(input_json, "input_json")?;
            ops::build(client, op, input)
        })();
        FfiBuildResult::from_outcome(outcome)
    }))
    .unwrap_or_else(|_| FfiBuildResult::from_outcome(Err(Failure::new(FfiErrorCode::Panic, "panic in nutai_build"))))
}

/// Build a multipart image upload from `data_len` bytes at `data`.
///
/// `image_type` may be null, meaning `meal`. Parse the response with
/// `nutai_parse(.., UploadUserImage, ..)`.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_build_upload_user_image(
    client: *const FfiNutritionClient,
    filename: *const c_char,
    content_type: *const c_char,
    image_type: *const c_char,
    data: *const u8,
    data_len: usize,
) -> *mut FfiBuildResult {
    catch_unwind(AssertUnwindSafe(|| {
        let outcome = (|| -> Result<HttpRequest, Failure> {
            let client = client_ref(client)?;
            let filename = required_str(filename, "filename")?;
            let content_type = required_str(content_type, "content_type")?;
            if data.is_null() && data_len > 0 {
                return Err(Failure::null_arg("data"));
            }
            let bytes = if data_len == 0 {
                Vec::new()
            } else {
                unsafe { std::slice::from_raw_parts(data, data_len) }.to_vec()
            };
            let mut upload = ImageUpload::meal_photo(filename, content_type, bytes);
            if let Some(image_type) = read_str(image_type, "image_type")? {
                upload.image_type = image_type.to_string();
            }
            Ok(client.build_upload_user_image(&upload)?)
        })();
        FfiBuildResult::from_outcome(outcome)
    }))
    .unwrap_or_else(|_| {
        FfiBuildResult::from_outcome(Err(Failure::new(
            FfiErrorCode::Panic,
            "panic in nutai_build_upload_user_image",
        )))
    })
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

fn ffi_response_to_core(resp: &FfiHttpResponse) -> Result<HttpResponse, Failure> {
    let body = read_str(resp.body, "response body")?.unwrap_or("").to_string();
    if resp.status == 0 {
        let reason = if body.is_empty() { "no response received".to_string() } else { body };
        return Err(ApiError::Transport(reason).into());
    }
    Ok(HttpResponse::new(resp.status, body))
}

/// Parse the response to a request built for `operation`.
///
/// On success `data_json` holds the result. Login and refresh also store
/// the new token. Free with `nutai_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_parse(
    client: *const FfiNutritionClient,
    operation_raw: u32,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        let outcome = (|| -> Result<String, Failure> {
            let client = client_ref(client)?;
            let op = operation(operation_raw)?;
            if response.is_null() {
                return Err(Failure::null_arg("response"));
            }
            let response = ffi_response_to_core(unsafe { &*response })?;
            ops::parse(client, op, response)
        })();
        FfiResult::from_outcome(outcome)
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in nutai_parse"))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Clear the stored token. `data_json` is `null` on success.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_logout(client: *const FfiNutritionClient) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        let outcome = client_ref(client).and_then(|c| {
            c.logout()?;
            Ok("null".to_string())
        });
        FfiResult::from_outcome(outcome)
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in nutai_logout"))
}

/// True when a token is stored. False for a null client or unreadable store.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_is_authenticated(client: *const FfiNutritionClient) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        client_ref(client)
            .ok()
            .and_then(|c| c.is_authenticated().ok())
            .unwrap_or(false)
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a result from `nutai_build*`, including its request. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_free_build_result(result: *mut FfiBuildResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe {
            free_c_string(result.error_message);
            FfiHttpRequest::free(result.request);
        }
    }));
}

/// Free a result from `nutai_parse` or `nutai_logout`. Safe with null.
#[unsafe(no_mangle)]
pub extern "C" fn nutai_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe {
            free_c_string(result.error_message);
            free_c_string(result.data_json);
        }
    }));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
