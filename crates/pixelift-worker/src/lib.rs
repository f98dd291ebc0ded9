//! Web worker entry point for pixelift enhancement runs.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`. It receives image bytes and an `EnhanceConfig` via
//! `postMessage`, runs one enhancement through
//! [`pixelift_pipeline::Enhancer`], streams progress messages while the
//! recipe advances, and posts the PNG result back.
//!
//! The PNG is sent as a raw `Uint8Array` to avoid JSON-encoding image
//! data. Diagnostics and errors are sent as small JSON strings.
//!
//! Running the pipeline in a worker keeps the browser's main thread
//! free for UI updates, animations, and user interaction. There are no
//! threads inside the worker, so progress moves per completed step only.

use std::sync::Arc;

use pixelift_pipeline::{EnhanceConfig, EnhanceError, EnhanceOutput, Enhancer, ProgressState};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Message protocol: the main thread sends a JS object with:
/// - `imageBytes`: `Uint8Array` containing the raw image file bytes
/// - `configJson`: `String` containing JSON-serialized `EnhanceConfig`
///   (missing fields take their defaults)
/// - `generation`: `f64` generation counter (passed through to responses)
///
/// While the run is in flight the worker posts progress objects:
/// - `generation`, `kind: "progress"`
/// - `percentage`: `f64` in `[0, 100]`, never decreasing
/// - `stage`: `String` label of the current step
///
/// On success the worker responds with:
/// - `generation`, `kind: "result"`, `ok: true`
/// - `pngBytes`: `Uint8Array` of the encoded PNG
/// - `width`, `height`: `f64` output dimensions
/// - `diagnosticsJson`: `String` of JSON-serialized `RunDiagnostics`
///
/// On error the worker responds with:
/// - `generation`, `kind: "result"`, `ok: false`
/// - `errorJson`: `String` of JSON-serialized `EnhanceError`
///
/// # Worker entry point
///
/// Called automatically when the WASM module is instantiated in the
/// worker context.
#[wasm_bindgen(start)]
pub fn worker_main() {
    console_error_panic_hook::set_once();

    let global: web_sys::DedicatedWorkerGlobalScope = js_sys::global()
        .dyn_into()
        .expect_throw("not running in a DedicatedWorkerGlobalScope");

    let onmessage =
        Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
            handle_message(&event);
        });
    global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget(); // leak: lives for the worker lifetime
}

/// A decoded request from the main thread.
struct Request {
    image_bytes: Vec<u8>,
    config: EnhanceConfig,
}

/// Read a named field off the message object.
fn field(data: &JsValue, name: &str) -> Result<JsValue, EnhanceError> {
    js_sys::Reflect::get(data, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined())
        .ok_or_else(|| EnhanceError::InvalidConfig(format!("missing {name} field")))
}

fn parse_request(data: &JsValue) -> Result<Request, EnhanceError> {
    let image_bytes: js_sys::Uint8Array = field(data, "imageBytes")?
        .dyn_into()
        .map_err(|_| EnhanceError::InvalidConfig("imageBytes is not a Uint8Array".into()))?;

    let config_json = field(data, "configJson")?
        .as_string()
        .ok_or_else(|| EnhanceError::InvalidConfig("configJson is not a string".into()))?;
    let config = serde_json::from_str(&config_json)
        .map_err(|e| EnhanceError::InvalidConfig(format!("failed to parse config: {e}")))?;

    Ok(Request {
        image_bytes: image_bytes.to_vec(),
        config,
    })
}

/// Handle an incoming message from the main thread.
///
/// Extracts the image bytes and config, runs the enhancement, and posts
/// progress and the result back.
fn handle_message(event: &web_sys::MessageEvent) {
    let data = event.data();
    let generation = js_sys::Reflect::get(&data, &JsValue::from_str("generation"))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NAN);

    let request = match parse_request(&data) {
        Ok(request) => request,
        Err(e) => {
            post_error(generation, &e);
            return;
        }
    };

    // Synchronous: blocks this worker thread only.
    let mut enhancer = Enhancer::new(request.config);
    let sink = Arc::new(move |state: &ProgressState| post_progress(generation, state));
    match enhancer.run(&request.image_bytes, sink) {
        Ok(output) => post_success(generation, &output),
        Err(e) => post_error(generation, &e),
    }
}

/// Build a response object from `(key, value)` pairs.
fn response(generation: f64, kind: &str, fields: &[(&str, JsValue)]) -> js_sys::Object {
    let object = js_sys::Object::new();
    let set = |key: &str, val: &JsValue| {
        // Setting a plain property on a fresh object cannot fail.
        let _ = js_sys::Reflect::set(&object, &JsValue::from_str(key), val);
    };
    set("generation", &JsValue::from_f64(generation));
    set("kind", &JsValue::from_str(kind));
    for (key, val) in fields {
        set(key, val);
    }
    object
}

fn post(message: &js_sys::Object) {
    if let Ok(global) = js_sys::global().dyn_into::<web_sys::DedicatedWorkerGlobalScope>() {
        let _ = global.post_message(message);
    }
}

fn post_progress(generation: f64, state: &ProgressState) {
    post(&response(
        generation,
        "progress",
        &[
            ("percentage", JsValue::from_f64(f64::from(state.percentage))),
            ("stage", JsValue::from_str(&state.stage_label)),
        ],
    ));
}

/// Post a successful result back to the main thread.
fn post_success(generation: f64, output: &EnhanceOutput) {
    let diagnostics_json = match serde_json::to_string(&output.diagnostics) {
        Ok(json) => json,
        Err(e) => {
            post_error(
                generation,
                &EnhanceError::Encode(format!("failed to serialize diagnostics: {e}")),
            );
            return;
        }
    };

    post(&response(
        generation,
        "result",
        &[
            ("ok", JsValue::from_bool(true)),
            (
                "pngBytes",
                js_sys::Uint8Array::from(output.png.as_slice()).into(),
            ),
            ("width", JsValue::from_f64(f64::from(output.dimensions.width))),
            (
                "height",
                JsValue::from_f64(f64::from(output.dimensions.height)),
            ),
            ("diagnosticsJson", JsValue::from_str(&diagnostics_json)),
        ],
    ));
}

/// Post an error response back to the main thread.
fn post_error(generation: f64, error: &EnhanceError) {
    let error_json = serde_json::to_string(error)
        .unwrap_or_else(|ser_err| format!("\"serialization error: {ser_err}\""));
    post(&response(
        generation,
        "result",
        &[
            ("ok", JsValue::from_bool(false)),
            ("errorJson", JsValue::from_str(&error_json)),
        ],
    ));
}
