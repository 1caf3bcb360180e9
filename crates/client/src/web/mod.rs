//! Browser-side implementations of the core host traits.

pub mod assets;
pub mod frame;
pub mod host;
pub mod orientation;

use strata_core::{ConfigError, PlatformError, ViewerConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub use assets::FetchAssetLoader;
pub use host::WebHost;
pub use orientation::DeviceOrientationFeed;

/// Optional `<script type="application/json">` holding a [`ViewerConfig`].
pub const CONFIG_ELEMENT_ID: &str = "strata-config";

/// Best-effort text for a thrown JS value.
pub fn describe(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

pub fn js_err(e: JsValue) -> PlatformError {
    PlatformError::new(describe(&e))
}

/// Read the embedded config, or defaults if the page has none.
pub fn read_config() -> Result<ViewerConfig, ConfigError> {
    let json = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
        .and_then(|el| el.text_content());

    match json {
        Some(json) => ViewerConfig::from_json(&json),
        None => Ok(ViewerConfig::default()),
    }
}
