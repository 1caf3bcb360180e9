//! Strata Client
//!
//! Browser AR viewer: rear camera feed behind a transparent wgpu canvas,
//! a glTF model steered by device orientation.

pub mod renderer;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
#[cfg(target_arch = "wasm32")]
pub mod web;

/// WASM entry point - called from JavaScript.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn wasm_start() {
    console_error_panic_hook::set_once();

    let (config, config_error) = match web::read_config() {
        Ok(config) => (config, None),
        Err(e) => (strata_core::ViewerConfig::default(), Some(e)),
    };
    let level = config.max_log_level().unwrap_or(tracing::Level::INFO);
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build(),
    );

    if let Some(e) = config_error {
        tracing::warn!("Ignoring #{}: {e}", web::CONFIG_ELEMENT_ID);
    }
    tracing::info!("Starting Strata (WASM)");

    if let Err(e) = wasm::run_wasm(config).await {
        tracing::error!("Fatal error: {e:#}");
    }
}
