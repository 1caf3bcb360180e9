//! WASM entry flow.
//!
//! Startup (consent, camera), then the scene on the canvas, the model fetch
//! in the background and the animation-frame loop. The loop starts before
//! the model arrives.

use anyhow::Context;
use strata_core::{bootstrap, Startup, ViewerConfig, Viewport};
use wasm_bindgen::JsValue;
use web_sys::{HtmlCanvasElement, Window};

use crate::renderer::Renderer;
use crate::web::{describe, frame, DeviceOrientationFeed, FetchAssetLoader, WebHost};

/// Run the viewer in the page.
pub async fn run_wasm(config: ViewerConfig) -> anyhow::Result<()> {
    let host = WebHost::new(config.elements.clone())?;

    let launch = match Startup::new(&host).run().await {
        Ok(launch) => launch,
        // Already reported to the user
        Err(e) => {
            tracing::warn!("Viewer not started: {e}");
            return Ok(());
        }
    };
    tracing::info!(
        "Startup finished: {:?}, camera {}",
        launch.gate,
        if launch.capture.is_some() { "on" } else { "off" }
    );

    let window = host.window();
    let viewport = viewport(window);

    let canvas: HtmlCanvasElement = host
        .element(&config.elements.canvas)
        .with_context(|| format!("canvas #{} not found", config.elements.canvas))?;
    let (width, height) = size_canvas(&canvas, viewport);

    let renderer =
        Renderer::new(wgpu::SurfaceTarget::Canvas(canvas.clone()), width, height).await?;

    // The surface may have been clamped to the GPU's texture limit
    let (surface_width, surface_height) = renderer.size();
    if (surface_width, surface_height) != (width, height) {
        tracing::warn!(
            "Canvas {width}x{height} exceeds GPU limits, rendering at {surface_width}x{surface_height}"
        );
        canvas.set_width(surface_width);
        canvas.set_height(surface_height);
    }

    let orientation = DeviceOrientationFeed::listen(window)
        .inspect_err(|e| tracing::warn!("No orientation events: {e}"))
        .ok();
    let loader = FetchAssetLoader::new(window.clone());

    let (render_loop, load) = bootstrap(&config, viewport, renderer, orientation, loader);
    wasm_bindgen_futures::spawn_local(load);
    frame::run(window.clone(), render_loop);

    Ok(())
}

fn viewport(window: &Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(1.0);

    Viewport {
        width: dimension(window.inner_width()),
        height: dimension(window.inner_height()),
        device_pixel_ratio: window.device_pixel_ratio(),
    }
}

/// Fill the window in CSS pixels, with a backing store at device resolution.
fn size_canvas(canvas: &HtmlCanvasElement, viewport: Viewport) -> (u32, u32) {
    let (width, height) = viewport.physical_size();
    canvas.set_width(width);
    canvas.set_height(height);

    let style = canvas.style();
    for (property, value) in [("width", viewport.width), ("height", viewport.height)] {
        if let Err(e) = style.set_property(property, &format!("{value}px")) {
            tracing::warn!("Failed to set canvas {property}: {}", describe(&e));
        }
    }

    tracing::info!(
        "Canvas size: {}x{} (dpr: {})",
        width,
        height,
        viewport.device_pixel_ratio
    );

    (width, height)
}
