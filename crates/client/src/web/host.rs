//! Browser host: consent modal, sensor permissions, camera and alerts.

use js_sys::{Function, Promise, Reflect};
use strata_core::config::ElementIds;
use strata_core::{
    CaptureConstraints, CaptureError, CaptureHost, ConsentHost, Notifier, PermissionState,
    PlatformError, SensorKind,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, DomException, Element, HtmlElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaTrackConstraints, Window,
};

use super::{describe, js_err};

/// The page the viewer runs in.
pub struct WebHost {
    window: Window,
    document: Document,
    elements: ElementIds,
}

impl WebHost {
    pub fn new(elements: ElementIds) -> Result<Self, PlatformError> {
        let window = web_sys::window().ok_or_else(|| PlatformError::new("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| PlatformError::new("no document"))?;

        Ok(Self {
            window,
            document,
            elements,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Look up an element by id and cast it.
    pub fn element<T: JsCast>(&self, id: &str) -> Option<T> {
        let Some(element) = self.document.get_element_by_id(id) else {
            tracing::warn!("Element #{id} not found");
            return None;
        };
        match element.dyn_into::<T>() {
            Ok(el) => Some(el),
            Err(_) => {
                tracing::warn!("Element #{id} has an unexpected type");
                None
            }
        }
    }

    fn set_modal_hidden(&self, hidden: bool) {
        let Some(modal) = self.element::<Element>(&self.elements.consent_modal) else {
            return;
        };
        let classes = modal.class_list();
        let result = if hidden {
            classes.add_1(&self.elements.hidden_class)
        } else {
            classes.remove_1(&self.elements.hidden_class)
        };
        if let Err(e) = result {
            tracing::warn!("Failed to toggle consent modal: {}", describe(&e));
        }
    }
}

/// Map a rejected `getUserMedia` (or related) call onto [`CaptureError`].
fn capture_err(e: JsValue) -> CaptureError {
    match e.dyn_ref::<DomException>() {
        Some(dom) => CaptureError::from_dom_name(&dom.name(), dom.message()),
        None => CaptureError::Platform(describe(&e)),
    }
}

/// Name of the global constructor that owns `requestPermission` for a sensor.
fn sensor_class(sensor: SensorKind) -> &'static str {
    match sensor {
        SensorKind::Motion => "DeviceMotionEvent",
        SensorKind::Orientation => "DeviceOrientationEvent",
    }
}

impl ConsentHost for WebHost {
    fn user_agent(&self) -> String {
        self.window.navigator().user_agent().unwrap_or_default()
    }

    fn show_consent_prompt(&self) {
        self.set_modal_hidden(false);
    }

    fn hide_consent_prompt(&self) {
        self.set_modal_hidden(true);
    }

    async fn consent_confirmed(&self) {
        let Some(button) = self.element::<HtmlElement>(&self.elements.consent_button) else {
            // Nothing to tap; ask right away and let the platform decide.
            return;
        };

        let clicked = Promise::new(&mut |resolve, _reject| {
            let resolve = resolve.clone();
            let on_click = Closure::once(move |_event: web_sys::MouseEvent| {
                let _ = resolve.call0(&JsValue::NULL);
            });
            button.set_onclick(Some(on_click.as_ref().unchecked_ref()));
            on_click.forget();
        });

        if let Err(e) = JsFuture::from(clicked).await {
            tracing::warn!("Consent wait failed: {}", describe(&e));
        }
        button.set_onclick(None);
        tracing::debug!("Consent confirmed");
    }

    async fn request_sensor_permission(
        &self,
        sensor: SensorKind,
    ) -> Result<PermissionState, PlatformError> {
        let class_name = sensor_class(sensor);
        let class = Reflect::get(&self.window, &JsValue::from_str(class_name)).map_err(js_err)?;
        let request: Function = Reflect::get(&class, &JsValue::from_str("requestPermission"))
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| PlatformError::new(format!("{class_name}.requestPermission is unavailable")))?;

        let pending: Promise = request
            .call0(&class)
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| PlatformError::new(format!("{class_name}.requestPermission returned no promise")))?;

        let answer = JsFuture::from(pending).await.map_err(js_err)?;
        let answer = answer.as_string().unwrap_or_default();
        tracing::info!("{sensor} permission: {answer}");

        Ok(PermissionState::parse(&answer))
    }
}

impl CaptureHost for WebHost {
    type Stream = MediaStream;

    async fn open_camera(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<MediaStream, CaptureError> {
        let devices = self.window.navigator().media_devices().map_err(capture_err)?;

        let video = MediaTrackConstraints::new();
        video.set_facing_mode(&JsValue::from_str(constraints.facing_mode));

        let request = MediaStreamConstraints::new();
        request.set_video(&video);
        request.set_audio(&JsValue::from_bool(constraints.audio));

        let pending = devices
            .get_user_media_with_constraints(&request)
            .map_err(capture_err)?;
        let stream = JsFuture::from(pending).await.map_err(capture_err)?;

        stream
            .dyn_into::<MediaStream>()
            .map_err(|_| CaptureError::Platform("getUserMedia returned no stream".into()))
    }

    fn present_video(&self, stream: &MediaStream) -> Result<(), CaptureError> {
        let id = &self.elements.video;
        let video: HtmlVideoElement = self
            .element(id)
            .ok_or_else(|| CaptureError::Platform(format!("no <video id=\"{id}\">")))?;

        video.set_src_object(Some(stream));

        // Playback starts on its own; a rejected play() only means autoplay was refused.
        let playing = video.play().map_err(capture_err)?;
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(playing).await {
                tracing::warn!("Video playback did not start: {}", describe(&e));
            }
        });

        Ok(())
    }
}

impl Notifier for WebHost {
    fn alert(&self, message: &str) {
        if let Err(e) = self.window.alert_with_message(message) {
            tracing::error!("alert() failed: {}", describe(&e));
        }
    }
}
