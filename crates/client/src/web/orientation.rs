//! `deviceorientation` listener feeding the orientation controls.

use std::cell::Cell;
use std::rc::Rc;

use js_sys::Reflect;
use strata_core::{OrientationReading, OrientationSource, PlatformError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{DeviceOrientationEvent, Window};

use super::js_err;

const EVENT: &str = "deviceorientation";

/// Keeps the most recent orientation sample. The listener is removed on drop.
pub struct DeviceOrientationFeed {
    window: Window,
    latest: Rc<Cell<Option<OrientationReading>>>,
    listener: Closure<dyn FnMut(DeviceOrientationEvent)>,
}

impl DeviceOrientationFeed {
    pub fn listen(window: &Window) -> Result<Self, PlatformError> {
        let latest = Rc::new(Cell::new(None));

        let sink = latest.clone();
        let source = window.clone();
        let listener = Closure::<dyn FnMut(DeviceOrientationEvent)>::new(
            move |event: DeviceOrientationEvent| {
                sink.set(Some(OrientationReading {
                    alpha: event.alpha(),
                    beta: event.beta(),
                    gamma: event.gamma(),
                    screen_angle: screen_angle(&source),
                }));
            },
        );

        window
            .add_event_listener_with_callback(EVENT, listener.as_ref().unchecked_ref())
            .map_err(js_err)?;
        tracing::debug!("Listening for {EVENT}");

        Ok(Self {
            window: window.clone(),
            latest,
            listener,
        })
    }
}

impl OrientationSource for DeviceOrientationFeed {
    fn latest(&self) -> Option<OrientationReading> {
        self.latest.get()
    }
}

impl Drop for DeviceOrientationFeed {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback(EVENT, self.listener.as_ref().unchecked_ref());
    }
}

/// Current screen rotation in degrees.
///
/// `screen.orientation.angle` where available, else the legacy
/// `window.orientation` (older iOS Safari), else 0.
fn screen_angle(window: &Window) -> f64 {
    if let Ok(angle) = window.screen().and_then(|s| s.orientation().angle()) {
        return f64::from(angle);
    }
    Reflect::get(window, &JsValue::from_str("orientation"))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}
