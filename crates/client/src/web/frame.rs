//! `requestAnimationFrame` driver for the render loop.

use std::cell::RefCell;
use std::rc::Rc;

use strata_core::{FrameRenderer, FrameScheduler, OrientationSource, RenderLoop};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use super::describe;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Re-arms the stored frame callback with `requestAnimationFrame`.
pub struct AnimationFrameScheduler {
    window: Window,
    callback: FrameCallback,
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_next_frame(&mut self) {
        let slot = self.callback.borrow();
        let Some(callback) = slot.as_ref() else {
            return;
        };
        if let Err(e) = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            tracing::error!("requestAnimationFrame failed: {}", describe(&e));
        }
    }
}

/// Start the loop. It owns the render loop and never stops.
pub fn run<M, R, S>(window: Window, mut render_loop: RenderLoop<M, R, S>)
where
    M: 'static,
    R: FrameRenderer<M> + 'static,
    S: OrientationSource + 'static,
{
    let callback: FrameCallback = Rc::new(RefCell::new(None));

    let mut scheduler = AnimationFrameScheduler {
        window: window.clone(),
        callback: callback.clone(),
    };
    *callback.borrow_mut() = Some(Closure::new(move || {
        render_loop.frame(&mut scheduler);
    }));

    AnimationFrameScheduler { window, callback }.request_next_frame();
    tracing::info!("Render loop started");
}
