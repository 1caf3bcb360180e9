//! End-to-end startup scenarios against a scripted browser.

use std::cell::{Cell, RefCell};

use strata_core::{
    bootstrap, AssetError, AssetLoader, CaptureConstraints, CaptureError, CaptureHost,
    ConsentHost, FrameRenderer, FrameScheduler, GateError, GateOutcome, LoadProgress, Notifier,
    OrientationReading, OrientationSource, PermissionState, PlatformError, RenderLoop,
    SceneGraph, SensorKind, Startup, StartupError, ViewerConfig, Viewport,
};

const IPHONE: &str = "mozilla/5.0 (iphone; cpu iphone os 17_4 like mac os x) applewebkit/605.1.15";
const WINDOWS: &str = "mozilla/5.0 (windows nt 10.0; win64; x64) applewebkit/537.36";

#[derive(Debug, Clone, PartialEq)]
enum Event {
    ShowPrompt,
    HidePrompt,
    Confirmed,
    Permission(SensorKind),
    OpenCamera,
    PresentVideo,
    Alert(String),
}

struct ScriptedBrowser {
    user_agent: &'static str,
    motion: PermissionState,
    orientation: PermissionState,
    camera: Result<&'static str, CaptureError>,
    events: RefCell<Vec<Event>>,
}

impl ScriptedBrowser {
    fn new(user_agent: &'static str) -> Self {
        Self {
            user_agent,
            motion: PermissionState::Granted,
            orientation: PermissionState::Granted,
            camera: Ok("rear-camera"),
            events: RefCell::new(Vec::new()),
        }
    }

    fn log(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn alerts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Alert(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }
}

impl ConsentHost for ScriptedBrowser {
    fn user_agent(&self) -> String {
        self.user_agent.to_string()
    }

    fn show_consent_prompt(&self) {
        self.log(Event::ShowPrompt);
    }

    fn hide_consent_prompt(&self) {
        self.log(Event::HidePrompt);
    }

    async fn consent_confirmed(&self) {
        self.log(Event::Confirmed);
    }

    async fn request_sensor_permission(
        &self,
        sensor: SensorKind,
    ) -> Result<PermissionState, PlatformError> {
        self.log(Event::Permission(sensor));
        Ok(match sensor {
            SensorKind::Motion => self.motion,
            SensorKind::Orientation => self.orientation,
        })
    }
}

impl CaptureHost for ScriptedBrowser {
    type Stream = &'static str;

    async fn open_camera(
        &self,
        _constraints: &CaptureConstraints,
    ) -> Result<&'static str, CaptureError> {
        self.log(Event::OpenCamera);
        self.camera.clone()
    }

    fn present_video(&self, _stream: &&'static str) -> Result<(), CaptureError> {
        self.log(Event::PresentVideo);
        Ok(())
    }
}

impl Notifier for ScriptedBrowser {
    fn alert(&self, message: &str) {
        self.log(Event::Alert(message.to_string()));
    }
}

#[derive(Default)]
struct FrameCounter {
    scheduled: u32,
}

impl FrameScheduler for FrameCounter {
    fn request_next_frame(&mut self) {
        self.scheduled += 1;
    }
}

#[derive(Default)]
struct DrawCounter {
    draws: u32,
}

impl FrameRenderer<&'static str> for DrawCounter {
    type Error = String;

    fn render(&mut self, _scene: &SceneGraph<&'static str>) -> Result<(), String> {
        self.draws += 1;
        Ok(())
    }
}

struct HeldUpright;

impl OrientationSource for HeldUpright {
    fn latest(&self) -> Option<OrientationReading> {
        Some(OrientationReading {
            alpha: Some(0.0),
            beta: Some(90.0),
            gamma: Some(0.0),
            screen_angle: 0.0,
        })
    }
}

struct StrataModel {
    loads: Cell<u32>,
}

impl AssetLoader<&'static str> for &StrataModel {
    async fn load(
        &self,
        _path: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<&'static str, AssetError> {
        self.loads.set(self.loads.get() + 1);
        on_progress(LoadProgress {
            loaded: 1024,
            total: Some(1024),
        });
        Ok("tinker2")
    }
}

type Viewer = RenderLoop<&'static str, DrawCounter, HeldUpright>;

/// Mirrors the browser entry: startup, then bootstrap only if startup succeeded.
fn launch<'m>(
    browser: &ScriptedBrowser,
    model: &'m StrataModel,
) -> (Result<GateOutcome, StartupError>, Option<(Viewer, impl std::future::Future<Output = ()> + 'm)>) {
    let config = ViewerConfig::default();
    let viewport = Viewport {
        width: 390.0,
        height: 844.0,
        device_pixel_ratio: 3.0,
    };

    match pollster::block_on(Startup::new(browser).run()) {
        Ok(launch) => {
            let (render_loop, load) = bootstrap(
                &config,
                viewport,
                DrawCounter::default(),
                Some(HeldUpright),
                model,
            );
            (Ok(launch.gate), Some((render_loop, load)))
        }
        Err(e) => (Err(e), None),
    }
}

#[test]
fn iphone_full_flow() {
    let browser = ScriptedBrowser::new(IPHONE);
    let model = StrataModel { loads: Cell::new(0) };

    let (gate, viewer) = launch(&browser, &model);
    assert_eq!(
        gate,
        Ok(GateOutcome::Granted {
            motion: PermissionState::Granted,
            orientation: PermissionState::Granted,
        })
    );
    assert_eq!(
        browser.events(),
        vec![
            Event::ShowPrompt,
            Event::Confirmed,
            Event::Permission(SensorKind::Motion),
            Event::Permission(SensorKind::Orientation),
            Event::HidePrompt,
            Event::OpenCamera,
            Event::PresentVideo,
        ]
    );

    let (mut viewer, load) = viewer.expect("scene bootstrapped");
    let mut frames = FrameCounter::default();
    viewer.frame(&mut frames);

    pollster::block_on(load);
    assert_eq!(model.loads.get(), 1);

    for _ in 0..100 {
        viewer.frame(&mut frames);
    }

    assert_eq!(frames.scheduled, 101);
    assert_eq!(viewer.renderer().draws, 101);
    let spin = viewer.scene().model().expect("model present").transform.rotation.y;
    assert!((spin - 100.0 * 0.002).abs() < 1e-4);
    assert!(browser.alerts().is_empty());
}

#[test]
fn windows_skips_prompt() {
    let browser = ScriptedBrowser::new(WINDOWS);
    let model = StrataModel { loads: Cell::new(0) };

    let (gate, viewer) = launch(&browser, &model);

    assert_eq!(gate, Ok(GateOutcome::Skipped));
    assert_eq!(browser.events(), vec![Event::OpenCamera, Event::PresentVideo]);
    assert!(viewer.is_some());
}

#[test]
fn camera_rejection_still_builds_scene() {
    let mut browser = ScriptedBrowser::new(WINDOWS);
    browser.camera = Err(CaptureError::from_dom_name(
        "NotAllowedError",
        "Permission denied",
    ));
    let model = StrataModel { loads: Cell::new(0) };

    let (gate, viewer) = launch(&browser, &model);

    assert!(gate.is_ok());
    assert_eq!(browser.alerts(), vec![CaptureError::USER_MESSAGE.to_string()]);
    assert!(!browser.events().contains(&Event::PresentVideo));

    let (mut viewer, _load) = viewer.expect("scene still bootstrapped");
    let mut frames = FrameCounter::default();
    viewer.frame(&mut frames);
    viewer.frame(&mut frames);
    assert_eq!(viewer.renderer().draws, 2);
    assert!(viewer.scene().model().is_none());
}

#[test]
fn denied_sensors_halt_startup() {
    let mut browser = ScriptedBrowser::new(IPHONE);
    browser.motion = PermissionState::Denied;
    browser.orientation = PermissionState::Denied;
    let model = StrataModel { loads: Cell::new(0) };

    let (gate, viewer) = launch(&browser, &model);

    assert!(matches!(
        gate,
        Err(StartupError::Permission(GateError::Denied { .. }))
    ));
    assert!(viewer.is_none());
    assert!(!browser.events().contains(&Event::OpenCamera));
    assert!(!browser.events().contains(&Event::HidePrompt));
    assert_eq!(browser.alerts(), vec!["Motion sensor access was denied.".to_string()]);
    assert_eq!(model.loads.get(), 0);
}
