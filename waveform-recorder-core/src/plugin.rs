use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::frames::{FrameScheduler, IntervalFrames, DEFAULT_FRAME_RATE};
use crate::clock::tick_clock::TickClock;
use crate::clock::time::{MonotonicTime, TimeSource};
use crate::events::bus::{EventBus, ListenerId};
use crate::models::artifact::RecordingArtifact;
use crate::models::config::RecordConfiguration;
use crate::models::device::DeviceDescriptor;
use crate::models::error::RecordError;
use crate::models::events::{RecordEvent, RecordEventKind};
use crate::models::state::RecordState;
use crate::session::recorder::CaptureSessionManager;
use crate::traits::capture_provider::{CaptureProvider, CaptureSource};
use crate::traits::encoder::EncoderFactory;
use crate::traits::renderer::WaveformRenderer;

/// Collaborators the host platform supplies.
pub struct Platform {
    pub capture: Arc<dyn CaptureProvider>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub renderer: Option<Arc<dyn WaveformRenderer>>,
    /// Frame source; an [`IntervalFrames`] at [`DEFAULT_FRAME_RATE`] when `None`.
    pub frames: Option<Arc<dyn FrameScheduler>>,
    pub time: Arc<dyn TimeSource>,
}

impl Platform {
    pub fn new(capture: Arc<dyn CaptureProvider>, encoders: Arc<dyn EncoderFactory>) -> Self {
        Self {
            capture,
            encoders,
            renderer: None,
            frames: None,
            time: Arc::new(MonotonicTime::new()),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn WaveformRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_frames(mut self, frames: Arc<dyn FrameScheduler>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn with_time(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }
}

/// Host-facing recorder: configuration, subscriptions and session control.
///
/// ```text
/// host ──start/pause/resume/stop──→ [CaptureSessionManager]
///   ↑                                        │
///   └──────────on/once/off──── [EventBus] ←──┘ record-* events
/// ```
pub struct RecordPlugin {
    bus: Arc<EventBus<RecordEvent>>,
    session: CaptureSessionManager,
    renderer: Option<Arc<dyn WaveformRenderer>>,
    destroyed: AtomicBool,
}

impl RecordPlugin {
    /// Validate `config` and wire it to the platform.
    pub fn create(config: RecordConfiguration, platform: Platform) -> Result<Self, RecordError> {
        config.validate()?;

        let frames: Arc<dyn FrameScheduler> = match platform.frames {
            Some(frames) => frames,
            None => Arc::new(IntervalFrames::at_rate(DEFAULT_FRAME_RATE)?),
        };
        let bus = Arc::new(EventBus::new());
        let session = CaptureSessionManager::new(
            config,
            Arc::clone(&bus),
            TickClock::new(frames),
            platform.capture,
            platform.encoders,
            platform.renderer.clone(),
            platform.time,
        );

        log::debug!("record plugin created with {:?}", session.config());
        Ok(Self {
            bus,
            session,
            renderer: platform.renderer,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Create from camelCase JSON options, e.g. `{"scrollingWaveform": true}`.
    pub fn from_json(options: &str, platform: Platform) -> Result<Self, RecordError> {
        Self::create(RecordConfiguration::from_json(options)?, platform)
    }

    pub fn config(&self) -> &RecordConfiguration {
        self.session.config()
    }

    pub fn on<F>(&self, kind: RecordEventKind, handler: F) -> ListenerId
    where
        F: Fn(&RecordEvent) + Send + Sync + 'static,
    {
        self.bus.on(kind, handler)
    }

    pub fn once<F>(&self, kind: RecordEventKind, handler: F) -> ListenerId
    where
        F: Fn(&RecordEvent) + Send + Sync + 'static,
    {
        self.bus.once(kind, handler)
    }

    pub fn off(&self, kind: RecordEventKind, id: ListenerId) -> bool {
        self.bus.off(kind, id)
    }

    /// Record from the default input device.
    pub fn start_mic(&self) -> Result<(), RecordError> {
        self.start_recording(CaptureSource::Device(None))
    }

    pub fn start_recording(&self, source: CaptureSource) -> Result<(), RecordError> {
        if self.is_destroyed() {
            return Err(RecordError::InvalidState("recorder has been destroyed".into()));
        }
        self.session.start_recording(source)
    }

    pub fn stop_recording(&self) -> Result<Option<Arc<RecordingArtifact>>, RecordError> {
        self.session.stop_recording()
    }

    pub fn pause_recording(&self) -> Result<(), RecordError> {
        self.session.pause_recording()
    }

    pub fn resume_recording(&self) -> Result<(), RecordError> {
        self.session.resume_recording()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }

    pub fn state(&self) -> RecordState {
        self.session.state()
    }

    pub fn duration(&self) -> Duration {
        self.session.duration()
    }

    pub fn mime_type(&self) -> Option<String> {
        self.session.mime_type()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Tear down: restore the renderer, emit `destroy`, drop every
    /// subscription and stop any session without further events.
    /// Safe to call more than once.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(renderer) = &self.renderer {
            renderer.end_live();
        }
        self.bus.destroy();

        match self.session.shutdown() {
            Ok(Some(artifact)) => log::info!("discarded {} byte recording on destroy", artifact.size()),
            Ok(None) => {}
            Err(e) => log::warn!("session did not stop cleanly on destroy: {}", e),
        }
        log::debug!("record plugin destroyed");
    }

    /// Audio input devices, labelled or not.
    pub fn list_input_devices(provider: &dyn CaptureProvider) -> Result<Vec<DeviceDescriptor>, RecordError> {
        let devices = provider.list_devices()?;
        Ok(devices.into_iter().filter(DeviceDescriptor::is_audio_input).collect())
    }
}
