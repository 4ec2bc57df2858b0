//! In-memory collaborators for unit tests.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::events::bus::{BusEvent, EventBus};
use crate::models::device::{DeviceDescriptor, DeviceKind};
use crate::models::error::RecordError;
use crate::models::events::{RecordEvent, RecordEventKind};
use crate::processing::waveform::WaveformMode;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider, CaptureStream};
use crate::traits::encoder::{EncoderFactory, EncoderOptions, MediaEncoder};
use crate::traits::renderer::{RenderRequest, RenderSource, WaveformRenderer};

struct StreamState {
    sample_rate: f64,
    live: bool,
    level: f32,
    listeners: Vec<AudioBufferCallback>,
    stopped: bool,
}

/// Shared view of a [`FakeStream`] that survives the stream being boxed.
#[derive(Clone)]
pub struct StreamHandle(Arc<Mutex<StreamState>>);

impl StreamHandle {
    /// Push PCM to every registered listener, as the audio thread would.
    pub fn deliver_pcm(&self, samples: &[f32]) {
        let (listeners, rate) = {
            let state = self.0.lock();
            (state.listeners.clone(), state.sample_rate)
        };
        for listener in listeners {
            listener(samples, rate, 1);
        }
    }

    /// Value the analysis tap reports for every sample.
    pub fn set_level(&self, level: f32) {
        self.0.lock().level = level;
    }

    pub fn is_stopped(&self) -> bool {
        self.0.lock().stopped
    }
}

pub struct FakeStream {
    state: Arc<Mutex<StreamState>>,
}

impl FakeStream {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(StreamState {
                sample_rate,
                live: true,
                level: 0.5,
                listeners: Vec::new(),
                stopped: false,
            })),
        }
    }

    /// A stream whose tracks have all ended.
    pub fn without_audio(self) -> Self {
        self.state.lock().live = false;
        self
    }

    pub fn handle(&self) -> StreamHandle {
        StreamHandle(Arc::clone(&self.state))
    }

    pub fn deliver_pcm(&self, samples: &[f32]) {
        self.handle().deliver_pcm(samples);
    }
}

impl CaptureStream for FakeStream {
    fn sample_rate(&self) -> f64 {
        self.state.lock().sample_rate
    }

    fn has_live_audio(&self) -> bool {
        let state = self.state.lock();
        state.live && !state.stopped
    }

    fn read_time_domain(&mut self, out: &mut [f32]) {
        let level = self.state.lock().level;
        out.fill(level);
    }

    fn add_pcm_listener(&mut self, callback: AudioBufferCallback) {
        self.state.lock().listeners.push(callback);
    }

    fn stop_tracks(&mut self) {
        self.state.lock().stopped = true;
    }
}

type AcquireHook = Arc<dyn Fn() + Send + Sync>;

/// Provider handing out [`FakeStream`]s.
pub struct FakeProvider {
    sample_rate: f64,
    granted: Mutex<bool>,
    devices: Vec<DeviceDescriptor>,
    hook: Mutex<Option<AcquireHook>>,
    streams: Mutex<Vec<StreamHandle>>,
}

impl FakeProvider {
    pub fn granted(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            granted: Mutex::new(true),
            devices: vec![
                DeviceDescriptor {
                    device_id: "default".into(),
                    label: "Built-in Microphone".into(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceDescriptor {
                    device_id: "usb-1".into(),
                    label: String::new(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceDescriptor {
                    device_id: "speakers".into(),
                    label: "Speakers".into(),
                    kind: DeviceKind::AudioOutput,
                },
            ],
            hook: Mutex::new(None),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn deny(&self) {
        *self.granted.lock() = false;
    }

    /// Run `hook` inside `acquire`, before the stream is returned.
    pub fn on_acquire<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    pub fn acquisitions(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn last_stream(&self) -> Option<StreamHandle> {
        self.streams.lock().last().cloned()
    }
}

impl CaptureProvider for FakeProvider {
    fn permission_granted(&self) -> bool {
        *self.granted.lock()
    }

    fn acquire(&self, device_id: Option<&str>) -> Result<Box<dyn CaptureStream>, RecordError> {
        if !self.permission_granted() {
            return Err(RecordError::Acquisition("permission denied".into()));
        }
        if let Some(id) = device_id {
            if !self.devices.iter().any(|d| d.device_id == id) {
                return Err(RecordError::Acquisition(format!("no device {}", id)));
            }
        }

        let stream = FakeStream::new(self.sample_rate);
        self.streams.lock().push(stream.handle());

        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        Ok(Box::new(stream))
    }

    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, RecordError> {
        if !self.permission_granted() {
            return Err(RecordError::Acquisition("permission denied".into()));
        }
        Ok(self.devices.clone())
    }
}

/// Encoder that emits nothing until stop, then a single `b"final"` chunk.
pub struct FakeEncoder {
    mime_type: String,
    fail_stop: bool,
}

impl MediaEncoder for FakeEncoder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self, _timeslice: Option<Duration>) -> Result<(), RecordError> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>, RecordError> {
        if self.fail_stop {
            return Err(RecordError::Encoding("flush failed".into()));
        }
        Ok(vec![b"final".to_vec()])
    }
}

type CreateHook = Arc<dyn Fn() + Send + Sync>;

pub struct FakeEncoderFactory {
    supported: Vec<String>,
    fail_stop: bool,
    hook: Mutex<Option<CreateHook>>,
}

impl FakeEncoderFactory {
    pub fn supporting(types: &[&str]) -> Self {
        Self {
            supported: types.iter().map(|t| t.to_string()).collect(),
            fail_stop: false,
            hook: Mutex::new(None),
        }
    }

    /// Encoders whose `stop` returns an encoding error.
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Run `hook` inside `create`, before the encoder is returned.
    pub fn on_create<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.hook.lock() = Some(Arc::new(hook));
    }
}

impl EncoderFactory for FakeEncoderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|t| t == mime_type)
    }

    fn create(
        &self,
        mime_type: &str,
        _stream: &mut dyn CaptureStream,
        _options: &EncoderOptions,
    ) -> Result<Box<dyn MediaEncoder>, RecordError> {
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
        Ok(Box::new(FakeEncoder {
            mime_type: mime_type.to_string(),
            fail_stop: self.fail_stop,
        }))
    }
}

#[derive(Default)]
struct RendererLog {
    requests: Vec<RenderRequest>,
    times: Vec<f64>,
    begun: Vec<WaveformMode>,
    end_live: usize,
    fail: bool,
}

/// Signals a held load has started, then waits to be let go.
type LoadHold = (Sender<()>, Receiver<()>);

/// Renderer that records every call.
#[derive(Default)]
pub struct FakeRenderer {
    log: Mutex<RendererLog>,
    hold: Mutex<Option<LoadHold>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the next live `load` until the returned sender fires. The
    /// returned receiver fires once that load has started.
    pub fn hold_next_live_load(&self) -> (Receiver<()>, Sender<()>) {
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        *self.hold.lock() = Some((started_tx, release_rx));
        (started_rx, release_tx)
    }

    /// `"live"` or `"artifact"` for every load, in the order they finished.
    pub fn load_order(&self) -> Vec<&'static str> {
        self.log
            .lock()
            .requests
            .iter()
            .map(|r| match r.source {
                RenderSource::Live => "live",
                RenderSource::Artifact(_) => "artifact",
            })
            .collect()
    }

    /// Make every subsequent `load` fail.
    pub fn fail_loads(&self) {
        self.log.lock().fail = true;
    }

    pub fn live_loads(&self) -> usize {
        self.count(|r| r.source == RenderSource::Live)
    }

    pub fn artifact_loads(&self) -> usize {
        self.count(|r| matches!(r.source, RenderSource::Artifact(_)))
    }

    pub fn last_request(&self) -> Option<RenderRequest> {
        self.log.lock().requests.last().cloned()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.log.lock().times.last().copied()
    }

    pub fn begun_modes(&self) -> Vec<WaveformMode> {
        self.log.lock().begun.clone()
    }

    pub fn end_live_calls(&self) -> usize {
        self.log.lock().end_live
    }

    fn count(&self, filter: impl Fn(&RenderRequest) -> bool) -> usize {
        self.log.lock().requests.iter().filter(|r| filter(r)).count()
    }
}

impl WaveformRenderer for FakeRenderer {
    fn load(&self, request: RenderRequest) -> Result<(), RecordError> {
        if request.source == RenderSource::Live {
            let hold = self.hold.lock().take();
            if let Some((started, release)) = hold {
                let _ = started.send(());
                let _ = release.recv();
            }
        }
        let mut log = self.log.lock();
        log.requests.push(request);
        if log.fail {
            return Err(RecordError::Render("decode failed".into()));
        }
        Ok(())
    }

    fn set_time(&self, secs: f64) {
        self.log.lock().times.push(secs);
    }

    fn begin_live(&self, mode: &WaveformMode) {
        self.log.lock().begun.push(*mode);
    }

    fn end_live(&self) {
        self.log.lock().end_live += 1;
    }
}

/// Records the kind of every event on a bus.
#[derive(Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<RecordEvent>>>,
}

impl EventLog {
    pub fn attach(bus: &EventBus<RecordEvent>) -> Self {
        let log = Self {
            events: Arc::new(Mutex::new(Vec::new())),
        };
        for kind in RecordEventKind::ALL {
            let events = Arc::clone(&log.events);
            bus.on(kind, move |event: &RecordEvent| events.lock().push(event.clone()));
        }
        log
    }

    pub fn kinds(&self) -> Vec<RecordEventKind> {
        self.events.lock().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: RecordEventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn events(&self) -> Vec<RecordEvent> {
        self.events.lock().clone()
    }
}
