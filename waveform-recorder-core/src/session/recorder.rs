use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

use crate::clock::tick_clock::TickClock;
use crate::clock::time::TimeSource;
use crate::events::bus::{EventBus, ListenerId};
use crate::models::artifact::RecordingArtifact;
use crate::models::config::RecordConfiguration;
use crate::models::error::RecordError;
use crate::models::events::{format_progress, RecordEvent};
use crate::models::state::RecordState;
use crate::processing::levels::{peak_level, rms_level};
use crate::processing::waveform::{WaveformBuilder, WaveformMode};
use crate::traits::capture_provider::{CaptureProvider, CaptureSource, CaptureStream};
use crate::traits::encoder::{EncoderFactory, EncoderOptions, MediaEncoder};
use crate::traits::renderer::{RenderRequest, WaveformRenderer};

/// Samples read from the stream per tick (half a 2048-point analysis frame).
pub const ANALYSIS_WINDOW: usize = 1024;

/// Samples per tick in continuous mode, where only the peak is kept.
pub const CONTINUOUS_ANALYSIS_WINDOW: usize = 16;

/// Everything one recording owns between start and stop.
struct ActiveSession {
    id: String,
    stream: Box<dyn CaptureStream>,
    encoder: Box<dyn MediaEncoder>,
    builder: WaveformBuilder,
    window: Vec<f32>,
    chunks: Vec<Vec<u8>>,
    mime_type: String,
    config: RecordConfiguration,
}

/// Internal mutable state, protected by `parking_lot::Mutex`.
struct ManagerState {
    state: RecordState,
    session: Option<ActiveSession>,
    tick_listener: Option<ListenerId>,
    /// Time at which the current recording run (start or resume) began.
    run_start: Duration,
    /// Duration accumulated before the current run.
    accumulated: Duration,
    cancel_acquisition: bool,
    /// Bumped for every session that reaches `Recording`.
    serial: u64,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            state: RecordState::Idle,
            session: None,
            tick_listener: None,
            run_start: Duration::ZERO,
            accumulated: Duration::ZERO,
            cancel_acquisition: false,
            serial: 0,
        }
    }

    fn duration_at(&self, now: Duration) -> Duration {
        match self.state {
            RecordState::Recording => self.accumulated + now.saturating_sub(self.run_start),
            _ => self.accumulated,
        }
    }
}

/// State and collaborators the tick callback needs.
struct SessionCore {
    /// Held for a whole tick and by pause, resume and stop, so a tick on the
    /// frame thread never interleaves with them. Reentrant so handlers and
    /// renderers may call back into the recorder.
    ticking: ReentrantMutex<()>,
    state: Mutex<ManagerState>,
    bus: Arc<EventBus<RecordEvent>>,
    renderer: Option<Arc<dyn WaveformRenderer>>,
    time: Arc<dyn TimeSource>,
}

impl SessionCore {
    fn duration(&self) -> Duration {
        self.state.lock().duration_at(self.time.now())
    }

    /// Whether the session numbered `serial` is still recording.
    fn still_recording(&self, serial: u64) -> bool {
        let s = self.state.lock();
        s.state == RecordState::Recording && s.serial == serial
    }

    /// One sampling cycle: read the analysis window, update the waveform,
    /// collect encoder output, then render and publish with the state
    /// lock released.
    fn tick(&self) {
        let _ticking = self.ticking.lock();
        let (snapshot, chunks, duration, continuous, serial) = {
            let mut guard = self.state.lock();
            if guard.state != RecordState::Recording {
                return;
            }
            let duration = guard.duration_at(self.time.now());
            let serial = guard.serial;
            let Some(session) = guard.session.as_mut() else {
                return;
            };

            let ActiveSession {
                stream,
                encoder,
                builder,
                window,
                chunks,
                ..
            } = session;
            stream.read_time_domain(window);
            builder.push(window);
            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "tick at {}: peak {:.3}, rms {:.3}",
                    format_progress(duration),
                    peak_level(window),
                    rms_level(window)
                );
            }

            let fresh = encoder.take_chunks();
            chunks.extend(fresh.iter().cloned());

            let snapshot = self.renderer.as_ref().map(|_| builder.snapshot());
            let continuous = matches!(builder.mode(), WaveformMode::Continuous { .. });
            (snapshot, fresh, duration, continuous, serial)
        };

        if let (Some(renderer), Some(snapshot)) = (&self.renderer, snapshot) {
            match renderer.load(RenderRequest::live(snapshot.samples, snapshot.span_secs)) {
                Ok(()) if continuous => renderer.set_time(duration.as_secs_f64()),
                Ok(()) => {}
                Err(e) => log::error!("Error rendering real-time recording data: {}", e),
            }
        }

        for chunk in chunks {
            if !self.still_recording(serial) {
                return;
            }
            self.bus.emit(RecordEvent::RecordDataAvailable(chunk));
        }
        if self.still_recording(serial) {
            self.bus.emit(RecordEvent::RecordProgress(duration));
        }
    }
}

/// Owns the capture/encode lifecycle of one recording at a time.
///
/// ```text
/// [CaptureStream] ──analysis window──→ [WaveformBuilder] → [WaveformRenderer]
///        └──────PCM──────→ [MediaEncoder] → chunks → [RecordingArtifact]
/// ```
///
/// Ticks come from a [`TickClock`] reused across sessions; the session's
/// tick callback is registered at start and removed at stop.
pub struct CaptureSessionManager {
    core: Arc<SessionCore>,
    clock: TickClock,
    capture: Arc<dyn CaptureProvider>,
    encoders: Arc<dyn EncoderFactory>,
    config: RecordConfiguration,
}

impl CaptureSessionManager {
    pub fn new(
        config: RecordConfiguration,
        bus: Arc<EventBus<RecordEvent>>,
        clock: TickClock,
        capture: Arc<dyn CaptureProvider>,
        encoders: Arc<dyn EncoderFactory>,
        renderer: Option<Arc<dyn WaveformRenderer>>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            core: Arc::new(SessionCore {
                ticking: ReentrantMutex::new(()),
                state: Mutex::new(ManagerState::new()),
                bus,
                renderer,
                time,
            }),
            clock,
            capture,
            encoders,
            config,
        }
    }

    pub fn state(&self) -> RecordState {
        self.core.state.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    pub fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    /// Accumulated recording time, excluding pauses. Kept after stop until the next start.
    pub fn duration(&self) -> Duration {
        self.core.duration()
    }

    /// Encoding format of the active session.
    pub fn mime_type(&self) -> Option<String> {
        self.core
            .state
            .lock()
            .session
            .as_ref()
            .map(|s| s.mime_type.clone())
    }

    pub fn config(&self) -> &RecordConfiguration {
        &self.config
    }

    /// Start a session. Transitions: idle → acquiring → recording.
    pub fn start_recording(&self, source: CaptureSource) -> Result<(), RecordError> {
        self.config.validate()?;
        {
            let mut s = self.core.state.lock();
            if !s.state.is_idle() {
                return Err(RecordError::InvalidState(format!("cannot start while {}", s.state)));
            }
            s.state = RecordState::Acquiring;
            s.cancel_acquisition = false;
        }
        log::debug!("acquiring capture stream from {:?}", source);

        let stream = match self.acquire(source) {
            Ok(stream) => stream,
            Err(e) => {
                self.core.state.lock().state = RecordState::Idle;
                log::warn!("capture acquisition failed: {}", e);
                return Err(e);
            }
        };
        if self.take_cancellation() {
            let mut stream = stream;
            stream.stop_tracks();
            log::info!("recording stopped during acquisition; stream released");
            return Err(RecordError::Cancelled);
        }

        let session = match self.prepare(stream) {
            Ok(session) => session,
            Err(e) => {
                self.core.state.lock().state = RecordState::Idle;
                return Err(e);
            }
        };
        let mode = session.builder.mode();
        let session_id = session.id.clone();
        let mime_type = session.mime_type.clone();

        {
            let mut s = self.core.state.lock();
            if s.cancel_acquisition {
                s.cancel_acquisition = false;
                s.state = RecordState::Idle;
                drop(s);
                release(session);
                log::info!("recording stopped during setup; stream released");
                return Err(RecordError::Cancelled);
            }
            s.session = Some(session);
            s.run_start = self.core.time.now();
            s.accumulated = Duration::ZERO;
            s.serial += 1;
            s.state = RecordState::Recording;
        }

        if let Some(renderer) = &self.core.renderer {
            renderer.begin_live(&mode);
        }

        let core = Arc::clone(&self.core);
        let listener = self.clock.on_tick(move || core.tick());
        self.core.state.lock().tick_listener = Some(listener);

        log::info!("recording {} started ({}, {:?})", session_id, mime_type, mode);
        self.core.bus.emit(RecordEvent::RecordStart);

        // A record-start handler may already have stopped the session.
        if self.state().is_active() {
            self.clock.start();
        }
        Ok(())
    }

    /// Transitions: recording → paused.
    pub fn pause_recording(&self) -> Result<(), RecordError> {
        let _ticking = self.core.ticking.lock();
        let duration = {
            let mut s = self.core.state.lock();
            if s.state != RecordState::Recording {
                return Err(RecordError::InvalidState(format!("cannot pause while {}", s.state)));
            }
            s.accumulated = s.duration_at(self.core.time.now());
            s.state = RecordState::Paused;
            if let Some(session) = s.session.as_mut() {
                session.builder.pause();
                session.encoder.pause();
            }
            s.accumulated
        };

        log::debug!("recording paused at {:?}", duration);
        self.core.bus.emit(RecordEvent::RecordPause(duration));
        Ok(())
    }

    /// Transitions: paused → recording. Duration continues from where it froze.
    pub fn resume_recording(&self) -> Result<(), RecordError> {
        let _ticking = self.core.ticking.lock();
        {
            let mut s = self.core.state.lock();
            if s.state != RecordState::Paused {
                return Err(RecordError::InvalidState(format!("cannot resume while {}", s.state)));
            }
            s.run_start = self.core.time.now();
            s.state = RecordState::Recording;
            if let Some(session) = s.session.as_mut() {
                session.builder.resume();
                session.encoder.resume();
            }
        }

        log::debug!("recording resumed");
        self.core.bus.emit(RecordEvent::RecordResume);
        Ok(())
    }

    /// Stop the session and assemble its artifact.
    ///
    /// Transitions: recording/paused → stopping → idle. Returns `Ok(None)`
    /// when there is nothing to stop; while a stream is still being acquired
    /// the acquisition is cancelled instead.
    pub fn stop_recording(&self) -> Result<Option<Arc<RecordingArtifact>>, RecordError> {
        self.finish(true)
    }

    /// Stop without handing the artifact to the renderer. Used at teardown,
    /// when the bus no longer delivers events.
    pub fn shutdown(&self) -> Result<Option<Arc<RecordingArtifact>>, RecordError> {
        self.finish(false)
    }

    fn finish(&self, render: bool) -> Result<Option<Arc<RecordingArtifact>>, RecordError> {
        let _ticking = self.core.ticking.lock();
        let (session, listener, duration) = {
            let mut s = self.core.state.lock();
            match s.state {
                RecordState::Idle | RecordState::Stopping => return Ok(None),
                RecordState::Acquiring => {
                    s.cancel_acquisition = true;
                    log::info!("stop requested during acquisition");
                    return Ok(None);
                }
                RecordState::Recording | RecordState::Paused => {}
            }
            s.accumulated = s.duration_at(self.core.time.now());
            s.state = RecordState::Stopping;
            (s.session.take(), s.tick_listener.take(), s.accumulated)
        };

        self.clock.stop();
        if let Some(id) = listener {
            self.clock.off_tick(id);
        }

        let Some(mut session) = session else {
            self.core.state.lock().state = RecordState::Idle;
            return Ok(None);
        };

        let flushed = session.encoder.stop();
        session.stream.stop_tracks();
        self.core.state.lock().state = RecordState::Idle;

        let final_chunks = flushed.map_err(|e| {
            log::error!("recording {}: encoder failed to flush: {}", session.id, e);
            e
        })?;

        for chunk in &final_chunks {
            self.core.bus.emit(RecordEvent::RecordDataAvailable(chunk.clone()));
        }
        session.chunks.extend(final_chunks);

        let artifact = Arc::new(RecordingArtifact::assemble(
            std::mem::take(&mut session.chunks),
            &session.mime_type,
            duration,
        ));
        log::info!(
            "recording {} finished: {} bytes of {} over {}",
            session.id,
            artifact.size(),
            artifact.mime_type,
            format_progress(duration)
        );
        log::debug!(
            "recording {}: {} waveform frames from {} Hz capture, {} clock ticks",
            session.id,
            session.builder.frames(),
            session.builder.capture_sample_rate(),
            self.clock.tick_count()
        );
        self.core.bus.emit(RecordEvent::RecordEnd(Arc::clone(&artifact)));

        if render && session.config.render_recorded_audio {
            if let Some(renderer) = &self.core.renderer {
                renderer.end_live();
                if let Err(e) = renderer.load(RenderRequest::artifact(Arc::clone(&artifact))) {
                    log::error!("Error rendering recorded audio: {}", e);
                }
            }
        }

        Ok(Some(artifact))
    }

    fn take_cancellation(&self) -> bool {
        let mut s = self.core.state.lock();
        if s.cancel_acquisition {
            s.cancel_acquisition = false;
            s.state = RecordState::Idle;
            true
        } else {
            false
        }
    }

    fn acquire(&self, source: CaptureSource) -> Result<Box<dyn CaptureStream>, RecordError> {
        match source {
            CaptureSource::Stream(stream) if stream.has_live_audio() => Ok(stream),
            CaptureSource::Stream(mut stream) => {
                stream.stop_tracks();
                if !self.capture.permission_granted() {
                    return Err(RecordError::Acquisition(
                        "no live capture stream and device access was not granted".into(),
                    ));
                }
                log::warn!("supplied stream has no live audio; falling back to the default input");
                self.capture.acquire(None)
            }
            CaptureSource::Device(device_id) => self.capture.acquire(device_id.as_deref()),
        }
    }

    /// Pick a format, create and start the encoder, and size the waveform
    /// buffer. The stream is released on any failure.
    fn prepare(&self, mut stream: Box<dyn CaptureStream>) -> Result<ActiveSession, RecordError> {
        let config = self.config.clone();
        let candidates = config.format_candidates();

        let Some(chosen) = candidates
            .iter()
            .find(|mime| self.encoders.is_type_supported(mime))
            .cloned()
        else {
            stream.stop_tracks();
            log::warn!("none of {:?} is supported", candidates);
            return Err(RecordError::UnsupportedFormat(candidates));
        };

        let options = EncoderOptions {
            audio_bits_per_second: config.audio_bits_per_second,
        };
        let mut encoder = match self.encoders.create(&chosen, stream.as_mut(), &options) {
            Ok(encoder) => encoder,
            Err(e) => {
                stream.stop_tracks();
                return Err(e);
            }
        };
        if let Err(e) = encoder.start(config.timeslice()) {
            stream.stop_tracks();
            return Err(e);
        }

        let mode = config.waveform_mode();
        let window_len = match mode {
            WaveformMode::Continuous { .. } => CONTINUOUS_ANALYSIS_WINDOW,
            _ => ANALYSIS_WINDOW,
        };
        let mime_type = match encoder.mime_type() {
            "" => chosen,
            actual => actual.to_string(),
        };

        Ok(ActiveSession {
            id: uuid::Uuid::new_v4().to_string(),
            builder: WaveformBuilder::new(mode, stream.sample_rate()),
            stream,
            encoder,
            window: vec![0.0; window_len],
            chunks: Vec::new(),
            mime_type,
            config,
        })
    }
}

/// Tear down a session that never started recording.
fn release(mut session: ActiveSession) {
    if let Err(e) = session.encoder.stop() {
        log::debug!("discarding encoder of cancelled session: {}", e);
    }
    session.stream.stop_tracks();
}
