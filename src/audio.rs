//! Process-wide briefing audio session.
//!
//! Only one briefing plays at a time. Starting another track stops and
//! releases the previous handle before the next one is opened, so two
//! briefings never overlap.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

/// A playing (or paused) track.
pub trait AudioHandle: Send {
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
}

/// Opens tracks for playback.
pub trait AudioBackend: Send + Sync {
    fn open(&self, track: &str, payload: &[u8]) -> Box<dyn AudioHandle>;
}

/// Backend used when nothing else was installed: tracks "play" silently.
#[derive(Debug, Default)]
pub struct SilentBackend;

struct SilentHandle;

impl AudioHandle for SilentHandle {
    fn pause(&mut self) {}
    fn resume(&mut self) {}
    fn stop(&mut self) {}
}

impl AudioBackend for SilentBackend {
    fn open(&self, track: &str, payload: &[u8]) -> Box<dyn AudioHandle> {
        log::debug!("Silent playback of '{}' ({} bytes)", track, payload.len());
        Box::new(SilentHandle)
    }
}

struct Active {
    track: String,
    handle: Box<dyn AudioHandle>,
    playing: bool,
}

pub struct AudioSession {
    backend: Arc<dyn AudioBackend>,
    active: Mutex<Option<Active>>,
}

static GLOBAL: OnceCell<AudioSession> = OnceCell::new();

impl AudioSession {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            active: Mutex::new(None),
        }
    }

    /// Installs the process-wide session. Returns `false` if one was already
    /// installed (or already created by [`AudioSession::global`]).
    pub fn install(backend: Arc<dyn AudioBackend>) -> bool {
        GLOBAL.set(Self::new(backend)).is_ok()
    }

    /// The process-wide session, silent unless a backend was installed first.
    pub fn global() -> &'static AudioSession {
        GLOBAL.get_or_init(|| Self::new(Arc::new(SilentBackend)))
    }

    /// Plays `track`, stopping whatever was active first.
    pub fn play(&self, track: &str, payload: &[u8]) {
        let mut active = self.active.lock();
        if let Some(mut previous) = active.take() {
            log::debug!("Stopping '{}' before playing '{}'", previous.track, track);
            previous.handle.stop();
        }
        let handle = self.backend.open(track, payload);
        *active = Some(Active {
            track: track.to_string(),
            handle,
            playing: true,
        });
    }

    pub fn pause(&self) {
        if let Some(active) = self.active.lock().as_mut().filter(|a| a.playing) {
            active.handle.pause();
            active.playing = false;
        }
    }

    pub fn resume(&self) {
        if let Some(active) = self.active.lock().as_mut().filter(|a| !a.playing) {
            active.handle.resume();
            active.playing = true;
        }
    }

    /// Stops and releases the active track, if any.
    pub fn stop(&self) {
        if let Some(mut active) = self.active.lock().take() {
            active.handle.stop();
        }
    }

    /// Track that is loaded, playing or paused.
    pub fn current(&self) -> Option<String> {
        self.active.lock().as_ref().map(|a| a.track.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.active.lock().as_ref().is_some_and(|a| a.playing)
    }
}
