//! Adapters between optional device capabilities and the chat core.
//!
//! Voice capture feeds the same input buffer typed text goes into, and reply
//! listeners (speech playback, celebratory effects) observe finished
//! assistant replies. Nothing here is persisted.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};

/// Speech-to-text provider.
///
/// The provider reports back through [`InteractionBridge::on_capture_start`],
/// [`InteractionBridge::on_capture_result`] and
/// [`InteractionBridge::on_capture_end`].
pub trait VoiceCapture: Send + Sync {
    fn start(&self) -> ChatResult<()>;
    fn stop(&self) -> ChatResult<()>;
}

/// Text-to-speech provider
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str) -> ChatResult<()>;
}

/// Observer of successful assistant replies
pub trait ReplyListener: Send + Sync {
    fn on_reply(&self, text: &str) -> ChatResult<()>;
}

/// Reply listener that reads replies aloud while audio is enabled
pub struct SpeechPlayback<S> {
    synthesizer: S,
    enabled: AtomicBool,
}

impl<S: SpeechSynthesizer> SpeechPlayback<S> {
    pub fn new(synthesizer: S, enabled: bool) -> Self {
        Self {
            synthesizer,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl<S: SpeechSynthesizer> ReplyListener for SpeechPlayback<S> {
    fn on_reply(&self, text: &str) -> ChatResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.synthesizer.speak(text)
    }
}

#[derive(Default)]
struct BridgeInner {
    input: Mutex<String>,
    listening: AtomicBool,
    capture: RwLock<Option<Arc<dyn VoiceCapture>>>,
    listeners: RwLock<Vec<Arc<dyn ReplyListener>>>,
}

/// Input buffer, capture flag and reply fan-out shared with the UI
#[derive(Clone, Default)]
pub struct InteractionBridge {
    inner: Arc<BridgeInner>,
}

impl InteractionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Input buffer
    // =========================================================================

    /// Replace the buffer with typed text
    pub fn set_input(&self, text: impl Into<String>) {
        *self.inner.input.lock() = text.into();
    }

    pub fn input(&self) -> String {
        self.inner.input.lock().clone()
    }

    /// Take the buffer contents, leaving it empty
    pub fn take_input(&self) -> String {
        std::mem::take(&mut *self.inner.input.lock())
    }

    /// Add a finalized utterance to the buffer. Does not send anything.
    pub fn submit_captured_text(&self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            let mut input = self.inner.input.lock();
            if input.is_empty() {
                input.push_str(text);
            } else {
                input.push(' ');
                input.push_str(text);
            }
        }
        self.inner.listening.store(false, Ordering::SeqCst);
    }

    // =========================================================================
    // Voice capture
    // =========================================================================

    pub fn set_voice_capture(&self, capture: Arc<dyn VoiceCapture>) {
        *self.inner.capture.write() = Some(capture);
    }

    pub fn has_voice_capture(&self) -> bool {
        self.inner.capture.read().is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    pub fn start_listening(&self) -> ChatResult<()> {
        let capture = self
            .inner
            .capture
            .read()
            .clone()
            .ok_or_else(|| ChatError::ProviderNotConfigured("voice capture".to_string()))?;
        capture.start()
    }

    pub fn stop_listening(&self) -> ChatResult<()> {
        let capture = self.inner.capture.read().clone();
        self.inner.listening.store(false, Ordering::SeqCst);
        match capture {
            Some(capture) => capture.stop(),
            None => Ok(()),
        }
    }

    pub fn on_capture_start(&self) {
        self.inner.listening.store(true, Ordering::SeqCst);
    }

    pub fn on_capture_result(&self, text: &str) {
        self.submit_captured_text(text);
    }

    pub fn on_capture_end(&self) {
        self.inner.listening.store(false, Ordering::SeqCst);
    }

    // =========================================================================
    // Reply notification
    // =========================================================================

    pub fn add_reply_listener(&self, listener: Arc<dyn ReplyListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// Hand a finished reply to every listener without blocking the caller.
    ///
    /// Inside a tokio runtime the listeners run on the blocking pool and the
    /// returned handle resolves once all of them are done. Outside a runtime
    /// they run inline and `None` is returned. Listener errors and panics are
    /// logged and dropped.
    pub fn notify_reply_ready(&self, text: &str) -> Option<JoinHandle<()>> {
        let listeners = self.inner.listeners.read().clone();
        if listeners.is_empty() {
            return None;
        }
        debug!(listeners = listeners.len(), "reply ready");

        let text = text.to_string();
        match Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn_blocking(move || run_listeners(&listeners, &text))),
            Err(_) => {
                run_listeners(&listeners, &text);
                None
            }
        }
    }
}

fn run_listeners(listeners: &[Arc<dyn ReplyListener>], text: &str) {
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| listener.on_reply(text))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Reply listener failed: {}", e),
            Err(_) => warn!("Reply listener panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct FakeCapture {
        starts: Mutex<u32>,
        stops: Mutex<u32>,
    }

    impl VoiceCapture for FakeCapture {
        fn start(&self) -> ChatResult<()> {
            *self.starts.lock() += 1;
            Ok(())
        }

        fn stop(&self) -> ChatResult<()> {
            *self.stops.lock() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSynth {
        spoken: Mutex<Vec<String>>,
    }

    impl SpeechSynthesizer for Arc<RecordingSynth> {
        fn speak(&self, text: &str) -> ChatResult<()> {
            self.spoken.lock().push(text.to_string());
            Ok(())
        }
    }

    struct FailingListener;

    impl ReplyListener for FailingListener {
        fn on_reply(&self, _text: &str) -> ChatResult<()> {
            Err(ChatError::ProviderNotConfigured("speaker".into()))
        }
    }

    struct PanickingListener;

    impl ReplyListener for PanickingListener {
        fn on_reply(&self, _text: &str) -> ChatResult<()> {
            panic!("speaker exploded");
        }
    }

    #[test]
    fn test_captured_text_joins_buffer() {
        let bridge = InteractionBridge::new();
        bridge.submit_captured_text("hello");
        assert_eq!(bridge.input(), "hello");

        bridge.submit_captured_text("there");
        assert_eq!(bridge.input(), "hello there");

        bridge.set_input("typed");
        bridge.submit_captured_text("  spoken  ");
        assert_eq!(bridge.take_input(), "typed spoken");
        assert_eq!(bridge.input(), "");
    }

    #[test]
    fn test_capture_flags() {
        let bridge = InteractionBridge::new();
        assert!(bridge.start_listening().is_err());

        let capture = Arc::new(FakeCapture::default());
        bridge.set_voice_capture(capture.clone());
        bridge.start_listening().unwrap();
        assert!(!bridge.is_listening());

        bridge.on_capture_start();
        assert!(bridge.is_listening());

        bridge.on_capture_result("what time is it");
        assert!(!bridge.is_listening());
        assert_eq!(bridge.input(), "what time is it");

        bridge.on_capture_start();
        bridge.stop_listening().unwrap();
        assert!(!bridge.is_listening());
        assert_eq!(*capture.starts.lock(), 1);
        assert_eq!(*capture.stops.lock(), 1);
    }

    #[test]
    fn test_listener_failures_are_swallowed() {
        let bridge = InteractionBridge::new();
        let synth = Arc::new(RecordingSynth::default());
        bridge.add_reply_listener(Arc::new(FailingListener));
        bridge.add_reply_listener(Arc::new(PanickingListener));
        bridge.add_reply_listener(Arc::new(SpeechPlayback::new(synth.clone(), true)));

        assert!(bridge.notify_reply_ready("world").is_none());
        assert_eq!(*synth.spoken.lock(), vec!["world".to_string()]);
    }

    struct SlowListener {
        heard: Mutex<Vec<String>>,
    }

    impl ReplyListener for SlowListener {
        fn on_reply(&self, text: &str) -> ChatResult<()> {
            std::thread::sleep(Duration::from_millis(300));
            self.heard.lock().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_listener_runs_off_the_caller() {
        let bridge = InteractionBridge::new();
        let slow = Arc::new(SlowListener {
            heard: Mutex::new(Vec::new()),
        });
        bridge.add_reply_listener(slow.clone());
        bridge.add_reply_listener(Arc::new(PanickingListener));

        let started = Instant::now();
        let handle = bridge.notify_reply_ready("world").unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(slow.heard.lock().is_empty());

        handle.await.unwrap();
        assert_eq!(*slow.heard.lock(), vec!["world".to_string()]);
    }

    #[tokio::test]
    async fn test_no_listeners_spawns_nothing() {
        let bridge = InteractionBridge::new();
        assert!(bridge.notify_reply_ready("world").is_none());
    }

    #[test]
    fn test_playback_respects_toggle() {
        let synth = Arc::new(RecordingSynth::default());
        let playback = SpeechPlayback::new(synth.clone(), false);
        playback.on_reply("quiet").unwrap();
        assert!(synth.spoken.lock().is_empty());

        playback.set_enabled(true);
        playback.on_reply("loud").unwrap();
        assert_eq!(*synth.spoken.lock(), vec!["loud".to_string()]);
    }
}
