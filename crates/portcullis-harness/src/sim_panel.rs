//! Scripted keypad with a display transcript.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use portcullis_core::{Key, Panel, PanelError};

#[derive(Default)]
struct PanelState {
    keys: VecDeque<Key>,
    transcript: Vec<String>,
    holds: Vec<Duration>,
}

/// Keypad fed by the test, display recorded as a transcript.
///
/// Clones share state: keep one handle to press keys and read the transcript
/// while the front node owns another. Holds are recorded, never slept.
#[derive(Clone, Default)]
pub struct ScriptedPanel {
    state: Arc<Mutex<PanelState>>,
}

impl ScriptedPanel {
    /// Panel with no pending keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue key presses, one per character. Whitespace is skipped.
    pub fn press(&self, keys: &str) {
        self.lock().keys.extend(keys.chars().filter(|c| !c.is_whitespace()).map(Key::from_char));
    }

    /// Keys queued but not yet read.
    pub fn pending_keys(&self) -> usize {
        self.lock().keys.len()
    }

    /// Every text written to the display, oldest first.
    pub fn transcript(&self) -> Vec<String> {
        self.lock().transcript.clone()
    }

    /// Drain the transcript.
    pub fn take_transcript(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().transcript)
    }

    /// Every hold requested, oldest first.
    pub fn holds(&self) -> Vec<Duration> {
        self.lock().holds.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Panel for ScriptedPanel {
    fn clear(&mut self) {}

    fn display_text(&mut self, text: &str) {
        self.lock().transcript.push(text.to_owned());
    }

    fn display_text_at(&mut self, _row: u8, _col: u8, text: &str) {
        self.lock().transcript.push(text.to_owned());
    }

    fn read_key(&mut self) -> Result<Key, PanelError> {
        self.lock().keys.pop_front().ok_or(PanelError::Disconnected)
    }

    fn hold(&mut self, duration: Duration) {
        self.lock().holds.push(duration);
    }
}
