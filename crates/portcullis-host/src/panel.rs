//! Console keypad and display.

use std::{
    collections::VecDeque,
    io::BufRead,
    time::Duration,
};

use portcullis_core::{Key, Panel, PanelError};

/// Columns of the character display.
pub const COLUMNS: usize = 16;

/// Rows of the character display.
pub const ROWS: usize = 2;

enum KeySource {
    Script(VecDeque<char>),
    Stdin(VecDeque<char>),
}

/// Keypad fed from a script or stdin, display rendered through `tracing`.
///
/// Text past the last column is kept rather than clipped, so long prompts
/// remain readable in logs.
pub struct ConsolePanel {
    keys: KeySource,
    rows: [String; ROWS],
    cursor: (usize, usize),
    realtime_holds: bool,
}

impl ConsolePanel {
    /// Keys taken from `script`, one per character. Whitespace is skipped.
    ///
    /// The keypad reports disconnection once the script is exhausted.
    #[must_use]
    pub fn scripted(script: &str) -> Self {
        let keys = script.chars().filter(|c| !c.is_whitespace()).collect();
        Self::with_source(KeySource::Script(keys))
    }

    /// Keys read line by line from stdin. End of input disconnects the keypad.
    #[must_use]
    pub fn stdin() -> Self {
        Self::with_source(KeySource::Stdin(VecDeque::new()))
    }

    fn with_source(keys: KeySource) -> Self {
        Self { keys, rows: Default::default(), cursor: (0, 0), realtime_holds: true }
    }

    /// Skip hold delays instead of sleeping through them.
    #[must_use]
    pub fn without_holds(mut self) -> Self {
        self.realtime_holds = false;
        self
    }

    /// Current display contents.
    pub fn rows(&self) -> &[String; ROWS] {
        &self.rows
    }

    fn write(&mut self, text: &str) {
        let (row, col) = self.cursor;
        let line = &mut self.rows[row];

        let mut chars: Vec<char> = line.chars().collect();
        if chars.len() < col {
            chars.resize(col, ' ');
        }
        for (i, c) in text.chars().enumerate() {
            match chars.get_mut(col + i) {
                Some(slot) => *slot = c,
                None => chars.push(c),
            }
        }
        *line = chars.into_iter().collect();
        self.cursor = (row, col + text.chars().count());

        tracing::info!(target: "portcullis::display", row0 = %self.rows[0], row1 = %self.rows[1]);
    }

    fn next_char(&mut self) -> Option<char> {
        match &mut self.keys {
            KeySource::Script(keys) => keys.pop_front(),
            KeySource::Stdin(pending) => loop {
                if let Some(c) = pending.pop_front() {
                    return Some(c);
                }
                let mut line = String::new();
                match std::io::stdin().lock().read_line(&mut line) {
                    Ok(0) | Err(_) => return None,
                    Ok(_) => pending.extend(line.chars().filter(|c| !c.is_whitespace())),
                }
            },
        }
    }
}

impl Panel for ConsolePanel {
    fn clear(&mut self) {
        self.rows = Default::default();
        self.cursor = (0, 0);
    }

    fn display_text(&mut self, text: &str) {
        self.write(text);
    }

    fn display_text_at(&mut self, row: u8, col: u8, text: &str) {
        self.cursor = (usize::from(row).min(ROWS - 1), usize::from(col).min(COLUMNS - 1));
        self.write(text);
    }

    fn read_key(&mut self) -> Result<Key, PanelError> {
        let c = self.next_char().ok_or(PanelError::Disconnected)?;
        tracing::debug!(target: "portcullis::keypad", "key pressed");
        Ok(Key::from_char(c))
    }

    fn hold(&mut self, duration: Duration) {
        if self.realtime_holds {
            std::thread::sleep(duration);
        }
    }
}
