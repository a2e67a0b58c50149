use anyhow::Result;

use crate::backend::{BackendClient, SystemStatus, DEFAULT_API_URL};
use crate::config::Config;
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Derived UI phase, computed from status + loading rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    Ready,
    NotReady,
    Initializing,
    Searching,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Session state: status, transcript, input buffer, loading, error banner
    pub status: Option<SystemStatus>,
    pub transcript: Transcript,
    pub input: String,
    pub cursor: usize, // char index into input
    pub loading: bool,
    pub error: String,

    // Presentation state
    pub dark_mode: bool,
    pub scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Remote service
    pub backend: BackendClient,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let api_url = std::env::var("RAGMATE_API_URL")
            .ok()
            .or_else(|| config.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Normal,

            status: None,
            transcript: Transcript::new(),
            input: String::new(),
            cursor: 0,
            loading: false,
            error: String::new(),

            dark_mode: config.dark_mode(),
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,

            backend: BackendClient::new(&api_url)?,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_ref().map(|s| s.ready).unwrap_or(false)
    }

    pub fn phase(&self) -> Phase {
        match &self.status {
            None => Phase::Checking,
            Some(status) => {
                if self.loading {
                    if status.ready {
                        Phase::Searching
                    } else {
                        Phase::Initializing
                    }
                } else if status.ready {
                    Phase::Ready
                } else {
                    Phase::NotReady
                }
            }
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
        // A write failure only costs the next session its preference
        let _ = Config::save_theme(self.dark_mode);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let max_scroll = self.transcript_lines().saturating_sub(self.chat_height);
        if self.scroll < max_scroll {
            self.scroll += 1;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    /// Scroll so the newest message (and the loading indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        let total = self.transcript_lines();
        let visible = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.scroll = total.saturating_sub(visible);
    }

    /// Estimated rendered line count of the transcript, using the chat pane
    /// width for wrap math. Mirrors the line structure ui.rs produces.
    fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: u16 = 0;
        for msg in self.transcript.entries() {
            total += 1; // role line
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total += 1;
                } else {
                    total += ((char_count / wrap_width) + 1) as u16;
                }
            }
            if !msg.sources.is_empty() {
                total += 1; // "Sources:" line
                for source in &msg.sources {
                    total += 1;
                    if let crate::transcript::Source::Citation {
                        excerpt: Some(_), ..
                    } = source
                    {
                        total += 1;
                    }
                }
            }
            total += 2; // timestamp + blank line
        }

        if self.loading {
            total += 2; // role line + "Thinking..." indicator
        }

        total
    }

    /// Viewport dimensions for the chat pane, fed in by the run loop before
    /// each draw so the renderer itself never writes back into the App.
    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.chat_width = width;
        self.chat_height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SystemStatus;

    fn test_app() -> App {
        App::new(&Config::new()).unwrap()
    }

    #[test]
    fn test_phase_before_first_probe_is_checking() {
        let app = test_app();
        assert_eq!(app.phase(), Phase::Checking);
        assert!(!app.is_ready());
    }

    #[test]
    fn test_phase_transitions() {
        let mut app = test_app();

        app.status = Some(SystemStatus {
            ready: false,
            database_status: "missing".into(),
        });
        assert_eq!(app.phase(), Phase::NotReady);

        app.loading = true;
        assert_eq!(app.phase(), Phase::Initializing);

        app.status = Some(SystemStatus {
            ready: true,
            database_status: "connected".into(),
        });
        assert_eq!(app.phase(), Phase::Searching);

        app.loading = false;
        assert_eq!(app.phase(), Phase::Ready);
    }

    #[test]
    fn test_search_never_regresses_readiness() {
        let mut app = test_app();
        app.status = Some(SystemStatus {
            ready: true,
            database_status: "connected".into(),
        });
        app.loading = true;
        assert!(app.is_ready());
        assert_eq!(app.phase(), Phase::Searching);
    }
}
