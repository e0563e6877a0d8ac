use async_trait::async_trait;

// ==============================================================================
// VIEW STATE
// ==============================================================================

/// Snapshot of everything the display surface shows for one submission.
///
/// The controller mutates this and hands it to [`Surface::render`]; surfaces
/// never see intermediate imperative writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Local preview reference for the selected file, when staged.
    pub preview: Option<String>,
    /// Busy indicator visibility.
    pub busy: bool,
    /// Text console contents.
    pub console: String,
    /// Processed-video URL bound for playback, once a result arrived.
    pub playback: Option<String>,
}

/// What happened when the surface tried to load and autoplay bound media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Played,
    /// Media loaded but autoplay was refused.
    AutoplayBlocked,
    LoadFailed,
}

// ==============================================================================
// SURFACE
// ==============================================================================

/// A display surface the controller renders into.
#[async_trait]
pub trait Surface: Send {
    /// Show a blocking validation message to the user.
    fn alert(&mut self, message: &str);

    /// Replace the displayed state with `state`.
    fn render(&mut self, state: &ViewState);

    /// Load the bound media and attempt autoplay once loading completes.
    async fn load_and_play(&mut self, url: &str) -> PlaybackOutcome;
}

// ==============================================================================
// TERMINAL SURFACE
// ==============================================================================

/// Renders the view state as plain terminal output.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    last_console: String,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Surface for TerminalSurface {
    fn alert(&mut self, message: &str) {
        eprintln!("{}", message);
    }

    fn render(&mut self, state: &ViewState) {
        if state.console != self.last_console {
            println!("{}", state.console);
            self.last_console = state.console.clone();
        }
    }

    async fn load_and_play(&mut self, url: &str) -> PlaybackOutcome {
        // A terminal cannot play media; report where the processed video lives
        // and treat an empty binding the way a media element would.
        if url.is_empty() {
            return PlaybackOutcome::LoadFailed;
        }
        println!("Processed video available at: {}", url);
        PlaybackOutcome::Played
    }
}

// ==============================================================================
// TEST SURFACE
// ==============================================================================

/// Records every rendered frame; used by controller tests.
#[cfg(test)]
pub struct RecordingSurface {
    pub alerts: Vec<String>,
    pub frames: Vec<ViewState>,
    pub playback_requests: Vec<String>,
    pub playback_outcome: PlaybackOutcome,
}

#[cfg(test)]
impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            alerts: Vec::new(),
            frames: Vec::new(),
            playback_requests: Vec::new(),
            playback_outcome: PlaybackOutcome::Played,
        }
    }

    pub fn with_playback(outcome: PlaybackOutcome) -> Self {
        let mut surface = Self::new();
        surface.playback_outcome = outcome;
        surface
    }

    pub fn last_frame(&self) -> &ViewState {
        self.frames.last().expect("no frames rendered")
    }
}

#[cfg(test)]
#[async_trait]
impl Surface for RecordingSurface {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn render(&mut self, state: &ViewState) {
        self.frames.push(state.clone());
    }

    async fn load_and_play(&mut self, url: &str) -> PlaybackOutcome {
        self.playback_requests.push(url.to_string());
        self.playback_outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn terminal_surface_fails_load_on_empty_binding() {
        let mut surface = TerminalSurface::new();
        assert_eq!(surface.load_and_play("").await, PlaybackOutcome::LoadFailed);
        assert_eq!(
            surface.load_and_play("/out/1.mp4").await,
            PlaybackOutcome::Played
        );
    }

    #[test]
    fn default_view_state_is_idle() {
        let state = ViewState::default();
        assert!(!state.busy);
        assert!(state.preview.is_none());
        assert!(state.playback.is_none());
        assert!(state.console.is_empty());
    }
}
