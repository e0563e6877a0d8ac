use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::client::DetectTransport;
use crate::models::SubmissionInput;
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::view::{PlaybackOutcome, Surface, ViewState};

// ==============================================================================
// UPLOAD CONTROLLER
// ==============================================================================

/// How a submission ended. Every variant leaves the controller idle and
/// resubmittable.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Local validation failed; no network request was issued.
    Rejected(String),
    /// Non-2xx status, network, or I/O failure.
    TransportFailed(String),
    /// 2xx response carrying a backend-reported `error` field.
    BackendError(String),
    Completed { detections: usize },
    /// A newer submission started while this one was in flight; its response
    /// was discarded without touching the view.
    Stale,
}

/// Orchestrates one submit-and-render cycle: validate the local selection,
/// stage a preview, perform exactly one network exchange, and update the
/// surface with either an error or the detection results.
///
/// Submissions are independent and non-deduplicated; the generation counter
/// only prevents a stale response from overwriting a newer submission's view.
pub struct UploadController<T: DetectTransport> {
    transport: T,
    previews: PreviewRegistry,
    generation: AtomicU64,
    current_preview: Mutex<Option<PreviewHandle>>,
}

impl<T: DetectTransport> UploadController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            previews: PreviewRegistry::new(),
            generation: AtomicU64::new(0),
            current_preview: Mutex::new(None),
        }
    }

    pub async fn submit<S: Surface>(
        &self,
        input: SubmissionInput,
        surface: &mut S,
    ) -> SubmissionOutcome {
        let request = match input.into_request() {
            Ok(request) => request,
            Err(failure) => {
                let message = failure.to_string();
                surface.alert(&message);
                return SubmissionOutcome::Rejected(message);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Staging a new preview drops the previous submission's handle,
        // revoking its registration.
        let preview = self.previews.create(&request.video);
        let mut state = ViewState {
            preview: Some(preview.url().to_string()),
            busy: true,
            console: "Processing...".to_string(),
            playback: None,
        };
        {
            let mut current = self
                .current_preview
                .lock()
                .expect("preview slot poisoned");
            *current = Some(preview);
        }
        surface.render(&state);

        info!(
            video = %request.video.display(),
            plant_type = %request.plant_type,
            "Submitting video for detection"
        );

        let result = self.transport.submit(&request).await;

        if self.is_stale(generation) {
            warn!(generation, "Discarding stale detection response");
            return SubmissionOutcome::Stale;
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                state.busy = false;
                state.console = format!("Error: {}", err);
                surface.render(&state);
                return SubmissionOutcome::TransportFailed(err.to_string());
            }
        };

        state.busy = false;

        if let Some(error) = response.error.as_deref().filter(|e| !e.is_empty()) {
            state.console = format!("Error: {}", error);
            surface.render(&state);
            return SubmissionOutcome::BackendError(error.to_string());
        }

        let playback_url = response.processed_video.clone().unwrap_or_default();
        state.playback = Some(playback_url.clone());
        state.console = response.console_text();
        surface.render(&state);

        // Playback problems are advisory only and never fail the submission.
        let playback = surface.load_and_play(&playback_url).await;
        if self.is_stale(generation) {
            return SubmissionOutcome::Stale;
        }
        match playback {
            PlaybackOutcome::Played => {}
            PlaybackOutcome::AutoplayBlocked => {
                state
                    .console
                    .push_str("\nError: Could not play video automatically. Try clicking play.");
                surface.render(&state);
            }
            PlaybackOutcome::LoadFailed => {
                state
                    .console
                    .push_str("\nError: Failed to play processed video.");
                surface.render(&state);
            }
        }

        SubmissionOutcome::Completed {
            detections: response.detections.len(),
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}
