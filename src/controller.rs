//! Request lifecycle control: every user action is split into a synchronous
//! `begin_*` half (precondition checks + state mutation) and a synchronous
//! `apply_*` half (outcome -> state mutation). The network call in between
//! runs on a spawned task that posts its outcome back onto the event channel,
//! so the event loop thread stays the sole writer of session state.

use tokio::sync::mpsc::UnboundedSender;

use crate::app::App;
use crate::backend::{InitializeOutcome, SearchOutcome, StatusOutcome, SystemStatus};
use crate::transcript::Role;
use crate::tui::AppEvent;

pub const NOT_READY_PROMPT: &str = "System not ready. Press i to initialize.";
pub const CONNECT_ERROR: &str = "Cannot connect to backend. Make sure the server is running.";
pub const INIT_CONNECT_ERROR: &str = "Failed to initialize system. Cannot connect to backend.";
pub const SEARCH_CONNECT_ERROR: &str = "Failed to get response. Check if the server is running.";
const INIT_SUCCESS_MESSAGE: &str = "System initialized successfully! You can now ask questions.";

/// Starts a status probe unless a request is already in flight.
pub fn run_status_probe(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    if begin_status_probe(app) {
        spawn_status_probe(app, tx.clone());
    }
}

pub fn run_initialize(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    if begin_initialize(app) {
        let backend = app.backend.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = backend.initialize().await;
            let _ = tx.send(AppEvent::Initialized(outcome));
        });
    }
}

pub fn run_search(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    if let Some(question) = begin_search(app) {
        let backend = app.backend.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = backend.search(&question).await;
            let _ = tx.send(AppEvent::Searched(outcome));
        });
    }
}

/// Completion side, called by the event loop when a spawned request posts
/// its outcome back.
pub fn on_completion(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Status(outcome) => apply_status(app, outcome),
        AppEvent::Initialized(outcome) => {
            if apply_initialize(app, outcome) {
                // Initialize succeeded; readiness is re-derived by a fresh
                // probe while loading stays set.
                spawn_status_probe(app, tx.clone());
            }
        }
        AppEvent::Searched(outcome) => apply_search(app, outcome),
        _ => {}
    }
}

fn spawn_status_probe(app: &App, tx: UnboundedSender<AppEvent>) {
    let backend = app.backend.clone();
    tokio::spawn(async move {
        let outcome = backend.check_status().await;
        let _ = tx.send(AppEvent::Status(outcome));
    });
}

/// In-flight guard: a second action while one is outstanding is rejected
/// here, not just by the disabled input in the UI.
pub fn begin_status_probe(app: &mut App) -> bool {
    if app.loading {
        return false;
    }
    app.loading = true;
    true
}

pub fn apply_status(app: &mut App, outcome: StatusOutcome) {
    match outcome {
        StatusOutcome::Status(status) => {
            if status.ready {
                app.error.clear();
            } else {
                app.error = NOT_READY_PROMPT.to_string();
            }
            app.status = Some(status);
        }
        StatusOutcome::Unreachable => {
            app.status = Some(SystemStatus::unreachable());
            app.error = CONNECT_ERROR.to_string();
        }
    }
    app.loading = false;
}

pub fn begin_initialize(app: &mut App) -> bool {
    if app.loading {
        return false;
    }
    app.loading = true;
    app.error.clear();
    true
}

/// Returns true when a follow-up status probe must run; `loading` stays set
/// until that probe completes, so the action is atomic from the UI's view.
pub fn apply_initialize(app: &mut App, outcome: InitializeOutcome) -> bool {
    match outcome {
        InitializeOutcome::Initialized => {
            app.error.clear();
            app.transcript.push(Role::System, INIT_SUCCESS_MESSAGE, Vec::new());
            app.scroll_to_bottom();
            true
        }
        InitializeOutcome::Failed(message) => {
            app.error = message;
            app.loading = false;
            false
        }
        InitializeOutcome::Unreachable => {
            app.status = Some(SystemStatus::unreachable());
            app.error = INIT_CONNECT_ERROR.to_string();
            app.loading = false;
            false
        }
    }
}

/// Preconditions: non-blank input, system ready, nothing in flight.
/// On pass: captures and clears the buffer, records the user message, and
/// returns the question for the network half. On fail: no state change.
pub fn begin_search(app: &mut App) -> Option<String> {
    if app.loading || !app.is_ready() {
        return None;
    }
    let question = app.input.trim().to_string();
    if question.is_empty() {
        return None;
    }

    app.input.clear();
    app.cursor = 0;
    app.loading = true;
    app.error.clear();
    app.transcript.push(Role::User, question.clone(), Vec::new());
    app.scroll_to_bottom();
    Some(question)
}

pub fn apply_search(app: &mut App, outcome: SearchOutcome) {
    match outcome {
        SearchOutcome::Answer { answer, sources } => {
            app.transcript.push(Role::Assistant, answer, sources);
        }
        SearchOutcome::Failed(message) => {
            app.transcript
                .push(Role::Error, format!("Error: {}", message), Vec::new());
            app.error = message;
        }
        SearchOutcome::Unreachable => {
            app.transcript
                .push(Role::Error, SEARCH_CONNECT_ERROR, Vec::new());
            app.error = SEARCH_CONNECT_ERROR.to_string();
        }
    }
    app.loading = false;
    app.scroll_to_bottom();
}
