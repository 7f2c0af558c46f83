//! # Display Module
//!
//! Latest-value publication of the controller state and its renderings.
//!
//! The input loop publishes a [`ControllerState`] every Nth report; the
//! CLI task watches the channel and renders whatever is newest. Frames the
//! CLI was too slow to render are simply skipped.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::controller::report::ControllerState;
use crate::error::Result;

/// Publishes controller state to any number of watchers.
#[derive(Debug, Clone)]
pub struct StatePublisher {
    tx: Arc<watch::Sender<ControllerState>>,
}

impl StatePublisher {
    /// Creates a publisher and a receiver starting at the neutral state.
    #[must_use]
    pub fn channel() -> (Self, watch::Receiver<ControllerState>) {
        let (tx, rx) = watch::channel(ControllerState::neutral());
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn publish(&self, state: ControllerState) {
        self.tx.send_replace(state);
    }

    /// Publish sticks centered and everything released.
    pub fn reset(&self) {
        self.publish(ControllerState::neutral());
    }

    #[must_use]
    pub fn current(&self) -> ControllerState {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.tx.subscribe()
    }
}

/// Compact one-line rendering.
///
/// ```text
/// L(+0.00,+0.00) R(-1.00,+0.50) LT   0 RT 255 [A, Start/Pause]
/// ```
#[must_use]
pub fn render_line(state: &ControllerState) -> String {
    let mut line = format!(
        "L({:+.2},{:+.2}) R({:+.2},{:+.2}) LT {:>3} RT {:>3} [",
        state.left_x,
        state.left_y,
        state.right_x,
        state.right_y,
        state.left_trigger,
        state.right_trigger,
    );

    for (i, button) in state.buttons.iter().enumerate() {
        if i > 0 {
            line.push_str(", ");
        }
        let _ = write!(line, "{}", button.name());
    }
    line.push(']');
    line
}

/// One JSON line of display output.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub state: ControllerState,
}

impl DisplayRecord {
    /// Stamps a state with the current time.
    #[must_use]
    pub fn now(state: ControllerState) -> Self {
        Self {
            timestamp: Utc::now(),
            state,
        }
    }

    /// Serialize as a single JSON line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns `Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
