//! Fire-and-forget action messages between the engine and its host surfaces.
//!
//! The background half of the system talks to page surfaces over a message
//! channel with an `action` discriminator. Delivery is best effort: there is
//! no acknowledgment protocol, and a failed send is logged and dropped, never
//! retried.

use serde::{Deserialize, Serialize};

/// A message on the background/content channel.
///
/// Serializes with an `action` tag and camelCase payload fields, matching
/// the wire shape the page surfaces expect:
///
/// ```
/// use pagelens::actions::Action;
///
/// let action = Action::StartTimer { domain: "example.com".into(), time: 600 };
/// let wire = serde_json::to_string(&action).unwrap();
/// assert!(wire.contains(r#""action":"startTimer""#));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Ask the page surface to explain the user's current selection.
    #[serde(rename_all = "camelCase")]
    ExplainSelected { text: String },
    /// Begin counting down a per-domain budget.
    #[serde(rename_all = "camelCase")]
    StartTimer { domain: String, time: u64 },
    /// Cancel the running countdown for a domain.
    #[serde(rename_all = "camelCase")]
    StopTimer { domain: String },
    /// Surface a time's-almost-up warning.
    #[serde(rename_all = "camelCase")]
    ShowWarning { domain: String, remaining: u64 },
    /// Close the page whose budget is exhausted.
    ClosePage,
    /// Re-wrap the page's code blocks after a rewrite.
    WrapCodeBlocks,
}

impl Action {
    /// The wire discriminator for this action.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Action::ExplainSelected { .. } => "explainSelected",
            Action::StartTimer { .. } => "startTimer",
            Action::StopTimer { .. } => "stopTimer",
            Action::ShowWarning { .. } => "showWarning",
            Action::ClosePage => "closePage",
            Action::WrapCodeBlocks => "wrapCodeBlocks",
        }
    }
}

/// Sender half of the action channel.
///
/// Cheap to clone; hand one to every producer (timer service, chat surface).
#[derive(Clone)]
pub struct ActionDispatcher {
    tx: flume::Sender<Action>,
}

impl ActionDispatcher {
    /// Create a dispatcher and the receiver its host surface drains.
    #[must_use]
    pub fn unbounded() -> (Self, flume::Receiver<Action>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    /// Send an action, best effort.
    ///
    /// A disconnected receiver is logged at debug and otherwise ignored.
    pub fn dispatch(&self, action: Action) {
        let name = action.name();
        if self.tx.send(action).is_err() {
            tracing::debug!(action = name, "action receiver dropped; message discarded");
        }
    }
}
