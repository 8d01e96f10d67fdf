//! Effects produced by reducer transitions

/// Side effects to run after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append the localized greeting (empty transcript on open)
    Greet,

    /// Persist the hydrated session id
    PersistSessionId { session_id: String },

    /// Remember that the visitor closed the widget
    MarkDismissed,
}
