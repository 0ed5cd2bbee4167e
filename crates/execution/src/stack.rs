//! The component call stack.

use cascade_core::ComponentId;
use cascade_flow::ComponentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the execution stack: pushed when a component is
/// entered, completed (exit time filled) when it is left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// The component this frame covers.
    pub component_id: ComponentId,
    /// Its type, recorded for audit readability.
    pub component_type: ComponentType,
    /// When the component was entered.
    pub entered_at: DateTime<Utc>,
    /// When the component was left; `None` while on the stack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<DateTime<Utc>>,
}

impl StackFrame {
    /// Open a frame at the current instant.
    #[must_use]
    pub fn enter(component_id: ComponentId, component_type: ComponentType) -> Self {
        Self {
            component_id,
            component_type,
            entered_at: Utc::now(),
            exited_at: None,
        }
    }

    /// Close the frame at the current instant.
    #[must_use]
    pub fn exited(mut self) -> Self {
        self.exited_at = Some(Utc::now());
        self
    }

    /// Returns `true` while the frame is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.exited_at.is_none()
    }

    /// Wall-clock duration of a closed frame, in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.exited_at.map(|exit| {
            (exit - self.entered_at).num_milliseconds().max(0) as u64
        })
    }
}
