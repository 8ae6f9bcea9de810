//! Per-pass lifecycle state machine.
//!
//! ```text
//! Pending --enable--> FirstEnabled --> Enabled --disable--> Disabled --enable--> SwitchedToEnabled --> Enabled
//! ```
//!
//! Entering `FirstEnabled` fires [`LifecycleHook::FirstEnable`], entering `SwitchedToEnabled` fires
//! [`LifecycleHook::SwitchToEnable`]. Both states last exactly one frame.

/// Lifecycle state of a pass.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PassLifecycle {
    /// Never enabled yet.
    #[default]
    Pending,
    /// Enabled for the first time this frame.
    FirstEnabled,
    /// Enabled, and was enabled the frame before as well.
    Enabled,
    /// Disabled after having been enabled.
    Disabled,
    /// Enabled again this frame after having been disabled.
    SwitchedToEnabled,
}

/// One-shot hook fired on a lifecycle transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleHook {
    /// The pass is enabled for the first time.
    FirstEnable,
    /// The pass is enabled again after having been disabled.
    SwitchToEnable,
}

impl PassLifecycle {
    /// Whether the pass runs in the frame this state belongs to.
    pub fn is_enabled(&self) -> bool {
        matches!(
            self,
            PassLifecycle::FirstEnabled | PassLifecycle::Enabled | PassLifecycle::SwitchedToEnabled
        )
    }

    /// Move to the state of the next frame. Returns the hook to fire before the pass records, if any.
    pub fn advance(&mut self, enabled: bool) -> Option<LifecycleHook> {
        let (next, hook) = match (*self, enabled) {
            (PassLifecycle::Pending, false) => (PassLifecycle::Pending, None),
            (PassLifecycle::Pending, true) => (PassLifecycle::FirstEnabled, Some(LifecycleHook::FirstEnable)),
            (PassLifecycle::Disabled, false) => (PassLifecycle::Disabled, None),
            (PassLifecycle::Disabled, true) => (PassLifecycle::SwitchedToEnabled, Some(LifecycleHook::SwitchToEnable)),
            (_, true) => (PassLifecycle::Enabled, None),
            (_, false) => (PassLifecycle::Disabled, None),
        };
        *self = next;
        hook
    }
}
