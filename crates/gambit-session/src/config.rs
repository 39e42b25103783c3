//! Session configuration.

/// Configuration shared by every session a registry creates.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum observers per session. `0` means unlimited — seats are
    /// always exactly two, but spectating is open-ended by default.
    pub max_observers: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_observers: 0 }
    }
}
