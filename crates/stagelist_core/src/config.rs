//! Engine configuration.

/// Configuration for a transaction coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Whether staging requires an explicit `begin()`.
    ///
    /// When `false`, the first accepted Append/Edit/Delete opens a
    /// transaction implicitly.
    pub require_begin: bool,

    /// Whether new entries get a device-assigned handle when staged.
    ///
    /// When `false`, new entries are committed with a null handle. A null
    /// handle cannot be referenced, so such entries can never be edited or
    /// deleted by a later transaction. Hosts whose clients manage the list
    /// after creating entries should turn this on.
    pub assign_handles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_begin: false,
            assign_handles: false,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether staging requires an explicit `begin()`.
    #[must_use]
    pub const fn require_begin(mut self, value: bool) -> Self {
        self.require_begin = value;
        self
    }

    /// Sets whether new entries get a handle when staged.
    #[must_use]
    pub const fn assign_handles(mut self, value: bool) -> Self {
        self.assign_handles = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert!(!config.require_begin);
        assert!(!config.assign_handles);
    }

    #[test]
    fn builder_pattern() {
        let config = EngineConfig::new().require_begin(true).assign_handles(true);
        assert!(config.require_begin);
        assert!(config.assign_handles);
    }
}
