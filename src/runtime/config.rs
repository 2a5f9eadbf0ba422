//! Runtime configuration for a [`TreeRunner`](crate::runtime::TreeRunner).

/// Knobs for one runner instance.
///
/// # Examples
///
/// ```rust
/// use renderloom::runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::default()
///     .with_runner_id("checkout-shell")
///     .with_queue_capacity(1024);
/// assert_eq!(config.queue_capacity, Some(1024));
/// ```
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Identifier stamped on this runner's tracing spans and snapshots.
    /// Defaults to a generated short id.
    pub runner_id: String,
    /// Action queue capacity. `None` (the default) is unbounded; with a
    /// bound, [`Sink::send`](crate::sink::Sink::send) fails fast with
    /// `QueueFull` while worker outlets await capacity.
    pub queue_capacity: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            runner_id: generate_runner_id(),
            queue_capacity: None,
        }
    }
}

impl RuntimeConfig {
    /// Use an explicit runner id instead of a generated one.
    #[must_use]
    pub fn with_runner_id(mut self, runner_id: impl Into<String>) -> Self {
        self.runner_id = runner_id.into();
        self
    }

    /// Bound the action queue to `capacity` entries.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }
}

/// Short random id so concurrent runners are tellable apart in logs.
fn generate_runner_id() -> String {
    format!("loom-{:08x}", rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_runner_ids_are_prefixed() {
        let config = RuntimeConfig::default();
        assert!(config.runner_id.starts_with("loom-"));
        assert_eq!(config.queue_capacity, None);
    }
}
