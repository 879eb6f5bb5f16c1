//! # Static service declaration.

use std::time::Duration;

/// Static, immutable declaration of one service.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use bootvisor::ServiceDescriptor;
///
/// let api = ServiceDescriptor::new("api")
///     .with_description("public HTTP API")
///     .depends_on(["db", "cache"])
///     .critical(true)
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(api.dependencies, vec!["db".to_string(), "cache".to_string()]);
/// assert!(api.critical_path);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique id.
    pub id: String,
    /// Human description (diagnostics only).
    pub description: String,
    /// Ids that must be `Ready` before this service starts.
    pub dependencies: Vec<String>,
    /// Whether a terminal failure blocks the whole application.
    pub critical_path: bool,
    /// Per-attempt timeout (`None` or zero = unbounded).
    pub timeout: Option<Duration>,
}

impl ServiceDescriptor {
    /// Creates a descriptor with no dependencies, not critical, no timeout.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            dependencies: Vec::new(),
            critical_path: false,
            timeout: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends dependencies.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Sets the critical-path flag.
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical_path = critical;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout with the zero sentinel collapsed to `None`.
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|d| !d.is_zero())
    }
}
