//! # Process runtime identity.
//!
//! [`Runtime`] carries what the manager needs to know about the process it
//! runs in: the namespace used for tag-based service filtering, whether this
//! process is a fork of another manager instance, and which service names or
//! tags the namespace requires.
//!
//! Fork detection is the caller's concern (a parent sets an environment
//! variable before spawning); [`Runtime::from_env`] reads the conventional
//! variable, [`Runtime::with_fork`] sets the flag explicitly.

use std::collections::HashSet;

/// Environment variable a parent process sets on its forked children.
pub const FORK_ENV: &str = "RUNVISOR_FORK";

/// Identity and filtering rules of the current process.
#[derive(Clone, Debug)]
pub struct Runtime {
    namespace: String,
    fork: bool,
    required: HashSet<String>,
}

impl Runtime {
    /// Creates a runtime for the given namespace, not a fork, with no
    /// required-tag restriction (every service is required).
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            fork: false,
            required: HashSet::new(),
        }
    }

    /// Creates a runtime, detecting the fork flag from [`FORK_ENV`].
    pub fn from_env(namespace: impl Into<String>) -> Self {
        let fork = std::env::var(FORK_ENV).map(|v| v == "1").unwrap_or(false);
        Self::new(namespace).with_fork(fork)
    }

    /// Marks (or unmarks) this process as a fork of a parent instance.
    pub fn with_fork(mut self, fork: bool) -> Self {
        self.fork = fork;
        self
    }

    /// Restricts the namespace to the given service names / tags.
    ///
    /// With an empty set, every service counts as required.
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = required.into_iter().map(Into::into).collect();
        self
    }

    /// The runtime namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// True when this process was forked by another manager instance.
    pub fn is_fork(&self) -> bool {
        self.fork
    }

    /// True when a service is required for this namespace, either by its
    /// name or by one of its tags.
    pub fn is_required(&self, name: &str, tags: &[String]) -> bool {
        if self.required.is_empty() {
            return true;
        }
        self.required.contains(name) || tags.iter().any(|t| self.required.contains(t))
    }

    /// The current process id, as stored in root-node metadata.
    pub fn current_pid() -> u32 {
        std::process::id()
    }

    /// The parent process id, used to detect a forking parent's root node.
    #[cfg(unix)]
    pub fn parent_pid() -> u32 {
        std::os::unix::process::parent_id()
    }

    /// The parent process id; unknown on non-unix targets.
    #[cfg(not(unix))]
    pub fn parent_pid() -> u32 {
        0
    }
}
