use chrono::Utc;
use indexmap::IndexMap;
use tracing::debug;

/// Prefix of generated session handles
const HANDLE_PREFIX: &str = "session_";

/// One registry entry as reported by [`SessionRegistry::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub handle: String,
    /// Latest continuation token, `None` until a generation call succeeds
    pub token: Option<String>,
}

impl SessionEntry {
    /// A session is active once it holds a non-empty continuation token
    pub fn is_active(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Outcome of looking up a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Handle is known; token may still be absent
    Registered(Option<String>),
    /// Handle has never been created or updated
    Unregistered,
}

impl Resolution {
    /// Continuation token to send for `handle`
    ///
    /// Unregistered handles are passed through as-is, so a raw token
    /// returned by an earlier call can be used to resume directly.
    pub fn continuation(self, handle: &str) -> Option<String> {
        match self {
            Resolution::Registered(token) => token.filter(|t| !t.is_empty()),
            Resolution::Unregistered => Some(handle.to_string()),
        }
    }
}

/// In-memory session handle to continuation token map
///
/// Last write wins; no history is retained and entries live for the
/// lifetime of the process.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Handle to latest token, in insertion order
    sessions: IndexMap<String, Option<String>>,
    /// Suffix of the last generated handle
    last_generated: i64,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` with no continuation
    ///
    /// An existing entry is reset to no continuation and keeps its place
    /// in the listing order.
    pub fn create(&mut self, handle: impl Into<String>) {
        let handle = handle.into();
        debug!(handle = %handle, "Creating session");
        self.put(handle, None);
    }

    /// Look up the continuation token stored for `handle`
    pub fn resolve(&self, handle: &str) -> Resolution {
        match self.sessions.get(handle) {
            Some(token) => Resolution::Registered(token.clone()),
            None => Resolution::Unregistered,
        }
    }

    /// Store `token` as the latest continuation for `handle`
    pub fn update(&mut self, handle: impl Into<String>, token: impl Into<String>) {
        let handle = handle.into();
        debug!(handle = %handle, "Updating session continuation");
        self.put(handle, Some(token.into()));
    }

    /// Every entry in insertion order
    pub fn list(&self) -> Vec<SessionEntry> {
        self.sessions
            .iter()
            .map(|(handle, token)| SessionEntry {
                handle: handle.clone(),
                token: token.clone(),
            })
            .collect()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.sessions.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Produce a `session_<millis>` handle not yet present in the registry
    ///
    /// The suffix never repeats within a process even when called twice in
    /// the same millisecond.
    pub fn generate_handle(&mut self) -> String {
        let mut suffix = Utc::now().timestamp_millis().max(self.last_generated + 1);
        loop {
            let candidate = format!("{}{}", HANDLE_PREFIX, suffix);
            if !self.sessions.contains_key(&candidate) {
                self.last_generated = suffix;
                return candidate;
            }
            suffix += 1;
        }
    }

    /// An existing handle keeps its index
    fn put(&mut self, handle: String, token: Option<String>) {
        self.sessions.insert(handle, token);
    }
}
