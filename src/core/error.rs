use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookscopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load trace {handle}: {message}")]
    Fetch { handle: String, message: String },

    #[error("Trace not found: {0}")]
    TraceNotFound(String),

    #[error("Terminal UI error: {0}")]
    Terminal(String),

    #[error("File watch error: {0}")]
    Watch(String),

    #[error("Layout preferences error: {0}")]
    Prefs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for hookscope operations
pub type Result<T> = std::result::Result<T, HookscopeError>;

impl HookscopeError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new fetch error for the given evaluation handle
    pub fn fetch<H: Into<String>, S: Into<String>>(handle: H, msg: S) -> Self {
        Self::Fetch {
            handle: handle.into(),
            message: msg.into(),
        }
    }

    /// Creates a new terminal error
    pub fn terminal<S: Into<String>>(msg: S) -> Self {
        Self::Terminal(msg.into())
    }

    /// Creates a new watcher error
    pub fn watch<S: Into<String>>(msg: S) -> Self {
        Self::Watch(msg.into())
    }

    /// Creates a new preferences error
    pub fn prefs<S: Into<String>>(msg: S) -> Self {
        Self::Prefs(msg.into())
    }

    /// Returns true if re-selecting the evaluation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::TraceNotFound(_) | Self::Io(_) | Self::Watch(_) => true,
            _ => false,
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Yaml(_) => "config",
            Self::Fetch { .. } | Self::TraceNotFound(_) => "fetch",
            Self::Terminal(_) => "ui",
            Self::Watch(_) => "watch",
            Self::Prefs(_) => "prefs",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = HookscopeError::config("bad row height");
        assert_eq!(err.to_string(), "Configuration error: bad row height");
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_fetch_error_message() {
        let err = HookscopeError::fetch("eval-7.json", "connection reset");
        assert_eq!(err.to_string(), "Failed to load trace eval-7.json: connection reset");
        assert_eq!(err.category(), "fetch");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_recoverability() {
        assert!(!HookscopeError::config("invalid").is_recoverable());
        assert!(!HookscopeError::terminal("oops").is_recoverable());
        assert!(HookscopeError::TraceNotFound("x".into()).is_recoverable());
    }
}
