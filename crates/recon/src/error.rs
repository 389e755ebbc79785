use std::fmt;

/// Which input a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Ledger,
    Master,
}

impl SourceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ledger => "ledger",
            Self::Master => "master",
        }
    }
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum RunError {
    /// One or more required run parameters are absent or blank.
    MissingInput(Vec<&'static str>),
    /// Retrieving a source failed (network, HTTP status, unreadable path).
    Fetch { source: SourceRole, message: String },
    /// A source was retrieved but its tabular content could not be parsed.
    Decode { source: SourceRole, message: String },
    /// Nothing to reconcile.
    EmptyInput(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown strategy, bad year label, etc.).
    ConfigValidation(String),
    /// IO error while persisting results.
    Io(String),
}

impl RunError {
    /// The source this error is attributed to, if any.
    pub fn source_role(&self) -> Option<SourceRole> {
        match self {
            Self::Fetch { source, .. } | Self::Decode { source, .. } => Some(*source),
            _ => None,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput(fields) => {
                write!(f, "missing required input fields: {}", fields.join(", "))
            }
            Self::Fetch { source, message } => {
                write!(f, "failed to download {source} CSV: {message}")
            }
            Self::Decode { source, message } => {
                write!(f, "failed to parse {source} CSV: {message}")
            }
            Self::EmptyInput(msg) => write!(f, "empty input: {msg}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for RunError {}
