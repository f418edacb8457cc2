//! Error types for the Newsroom core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from the LLM gateway.
///
/// These variants map one-to-one onto the gateway's failure taxonomy:
/// missing credentials, transport, timeout, HTTP status, unparseable
/// JSON, and responses missing expected schema keys.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Required credential or endpoint is not configured.
    #[error("LLM gateway not configured: {message}")]
    ConfigMissing {
        /// Which configuration piece is absent.
        message: String,
    },

    /// Network-level failure reaching the LLM endpoint.
    #[error("LLM transport error: {source}")]
    Transport {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The call exceeded its deadline.
    #[error("LLM call timed out after {seconds}s")]
    Timeout {
        /// Number of seconds waited before giving up.
        seconds: u64,
    },

    /// LLM API returned a non-success HTTP status.
    #[error("LLM API error (HTTP {status}): {message}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// Response content could not be parsed as JSON, even after fallback
    /// extraction of a fenced block.
    #[error("LLM returned unparseable JSON: {message}")]
    BadJson {
        /// Details about the parse failure.
        message: String,
    },

    /// Parsed JSON is missing one or more expected schema keys.
    #[error("LLM response missing expected keys: {missing:?}")]
    SchemaIncomplete {
        /// The keys absent from the response.
        missing: Vec<String>,
    },
}

impl LlmError {
    /// Whether the retry policy applies: transport faults, timeouts,
    /// HTTP 5xx and HTTP 429. Other 4xx responses and parse failures
    /// are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors from the embedding service.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// HTTP request to the embedding endpoint failed.
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Embedding API returned an error response.
    #[error("embedding API error (HTTP {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// Embedding response could not be parsed.
    #[error("failed to parse embedding response: {0}")]
    Parse(String),
}

/// Errors from record, duplicate-store, and index persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage io error at '{path}': {source}")]
    Io {
        /// The path involved in the failed operation.
        path: String,
        /// The underlying io error.
        #[source]
        source: std::io::Error,
    },

    /// Stored JSON could not be deserialized.
    #[error("corrupt stored document '{path}': {source}")]
    Corrupt {
        /// The path of the unreadable document.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A record with the given ID does not exist.
    #[error("record not found: {id}")]
    NotFound {
        /// The missing record ID.
        id: String,
    },
}

/// Errors from the TTS task manager.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// TTS credential not configured.
    #[error("TTS service not configured: {message}")]
    NotConfigured {
        /// Which configuration piece is absent.
        message: String,
    },

    /// HTTP request to the TTS service failed.
    #[error("TTS request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// TTS API returned an error response.
    #[error("TTS API error (HTTP {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// The service reported the generation task failed.
    #[error("TTS task failed: {message}")]
    TaskFailed {
        /// The failure reason from the service.
        message: String,
    },

    /// Polling exhausted its attempt budget.
    #[error("TTS task polling timed out after {attempts} attempts")]
    PollTimeout {
        /// The number of poll attempts made.
        attempts: u32,
    },

    /// The input text was empty after cleaning.
    #[error("no substantial text to synthesize")]
    EmptyText,

    /// Saving the downloaded audio failed.
    #[error("audio file save failed at '{path}': {source}")]
    Save {
        /// The destination path.
        path: String,
        /// The underlying io error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the social poster.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    /// Social credentials not configured.
    #[error("social poster not configured: {message}")]
    NotConfigured {
        /// Which credential is absent.
        message: String,
    },

    /// Network-level failure communicating with the social API.
    #[error("social API network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Social API returned an error response.
    #[error("social API error (HTTP {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// Media upload failed.
    #[error("media upload failed: {message}")]
    MediaUpload {
        /// Details about the upload failure.
        message: String,
    },
}
