use crate::LLMError;

/// every way an analysis can go wrong.
///
/// the ui never shows these apart; they exist so the log carries the detail.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// the llm provider rejected the request or the stream broke (network, auth, quota).
    #[error("provider error: {0}")]
    Provider(#[from] LLMError),
    /// a fragment source reported a failure that didn't come from `llm`.
    #[error("stream error: {0}")]
    Stream(String),
    /// the client couldn't be built from the configuration.
    #[error("config error: {0}")]
    Config(String),
}
