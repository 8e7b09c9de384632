/// model used for every analysis unless the config says otherwise.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// env vars checked (in order) for the api credential.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// process-wide settings, read once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub api_key: String,
    pub model: String,
    /// optional override for the provider endpoint (proxies, local gateways).
    pub base_url: Option<String>,
}

impl AnalyzerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }

    /// reads the credential from the environment. a missing key is not an
    /// error here: the provider reports it on the first request.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .unwrap_or_default();
        Self::new(api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_prefers_api_key_then_gemini_key() {
        let cfg = AnalyzerConfig::from_lookup(|name| match name {
            "API_KEY" => Some("primary".into()),
            "GEMINI_API_KEY" => Some("secondary".into()),
            _ => None,
        });
        assert_eq!(cfg.api_key, "primary");
        assert_eq!(cfg.model, DEFAULT_MODEL);

        let cfg = AnalyzerConfig::from_lookup(|name| match name {
            "API_KEY" => Some("  ".into()),
            "GEMINI_API_KEY" => Some("secondary".into()),
            _ => None,
        });
        assert_eq!(cfg.api_key, "secondary");
    }

    #[test]
    fn overrides_replace_model_and_endpoint() {
        let cfg = AnalyzerConfig::new("k")
            .with_model("gemini-2.5-pro")
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.model, "gemini-2.5-pro");
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:8080/v1beta/"));
    }

    #[test]
    fn missing_key_yields_empty_credential() {
        let cfg = AnalyzerConfig::from_lookup(|_| None);
        assert!(!cfg.has_api_key());
        assert_eq!(cfg.base_url, None);
    }
}
