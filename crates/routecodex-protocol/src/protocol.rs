use serde::{Deserialize, Serialize};

/// The outgoing wire protocol spoken to an upstream provider — determines
/// which codec the facade dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderProtocol {
    OpenAiChat,
    OpenAiResponses,
    Anthropic,
}

impl ProviderProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderProtocol::OpenAiChat => "openai-chat",
            ProviderProtocol::OpenAiResponses => "openai-responses",
            ProviderProtocol::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for ProviderProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
