use serde::{Deserialize, Serialize};

/// A family of models that share a rate-limit quota upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSeries {
    Claude,
    GeminiPro,
    GeminiFlash,
}

/// Classifies a model id into a cooldown series by loose substring match.
///
/// `flash` is checked before the broader `gemini|pro` match so
/// `gemini-1.5-flash` lands in [`ModelSeries::GeminiFlash`] rather than
/// [`ModelSeries::GeminiPro`].
pub fn classify_series(model_id: &str) -> Option<ModelSeries> {
    let lower = model_id.to_ascii_lowercase();
    if lower.contains("claude") || lower.contains("opus") {
        return Some(ModelSeries::Claude);
    }
    if lower.contains("flash") {
        return Some(ModelSeries::GeminiFlash);
    }
    if lower.contains("gemini") || lower.contains("pro") {
        return Some(ModelSeries::GeminiPro);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_and_opus_match() {
        assert_eq!(classify_series("claude-3-opus"), Some(ModelSeries::Claude));
        assert_eq!(classify_series("opus-4"), Some(ModelSeries::Claude));
    }

    #[test]
    fn flash_beats_gemini() {
        assert_eq!(
            classify_series("gemini-1.5-flash"),
            Some(ModelSeries::GeminiFlash)
        );
    }

    #[test]
    fn gemini_pro_fallback() {
        assert_eq!(
            classify_series("gemini-1.5-pro"),
            Some(ModelSeries::GeminiPro)
        );
    }

    #[test]
    fn unrelated_model_has_no_series() {
        assert_eq!(classify_series("glm-4"), None);
    }
}
