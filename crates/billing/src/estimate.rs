//! Token estimation for responses without vendor-reported usage.
//!
//! The heuristic is deliberately coarse: characters divided by a
//! per-language ratio (CJK scripts pack roughly one token per 1.5 chars,
//! Latin text closer to one per 4), with a per-feature multiplier for the
//! expected output size relative to the input.

use inkflow_config::BillingConfig;
use inkflow_core::feature::FeatureType;
use inkflow_core::provider::{GenerationRequest, GenerationResponse, Usage};
use std::collections::HashMap;

/// Usage for one completed generation, actual or estimated.
#[derive(Debug, Clone)]
pub enum GenerationUsage {
    /// Real token counts reported by the provider.
    Actual(Usage),
    /// No counts available; bill from the assembled prompt.
    Estimated {
        prompt_chars: usize,
        /// Characters of output actually received (0 if the stream died
        /// before any content arrived).
        output_chars: usize,
        cjk: bool,
    },
}

impl GenerationUsage {
    /// Prefer the provider's counts; fall back to estimation from the
    /// request and whatever output text we have.
    pub fn from_response(request: &GenerationRequest, response: &GenerationResponse) -> Self {
        match response.usage {
            Some(usage) => Self::Actual(usage),
            None => Self::estimated(request, &response.content),
        }
    }

    /// Estimation-only constructor, used when a stream ends without a
    /// usage-bearing terminal chunk.
    pub fn estimated(request: &GenerationRequest, output: &str) -> Self {
        let prompt = prompt_text(request);
        Self::Estimated {
            prompt_chars: request.prompt_chars(),
            output_chars: output.chars().count(),
            cjk: is_cjk_dominant(&prompt),
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Self::Estimated { .. })
    }
}

fn prompt_text(request: &GenerationRequest) -> String {
    let mut text = request.system_prompt.clone().unwrap_or_default();
    for message in &request.messages {
        text.push_str(&message.content);
    }
    text
}

/// True when at least half of the non-whitespace characters fall in a CJK
/// script (Han, Hiragana, Katakana, Hangul).
pub fn is_cjk_dominant(text: &str) -> bool {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_cjk_char(ch) {
            cjk += 1;
        }
    }
    total > 0 && cjk * 2 >= total
}

fn is_cjk_char(ch: char) -> bool {
    matches!(ch,
        '\u{3040}'..='\u{30FF}'   // Hiragana, Katakana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}' // Hangul syllables
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
    )
}

/// Turns character counts into billable token counts.
#[derive(Debug, Clone)]
pub struct Estimator {
    cjk_chars_per_token: f64,
    chars_per_token: f64,
    /// Per-feature overrides for the output multiplier, keyed by feature
    /// name. Unlisted features use the built-in table.
    multiplier_overrides: HashMap<String, f64>,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            cjk_chars_per_token: 1.5,
            chars_per_token: 4.0,
            multiplier_overrides: HashMap::new(),
        }
    }
}

impl From<&BillingConfig> for Estimator {
    fn from(config: &BillingConfig) -> Self {
        Self {
            cjk_chars_per_token: config.cjk_chars_per_token,
            chars_per_token: config.chars_per_token,
            multiplier_overrides: config.output_multipliers.clone(),
        }
    }
}

impl Estimator {
    pub fn new(
        cjk_chars_per_token: f64,
        chars_per_token: f64,
        multiplier_overrides: HashMap<String, f64>,
    ) -> Self {
        Self {
            cjk_chars_per_token,
            chars_per_token,
            multiplier_overrides,
        }
    }

    /// Expected output size relative to the input, per feature.
    pub fn output_multiplier(&self, feature: FeatureType) -> f64 {
        if let Some(factor) = self.multiplier_overrides.get(feature.as_str()) {
            return *factor;
        }
        match feature {
            FeatureType::Expansion => 1.5,
            FeatureType::Summary => 0.3,
            FeatureType::Chat => 0.8,
            FeatureType::SceneGeneration => 2.0,
            FeatureType::OutlineGeneration => 1.2,
            FeatureType::Polish => 1.0,
        }
    }

    /// Resolve usage to billable (input, output) token counts.
    ///
    /// Actual counts pass through untouched. Estimated counts convert the
    /// prompt characters to input tokens; output tokens come from received
    /// output characters when any arrived, otherwise from the per-feature
    /// multiplier applied to the input estimate.
    pub fn resolve(&self, usage: &GenerationUsage, feature: FeatureType) -> (u64, u64) {
        match usage {
            GenerationUsage::Actual(counts) => {
                (u64::from(counts.prompt_tokens), u64::from(counts.completion_tokens))
            }
            GenerationUsage::Estimated {
                prompt_chars,
                output_chars,
                cjk,
            } => {
                let ratio = if *cjk {
                    self.cjk_chars_per_token
                } else {
                    self.chars_per_token
                };
                let input = tokens_for(*prompt_chars, ratio);
                let output = if *output_chars > 0 {
                    tokens_for(*output_chars, ratio)
                } else {
                    (input as f64 * self.output_multiplier(feature)).ceil() as u64
                };
                (input, output)
            }
        }
    }
}

fn tokens_for(chars: usize, ratio: f64) -> u64 {
    (chars as f64 / ratio).ceil() as u64
}
