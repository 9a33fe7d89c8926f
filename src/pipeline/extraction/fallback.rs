//! Generative fallback for low-confidence extractions.
//!
//! When the rule-based pass scores below the confidence threshold, a bill
//! excerpt is sent to an LLM with a constrained-JSON prompt. The adapter
//! is a trait so the pipeline can run against a mock in tests and stay
//! usable with no credential configured.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::FallbackError;
use crate::config;
use crate::models::InstitutionType;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 1024;

/// Minimal completion interface over a generative model.
pub trait LlmClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, FallbackError>;
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Builds a client from `ANTHROPIC_API_KEY`, or `None` when unset.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl LlmClient for AnthropicClient {
    fn complete(&self, prompt: &str) -> Result<String, FallbackError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| FallbackError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FallbackError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| FallbackError::JsonParsing(e.to_string()))?;
        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                FallbackError::MalformedResponse("response has no text content block".to_string())
            })
    }
}

/// Parameter set as the model is asked to emit it. Unknown keys are
/// rejected so a chatty or hallucinated response fails cleanly instead of
/// half-applying.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackParameters {
    pub funding_change_pct: Option<f64>,
    pub min_wage_change: Option<f64>,
    pub childcare_subsidy: Option<f64>,
    pub tuition_cap_pct: Option<f64>,
    pub affected_types: Option<Vec<String>>,
}

impl FallbackParameters {
    /// Strict sector parsing: any unrecognized name invalidates the whole
    /// response rather than silently dropping it.
    pub fn parsed_types(&self) -> Result<Option<BTreeSet<InstitutionType>>, FallbackError> {
        let Some(raw) = &self.affected_types else {
            return Ok(None);
        };
        let mut types = BTreeSet::new();
        for name in raw {
            let ty = InstitutionType::parse(name).ok_or_else(|| {
                FallbackError::MalformedResponse(format!("unknown institution type: {name:?}"))
            })?;
            types.insert(ty);
        }
        Ok(Some(types))
    }
}

pub fn build_fallback_prompt(excerpt: &str) -> String {
    format!(
        "Extract policy parameters from this legislative bill text.\n\
         Return ONLY a JSON object with exactly these keys:\n\
         - funding_change_pct: percentage change to state higher-education funding \
         (negative for cuts), or null\n\
         - min_wage_change: new or changed minimum wage in dollars, or null\n\
         - childcare_subsidy: childcare subsidy amount in dollars, or null\n\
         - tuition_cap_pct: tuition increase cap in percent, or null\n\
         - affected_types: array drawn from [\"public\", \"private\", \"community\"], \
         or null if the bill names no sector\n\
         Use null for anything the text does not state. No prose, no markdown.\n\n\
         Bill text:\n{excerpt}"
    )
}

/// Parses the model response, tolerating code fences around the JSON.
pub fn parse_fallback_response(raw: &str) -> Result<FallbackParameters, FallbackError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| FallbackError::JsonParsing(e.to_string()))
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Runs the fallback on a bounded excerpt of the normalized bill text.
///
/// The response is validated as a whole, sector names included; a single
/// bad field rejects the entire response so nothing is half-applied.
pub fn llm_fallback_extraction(
    client: &dyn LlmClient,
    text: &str,
) -> Result<FallbackParameters, FallbackError> {
    let excerpt = clamp_chars(text, config::FALLBACK_EXCERPT_CHARS);
    debug!(excerpt_len = excerpt.len(), "running generative fallback");
    let response = client.complete(&build_fallback_prompt(excerpt))?;
    let params = parse_fallback_response(&response)?;
    params.parsed_types()?;
    Ok(params)
}

fn clamp_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Test double returning a canned response, with optional failure mode.
#[cfg(test)]
pub struct MockLlmClient {
    pub response: Result<String, String>,
}

#[cfg(test)]
impl MockLlmClient {
    pub fn replying(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

#[cfg(test)]
impl LlmClient for MockLlmClient {
    fn complete(&self, _prompt: &str) -> Result<String, FallbackError> {
        self.response
            .clone()
            .map_err(FallbackError::HttpClient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_response() {
        let raw = r#"{"funding_change_pct": -10.0, "min_wage_change": null,
                      "childcare_subsidy": 2500.0, "tuition_cap_pct": null,
                      "affected_types": ["public", "community"]}"#;
        let params = parse_fallback_response(raw).expect("parse");
        assert_eq!(params.funding_change_pct, Some(-10.0));
        assert_eq!(params.childcare_subsidy, Some(2500.0));
        let types = params.parsed_types().expect("types").expect("some");
        assert_eq!(types.len(), 2);
        assert!(types.contains(&InstitutionType::Public));
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"funding_change_pct\": 5.0, \"min_wage_change\": null,\
                   \"childcare_subsidy\": null, \"tuition_cap_pct\": null,\
                   \"affected_types\": null}\n```";
        let params = parse_fallback_response(raw).expect("parse");
        assert_eq!(params.funding_change_pct, Some(5.0));
        assert!(params.parsed_types().unwrap().is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = r#"{"funding_change_pct": 1.0, "min_wage_change": null,
                      "childcare_subsidy": null, "tuition_cap_pct": null,
                      "affected_types": null, "commentary": "looks fine"}"#;
        assert!(matches!(
            parse_fallback_response(raw),
            Err(FallbackError::JsonParsing(_))
        ));
    }

    #[test]
    fn prose_response_is_an_error() {
        assert!(parse_fallback_response("I could not find any parameters.").is_err());
    }

    #[test]
    fn unknown_institution_type_invalidates_response() {
        let raw = r#"{"funding_change_pct": null, "min_wage_change": null,
                      "childcare_subsidy": null, "tuition_cap_pct": null,
                      "affected_types": ["public", "for-profit"]}"#;
        let params = parse_fallback_response(raw).expect("parse");
        assert!(matches!(
            params.parsed_types(),
            Err(FallbackError::MalformedResponse(_))
        ));
    }

    #[test]
    fn excerpt_is_clamped_to_char_limit() {
        let text = "é".repeat(config::FALLBACK_EXCERPT_CHARS + 500);
        let clamped = clamp_chars(&text, config::FALLBACK_EXCERPT_CHARS);
        assert_eq!(clamped.chars().count(), config::FALLBACK_EXCERPT_CHARS);
    }

    #[test]
    fn prompt_contains_excerpt_and_schema_keys() {
        let prompt = build_fallback_prompt("Senate Bill 42 text here");
        assert!(prompt.contains("Senate Bill 42 text here"));
        assert!(prompt.contains("funding_change_pct"));
        assert!(prompt.contains("affected_types"));
    }

    #[test]
    fn invalid_sector_rejects_whole_response() {
        let client = MockLlmClient::replying(
            r#"{"funding_change_pct": -3.0, "min_wage_change": null,
                "childcare_subsidy": null, "tuition_cap_pct": null,
                "affected_types": ["for-profit"]}"#,
        );
        assert!(matches!(
            llm_fallback_extraction(&client, "some bill text"),
            Err(FallbackError::MalformedResponse(_))
        ));
    }

    #[test]
    fn mock_client_round_trips() {
        let client = MockLlmClient::replying(
            r#"{"funding_change_pct": -3.0, "min_wage_change": null,
                "childcare_subsidy": null, "tuition_cap_pct": null,
                "affected_types": null}"#,
        );
        let params = llm_fallback_extraction(&client, "some bill text").expect("extract");
        assert_eq!(params.funding_change_pct, Some(-3.0));
    }

    #[test]
    fn transport_failure_propagates() {
        let client = MockLlmClient::failing("connection refused");
        assert!(matches!(
            llm_fallback_extraction(&client, "text"),
            Err(FallbackError::HttpClient(_))
        ));
    }
}
