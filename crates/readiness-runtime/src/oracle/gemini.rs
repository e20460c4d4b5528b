//! Gemini `generateContent` oracle.
//!
//! Two transports reach the same model API:
//!
//! - **Vertex**: regional endpoint, `Authorization: Bearer <token>`
//! - **API key**: public endpoint, `x-goog-api-key`
//!
//! The credential is resolved once in [`GeminiOracle::connect`]; a missing
//! key or a failing token command aborts construction.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use readiness_core::RawAssessmentText;

use super::secrets::{Credential, CredentialSource};
use super::token::{CommandTokenSource, StaticTokenSource, TokenSource};
use super::{EvidencePart, Oracle, OracleError};
use crate::config::{OracleConfig, TransportKind, ACCESS_TOKEN_ENV, API_KEY_ENV};

const PUBLIC_BASE_URL: &str = "https://generativelanguage.googleapis.com";

enum Auth {
    Bearer(Credential),
    ApiKey(Credential),
}

/// Gemini model behind either transport.
pub struct GeminiOracle {
    client: reqwest::Client,
    url: String,
    auth: Auth,
    model: String,
    generation: GenerationConfig,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let credential = match &self.auth {
            Auth::Bearer(c) | Auth::ApiKey(c) => c,
        };
        f.debug_struct("GeminiOracle")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("credential", credential)
            .finish()
    }
}

impl GeminiOracle {
    /// Resolve the transport and its credential, then build the client.
    pub async fn connect(config: &OracleConfig) -> Result<Self, OracleError> {
        match config.resolved_transport() {
            TransportKind::Vertex => {
                let source: Box<dyn TokenSource> = match config
                    .access_token
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                {
                    Some(token) => Box::new(StaticTokenSource::new(token, CredentialSource::Config)),
                    None => Box::new(CommandTokenSource::new(&config.token_command)?),
                };
                Self::connect_vertex(config, source.as_ref()).await
            }
            TransportKind::ApiKey | TransportKind::Auto => {
                let key = Credential::from_config_or_env(
                    config.api_key.as_deref(),
                    API_KEY_ENV,
                    "Gemini API key",
                )?;
                Self::with_api_key(config, key)
            }
        }
    }

    /// Vertex transport with an explicit token source.
    pub async fn connect_vertex(
        config: &OracleConfig,
        tokens: &dyn TokenSource,
    ) -> Result<Self, OracleError> {
        let (project, region) = match (config.project_id.as_deref(), config.region.as_deref()) {
            (Some(project), Some(region)) => (project, region),
            _ => {
                return Err(OracleError::Unavailable(
                    "Vertex transport requires oracle.project_id and oracle.region".to_string(),
                ))
            }
        };

        tracing::debug!(source = %tokens.describe(), "Fetching oracle access token");
        let token = tokens.token().await.map_err(|e| match e {
            OracleError::Unavailable(msg) => OracleError::Unavailable(format!(
                "{} (or set {})",
                msg, ACCESS_TOKEN_ENV
            )),
            other => other,
        })?;

        let url = vertex_url(config.base_url.as_deref(), project, region, &config.model);
        Self::build(config, url, Auth::Bearer(token))
    }

    /// API-key transport.
    pub fn with_api_key(config: &OracleConfig, key: Credential) -> Result<Self, OracleError> {
        if key.is_empty() {
            return Err(OracleError::Unavailable(format!("{} is empty", key.name())));
        }
        let url = api_key_url(config.base_url.as_deref(), &config.model);
        Self::build(config, url, Auth::ApiKey(key))
    }

    fn build(config: &OracleConfig, url: String, auth: Auth) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            auth,
            model: config.model.clone(),
            generation: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: config.response_mime_type.clone(),
            },
            timeout: config.timeout,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str, parts: &[EvidencePart<'a>]) -> GenerateRequest<'a> {
        let mut request_parts: Vec<Part<'a>> = parts
            .iter()
            .map(|p| Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: p.mime_type,
                    data: BASE64.encode(p.data),
                }),
            })
            .collect();
        request_parts.push(Part {
            text: Some(prompt),
            inline_data: None,
        });

        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: request_parts,
            }],
            generation_config: &self.generation,
        }
    }
}

fn vertex_url(base: Option<&str>, project: &str, region: &str, model: &str) -> String {
    let base = base
        .map(|b| b.trim_end_matches('/').to_string())
        .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", region));
    format!(
        "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
        base, project, region, model
    )
}

fn api_key_url(base: Option<&str>, model: &str) -> String {
    let base = base.unwrap_or(PUBLIC_BASE_URL).trim_end_matches('/');
    format!("{}/v1beta/models/{}:generateContent", base, model)
}

/// `generateContent` request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

/// `generateContent` response format.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Upstream error message, or the body itself when it is not the usual shape.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn answer_text(body: &str) -> Result<String, OracleError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::InvalidResponse("no candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(OracleError::InvalidResponse(format!(
            "candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn submit(
        &self,
        prompt: &str,
        parts: &[EvidencePart<'_>],
    ) -> Result<RawAssessmentText, OracleError> {
        let body = self.request_body(prompt, parts);

        let request = self.client.post(&self.url).timeout(self.timeout).json(&body);
        // Only place the credential leaves its wrapper.
        let request = match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token.expose()),
            Auth::ApiKey(key) => request.header("x-goog-api-key", key.expose()),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout)
            } else {
                OracleError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout)
            } else {
                OracleError::Unavailable(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(OracleError::Rejected {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        answer_text(&text).map(RawAssessmentText::new)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
