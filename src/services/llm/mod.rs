//! Language model abstraction
//!
//! Every pipeline stage talks to a model through [`StructuredModel`], a single capability
//! implemented once per provider. A [`Prompt`] names the task it serves (so providers can
//! route tasks to different models) and the shape the answer must take.
use std::fmt::{self, Display};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod openrouter;

pub use openrouter::OpenRouterModel;

/// The pipeline step a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmTask {
    AssessComplexity,
    AnalyzeQuery,
    ExtractGames,
    AssessResults,
    RefineSearch,
    Recommend,
}

impl Display for LlmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmTask::AssessComplexity => "assess_complexity",
            LlmTask::AnalyzeQuery => "analyze_query",
            LlmTask::ExtractGames => "extract_games",
            LlmTask::AssessResults => "assess_results",
            LlmTask::RefineSearch => "refine_search",
            LlmTask::Recommend => "recommend",
        };
        write!(f, "{}", name)
    }
}

/// One field of an expected JSON answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub kind: &'static str,
}

impl FieldSpec {
    pub const fn new(path: &'static str, kind: &'static str) -> Self {
        Self { path, kind }
    }
}

/// Expected structure of a JSON answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonShape {
    pub fields: &'static [FieldSpec],
}

impl JsonShape {
    /// Renders the shape as instructions appended to the prompt
    pub fn describe(&self) -> String {
        let mut lines = String::from("Return a JSON object with the following structure:\n");
        for field in self.fields {
            lines.push_str(&format!("- {}: {}\n", field.path, field.kind));
        }
        lines.push_str(
            "IMPORTANT: You MUST respond with valid JSON only. Do not include any explanation or text outside the JSON structure.",
        );
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Text,
    Json(&'static JsonShape),
}

/// A rendered prompt ready to send to a model
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub task: LlmTask,
    pub text: String,
    pub shape: OutputShape,
}

impl Prompt {
    pub fn text(task: LlmTask, text: impl Into<String>) -> Self {
        Self {
            task,
            text: text.into(),
            shape: OutputShape::Text,
        }
    }

    pub fn json(task: LlmTask, text: impl Into<String>, shape: &'static JsonShape) -> Self {
        Self {
            task,
            text: text.into(),
            shape: OutputShape::Json(shape),
        }
    }
}

/// Model answer, already decoded as JSON when the prompt asked for it
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    Json(Value),
}

/// LLM errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Structured-output capability, implemented once per provider
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StructuredModel: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<ModelOutput, LlmError>;
}

/// Completes `prompt` and decodes the answer into `T`
pub async fn complete_json<T: DeserializeOwned>(
    model: &dyn StructuredModel,
    prompt: &Prompt,
) -> Result<T, LlmError> {
    let value = match model.complete(prompt).await? {
        ModelOutput::Json(value) => value,
        ModelOutput::Text(text) => {
            let json = extract_json_object(&text)
                .ok_or_else(|| LlmError::Parse("no JSON object in response".to_string()))?;
            serde_json::from_str(json).map_err(|e| LlmError::Parse(e.to_string()))?
        }
    };

    serde_json::from_value(value).map_err(|e| LlmError::Parse(e.to_string()))
}

/// Completes `prompt` and returns the answer as trimmed text
pub async fn complete_text(
    model: &dyn StructuredModel,
    prompt: &Prompt,
) -> Result<String, LlmError> {
    let text = match model.complete(prompt).await? {
        ModelOutput::Text(text) => text,
        ModelOutput::Json(Value::String(text)) => text,
        ModelOutput::Json(other) => other.to_string(),
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

/// Returns the outermost `{ ... }` span of `text`, if any
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Which model serves which task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub default_model: String,
    pub analyze_query: Option<String>,
    pub assess_results: Option<String>,
    pub refine_search: Option<String>,
}

impl ModelSelection {
    pub fn model_for(&self, task: LlmTask) -> &str {
        let dedicated = match task {
            LlmTask::AssessComplexity | LlmTask::AnalyzeQuery => self.analyze_query.as_deref(),
            LlmTask::AssessResults => self.assess_results.as_deref(),
            LlmTask::RefineSearch => self.refine_search.as_deref(),
            _ => None,
        };
        dedicated.unwrap_or(&self.default_model)
    }
}
