/// OpenRouter chat-completions provider
///
/// Speaks the OpenAI-compatible `/chat/completions` endpoint. JSON-shaped prompts get the
/// shape description appended and request `response_format: json_object`; the outermost JSON
/// object is then pulled out of the reply, since not every routed model honours the flag.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{
    extract_json_object, LlmError, ModelOutput, ModelSelection, OutputShape, Prompt,
    StructuredModel,
};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Clone)]
pub struct OpenRouterModel {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    referer: String,
    title: String,
    selection: ModelSelection,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterModel {
    pub fn new(
        api_key: String,
        api_url: String,
        referer: String,
        title: String,
        selection: ModelSelection,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            referer,
            title,
            selection,
            temperature,
            max_tokens,
        }
    }

    fn render(prompt: &Prompt) -> String {
        match prompt.shape {
            OutputShape::Text => prompt.text.clone(),
            OutputShape::Json(shape) => format!("{}\n\n{}", prompt.text.trim_end(), shape.describe()),
        }
    }

    fn decode(prompt: &Prompt, content: String) -> Result<ModelOutput, LlmError> {
        match prompt.shape {
            OutputShape::Text => Ok(ModelOutput::Text(content)),
            OutputShape::Json(_) => {
                let json = extract_json_object(&content).ok_or_else(|| {
                    LlmError::Parse(format!("no JSON object in {} response", prompt.task))
                })?;
                serde_json::from_str(json)
                    .map(ModelOutput::Json)
                    .map_err(|e| LlmError::Parse(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl StructuredModel for OpenRouterModel {
    async fn complete(&self, prompt: &Prompt) -> Result<ModelOutput, LlmError> {
        let model = self.selection.model_for(prompt.task);
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(Self::render(prompt)),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: matches!(prompt.shape, OutputShape::Json(_))
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        tracing::debug!(task = %prompt.task, model = %model, "Sending completion request");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Response(format!(
                "OpenRouter returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Response(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(task = %prompt.task, chars = content.len(), "Completion received");

        Self::decode(prompt, content)
    }
}
