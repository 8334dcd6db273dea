use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::CompletionSettings;
use crate::errors::CompletionError;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI compatible chat completions endpoint.
pub struct CompletionFetcher {
    client: Client,
    settings: CompletionSettings,
    system_prompt: String,
}

impl CompletionFetcher {
    pub fn new(settings: CompletionSettings, system_prompt: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            settings,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Returns the completion for `prompt_text`, or an empty string if it could not be
    /// fetched. The failure is logged.
    pub async fn fetch(&self, prompt_text: &str) -> String {
        match self.try_fetch(prompt_text).await {
            Ok(text) => text,
            Err(err) => {
                error!("Error getting ChatGPT response: {err}");
                String::new()
            }
        }
    }

    /// Sends the system instruction and `prompt_text` as a two message exchange and returns
    /// the content of the first choice.
    pub async fn try_fetch(&self, prompt_text: &str) -> Result<String, CompletionError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt_text,
                },
            ],
        };

        debug!(model = %self.settings.model, %url, "Requesting chat completion");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}
