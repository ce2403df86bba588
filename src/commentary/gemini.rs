use crate::commentary::{CommentaryProvider, CommentaryRequest};
use crate::errors::{DeskError, DeskResult};
use futures_util::future::BoxFuture;
use reqwest::Client;

/// Generative-language REST client (`models/{model}:generateContent`).
/// Cheap to clone; each request runs on its own spawned task.
#[derive(Clone)]
pub struct GenerativeCommentary {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GenerativeCommentary {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl CommentaryProvider for GenerativeCommentary {
    fn name(&self) -> &'static str {
        "generative"
    }

    fn generate(&self, request: CommentaryRequest) -> BoxFuture<'static, DeskResult<String>> {
        let this = self.clone();
        Box::pin(async move { this.fetch(&request).await })
    }
}

impl GenerativeCommentary {
    async fn fetch(&self, request: &CommentaryRequest) -> DeskResult<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: request.prompt() }],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeskError::Commentary(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeskError::Commentary(format!("HTTP {status}: {body}")));
        }

        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| DeskError::Commentary(format!("parse: {e}")))?;

        extract_text(data)
    }
}

// Response shape (fields we read):
// {
//   "candidates": [
//     { "content": { "parts": [ { "text": "..." } ], "role": "model" } }
//   ]
// }

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Part {
    text: String,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn extract_text(data: GenerateResponse) -> DeskResult<String> {
    let text = data
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim();
    if text.is_empty() {
        return Err(DeskError::Commentary("empty response".into()));
    }
    Ok(text.to_string())
}
