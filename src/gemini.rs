use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::error::VerifyError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

// Longer clips can take minutes on Google's side; cap the wait at ~5 minutes
// instead of polling forever.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLL_ATTEMPTS: u32 = 150;

/// Processing lifecycle of a file uploaded to the Gemini File API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Processing,
    Active,
    Failed,
}

impl FileState {
    pub fn from_wire(state: &str) -> Self {
        match state {
            "PROCESSING" => FileState::Processing,
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            // STATE_UNSPECIFIED or anything the API adds later
            _ => FileState::Pending,
        }
    }
}

/// A video uploaded to the Gemini File API. The resource `name` ("files/...")
/// is used for status checks and deletion, the `uri` in generation requests.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    pub state: FileState,
}

impl RemoteFile {
    fn from_json(file: &Value) -> Option<Self> {
        Some(Self {
            name: file["name"].as_str()?.to_string(),
            uri: file["uri"].as_str()?.to_string(),
            state: FileState::from_wire(file["state"].as_str().unwrap_or("STATE_UNSPECIFIED")),
        })
    }
}

/// The structured judgment the model returns for a complaint video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub is_valid: bool,
    pub confidence_score: i64,
    pub ai_reasoning: String,
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Reads `GEMINI_API_KEY` / `GEMINI_MODEL` from the environment. A missing
    /// key only logs a warning so the server still boots; the first real
    /// request fails against the API instead.
    pub fn new(http: Client) -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("GEMINI_API_KEY not set, verification requests will fail");
            String::new()
        });
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        Self::with_config(http, api_key, model)
    }

    pub fn with_config(http: Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }

    /// Streams a local video into the File API and returns its handle.
    pub async fn upload_file(&self, path: &Path) -> Result<RemoteFile, VerifyError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        let file = File::open(path).await?;

        let stream = FramedRead::new(file, BytesCodec::new());
        let file_body = reqwest::Body::wrap_stream(stream);

        let url = format!("{}/upload/v1beta/files?key={}", BASE_URL, self.api_key);
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::stream(file_body).file_name(file_name),
        );

        let res = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VerifyError::Upload(e.to_string()))?;

        if !res.status().is_success() {
            crate::metrics::increment_gemini_api_errors("upload");
            let text = res.text().await.unwrap_or_default();
            return Err(VerifyError::Upload(text));
        }

        let json: Value = res
            .json()
            .await
            .map_err(|e| VerifyError::Upload(e.to_string()))?;

        RemoteFile::from_json(&json["file"])
            .ok_or_else(|| VerifyError::Upload("No name/uri in upload response".to_string()))
    }

    /// Refreshes the state of an uploaded file.
    pub async fn get_file(&self, name: &str) -> Result<RemoteFile, VerifyError> {
        let url = format!("{}/v1beta/{}?key={}", BASE_URL, name, self.api_key);
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| VerifyError::Processing(e.to_string()))?;
        let json: Value = res
            .json()
            .await
            .map_err(|e| VerifyError::Processing(e.to_string()))?;

        RemoteFile::from_json(&json)
            .ok_or_else(|| VerifyError::Processing("No name/uri in file info".to_string()))
    }

    /// Polls the file every 2s until it leaves the processing states. A job
    /// stuck on Google's side becomes `ProcessingTimeout` rather than stalling
    /// the request forever.
    pub async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile, VerifyError> {
        let mut attempts = 0;
        loop {
            match file.state {
                FileState::Active => return Ok(file),
                FileState::Failed => {
                    return Err(VerifyError::Processing(
                        "Gemini failed to process the video.".to_string(),
                    ))
                }
                FileState::Pending | FileState::Processing => {
                    if attempts >= MAX_POLL_ATTEMPTS {
                        return Err(VerifyError::ProcessingTimeout);
                    }
                    attempts += 1;
                    tokio::time::sleep(POLL_INTERVAL).await;
                    file = self.get_file(&file.name).await?;
                }
            }
        }
    }

    /// Sends the prompt plus a reference to the uploaded video and returns the
    /// model's raw text reply.
    pub async fn generate_content(
        &self,
        prompt: &str,
        file: &RemoteFile,
        mime_type: &str,
    ) -> Result<String, VerifyError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            BASE_URL, self.model, self.api_key
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "file_data": {
                        "mime_type": mime_type,
                        "file_uri": file.uri
                    }}
                ]
            }]
        });

        let res = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VerifyError::Generation(e.to_string()))?;

        if !res.status().is_success() {
            crate::metrics::increment_gemini_api_errors("generate");
            let text = res.text().await.unwrap_or_default();
            return Err(VerifyError::Generation(text));
        }

        let json: Value = res
            .json()
            .await
            .map_err(|e| VerifyError::Generation(e.to_string()))?;

        if let Some(usage) = json.get("usageMetadata") {
            crate::metrics::record_gemini_token_usage(usage);
        }

        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| VerifyError::Generation("No text in Gemini response".to_string()))
    }

    /// Deletes an uploaded file. Callers log failures and move on.
    pub async fn delete_file(&self, name: &str) -> Result<(), VerifyError> {
        let url = format!("{}/v1beta/{}?key={}", BASE_URL, name, self.api_key);
        let res = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| VerifyError::Cleanup(e.to_string()))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(VerifyError::Cleanup(text));
        }
        Ok(())
    }
}

/// Instruction given to the model for judging a complaint video.
pub fn build_prompt(category: &str, description: &str) -> String {
    format!(
        "You are a strict automated facility manager for a housing society.\n\
         A resident has submitted a video complaint.\n\
         Category: {category}\n\
         Description: {description}\n\
         \n\
         Watch the provided video. Does the video clearly show a real issue related to the Category and Description?\n\
         If it is a recording of a screen, completely unrelated, or obviously fake, reject it.\n\
         \n\
         Respond ONLY in the following valid JSON format:\n\
         {{\n\
             \"is_valid\": true or false,\n\
             \"confidence_score\": 1 to 100,\n\
             \"ai_reasoning\": \"Brief 1-sentence explanation of what happens in the video\"\n\
         }}"
    )
}

/// Strips the markdown code fences the model likes to wrap JSON in. Handles
/// any stacking of leading/trailing ``` fences, with or without a json tag.
pub fn strip_code_fences(text: &str) -> &str {
    let mut out = text.trim();
    loop {
        let trimmed = out
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        if trimmed == out {
            return out;
        }
        out = trimmed;
    }
}

/// Parses the model's reply into a `Verdict`. Valid JSON that omits one of the
/// contract fields fails here too, so a partial verdict never reaches the
/// caller.
pub fn parse_verdict(reply: &str) -> Result<Verdict, VerifyError> {
    let clean = strip_code_fences(reply);
    serde_json::from_str(clean)
        .map_err(|e| VerifyError::MalformedVerdict(format!("{} - Text: {}", e, clean)))
}
