//! Gemini `generateContent` label provider.

use super::LabelProvider;
use crate::error::RenameError;
use base64::{engine::general_purpose, Engine};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default generative model
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROMPT: &str = "Look at the main subject of this image: what kind of object it is, \
its dominant colour and any distinctive pattern. Turn that into a short folder name for a \
computer file system: at most five English words, ASCII letters and digits only, words \
separated by hyphens. Reply with the folder name only, no explanation.";

/// Asks Gemini for a short, hyphenated label for an image
#[derive(Clone)]
pub struct GeminiLabeler {
    client: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiLabeler {
    pub fn new(api_key: &str) -> Result<Self, RenameError> {
        Self::with_model(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL)
    }

    /// Use a different model or endpoint (e.g. a proxy)
    pub fn with_model(api_key: &str, model: &str, base_url: &str) -> Result<Self, RenameError> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct Request<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl Response {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
    }
}

impl LabelProvider for GeminiLabeler {
    fn propose_label(&self, image: &Path) -> Result<String, RenameError> {
        let bytes = fs::read(image).map_err(|source| RenameError::ImageRead {
            path: image.to_path_buf(),
            source,
        })?;

        let req = Request {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: PROMPT },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: mime_type(image),
                            data: general_purpose::STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| RenameError::Request(format!("invalid API key header: {}", e)))?,
        );

        let response = self.client.post(url).headers(headers).json(&req).send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(RenameError::Status { status, body });
        }

        let body: Response = response.json()?;
        body.first_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(RenameError::EmptyLabel)
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type(Path::new("a.png")), "image/png");
        assert_eq!(mime_type(Path::new("a.tiff")), "image/tiff");
        assert_eq!(mime_type(Path::new("a.bmp")), "image/bmp");
    }

    #[test]
    fn request_serializes_inline_image() {
        let req = Request {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "hi" },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: general_purpose::STANDARD.encode(b"abc"),
                        },
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&req).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "hi");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "YWJj");
    }

    #[test]
    fn response_text_is_extracted() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"red-floral-dress\n"}]}}]}"#;
        let response: Response = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_text().as_deref(), Some("red-floral-dress\n"));
    }

    #[test]
    fn blocked_response_has_no_text() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: Response = serde_json::from_str(body).unwrap();
        assert!(response.first_text().is_none());
    }

    #[test]
    fn unreadable_image_is_reported() {
        let labeler = GeminiLabeler::new("key").unwrap();
        let result = labeler.propose_label(Path::new("/nonexistent/representative.jpg"));
        assert!(matches!(result, Err(RenameError::ImageRead { .. })));
    }
}
