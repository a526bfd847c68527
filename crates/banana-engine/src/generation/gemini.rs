use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Map, Value};

use super::{ContentRequest, ContentResponse, GenerationError, GenerationService};
use crate::config::{non_empty_env, StudioConfig};

const ERROR_BODY_MAX_CHARS: usize = 512;

/// `generateContent` over the Gemini REST API.
///
/// The API key is looked up on every call, so a missing key only surfaces
/// when the first request is made.
pub struct GeminiService {
    api_base: String,
    api_key_vars: Vec<String>,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiService {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key_vars: config.api_key_vars.clone(),
            timeout: config.request_timeout,
            http: HttpClient::new(),
        }
    }

    fn api_key(&self) -> Option<String> {
        self.api_key_vars.iter().find_map(|key| non_empty_env(key))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &ContentRequest) -> Value {
        let mut payload = Map::new();
        if let Some(instruction) = request
            .system_instruction
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": instruction }] }),
            );
        }
        payload.insert(
            "contents".to_string(),
            json!([{
                "role": "user",
                "parts": request.parts,
            }]),
        );
        if let Some(aspect_ratio) = request.aspect_ratio.as_deref() {
            payload.insert(
                "generationConfig".to_string(),
                json!({ "imageConfig": { "aspectRatio": aspect_ratio } }),
            );
        }
        Value::Object(payload)
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            return GenerationError::Timeout {
                seconds: self.timeout.as_secs(),
            };
        }
        GenerationError::Network(error_chain_text(&err))
    }
}

impl GenerationService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<ContentResponse, GenerationError> {
        let Some(api_key) = self.api_key() else {
            return Err(GenerationError::CredentialMissing {
                checked: self.api_key_vars.join(" or "),
            });
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key.as_str())])
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let body = response.text().map_err(|err| self.transport_error(err))?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), %endpoint, "gemini request rejected");
            return Err(GenerationError::Service {
                status: status.as_u16(),
                body: truncate_text(&body, ERROR_BODY_MAX_CHARS),
            });
        }
        let parsed: ContentResponse = serde_json::from_str(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        tracing::debug!(candidates = parsed.candidates.len(), "gemini response parsed");
        Ok(parsed)
    }
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if parts.last().map(|last| last != &text).unwrap_or(true) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(" | caused by: ")
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use serde_json::json;

    use super::{truncate_text, GeminiService};
    use crate::config::StudioConfig;
    use crate::generation::{ContentPart, ContentRequest, GenerationError, GenerationService};

    const TEST_KEY_VAR: &str = "BANANA_TEST_GEMINI_KEY";

    /// Answers one connection with `response` after `delay` and reports the
    /// raw request it read.
    fn serve_once(
        response: String,
        delay: Duration,
    ) -> anyhow::Result<(String, mpsc::Receiver<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let request = read_request(&mut stream);
                let _ = tx.send(request);
                thread::sleep(delay);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        Ok((format!("http://{addr}/v1beta"), rx))
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(read) => read,
            };
            buf.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn local_service(api_base: String, timeout: Duration) -> GeminiService {
        std::env::set_var(TEST_KEY_VAR, "local-test-key");
        let config = StudioConfig {
            api_base,
            api_key_vars: vec![TEST_KEY_VAR.to_string()],
            request_timeout: timeout,
            ..StudioConfig::default()
        };
        GeminiService::new(&config)
    }

    fn text_request() -> ContentRequest {
        ContentRequest {
            model: "gemini-2.5-flash".to_string(),
            system_instruction: None,
            parts: vec![ContentPart::text("a lighthouse")],
            aspect_ratio: None,
        }
    }

    #[test]
    fn success_parses_candidates_and_sends_key_in_query() -> anyhow::Result<()> {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "מגדלור"}]}}]}).to_string();
        let (base, requests) = serve_once(http_response("200 OK", &body), Duration::ZERO)?;
        let service = local_service(base, Duration::from_secs(5));

        let response = service.generate_content(&text_request())?;
        assert_eq!(response.text(), "מגדלור");

        let request = requests.recv_timeout(Duration::from_secs(5))?;
        assert!(request.starts_with(
            "POST /v1beta/models/gemini-2.5-flash:generateContent?key=local-test-key "
        ));
        assert!(request.contains("\"text\":\"a lighthouse\""));
        Ok(())
    }

    #[test]
    fn non_success_status_maps_to_service_error() -> anyhow::Result<()> {
        let (base, _requests) = serve_once(
            http_response("500 Internal Server Error", r#"{"error":"boom"}"#),
            Duration::ZERO,
        )?;
        let service = local_service(base, Duration::from_secs(5));
        assert_eq!(
            service.generate_content(&text_request()).err(),
            Some(GenerationError::Service {
                status: 500,
                body: r#"{"error":"boom"}"#.to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn unparsable_body_maps_to_malformed_response() -> anyhow::Result<()> {
        let (base, _requests) = serve_once(http_response("200 OK", "not json"), Duration::ZERO)?;
        let service = local_service(base, Duration::from_secs(5));
        let result = service.generate_content(&text_request());
        assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));
        Ok(())
    }

    #[test]
    fn slow_reply_maps_to_timeout() -> anyhow::Result<()> {
        let (base, _requests) = serve_once(
            http_response("200 OK", r#"{"candidates":[]}"#),
            Duration::from_secs(3),
        )?;
        let service = local_service(base, Duration::from_millis(500));
        let result = service.generate_content(&text_request());
        assert!(matches!(result, Err(GenerationError::Timeout { .. })));
        Ok(())
    }

    fn service_without_key() -> GeminiService {
        let config = StudioConfig {
            api_base: "https://gemini.test/v1beta/".to_string(),
            api_key_vars: vec!["BANANA_TEST_KEY_THAT_IS_NEVER_SET".to_string()],
            ..StudioConfig::default()
        };
        GeminiService::new(&config)
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_models() {
        let service = service_without_key();
        assert_eq!(
            service.endpoint_for_model("gemini-2.5-flash"),
            "https://gemini.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            service.endpoint_for_model(" models/gemini-2.5-flash-image "),
            "https://gemini.test/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn text_payload_carries_system_instruction_and_parts() {
        let request = ContentRequest {
            model: "gemini-2.5-flash".to_string(),
            system_instruction: Some("be vivid".to_string()),
            parts: vec![
                ContentPart::inline("image/png", b"abc"),
                ContentPart::text("a lighthouse"),
            ],
            aspect_ratio: None,
        };
        let payload = GeminiService::build_payload(&request);
        assert_eq!(
            payload["systemInstruction"],
            json!({"parts": [{"text": "be vivid"}]})
        );
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(
            payload["contents"][0]["parts"][0],
            json!({"inlineData": {"mimeType": "image/png", "data": "YWJj"}})
        );
        assert_eq!(
            payload["contents"][0]["parts"][1],
            json!({"text": "a lighthouse"})
        );
        assert!(payload.get("generationConfig").is_none());
    }

    #[test]
    fn image_payload_carries_aspect_ratio() {
        let request = ContentRequest {
            model: "gemini-2.5-flash-image".to_string(),
            system_instruction: None,
            parts: vec![ContentPart::text("wallpaper")],
            aspect_ratio: Some("9:16".to_string()),
        };
        let payload = GeminiService::build_payload(&request);
        assert_eq!(
            payload["generationConfig"],
            json!({"imageConfig": {"aspectRatio": "9:16"}})
        );
        assert!(payload.get("systemInstruction").is_none());
    }

    #[test]
    fn missing_key_fails_on_first_call() {
        let service = service_without_key();
        let request = ContentRequest {
            model: "gemini-2.5-flash".to_string(),
            system_instruction: None,
            parts: vec![ContentPart::text("hi")],
            aspect_ratio: None,
        };
        let result = service.generate_content(&request);
        assert_eq!(
            result.err(),
            Some(GenerationError::CredentialMissing {
                checked: "BANANA_TEST_KEY_THAT_IS_NEVER_SET".to_string()
            })
        );
    }

    #[test]
    fn truncate_text_marks_cut_bodies() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
    }
}
