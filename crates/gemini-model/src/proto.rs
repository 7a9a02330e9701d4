use ideaflow_model::{
    ModelFinishReason, ModelMessage, ModelRequest, ModelResponse,
};
use serde::{Deserialize, Serialize};

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// The body Google APIs return along with an error status.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: req.messages.iter().map(create_content).collect(),
        system_instruction: req.system_instruction.as_ref().map(|text| {
            SystemInstruction {
                parts: vec![Part { text: text.clone() }],
            }
        }),
    }
}

#[inline]
fn create_content(msg: &ModelMessage) -> Content {
    let role = match msg {
        ModelMessage::User(_) => Role::User,
        ModelMessage::Assistant(_) => Role::Model,
    };
    Content {
        role,
        parts: vec![Part {
            text: msg.text().to_owned(),
        }],
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of the response.
///
/// Returns `None` when any step of that path is missing.
pub fn extract_response(
    mut resp: GenerateContentResponse,
) -> Option<ModelResponse> {
    if resp.candidates.is_empty() {
        return None;
    }
    let candidate = resp.candidates.swap_remove(0);
    let text = candidate
        .content?
        .parts
        .into_iter()
        .next()?
        .text?;
    let finish_reason = candidate.finish_reason.as_deref().map(|reason| {
        match reason {
            "STOP" => ModelFinishReason::Stop,
            "MAX_TOKENS" => ModelFinishReason::MaxTokens,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => {
                ModelFinishReason::Moderated
            }
            _ => ModelFinishReason::Other,
        }
    });
    Some(ModelResponse {
        text,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = ModelRequest::with_messages([
            ModelMessage::User("App Name: TaskFlow".to_owned()),
            ModelMessage::Assistant("Love it!".to_owned()),
            ModelMessage::User("Teams of five".to_owned()),
        ])
        .with_system_instruction("You are a product strategist.");
        let body = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "App Name: TaskFlow" }] },
                    { "role": "model", "parts": [{ "text": "Love it!" }] },
                    { "role": "user", "parts": [{ "text": "Teams of five" }] },
                ],
                "systemInstruction": {
                    "parts": [{ "text": "You are a product strategist." }]
                }
            })
        );
    }

    #[test]
    fn test_create_request_without_instruction() {
        let request =
            ModelRequest::with_messages([ModelMessage::User("Hi".to_owned())]);
        let body = serde_json::to_value(create_request(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_extract_response() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "Great idea." }, { "text": "ignored" }]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();
        let resp = extract_response(resp).unwrap();
        assert_eq!(resp.text, "Great idea.");
        assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
    }

    #[test]
    fn test_extract_missing_fields() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{}] } }] }),
        ] {
            let resp: GenerateContentResponse =
                serde_json::from_value(body).unwrap();
            assert_eq!(extract_response(resp), None);
        }
    }
}
