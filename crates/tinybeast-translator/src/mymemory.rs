use async_trait::async_trait;
use serde_json::Value;
use tinybeast_types::{AggregatedTranslation, LangCode, MemoryMatch, SourceLang};

use crate::{ProviderMetadata, TranslateError, Translator};

const PROVIDER: &str = "mymemory";

#[derive(Clone)]
pub struct MyMemoryTranslator {
    client: reqwest::Client,
    api_url: String,
    email: Option<String>,
}

impl MyMemoryTranslator {
    pub fn new(client: reqwest::Client, api_url: String, email: Option<String>) -> Self {
        Self {
            client,
            api_url,
            email,
        }
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError> {
        let text = text.trim().to_lowercase();
        let source = match from {
            SourceLang::Auto => "Autodetect",
            SourceLang::Lang(code) => code.as_str(),
        };
        let langpair = format!("{source}|{to}");

        let mut params = vec![("q", text.as_str()), ("langpair", langpair.as_str())];
        if let Some(email) = &self.email {
            params.push(("de", email.as_str()));
        }

        tracing::debug!("MyMemory request {langpair}: {} chars", text.len());

        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .send()
            .await?;

        if response.status() == 429 {
            return Err(TranslateError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            return Err(TranslateError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            TranslateError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        parse_response(&json)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "MyMemory".to_string(),
            requires_api_key: false,
            free_tier_available: true,
        }
    }
}

fn parse_response(json: &Value) -> Result<AggregatedTranslation, TranslateError> {
    // responseStatus arrives both as a number and as a string
    let status = match &json["responseStatus"] {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };

    if status == Some(429) {
        return Err(TranslateError::RateLimitExceeded);
    }

    if let Some(code) = status
        && code != 200
    {
        let details = json["responseDetails"].as_str().unwrap_or("unknown error");
        return Err(TranslateError::ApiError(format!("{code}: {details}")));
    }

    let primary = json["responseData"]["translatedText"]
        .as_str()
        .ok_or_else(|| TranslateError::ApiError("No translation in response".to_string()))?;

    let alternatives = json["matches"]
        .as_array()
        .map(|matches| matches.iter().filter_map(parse_match).collect())
        .unwrap_or_default();

    Ok(AggregatedTranslation {
        primary: primary.to_string(),
        provider: PROVIDER.to_string(),
        alternatives,
        ..Default::default()
    })
}

fn parse_match(value: &Value) -> Option<MemoryMatch> {
    let accuracy = match &value["match"] {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };

    Some(MemoryMatch {
        segment: value["segment"].as_str()?.to_string(),
        translation: value["translation"].as_str()?.to_string(),
        accuracy: accuracy as f32,
    })
}
