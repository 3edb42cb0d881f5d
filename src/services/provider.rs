//! LLM 服务商适配层
//! 三家服务商的端点、模型与错误码翻译表，以及统一的 chat-completion 传输实现

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::models::TokenUsage;
use crate::services::prompt::StoryPrompt;

/// 建立连接的超时
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// 生成请求的整体超时
const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
/// 连通性自检的整体超时
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 支持的 LLM 服务商
///
/// 行为全部数据驱动：端点、模型名、提示词措辞（见 prompt 模块）和错误翻译表
/// 都按服务商查表，不走继承。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    OpenAi,
    DeepSeek,
    Moonshot,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 3] = [
        LlmProvider::OpenAi,
        LlmProvider::DeepSeek,
        LlmProvider::Moonshot,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::DeepSeek => "DeepSeek",
            LlmProvider::Moonshot => "Moonshot",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/",
            LlmProvider::DeepSeek => "https://api.deepseek.com/",
            LlmProvider::Moonshot => "https://api.moonshot.cn/",
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4o",
            LlmProvider::DeepSeek => "deepseek-chat",
            LlmProvider::Moonshot => "moonshot-v1-8k",
        }
    }

    /// 设置存储里的标识符
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI",
            LlmProvider::DeepSeek => "DEEPSEEK",
            LlmProvider::Moonshot => "MOONSHOT",
        }
    }

    /// 从设置存储的标识符还原，无法识别时回落到 OpenAI
    pub fn from_name(name: &str) -> LlmProvider {
        match name.trim().to_uppercase().as_str() {
            "DEEPSEEK" => LlmProvider::DeepSeek,
            "MOONSHOT" | "KIMI" => LlmProvider::Moonshot,
            _ => LlmProvider::OpenAi,
        }
    }

    /// 把 HTTP 状态码翻译成用户可读的失败原因
    ///
    /// 表外状态码尝试解析响应体里的 `error.message` 或顶层 `message`，
    /// 都没有时截取正文前 100 个字符。
    pub fn decode_error(&self, status: u16, body: &str) -> String {
        let name = self.display_name();
        match status {
            401 => format!("{name} API Key 无效或未授权，请检查设置"),
            429 => format!("{name} 请求过于频繁或配额已用完，请稍后再试"),
            500 | 502 | 503 => format!("{name} 服务暂时不可用，请稍后重试"),
            _ => {
                let decoded = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.pointer("/error/message")
                            .and_then(|m| m.as_str())
                            .or_else(|| v.get("message").and_then(|m| m.as_str()))
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| body.chars().take(100).collect());
                format!("{name} API error: {decoded}")
            }
        }
    }
}

/// 聊天消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

/// 一次成功调用返回的正文与计量
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// 生成服务与传输层之间的接缝，测试注入假后端
pub trait ChatBackend: Send + Sync {
    fn chat(
        &self,
        provider: LlmProvider,
        api_key: &str,
        prompt: &StoryPrompt,
    ) -> impl Future<Output = Result<ChatReply, GenerationError>> + Send;
}

/// 基于 reqwest 的真实传输实现
pub struct ProviderClient {
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// 调用 chat-completion 端点，失败时把传输错误和状态码改写成用户可读分类
    pub async fn chat_completion(
        &self,
        provider: LlmProvider,
        api_key: &str,
        prompt: &StoryPrompt,
    ) -> Result<ChatReply, GenerationError> {
        let url = format!("{}v1/chat/completions", provider.base_url());
        let request = ChatCompletionRequest {
            model: provider.model(),
            messages: &prompt.messages,
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ProviderRejected {
                status: status.as_u16(),
                message: provider.decode_error(status.as_u16(), &body),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(map_transport_error)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(GenerationError::MalformedOutput)?;

        Ok(ChatReply {
            content,
            usage: parsed.usage,
        })
    }

    /// 连通性自检：GET /v1/models，只看状态码，不读响应体
    pub async fn probe(
        &self,
        provider: LlmProvider,
        api_key: &str,
    ) -> Result<(), GenerationError> {
        let url = format!("{}v1/models", provider.base_url());
        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GenerationError::ProviderRejected {
                status: status.as_u16(),
                message: provider.decode_error(status.as_u16(), ""),
            })
        }
    }
}

impl ChatBackend for ProviderClient {
    fn chat(
        &self,
        provider: LlmProvider,
        api_key: &str,
        prompt: &StoryPrompt,
    ) -> impl Future<Output = Result<ChatReply, GenerationError>> + Send {
        self.chat_completion(provider, api_key, prompt)
    }
}

/// 把 reqwest 的传输错误改写成用户可读分类，认不出的原样向上传递
fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        return GenerationError::RequestTimeout;
    }

    let detail = source_chain(&e).to_lowercase();
    if detail.contains("dns") || detail.contains("failed to lookup") {
        return GenerationError::NetworkUnavailable;
    }
    if detail.contains("certificate") || detail.contains("tls") || detail.contains("ssl") {
        return GenerationError::SecureConnectionError;
    }
    if e.is_connect() {
        return GenerationError::NetworkUnavailable;
    }

    GenerationError::Http(e)
}

fn source_chain(e: &dyn std::error::Error) -> String {
    let mut parts = vec![e.to_string()];
    let mut current = e.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_table_fixed_codes() {
        let msg = LlmProvider::OpenAi.decode_error(401, "");
        assert!(msg.contains("OpenAI"));
        assert!(msg.contains("API Key"));

        let msg = LlmProvider::DeepSeek.decode_error(429, "");
        assert!(msg.contains("DeepSeek"));
        assert!(msg.contains("配额"));

        for status in [500, 502, 503] {
            let msg = LlmProvider::Moonshot.decode_error(status, "");
            assert!(msg.contains("Moonshot"));
            assert!(msg.contains("稍后重试"));
        }
    }

    #[test]
    fn test_decode_nested_error_message() {
        let body = r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#;
        let msg = LlmProvider::OpenAi.decode_error(404, body);
        assert_eq!(msg, "OpenAI API error: model not found");
    }

    #[test]
    fn test_decode_top_level_message() {
        let body = r#"{"message":"invalid model id"}"#;
        let msg = LlmProvider::Moonshot.decode_error(400, body);
        assert_eq!(msg, "Moonshot API error: invalid model id");
    }

    #[test]
    fn test_decode_raw_body_truncated_to_100_chars() {
        let body = "x".repeat(300);
        let msg = LlmProvider::DeepSeek.decode_error(418, &body);
        assert_eq!(msg, format!("DeepSeek API error: {}", "x".repeat(100)));
    }

    #[test]
    fn test_provider_name_round_trip() {
        for provider in LlmProvider::ALL {
            assert_eq!(LlmProvider::from_name(provider.name()), provider);
        }
        assert_eq!(LlmProvider::from_name("kimi"), LlmProvider::Moonshot);
        assert_eq!(LlmProvider::from_name("garbage"), LlmProvider::OpenAi);
    }

    #[test]
    fn test_endpoints_and_models() {
        assert_eq!(LlmProvider::OpenAi.model(), "gpt-4o");
        assert_eq!(LlmProvider::DeepSeek.base_url(), "https://api.deepseek.com/");
        assert_eq!(LlmProvider::Moonshot.model(), "moonshot-v1-8k");
    }
}
