//! 故事生成服务
//! 串起提示词构建、服务商调用、重试循环与输出校验，是整个流水线的编排层

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::error::GenerationError;
use crate::models::{SavedStory, TokenUsage, WordDefinition};
use crate::services::database::Database;
use crate::services::parser;
use crate::services::prompt::{build_story_prompt, StoryPrompt};
use crate::services::provider::{ChatBackend, LlmProvider};

/// 一次生成请求内的最大尝试次数
const MAX_ATTEMPTS: u32 = 5;

/// 两次尝试之间的固定等待
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// 未配置 API Key 时使用的内置演示故事
const DEMO_STORY: &str = "\
Once upon a time, a young adventurer found himself in a difficult situation. \
He had to **abandon** [v.] (放弃) *give up his original plan* when he discovered \
that the ancient map was **fragile** [adj.] (脆弱的) *easily torn* and barely \
readable. The mysterious circumstances seemed to **compel** [v.] (强迫) *force \
him against his will* to take a different path through the **obscure** [adj.] \
(模糊的) *hard to see through* forest.

Along the way, he met a stranger who tried to **deceive** [v.] (欺骗) *trick* \
him with false promises of treasure. However, the adventurer had made a \
**pledge** [n.] (承诺) *a solemn promise* to his village to return with the \
sacred artifact. Despite feeling **weary** [adj.] (疲惫的) *extremely tired* \
from the long journey, he pressed on with **vivid** [adj.] (生动的) *clear and \
bright* memories of his home motivating him.

In the end, truth and determination would **prevail** [v.] (获胜) *win out*, \
and he would finally **embrace** [v.] (拥抱) *welcome gladly* the success that \
awaited him.";

/// 一次成功生成的产物
#[derive(Debug, Clone, PartialEq)]
pub struct StoryOutcome {
    pub story: String,
    pub definitions: Vec<WordDefinition>,
    /// API 返回计量时才有值，演示故事没有
    pub token_usage: Option<TokenUsage>,
}

/// 故事生成服务
///
/// 对后端做泛型，测试注入假的 [`ChatBackend`]。同一时刻只允许一个生成
/// 请求在途，后来的请求直接拒绝（[`GenerationError::Busy`]）。
pub struct StoryService<B: ChatBackend> {
    backend: B,
    db: Arc<Database>,
    in_flight: AtomicBool,
}

impl<B: ChatBackend> StoryService<B> {
    pub fn new(backend: B, db: Arc<Database>) -> Self {
        Self {
            backend,
            db,
            in_flight: AtomicBool::new(false),
        }
    }

    /// 为给定单词列表生成一个故事并解析出全部释义
    ///
    /// 未配置 API Key 时直接解析内置演示故事返回，不走网络、不重试、
    /// 不写历史。否则顺序最多尝试 [`MAX_ATTEMPTS`] 次，每次失败后等
    /// [`RETRY_DELAY`] 再试，只保留最后一次的失败原因；全部耗尽时以
    /// [`GenerationError::AllAttemptsExhausted`] 上报。成功时把故事
    /// 追加进历史记录。
    pub async fn generate_story(
        &self,
        words: &[String],
    ) -> Result<StoryOutcome, GenerationError> {
        let _guard =
            InFlightGuard::acquire(&self.in_flight).ok_or(GenerationError::Busy)?;

        let api_key = self.db.get_api_key()?.unwrap_or_default();
        if api_key.trim().is_empty() {
            log::info!("未配置 API Key，返回内置演示故事");
            let definitions = parser::extract_word_definitions(DEMO_STORY);
            return Ok(StoryOutcome {
                story: DEMO_STORY.to_string(),
                definitions,
                token_usage: None,
            });
        }

        let theme = self.db.get_story_theme()?;
        let length = self.db.get_story_length()?;
        let provider = self.db.get_provider()?;

        let mut last_error: Option<GenerationError> = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let prompt = build_story_prompt(words, &theme, length, provider);
            match self.run_attempt(provider, &api_key, &prompt, words).await {
                Ok((story, definitions, token_usage)) => {
                    log::info!(
                        "第 {attempt} 次尝试生成成功，解析出 {} 条释义",
                        definitions.len()
                    );
                    self.record_success(words, &theme, provider, &story, &definitions);
                    return Ok(StoryOutcome {
                        story,
                        definitions,
                        token_usage,
                    });
                }
                Err(e) => {
                    log::warn!("第 {attempt}/{MAX_ATTEMPTS} 次生成失败: {e}");
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(GenerationError::AllAttemptsExhausted {
            attempts: MAX_ATTEMPTS,
            last: Box::new(last_error.unwrap_or(GenerationError::MalformedOutput)),
        })
    }

    /// 单次尝试：调用后端，做格式检查和完整性检查
    async fn run_attempt(
        &self,
        provider: LlmProvider,
        api_key: &str,
        prompt: &StoryPrompt,
        words: &[String],
    ) -> Result<(String, Vec<WordDefinition>, Option<TokenUsage>), GenerationError> {
        let reply = self.backend.chat(provider, api_key, prompt).await?;
        let story = reply.content;

        // 格式检查：起码得有一处加粗标记和一个括号
        if !(story.contains("**") && story.contains('(')) {
            return Err(GenerationError::MalformedOutput);
        }

        let definitions = parser::extract_word_definitions(&story);
        let missing = parser::missing_words(words, &definitions);
        if !missing.is_empty() {
            return Err(GenerationError::IncompleteOutput { missing });
        }

        Ok((story, definitions, reply.usage))
    }

    /// 成功后的副作用：写入故事历史并记住本次输入的单词
    ///
    /// 存储失败只记日志，不影响已经生成好的结果。
    fn record_success(
        &self,
        words: &[String],
        theme: &str,
        provider: LlmProvider,
        story: &str,
        definitions: &[WordDefinition],
    ) {
        let saved = SavedStory {
            id: Uuid::new_v4().to_string(),
            title: format!("{theme}（{} 词）", words.len()),
            content: story.to_string(),
            word_definitions: definitions.to_vec(),
            original_words: words.to_vec(),
            theme: theme.to_string(),
            created_at: Utc::now(),
            llm_provider: provider.display_name().to_string(),
        };
        if let Err(e) = self.db.save_story(&saved) {
            log::warn!("写入故事历史失败: {e:#}");
        }
        if let Err(e) = self.db.save_last_word_input(&words.join(", ")) {
            log::warn!("记录单词输入失败: {e:#}");
        }
    }
}

/// 在途标记的持有凭证，析构时自动放行下一个请求
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
