//! AI 背单词核心引擎
//!
//! 流水线：单词列表 → 提示词构建 → 服务商调用（带重试）→ 富文本标注解析 →
//! 完整性校验 → 选择题生成 → 答题计分与错题记录。周边的界面、导航和主题
//! 不在本 crate 范围内，调用方只依赖这里暴露的纯数据结果。

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::GenerationError;
pub use models::{
    QuizQuestion, QuizResult, SavedStory, TokenUsage, WordDefinition, WrongAnswer,
};
pub use services::{
    build_quiz, build_story_prompt, extract_word_definitions, missing_words, AnswerOutcome,
    ChatBackend, ChatMessage, ChatReply, Database, LlmProvider, ProviderClient, QuizSession,
    StoryOutcome, StoryPrompt, StoryService,
};
