// 服务模块
// 提供故事生成流水线的各段实现

pub mod database;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod quiz;
pub mod story;

pub use database::Database;

pub use parser::{extract_word_definitions, missing_words, UNKNOWN_POS};

pub use prompt::{build_story_prompt, StoryPrompt};

pub use provider::{ChatBackend, ChatMessage, ChatReply, LlmProvider, ProviderClient};

pub use quiz::{build_quiz, AnswerOutcome, QuizSession};

pub use story::{StoryOutcome, StoryService};
