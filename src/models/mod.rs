use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 从故事标注中解析出的单词释义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDefinition {
    /// 单词本身，统一小写
    pub word: String,
    /// 词性，主格式缺失时为 "unknown"
    pub part_of_speech: String,
    /// 中文翻译
    pub translation: String,
    /// 该单词在句中的具体含义
    pub context_meaning: Option<String>,
}

/// 选择题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub word: String,
    pub part_of_speech: String,
    pub question: String,
    /// 选项，正确翻译恰好出现一次
    pub options: Vec<String>,
    pub correct_index: usize,
    pub correct_translation: String,
    pub context_meaning: Option<String>,
}

/// 错题记录，仅在答错时产生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub word: String,
    pub part_of_speech: String,
    pub correct_translation: String,
    pub user_answer: String,
    pub context_meaning: Option<String>,
}

/// 一次测验的最终成绩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub total_questions: usize,
    pub correct_answers: usize,
    pub percentage: f64,
}

impl QuizResult {
    pub fn evaluation(&self) -> &'static str {
        if self.percentage >= 90.0 {
            "🏆 优秀！猫猫很崇拜你！"
        } else if self.percentage >= 70.0 {
            "👍 不错！你的努力猫猫都看在眼里！"
        } else {
            "What can I say? 猫猫 OUT!😭"
        }
    }
}

/// API 返回的 token 计量，demo 模式下不存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// 历史故事记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStory {
    pub id: String,
    pub title: String,
    pub content: String,
    pub word_definitions: Vec<WordDefinition>,
    pub original_words: Vec<String>,
    pub theme: String,
    pub created_at: DateTime<Utc>,
    pub llm_provider: String,
}
