//! 提示词工程
//! 按服务商家族生成故事提示词：国产模型用中文指令并附 system 角色，OpenAI 用英文指令

use crate::services::provider::{ChatMessage, LlmProvider};

/// 国产模型家族的 system 角色设定
const DOMESTIC_SYSTEM_PROMPT: &str =
    "你是一位耐心的英语老师，擅长通过编写短篇故事帮助学生记忆英语单词，输出严格遵守用户要求的标注格式。";

/// 一次生成请求的完整提示词与采样参数
#[derive(Debug, Clone)]
pub struct StoryPrompt {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// 构建故事生成提示词
///
/// 两种措辞约束完全一致：故事长度、每个单词恰好出现一次并按四段式标注、
/// 翻译准确简洁、零容忍遗漏（明确写出全部 N 个单词都必须出现）、主题。
/// 国产模型对中文指令的理解更稳，额外给 system 消息并压低温度；
/// OpenAI 用英文指令，不带 system 消息。
pub fn build_story_prompt(
    words: &[String],
    theme: &str,
    target_length: u32,
    provider: LlmProvider,
) -> StoryPrompt {
    let word_list = words.join(", ");
    let count = words.len();

    let (instruction, system, temperature, max_tokens) = match provider {
        LlmProvider::DeepSeek | LlmProvider::Moonshot => (
            format!(
                "请用英文写一个约 {target_length} 词的短篇故事，主题是“{theme}”，\
                 必须包含以下全部英语单词：{word_list}。\n\n\
                 要求：\n\
                 1. 每个单词恰好出现一次，并按 **word** [词性] (中文翻译) *该句中的含义* 格式标注\n\
                 2. 中文翻译要准确简洁，星号部分解释该单词在这个句子里的具体含义\n\
                 3. 故事要连贯有趣\n\
                 4. 绝对不允许遗漏：这 {count} 个单词全部必须出现在故事里，一个都不能少\n\n\
                 示例格式：The traveler had to **abandon** [v.] (放弃) *give up* his quest..."
            ),
            Some(DOMESTIC_SYSTEM_PROMPT.to_string()),
            0.3,
            1200,
        ),
        LlmProvider::OpenAi => (
            format!(
                "Write a {target_length}-word English story on the theme \"{theme}\" \
                 that includes ALL of the following vocabulary words: {word_list}.\n\n\
                 Important requirements:\n\
                 1. Each word must appear exactly once, tagged as \
                 **word** [part of speech] (Chinese translation) *meaning in this sentence*\n\
                 2. Chinese translations must be accurate and concise; the starred part \
                 explains the word's specific sense in that sentence\n\
                 3. The story should be coherent and interesting\n\
                 4. Zero tolerance for omissions: all {count} words are mandatory, do not skip any\n\n\
                 Example format: The traveler had to **abandon** [v.] (放弃) *give up* his quest..."
            ),
            None,
            0.7,
            1000,
        ),
    };

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: instruction,
    });

    StoryPrompt {
        messages,
        temperature,
        max_tokens,
    }
}
