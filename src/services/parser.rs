//! 富文本标注解析引擎
//! 从 AI 生成的故事文本中提取 `**word** [词性] (翻译) *语境含义*` 四段式标注

use regex::Regex;
use std::collections::HashSet;

use crate::models::WordDefinition;

/// 主格式：`**word** [词性] (翻译) *语境含义*`
/// 单词只认 ASCII 字母数字下划线，中文等其他字符按普通正文处理
const RICH_PATTERN: &str = r"\*\*([A-Za-z0-9_]+)\*\*\s*\[([^\]]+)\]\s*\(([^)]+)\)\s*\*([^*]+)\*";

/// 旧版兜底格式：`**word** (翻译)`
const LEGACY_PATTERN: &str = r"\*\*([A-Za-z0-9_]+)\*\*\s*\(([^)]+)\)";

/// 主格式缺失词性时使用的占位值
pub const UNKNOWN_POS: &str = "unknown";

/// 按文本出现顺序提取全部单词释义
///
/// 主格式一个都匹配不到时，退回旧版两段式重新扫描，此时词性为
/// [`UNKNOWN_POS`]，语境含义为空。残缺的标注（比如少了收尾星号）当作
/// 普通正文跳过，不算错误。同一单词出现多次会产生多条记录，不去重。
pub fn extract_word_definitions(story: &str) -> Vec<WordDefinition> {
    let rich = Regex::new(RICH_PATTERN).unwrap();

    let mut definitions: Vec<WordDefinition> = rich
        .captures_iter(story)
        .map(|cap| WordDefinition {
            word: cap[1].to_lowercase(),
            part_of_speech: cap[2].trim().to_string(),
            translation: cap[3].trim().to_string(),
            context_meaning: non_empty(cap[4].trim()),
        })
        .collect();

    if definitions.is_empty() {
        let legacy = Regex::new(LEGACY_PATTERN).unwrap();
        definitions = legacy
            .captures_iter(story)
            .map(|cap| WordDefinition {
                word: cap[1].to_lowercase(),
                part_of_speech: UNKNOWN_POS.to_string(),
                translation: cap[2].trim().to_string(),
                context_meaning: None,
            })
            .collect();
    }

    definitions
}

/// 完整性检查：返回要求出现但没被解析出来的单词
///
/// 两边都做 trim + 小写后取差集，结果保持输入顺序并去重。
pub fn missing_words(requested: &[String], definitions: &[WordDefinition]) -> Vec<String> {
    let parsed: HashSet<&str> = definitions.iter().map(|d| d.word.as_str()).collect();

    let mut missing = Vec::new();
    let mut seen = HashSet::new();
    for word in requested {
        let normalized = word.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if !parsed.contains(normalized.as_str()) && seen.insert(normalized.clone()) {
            missing.push(normalized);
        }
    }
    missing
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
