// 本地存储模块
// 提供 SQLite 持久化：应用设置的键值读写与故事历史记录

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::models::{SavedStory, WordDefinition};
use crate::services::provider::LlmProvider;

/// 历史记录上限，超出后淘汰最旧的
const HISTORY_CAP: usize = 20;

const DEFAULT_THEME: &str = "adventure";
const DEFAULT_STORY_LENGTH: u32 = 250;

const KEY_API_KEY: &str = "api_key";
const KEY_STORY_THEME: &str = "story_theme";
const KEY_STORY_LENGTH: &str = "story_length";
const KEY_LLM_PROVIDER: &str = "llm_provider";
const KEY_LAST_WORD_INPUT: &str = "last_word_input";

/// 设置与故事历史的存储服务
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 打开（必要时创建）数据库文件
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("创建数据目录失败: {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("打开数据库失败: {}", path.display()))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    /// 内存数据库，测试用
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("打开内存数据库失败")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                word_definitions TEXT NOT NULL,
                original_words TEXT NOT NULL,
                theme TEXT NOT NULL,
                created_at TEXT NOT NULL,
                llm_provider TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stories_created_at ON stories(created_at);",
        )
        .context("初始化表结构失败")?;
        Ok(())
    }

    // ==================== 设置 ====================

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?")?;
        let mut rows = stmt.query(rusqlite::params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    pub fn save_api_key(&self, api_key: &str) -> Result<()> {
        self.set_setting(KEY_API_KEY, api_key)
    }

    pub fn get_api_key(&self) -> Result<Option<String>> {
        self.get_setting(KEY_API_KEY)
    }

    pub fn clear_api_key(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM settings WHERE key = ?",
            rusqlite::params![KEY_API_KEY],
        )?;
        Ok(())
    }

    pub fn save_story_theme(&self, theme: &str) -> Result<()> {
        self.set_setting(KEY_STORY_THEME, theme)
    }

    pub fn get_story_theme(&self) -> Result<String> {
        Ok(self
            .get_setting(KEY_STORY_THEME)?
            .unwrap_or_else(|| DEFAULT_THEME.to_string()))
    }

    pub fn save_story_length(&self, length: u32) -> Result<()> {
        self.set_setting(KEY_STORY_LENGTH, &length.to_string())
    }

    pub fn get_story_length(&self) -> Result<u32> {
        Ok(self
            .get_setting(KEY_STORY_LENGTH)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STORY_LENGTH))
    }

    pub fn save_provider(&self, provider: LlmProvider) -> Result<()> {
        self.set_setting(KEY_LLM_PROVIDER, provider.name())
    }

    pub fn get_provider(&self) -> Result<LlmProvider> {
        Ok(self
            .get_setting(KEY_LLM_PROVIDER)?
            .map(|v| LlmProvider::from_name(&v))
            .unwrap_or(LlmProvider::OpenAi))
    }

    pub fn save_last_word_input(&self, input: &str) -> Result<()> {
        self.set_setting(KEY_LAST_WORD_INPUT, input)
    }

    pub fn get_last_word_input(&self) -> Result<Option<String>> {
        self.get_setting(KEY_LAST_WORD_INPUT)
    }

    // ==================== 故事历史 ====================

    /// 追加一条历史记录，超出上限时淘汰最旧的
    pub fn save_story(&self, story: &SavedStory) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO stories
             (id, title, content, word_definitions, original_words, theme, created_at, llm_provider)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                story.id,
                story.title,
                story.content,
                serde_json::to_string(&story.word_definitions)?,
                serde_json::to_string(&story.original_words)?,
                story.theme,
                story.created_at.to_rfc3339(),
                story.llm_provider,
            ],
        )?;

        conn.execute(
            "DELETE FROM stories WHERE id NOT IN (
                SELECT id FROM stories ORDER BY created_at DESC, rowid DESC LIMIT ?
            )",
            rusqlite::params![HISTORY_CAP as i64],
        )?;
        Ok(())
    }

    /// 按时间倒序列出全部历史故事
    pub fn list_stories(&self) -> Result<Vec<SavedStory>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, content, word_definitions, original_words, theme, created_at, llm_provider
             FROM stories ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut stories = Vec::new();
        for row in rows {
            let (id, title, content, defs, words, theme, created_at, llm_provider) = row?;
            let word_definitions: Vec<WordDefinition> =
                serde_json::from_str(&defs).context("历史记录中的释义数据损坏")?;
            let original_words: Vec<String> =
                serde_json::from_str(&words).context("历史记录中的单词数据损坏")?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .context("历史记录中的时间戳损坏")?
                .with_timezone(&Utc);
            stories.push(SavedStory {
                id,
                title,
                content,
                word_definitions,
                original_words,
                theme,
                created_at,
                llm_provider,
            });
        }
        Ok(stories)
    }

    pub fn rename_story(&self, id: &str, title: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE stories SET title = ? WHERE id = ?",
            rusqlite::params![title, id],
        )?;
        Ok(())
    }

    pub fn delete_story(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM stories WHERE id = ?", rusqlite::params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn story_at(n: i64) -> SavedStory {
        SavedStory {
            id: format!("story-{n}"),
            title: format!("故事 {n}"),
            content: "**abandon** [v.] (放弃) *give up*".to_string(),
            word_definitions: vec![WordDefinition {
                word: "abandon".to_string(),
                part_of_speech: "v.".to_string(),
                translation: "放弃".to_string(),
                context_meaning: Some("give up".to_string()),
            }],
            original_words: vec!["abandon".to_string()],
            theme: "adventure".to_string(),
            created_at: Utc::now() + Duration::seconds(n),
            llm_provider: "OpenAI".to_string(),
        }
    }

    #[test]
    fn test_settings_defaults() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_api_key().unwrap(), None);
        assert_eq!(db.get_story_theme().unwrap(), "adventure");
        assert_eq!(db.get_story_length().unwrap(), 250);
        assert_eq!(db.get_provider().unwrap(), LlmProvider::OpenAi);
    }

    #[test]
    fn test_settings_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.save_api_key("sk-test").unwrap();
        db.save_story_theme("科幻").unwrap();
        db.save_story_length(400).unwrap();
        db.save_provider(LlmProvider::Moonshot).unwrap();
        db.save_last_word_input("abandon, fragile").unwrap();

        assert_eq!(db.get_api_key().unwrap().as_deref(), Some("sk-test"));
        assert_eq!(db.get_story_theme().unwrap(), "科幻");
        assert_eq!(db.get_story_length().unwrap(), 400);
        assert_eq!(db.get_provider().unwrap(), LlmProvider::Moonshot);
        assert_eq!(
            db.get_last_word_input().unwrap().as_deref(),
            Some("abandon, fragile")
        );

        db.clear_api_key().unwrap();
        assert_eq!(db.get_api_key().unwrap(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let db = Database::open_in_memory().unwrap();
        db.save_story_theme("one").unwrap();
        db.save_story_theme("two").unwrap();
        assert_eq!(db.get_story_theme().unwrap(), "two");
    }

    #[test]
    fn test_history_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let story = story_at(0);
        db.save_story(&story).unwrap();

        let listed = db.list_stories().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], story);
    }

    #[test]
    fn test_history_cap_evicts_oldest() {
        let db = Database::open_in_memory().unwrap();
        for n in 0..25 {
            db.save_story(&story_at(n)).unwrap();
        }

        let listed = db.list_stories().unwrap();
        assert_eq!(listed.len(), 20);
        // 最新的在前，最早的 5 条被淘汰
        assert_eq!(listed[0].id, "story-24");
        assert_eq!(listed[19].id, "story-5");
    }

    #[test]
    fn test_rename_and_delete() {
        let db = Database::open_in_memory().unwrap();
        db.save_story(&story_at(1)).unwrap();
        db.save_story(&story_at(2)).unwrap();

        db.rename_story("story-1", "新标题").unwrap();
        db.delete_story("story-2").unwrap();

        let listed = db.list_stories().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "新标题");
    }
}
