//! 命令行演示入口
//! 用法：beidanci 单词1 单词2 ...  （通过 BEIDANCI_API_KEY 等环境变量配置）

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use beidanci::services::{
    build_quiz, Database, LlmProvider, ProviderClient, QuizSession, StoryService,
};
use beidanci::utils;

#[tokio::main]
async fn main() -> Result<()> {
    utils::init_logging().context("初始化日志失败")?;

    let words: Vec<String> = std::env::args().skip(1).collect();
    if words.len() < 2 {
        eprintln!("用法: beidanci <单词1> <单词2> [更多单词...]");
        eprintln!("环境变量: BEIDANCI_API_KEY / BEIDANCI_PROVIDER / BEIDANCI_THEME / BEIDANCI_LENGTH");
        std::process::exit(2);
    }

    let db = Arc::new(Database::open(&utils::default_db_path()?)?);
    apply_env_settings(&db)?;

    let client = ProviderClient::new().context("初始化 HTTP 客户端失败")?;

    // 配置了 Key 就先做一次连通性自检
    if db.get_api_key()?.is_some_and(|k| !k.trim().is_empty()) {
        let provider = db.get_provider()?;
        match client.probe(provider, &db.get_api_key()?.unwrap_or_default()).await {
            Ok(()) => log::info!("{} 连通性正常", provider.display_name()),
            Err(e) => log::warn!("{} 连通性自检失败: {e}", provider.display_name()),
        }
    }

    let service = StoryService::new(client, db.clone());
    let outcome = match service.generate_story(&words).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("生成故事失败: {e}");
            std::process::exit(1);
        }
    };

    println!("\n========== 背单词故事 ==========\n");
    println!("{}\n", outcome.story);
    if let Some(usage) = outcome.token_usage {
        log::info!(
            "token 用量: prompt={} completion={} total={}",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens
        );
    }

    println!("========== 单词列表 ==========\n");
    for def in &outcome.definitions {
        let context = def
            .context_meaning
            .as_deref()
            .map(|c| format!(" 💡{c}"))
            .unwrap_or_default();
        println!("  {} [{}] {}{}", def.word, def.part_of_speech, def.translation, context);
    }

    run_quiz(&words, &outcome.definitions)?;
    Ok(())
}

fn apply_env_settings(db: &Database) -> Result<()> {
    if let Ok(key) = std::env::var("BEIDANCI_API_KEY") {
        db.save_api_key(&key)?;
    }
    if let Ok(provider) = std::env::var("BEIDANCI_PROVIDER") {
        db.save_provider(LlmProvider::from_name(&provider))?;
    }
    if let Ok(theme) = std::env::var("BEIDANCI_THEME") {
        db.save_story_theme(&theme)?;
    }
    if let Ok(length) = std::env::var("BEIDANCI_LENGTH") {
        if let Ok(length) = length.parse() {
            db.save_story_length(length)?;
        }
    }
    Ok(())
}

fn run_quiz(words: &[String], definitions: &[beidanci::WordDefinition]) -> Result<()> {
    let questions = build_quiz(words, definitions);
    if questions.is_empty() {
        println!("\n故事里没有可出题的单词。");
        return Ok(());
    }

    println!("\n========== 开始测验 ==========");
    let total = questions.len();
    let mut session = QuizSession::new(questions);

    while let Some(question) = session.current_question().cloned() {
        println!("\n{}", question.question);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }
        print!("请输入选项编号: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        // 非数字输入按越界处理，记作未作答
        let selected = line.trim().parse::<usize>().map(|n| n.wrapping_sub(1)).unwrap_or(usize::MAX);

        let outcome = session.submit_answer(selected);
        if outcome.correct {
            println!("✅ 答对了！");
        } else {
            println!("❌ 答错了，正确答案是 {}", question.correct_translation);
        }
        if outcome.finished {
            break;
        }
    }

    let result = session.result();
    println!("\n========== 测验结果 ==========");
    println!("共 {total} 题，答对 {} 题（{:.0}%）", result.correct_answers, result.percentage);
    println!("{}", result.evaluation());

    let wrong = session.wrong_answers();
    if !wrong.is_empty() {
        println!("\n错题回顾:");
        for w in wrong {
            println!(
                "  {} [{}] 正确: {} / 你的答案: {}",
                w.word, w.part_of_speech, w.correct_translation, w.user_answer
            );
        }
    }
    Ok(())
}
