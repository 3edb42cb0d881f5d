use anyhow::{Context, Result};
use std::path::PathBuf;

/// 默认数据库路径：可执行文件旁的 data/beidanci.db
pub fn default_db_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("获取可执行文件路径失败")?;
    let exe_dir = exe_path.parent().unwrap_or(std::path::Path::new("."));
    Ok(exe_dir.join("data").join("beidanci.db"))
}

/// 初始化 fern 日志输出
pub fn init_logging() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
