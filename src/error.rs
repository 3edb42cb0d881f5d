//! 故事生成错误分类
//! 传输层错误在适配器边界统一改写，校验错误由生成服务自身抛出

/// 生成流水线的错误类型
///
/// 重试循环按变体区分可重试原因，最终只向调用方暴露一次
/// [`GenerationError::AllAttemptsExhausted`]。
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// 域名无法解析或连接被拒
    #[error("网络不可用，请检查网络连接")]
    NetworkUnavailable,

    /// 连接或读取超时
    #[error("请求超时，请稍后重试")]
    RequestTimeout,

    /// TLS 握手失败
    #[error("安全连接失败，请检查系统时间或网络环境")]
    SecureConnectionError,

    /// 服务商返回了非成功状态码，message 已按各家错误表翻译成用户可读文案
    #[error("{message}")]
    ProviderRejected { status: u16, message: String },

    /// 模型输出里找不到单词标注格式
    #[error("AI 输出格式不正确，缺少单词标注")]
    MalformedOutput,

    /// 解析成功但有单词没出现在故事里
    #[error("故事缺少单词: {}", .missing.join(", "))]
    IncompleteOutput { missing: Vec<String> },

    /// 重试次数耗尽，保留最后一次失败原因
    #[error("连续 {attempts} 次生成均未成功（{last}）。建议增加故事长度、减少单词数量或更换 AI 服务商后重试")]
    AllAttemptsExhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },

    /// 上一次生成尚未结束时拒绝新请求
    #[error("上一个故事仍在生成中，请稍候")]
    Busy,

    /// 本地设置或历史记录读写失败
    #[error("本地存储读写失败: {0}")]
    Storage(String),

    /// 其余传输层错误原样向上传递
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<anyhow::Error> for GenerationError {
    fn from(e: anyhow::Error) -> Self {
        GenerationError::Storage(format!("{e:#}"))
    }
}
