//! 定义了整个库通用的错误类型。

use thiserror::Error;

use crate::model::song::Platform;

/// 歌词获取、解密、解析与匹配过程中可能出现的所有错误。
#[derive(Error, Debug)]
pub enum LyricsError {
    /// 平台接口返回了错误、空响应或无法识别的响应。
    ///
    /// 这一层从不自动重试，由调用方决定是否重新发起请求。
    #[error("{platform} API 错误 (code: {code}): {message}")]
    Api {
        /// 出错的平台。
        platform: Platform,
        /// 平台返回的错误码，没有错误码时为 -1。
        code: i64,
        /// 错误信息。
        message: String,
    },

    /// 网络请求失败。
    #[error("网络请求失败: {0}")]
    Http(String),

    /// 歌词密文损坏或格式不符合预期。
    #[error("解密失败: {0}")]
    Decryption(String),

    /// 解析数据失败。
    #[error("解析失败: {0}")]
    Parser(String),

    /// 该歌曲没有可用的歌词。
    #[error("未找到歌词")]
    LyricNotFound,

    /// 配置文件读写失败。
    #[error("配置错误: {0}")]
    Config(String),

    /// 任务已被取消。
    #[error("任务已取消")]
    Cancelled,

    /// 文件读写等 IO 错误。
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化或反序列化失败。
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 解码失败。
    #[error("Base64 解码错误: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// 字节序列不是有效的 UTF-8。
    #[error("UTF-8 转换错误: {0}")]
    FromUtf8(#[from] std::string::FromUtf8Error),

    /// 整数解析失败。
    #[error("整数解析错误: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 生成歌词文本时的字符串格式化错误。
    #[error("格式错误: {0}")]
    Format(#[from] std::fmt::Error),

    /// 内部逻辑错误。
    #[error("内部错误: {0}")]
    Internal(String),
}

impl LyricsError {
    /// 构造一个平台接口错误。
    pub fn api(platform: Platform, code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            platform,
            code,
            message: message.into(),
        }
    }
}

/// `LyricsError` 的结果别名。
pub type Result<T> = std::result::Result<T, LyricsError>;
