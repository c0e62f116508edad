//! HTTP 客户端抽象层，平台客户端只依赖这里的 trait，方便替换实现和在测试中注入假客户端。

use std::fmt::Debug;

use async_trait::async_trait;
use crate::error::{LyricsError, Result};

pub mod reqwest_client;

pub use self::reqwest_client::ReqwestClient;

/// HTTP 请求方法枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET 方法
    Get,
    /// POST 方法
    Post,
}

/// 统一的 HTTP 响应数据结构
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP 状态码
    pub status: u16,
    /// 响应头，同名的头部（如 `set-cookie`）会出现多次
    pub headers: Vec<(String, String)>,
    /// 响应体
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 将响应体解析为 UTF-8 字符串
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.clone()).map_err(LyricsError::from)
    }

    /// 是否为 2xx 状态码
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// 按名称（不区分大小写）列出所有同名响应头的值
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 从 `set-cookie` 头中读取指定 Cookie 的值
    #[must_use]
    pub fn cookie(&self, cookie_name: &str) -> Option<String> {
        self.header_values("set-cookie").find_map(|raw| {
            let pair = raw.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == cookie_name).then(|| value.trim().to_string())
        })
    }
}

/// 统一的 HTTP 客户端接口
#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    /// 发送 POST 请求，携带表单数据
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse>;

    /// 发送带自定义 headers 的请求
    async fn request_with_headers(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse>;

    /// 发送带查询参数和自定义头部的 GET 请求
    async fn get_with_params_and_headers(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let query_string = serde_urlencoded::to_string(params)
            .map_err(|e| LyricsError::Internal(format!("无法对查询参数进行编码: {e}")))?;
        let full_url = format!("{url}?{query_string}");

        self.request_with_headers(HttpMethod::Get, &full_url, headers, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_lookup() {
        let response = HttpResponse {
            status: 200,
            headers: vec![
                ("Set-Cookie".to_string(), "NMTID=abc; Path=/".to_string()),
                (
                    "set-cookie".to_string(),
                    "MUSIC_A=token123; Max-Age=2147483647; Path=/".to_string(),
                ),
            ],
            body: Vec::new(),
        };
        assert_eq!(response.cookie("MUSIC_A").as_deref(), Some("token123"));
        assert!(response.cookie("MUSIC_U").is_none());
    }
}
