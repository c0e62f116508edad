//! 集成测试共用的假 HTTP 客户端。

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use lyrics_sync_rs::{
    LyricsError, Result,
    http::{HttpClient, HttpMethod, HttpResponse},
};
use parking_lot::Mutex;

pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lyrics_sync_rs=debug"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// 一次被记录下来的请求。
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    fn matches(&self, pattern: &str) -> bool {
        self.url.contains(pattern)
            || self
                .body
                .as_deref()
                .is_some_and(|body| String::from_utf8_lossy(body).contains(pattern))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(HttpResponse),
    Fail(String),
}

/// 按子串匹配路由的假客户端，URL 或请求体包含该子串即命中，第一个命中的路由生效。
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Vec<(String, Reply)>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.route_with_headers(pattern, status, body, &[])
    }

    pub fn route_with_headers(
        mut self,
        pattern: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> Self {
        let response = HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: body.into(),
        };
        self.routes
            .push((pattern.to_string(), Reply::Respond(response)));
        self
    }

    /// 匹配的请求直接返回网络错误。
    pub fn fail(mut self, pattern: &str) -> Self {
        self.routes
            .push((pattern.to_string(), Reply::Fail(format!("连接 {pattern} 失败"))));
        self
    }

    /// 每个请求在返回前等待一段时间。
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.matches(pattern))
            .count()
    }

    async fn respond(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse> {
        let request = RecordedRequest {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: body.map(<[u8]>::to_vec),
        };
        let reply = self
            .routes
            .iter()
            .find(|(pattern, _)| request.matches(pattern))
            .map(|(_, reply)| reply.clone());
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(LyricsError::Http(message)),
            None => Ok(HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: Vec::new(),
            }),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let body = serde_urlencoded::to_string(form)
            .map_err(|e| LyricsError::Internal(e.to_string()))?;
        self.respond(url, headers, Some(body.as_bytes())).await
    }

    async fn request_with_headers(
        &self,
        _method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse> {
        self.respond(url, headers, body).await
    }
}
