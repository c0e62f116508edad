//! `reqwest` 客户端的默认实现。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::{
    error::{LyricsError, Result},
    http::{HttpClient, HttpMethod, HttpResponse},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 包装了 `reqwest::Client` 的 `HttpClient` 实现。
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// 创建一个新的 `ReqwestClient` 实例。
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LyricsError::Http(e.to_string()))?;

        Ok(Self { client })
    }
}

impl ReqwestClient {
    /// 附加头部后发送，并把响应读成 `HttpResponse`。
    async fn send(
        &self,
        mut builder: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| LyricsError::Http(e.to_string()))?;
        convert_response(response).await
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        self.send(self.client.post(url).form(form), headers).await
    }

    async fn request_with_headers(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<HttpResponse> {
        let mut builder = self.client.request(method.into(), url);
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }
        self.send(builder, headers).await
    }

    async fn get_with_params_and_headers(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        self.send(self.client.get(url).query(params), headers).await
    }
}

/// 将 `reqwest::Response` 转换为自定义的 `HttpResponse`。
async fn convert_response(response: reqwest::Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let headers = convert_headers(response.headers());
    let body = response
        .bytes()
        .await
        .map_err(|e| LyricsError::Http(e.to_string()))?
        .to_vec();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// 丢弃无法表示为字符串的头部值。同名头部逐条保留。
fn convert_headers(header_map: &HeaderMap) -> Vec<(String, String)> {
    header_map
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect()
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
        }
    }
}
