use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;

use crate::config::BridgeConfig;
use crate::error::TransferError;

/// 下载提供者接口
/// 把资源完整读入内存，失败立即返回，不做重试
#[async_trait]
pub trait DownloadProvider: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError>;
}

/// 基于 reqwest 的 HTTP 下载
pub struct HttpDownloadProvider {
    client: Client,
    timeout: Option<Duration>,
    /// 超过该大小的资源无法放进一个宿主会话
    max_bytes: u64,
}

impl HttpDownloadProvider {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &BridgeConfig) -> Self {
        Self {
            client,
            timeout: config.timeout_seconds.map(Duration::from_secs),
            max_bytes: config.max_session_bytes,
        }
    }
}

#[async_trait]
impl DownloadProvider for HttpDownloadProvider {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| TransferError::Download(format!("Invalid URL {}: {}", url, e)))?;

        let mut request_builder = self.client.get(parsed);

        // 设置超时
        if let Some(timeout) = self.timeout {
            request_builder = request_builder.timeout(timeout);
        }

        // 发送请求
        let response = request_builder
            .send()
            .await
            .map_err(|e| TransferError::Download(format!("HTTP request failed: {}", e)))?;

        // 检查响应状态
        if !response.status().is_success() {
            return Err(TransferError::Download(format!(
                "HTTP download failed with status: {}",
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        if total_size > self.max_bytes {
            return Err(TransferError::Download(format!(
                "Resource is {} bytes, limit is {}",
                total_size, self.max_bytes
            )));
        }

        // 开始流式读取
        let mut buffer = Vec::with_capacity(total_size as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let bytes = chunk_result
                .map_err(|e| TransferError::Download(format!("Stream error: {}", e)))?;

            if (buffer.len() + bytes.len()) as u64 > self.max_bytes {
                return Err(TransferError::Download(format!(
                    "Resource exceeds {} bytes",
                    self.max_bytes
                )));
            }
            buffer.extend_from_slice(&bytes);
        }

        log::debug!("Downloaded {} bytes from {}", buffer.len(), url);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 只响应一次请求的 HTTP 服务
    async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 4096];
            let _ = socket.read(&mut request).await;

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/emote/4x.gif", addr)
    }

    #[tokio::test]
    async fn downloads_full_body() {
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
        let url = serve_once("200 OK", body.clone()).await;

        let provider = HttpDownloadProvider::new(&BridgeConfig::default());
        assert_eq!(provider.fetch(&url).await.unwrap(), body);
    }

    #[tokio::test]
    async fn non_success_status_is_a_download_error() {
        let url = serve_once("404 Not Found", b"missing".to_vec()).await;

        let provider = HttpDownloadProvider::new(&BridgeConfig::default());
        let err = provider.fetch(&url).await.unwrap_err();
        assert!(matches!(err, TransferError::Download(msg) if msg.contains("404")));
    }

    #[tokio::test]
    async fn oversized_resources_are_refused() {
        let url = serve_once("200 OK", vec![0u8; 64]).await;

        let config = BridgeConfig::default().with_max_session_bytes(16);
        let provider = HttpDownloadProvider::new(&config);
        assert!(matches!(
            provider.fetch(&url).await,
            Err(TransferError::Download(_))
        ));
    }

    #[tokio::test]
    async fn invalid_urls_fail_fast() {
        let provider = HttpDownloadProvider::new(&BridgeConfig::default());
        assert!(matches!(
            provider.fetch("not a url").await,
            Err(TransferError::Download(_))
        ));
    }
}
