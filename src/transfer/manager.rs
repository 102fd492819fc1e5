use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::chunker::ChunkPlan;
use super::progress::ProgressTracker;
use super::provider::DownloadProvider;
use super::types::{ProgressCallback, TransferRequest, TransferResult};
use crate::bridge::channel::RpcChannel;
use crate::bridge::messages::{ChunkAck, FinishOutcome, PurgeReport};
use crate::bridge::script::ScriptCall;
use crate::bridge::traits::ScriptBridge;
use crate::config::BridgeConfig;
use crate::error::TransferError;

/// 传输客户端
/// 负责下载、分块、驱动宿主完成一次会话，并在失败时清理宿主状态
pub struct TransferClient<B> {
    channel: RpcChannel<B>,
    provider: Arc<dyn DownloadProvider>,
    chunk_size: usize,
    // 同一时间只允许一个调用序列占用桥接
    in_flight: Mutex<()>,
}

impl<B: ScriptBridge> TransferClient<B> {
    pub fn new(
        bridge: B,
        provider: Arc<dyn DownloadProvider>,
        config: &BridgeConfig,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            channel: RpcChannel::new(bridge),
            provider,
            chunk_size: config.chunk_size,
            in_flight: Mutex::new(()),
        })
    }

    pub fn channel(&self) -> &RpcChannel<B> {
        &self.channel
    }

    /// 下载资源并导入目标应用
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        on_progress: Option<ProgressCallback>,
    ) -> Result<TransferResult, TransferError> {
        // 下载也在锁内，两次传输的调用序列不会交错
        let _guard = self.in_flight.lock().await;
        log::info!("Downloading {}", request.source_url);
        let bytes = self.provider.fetch(&request.source_url).await?;
        self.send_locked(request, &bytes, on_progress).await
    }

    /// 依次尝试候选地址，使用第一个下载成功的资源
    /// 只有下载阶段会回退，宿主端的失败直接返回
    pub async fn transfer_first_available(
        &self,
        request: &TransferRequest,
        urls: &[String],
        on_progress: Option<ProgressCallback>,
    ) -> Result<TransferResult, TransferError> {
        let _guard = self.in_flight.lock().await;
        let mut last_error = None;

        for url in urls {
            match self.provider.fetch(url).await {
                Ok(bytes) => {
                    log::info!("Downloaded {} ({} bytes)", url, bytes.len());
                    return self.send_locked(request, &bytes, on_progress).await;
                }
                Err(e) => {
                    log::warn!("Candidate {} unavailable: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| TransferError::Download("No candidate URLs to try".to_string())))
    }

    /// 把内存中的字节发送给宿主并完成导入
    pub async fn send_bytes(
        &self,
        request: &TransferRequest,
        bytes: &[u8],
        on_progress: Option<ProgressCallback>,
    ) -> Result<TransferResult, TransferError> {
        let _guard = self.in_flight.lock().await;
        self.send_locked(request, bytes, on_progress).await
    }

    /// 调用方必须已持有 in_flight
    async fn send_locked(
        &self,
        request: &TransferRequest,
        bytes: &[u8],
        on_progress: Option<ProgressCallback>,
    ) -> Result<TransferResult, TransferError> {
        let file_name = request.file_name();

        if let Err(e) = self
            .channel
            .call(&ScriptCall::StartSession {
                file_name: file_name.clone(),
            })
            .await
        {
            // 宿主明确拒绝时没有打开会话，不能去中止别人的会话；
            // 桥接故障或无法解析的返回则无法确定宿主状态
            if matches!(e, TransferError::Bridge(_) | TransferError::EnvelopeParse(_)) {
                self.abort_quietly().await;
            }
            return Err(e);
        }
        log::info!("Session started for {} ({} bytes)", file_name, bytes.len());

        let result = self.write_and_finish(&file_name, bytes, on_progress).await;
        if let Err(e) = &result {
            log::warn!("Transfer of {} failed: {}", file_name, e);
            self.abort_quietly().await;
        }
        result
    }

    async fn write_and_finish(
        &self,
        file_name: &str,
        bytes: &[u8],
        on_progress: Option<ProgressCallback>,
    ) -> Result<TransferResult, TransferError> {
        let plan = ChunkPlan::new(bytes.len(), self.chunk_size);
        let tracker = ProgressTracker::new(file_name, plan, on_progress);

        for (index, chunk) in plan.slices(bytes).enumerate() {
            let ack: ChunkAck = self
                .channel
                .call_typed(&ScriptCall::AppendChunk {
                    index: index as u64,
                    bytes: chunk.to_vec(),
                })
                .await?;
            verify_ack(&ack, index, chunk, &plan)?;
            tracker.emit_chunk_done(index);
        }

        let outcome: FinishOutcome = self
            .channel
            .call_typed(&ScriptCall::FinishSession {
                expected_len: Some(bytes.len() as u64),
                sha256: Some(hex::encode(Sha256::digest(bytes))),
            })
            .await?;

        log::info!(
            "Imported {} ({} chunks, timeline: {})",
            file_name,
            plan.total_chunks(),
            outcome.added_to_timeline
        );

        Ok(TransferResult {
            file_name: file_name.to_string(),
            bytes: bytes.len() as u64,
            chunks: plan.total_chunks(),
            added_to_timeline: outcome.added_to_timeline,
            imported_path: outcome.path,
            item_id: outcome.item_id,
        })
    }

    /// 中止宿主上的会话，宿主空闲时同样成功
    pub async fn abort(&self) -> Result<(), TransferError> {
        let _guard = self.in_flight.lock().await;
        self.channel.call(&ScriptCall::AbortSession).await.map(|_| ())
    }

    /// 清空宿主工作目录
    pub async fn purge_all(&self) -> Result<PurgeReport, TransferError> {
        let _guard = self.in_flight.lock().await;
        self.channel.call_typed(&ScriptCall::PurgeAll).await
    }

    /// 尽力中止，失败只记录日志，避免掩盖原始错误
    async fn abort_quietly(&self) {
        if let Err(e) = self.channel.call(&ScriptCall::AbortSession).await {
            log::warn!("Best-effort abort failed: {}", e);
        }
    }
}

/// 校验宿主回显的分块确认
fn verify_ack(
    ack: &ChunkAck,
    index: usize,
    chunk: &[u8],
    plan: &ChunkPlan,
) -> Result<(), TransferError> {
    if ack.chunk_index != index as u64 {
        return Err(TransferError::AckMismatch(format!(
            "sent chunk {}, host acknowledged chunk {}",
            index, ack.chunk_index
        )));
    }

    let expected_bytes = plan.bytes_through(index) as u64;
    if ack.bytes_written != expected_bytes {
        return Err(TransferError::AckMismatch(format!(
            "host holds {} bytes after chunk {}, expected {}",
            ack.bytes_written, index, expected_bytes
        )));
    }

    let crc = crc32fast::hash(chunk);
    if ack.crc32 != crc {
        return Err(TransferError::AckMismatch(format!(
            "chunk {} checksum {:08x}, host computed {:08x}",
            index, crc, ack.crc32
        )));
    }
    Ok(())
}
