pub mod bridge; // 脚本桥接与信封协议
pub mod catalog; // 表情目录与资源地址
pub mod config;
pub mod error;
pub mod host; // 宿主端会话与导入
pub mod transfer; // 传输客户端

use std::sync::Arc;

pub use bridge::{HostThread, InProcessBridge, ScriptBridge};
pub use config::BridgeConfig;
pub use error::{BridgeError, ConfigError, HostError, TransferError};
pub use host::{FolderProject, MediaImporter, TransferHost};
pub use transfer::{
    DownloadProvider, HttpDownloadProvider, TransferClient, TransferRequest, TransferResult,
};

/// 在当前进程内启动宿主，并返回连接到它的传输客户端
///
/// 客户端被释放后宿主线程会清理工作目录并退出，可以通过 [`HostThread::join`] 等待。
pub fn connect_in_process<I: MediaImporter>(
    config: &BridgeConfig,
    importer: I,
    provider: Arc<dyn DownloadProvider>,
) -> Result<(TransferClient<InProcessBridge>, HostThread), TransferError> {
    config.validate()?;

    let host = TransferHost::new(config, importer);
    let (bridge, host_thread) = InProcessBridge::spawn(host)
        .map_err(|e| TransferError::Io(format!("Failed to start host thread: {}", e)))?;

    let client = TransferClient::new(bridge, provider, config)?;
    Ok((client, host_thread))
}
