// 传输客户端
// 下载资源、切分为分块，并按 start / appendChunk* / finish 的顺序驱动宿主

pub mod chunker;
pub mod manager;
pub mod naming;
pub mod progress;
pub mod provider;
pub mod types;

pub use chunker::ChunkPlan;
pub use manager::TransferClient;
pub use provider::{DownloadProvider, HttpDownloadProvider};
pub use types::{ProgressCallback, TransferProgress, TransferRequest, TransferResult};
