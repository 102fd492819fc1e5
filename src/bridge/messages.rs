use serde::{Deserialize, Serialize};

/// appendChunk 的确认结果，回显分块序号供客户端校验顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkAck {
    pub chunk_index: u64,
    pub bytes_written: u64,
    pub crc32: u32,
}

/// finishSession 的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishOutcome {
    pub added_to_timeline: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// purgeAll 的结果，失败数只统计不上报为错误
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub removed: usize,
    pub failed: usize,
}
