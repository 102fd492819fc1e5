use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::naming;
use crate::catalog::EmoteItem;

/// 一次导入请求，每次传输只使用一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_url: String,
    pub display_name: String,
    /// 目录条目的稳定标识，用于生成文件名
    pub item_id: String,
    pub is_animated: bool,
    /// 指定目标文件名，为空时根据显示名称和标识生成
    pub target_file_name: Option<String>,
}

impl TransferRequest {
    pub fn new(
        source_url: impl Into<String>,
        display_name: impl Into<String>,
        item_id: impl Into<String>,
        is_animated: bool,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            display_name: display_name.into(),
            item_id: item_id.into(),
            is_animated,
            target_file_name: None,
        }
    }

    /// 由目录条目和解析出的资源地址构造
    pub fn from_item(item: &EmoteItem, source_url: impl Into<String>) -> Self {
        Self::new(source_url, item.name.clone(), item.id.clone(), item.animated)
    }

    pub fn with_target_file_name(mut self, name: impl Into<String>) -> Self {
        self.target_file_name = Some(name.into());
        self
    }

    /// 宿主端使用的文件名，同一条目总是得到同一个名字
    pub fn file_name(&self) -> String {
        match &self.target_file_name {
            Some(name) => naming::sanitize_explicit_name(name, self.is_animated),
            None => naming::sanitize_file_name(&self.display_name, &self.item_id, self.is_animated),
        }
    }
}

/// 单个分块确认后的进度事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub file_name: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub percent: f64,
}

/// 进度回调
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// 传输结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub file_name: String,
    pub bytes: u64,
    pub chunks: usize,
    /// 由宿主报告：是否已放到活动时间线上
    pub added_to_timeline: bool,
    pub imported_path: Option<String>,
    pub item_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_derived_from_item() {
        let item = EmoteItem {
            id: "01GGD5PJA8000FH13S498E9D8X".to_string(),
            name: "Kappa".to_string(),
            animated: true,
            tags: vec![],
            owner: None,
        };
        let request = TransferRequest::from_item(&item, "https://cdn.example/4x.gif");
        assert_eq!(request.file_name(), "Kappa_01GGD5PJ.gif");
        assert_eq!(request.file_name(), request.clone().file_name());
    }

    #[test]
    fn explicit_target_is_still_sanitized() {
        let request = TransferRequest::new("u", "Kappa", "01GGD5PJ", false)
            .with_target_file_name("../my emote.PNG");
        assert_eq!(request.file_name(), "myemote.png");
    }
}
