use serde::{Deserialize, Serialize};

/// 归一化后的目录条目
/// 传输客户端只使用 id、name 和 animated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmoteItem {
    pub id: String,
    pub name: String,
    pub animated: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// 一页查询结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<EmoteItem>,
    pub total_count: usize,
}
