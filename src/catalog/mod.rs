// 表情目录
// 远程目录查询、条目归一化，以及 CDN 资源地址解析

pub mod client;
pub mod resolver;
pub mod types;

pub use client::{CatalogClient, SevenTvCatalog, PAGE_SIZE};
pub use resolver::{AssetFormat, AssetUrlResolver, ResolutionTier};
pub use types::{CatalogPage, EmoteItem};

/// 目录查询错误
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
