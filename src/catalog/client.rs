use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::types::{CatalogPage, EmoteItem};
use super::CatalogError;
use crate::config::BridgeConfig;

/// 每页条目数
pub const PAGE_SIZE: usize = 50;

/// 目录查询接口，页码从 1 开始
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_all(&self, page: usize) -> Result<CatalogPage, CatalogError>;

    async fn search(&self, query: &str, page: usize) -> Result<CatalogPage, CatalogError>;
}

/// 7TV 条目的所有者信息
#[derive(Debug, Clone, Default, Deserialize)]
struct RawOwner {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// 条目的详细数据，集合接口把它嵌套在 `data` 下
#[derive(Debug, Clone, Default, Deserialize)]
struct RawEmoteData {
    #[serde(default)]
    animated: Option<bool>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    owner: Option<RawOwner>,
}

/// 7TV 条目，搜索接口直接返回详细字段
#[derive(Debug, Clone, Deserialize)]
struct RawEmote {
    id: String,
    name: String,
    #[serde(default)]
    animated: Option<bool>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    owner: Option<RawOwner>,
    #[serde(default)]
    data: Option<RawEmoteData>,
}

/// 表情集合（全局集合）
#[derive(Debug, Deserialize)]
struct RawEmoteSet {
    #[serde(default)]
    emotes: Vec<RawEmote>,
}

/// 搜索结果
#[derive(Debug, Deserialize)]
struct RawSearchResult {
    #[serde(default)]
    items: Vec<RawEmote>,
    #[serde(default)]
    total: Option<usize>,
}

impl RawEmote {
    /// 顶层字段优先，缺失时取 `data` 中的值
    fn normalize(self) -> EmoteItem {
        let data = self.data.unwrap_or_default();
        let owner = self.owner.or(data.owner).and_then(|owner| {
            owner
                .display_name
                .filter(|name| !name.is_empty())
                .or(owner.username)
        });

        EmoteItem {
            id: self.id,
            name: self.name,
            animated: self.animated.or(data.animated).unwrap_or(false),
            tags: self.tags.or(data.tags).unwrap_or_default(),
            owner,
        }
    }
}

/// 在本地对完整列表分页
fn paginate(items: Vec<EmoteItem>, page: usize) -> CatalogPage {
    let total_count = items.len();
    let start = page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE);
    let items = items.into_iter().skip(start).take(PAGE_SIZE).collect();
    CatalogPage { items, total_count }
}

fn parse_emote_set(json: &str, page: usize) -> Result<CatalogPage, CatalogError> {
    let set: RawEmoteSet = serde_json::from_str(json)
        .map_err(|e| CatalogError::Parse(format!("Invalid emote set: {}", e)))?;
    let items = set.emotes.into_iter().map(RawEmote::normalize).collect();
    Ok(paginate(items, page))
}

fn parse_search_result(json: &str) -> Result<CatalogPage, CatalogError> {
    let result: RawSearchResult = serde_json::from_str(json)
        .map_err(|e| CatalogError::Parse(format!("Invalid search result: {}", e)))?;
    let items: Vec<EmoteItem> = result.items.into_iter().map(RawEmote::normalize).collect();
    let total_count = result.total.unwrap_or(items.len());
    Ok(CatalogPage { items, total_count })
}

/// 7TV v3 目录客户端
pub struct SevenTvCatalog {
    client: Client,
    api_base_url: String,
    timeout: Option<Duration>,
}

impl SevenTvCatalog {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            client: Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout_seconds.map(Duration::from_secs),
        }
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, CatalogError> {
        url::Url::parse(&format!("{}/{}", self.api_base_url, path))
            .map_err(|e| CatalogError::RequestFailed(format!("Invalid API URL: {}", e)))
    }

    fn search_url(&self, query: &str, page: usize) -> Result<url::Url, CatalogError> {
        let mut url = self.endpoint("emotes")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &PAGE_SIZE.to_string())
            .append_pair("page", &page.max(1).to_string());
        Ok(url)
    }

    async fn get_text(&self, url: url::Url) -> Result<String, CatalogError> {
        let mut request_builder = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            request_builder = request_builder.timeout(timeout);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::RequestFailed(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))
    }
}

#[async_trait]
impl CatalogClient for SevenTvCatalog {
    async fn fetch_all(&self, page: usize) -> Result<CatalogPage, CatalogError> {
        let url = self.endpoint("emote-sets/global")?;
        let body = self.get_text(url).await?;
        let result = parse_emote_set(&body, page)?;
        log::debug!(
            "Global set page {}: {} of {} emotes",
            page,
            result.items.len(),
            result.total_count
        );
        Ok(result)
    }

    async fn search(&self, query: &str, page: usize) -> Result<CatalogPage, CatalogError> {
        let url = self.search_url(query, page)?;
        let body = self.get_text(url).await?;
        let result = parse_search_result(&body)?;
        log::debug!("Search {:?} page {}: {} emotes", query, page, result.items.len());
        Ok(result)
    }
}
