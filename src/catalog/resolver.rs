use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;

/// CDN 提供的分辨率档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "1x")]
    X1,
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "3x")]
    X3,
    #[serde(rename = "4x")]
    X4,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::X1 => "1x",
            ResolutionTier::X2 => "2x",
            ResolutionTier::X3 => "3x",
            ResolutionTier::X4 => "4x",
        }
    }

    /// 加载失败时的下一个档位
    pub fn lower(&self) -> Option<ResolutionTier> {
        match self {
            ResolutionTier::X4 => Some(ResolutionTier::X3),
            ResolutionTier::X3 => Some(ResolutionTier::X2),
            ResolutionTier::X2 => Some(ResolutionTier::X1),
            ResolutionTier::X1 => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Gif,
    Webp,
    Png,
}

impl AssetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AssetFormat::Gif => "gif",
            AssetFormat::Webp => "webp",
            AssetFormat::Png => "png",
        }
    }

    /// 预览图：动图用 gif，静态图用有损的 webp
    pub fn preview_for(animated: bool) -> Self {
        if animated {
            AssetFormat::Gif
        } else {
            AssetFormat::Webp
        }
    }

    /// 导入文件的格式，与生成的文件扩展名一致
    pub fn import_for(animated: bool) -> Self {
        if animated {
            AssetFormat::Gif
        } else {
            AssetFormat::Png
        }
    }
}

/// 资源地址解析
/// 地址格式为 `<cdn>/<id>/<档位>.<扩展名>`
#[derive(Debug, Clone)]
pub struct AssetUrlResolver {
    cdn_base_url: String,
}

impl AssetUrlResolver {
    pub fn new(cdn_base_url: impl Into<String>) -> Self {
        let cdn_base_url: String = cdn_base_url.into();
        Self {
            cdn_base_url: cdn_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.cdn_base_url.clone())
    }

    pub fn url_for(&self, id: &str, tier: ResolutionTier, format: AssetFormat) -> String {
        format!(
            "{}/{}/{}.{}",
            self.cdn_base_url,
            id,
            tier.as_str(),
            format.extension()
        )
    }

    pub fn preview_url(&self, id: &str, animated: bool) -> String {
        self.url_for(id, ResolutionTier::X2, AssetFormat::preview_for(animated))
    }

    /// 导入时依次尝试的地址，从最高档位开始
    pub fn candidates(&self, id: &str, animated: bool) -> Vec<String> {
        let format = AssetFormat::import_for(animated);
        std::iter::successors(Some(ResolutionTier::X4), |tier| tier.lower())
            .map(|tier| self.url_for(id, tier, format))
            .collect()
    }
}
