use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 导入后的素材引用，由目标应用持有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedItem {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub imported_at: DateTime<Utc>,
}

/// 时间线上的插入位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsertionPoint {
    pub track: usize,
    pub seconds: f64,
}

/// 目标应用的导入接口
pub trait MediaImporter: Send + 'static {
    /// 是否有可导入的活动项目
    fn has_project(&self) -> bool;

    /// 导入本地文件，返回素材引用
    fn import_file(&mut self, path: &Path) -> Result<ImportedItem, String>;

    /// 当前活动序列的插入位置，没有活动序列时返回 None
    fn insertion_point(&self) -> Option<InsertionPoint>;

    /// 把素材插入到时间线
    fn insert_clip(&mut self, item: &ImportedItem, at: InsertionPoint) -> Result<(), String>;
}

/// 共享访问，便于宿主线程之外查看项目状态
impl<T: MediaImporter> MediaImporter for Arc<Mutex<T>> {
    fn has_project(&self) -> bool {
        self.lock().map(|inner| inner.has_project()).unwrap_or(false)
    }

    fn import_file(&mut self, path: &Path) -> Result<ImportedItem, String> {
        self.lock()
            .map_err(|_| "project lock poisoned".to_string())?
            .import_file(path)
    }

    fn insertion_point(&self) -> Option<InsertionPoint> {
        self.lock().ok().and_then(|inner| inner.insertion_point())
    }

    fn insert_clip(&mut self, item: &ImportedItem, at: InsertionPoint) -> Result<(), String> {
        self.lock()
            .map_err(|_| "project lock poisoned".to_string())?
            .insert_clip(item, at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub item_id: String,
    pub start_seconds: f64,
}

/// 活动序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub playhead_seconds: f64,
    pub video_tracks: Vec<Vec<Clip>>,
}

/// 以目录模拟的项目
///
/// 导入的文件被复制到 `<root>/media/`，时间线只保存在内存中。
#[derive(Debug, Default)]
pub struct FolderProject {
    root: Option<PathBuf>,
    items: Vec<ImportedItem>,
    sequence: Option<Sequence>,
}

impl FolderProject {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// 没有打开任何项目
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn with_active_sequence(mut self, name: &str, playhead_seconds: f64) -> Self {
        self.sequence = Some(Sequence {
            name: name.to_string(),
            playhead_seconds,
            video_tracks: vec![Vec::new()],
        });
        self
    }

    pub fn close(&mut self) {
        self.root = None;
        self.sequence = None;
    }

    pub fn media_dir(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join("media"))
    }

    pub fn items(&self) -> &[ImportedItem] {
        &self.items
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }
}

impl MediaImporter for FolderProject {
    fn has_project(&self) -> bool {
        self.root.is_some()
    }

    fn import_file(&mut self, path: &Path) -> Result<ImportedItem, String> {
        let media_dir = self.media_dir().ok_or_else(|| "no project is open".to_string())?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("Invalid file path: {}", path.display()))?
            .to_string();

        fs::create_dir_all(&media_dir)
            .map_err(|e| format!("Failed to create media directory: {}", e))?;
        let dest = media_dir.join(&name);
        fs::copy(path, &dest).map_err(|e| format!("Failed to import {}: {}", name, e))?;

        let item = ImportedItem {
            id: format!("item-{}", self.items.len() + 1),
            name,
            path: dest,
            imported_at: Utc::now(),
        };
        self.items.push(item.clone());
        Ok(item)
    }

    fn insertion_point(&self) -> Option<InsertionPoint> {
        self.sequence.as_ref().map(|sequence| InsertionPoint {
            track: 0,
            seconds: sequence.playhead_seconds,
        })
    }

    fn insert_clip(&mut self, item: &ImportedItem, at: InsertionPoint) -> Result<(), String> {
        let sequence = self
            .sequence
            .as_mut()
            .ok_or_else(|| "no active sequence".to_string())?;
        let track = sequence
            .video_tracks
            .get_mut(at.track)
            .ok_or_else(|| format!("video track {} does not exist", at.track))?;

        track.push(Clip {
            item_id: item.id.clone(),
            start_seconds: at.seconds,
        });
        Ok(())
    }
}
