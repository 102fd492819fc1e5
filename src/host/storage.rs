use std::fs;
use std::path::{Path, PathBuf};

use crate::bridge::messages::PurgeReport;
use crate::bridge::script::MAX_FILE_NAME_LEN;
use crate::error::HostError;

/// 宿主的工作目录
/// 所有经由桥接写入的文件都落在这里，可以整体清理
#[derive(Debug, Clone)]
pub struct WorkArea {
    root: PathBuf,
}

impl WorkArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 确保工作目录存在，清理之后会按需重建
    pub fn ensure(&self) -> Result<(), HostError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            HostError::Io(format!(
                "Failed to create directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// 计算文件在工作目录中的路径
    /// 文件名来自桥接另一端，必须是单个安全的路径分量
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf, HostError> {
        validate_file_name(file_name)?;
        Ok(self.root.join(file_name))
    }

    /// 当前工作目录中的所有条目
    pub fn entries(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.root) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// 尽力删除工作目录中的所有文件，单个文件失败不会中断
    pub fn purge_all(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // 目录不存在时没有需要清理的内容
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                log::warn!("Failed to read {}: {}", self.root.display(), e);
                report.failed += 1;
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read directory entry: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            let path = entry.path();
            let removed = match entry.file_type() {
                Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };

            match removed {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    log::warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// 校验桥接传入的文件名
pub fn validate_file_name(file_name: &str) -> Result<(), HostError> {
    if file_name.is_empty() {
        return Err(HostError::BadCall("file name is empty".to_string()));
    }
    if file_name.len() > MAX_FILE_NAME_LEN {
        return Err(HostError::BadCall(format!(
            "file name is longer than {} bytes",
            MAX_FILE_NAME_LEN
        )));
    }
    if file_name.starts_with('.') {
        return Err(HostError::BadCall(format!(
            "file name must not start with '.': {}",
            file_name
        )));
    }
    if let Some(c) = file_name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(HostError::BadCall(format!(
            "file name contains {:?}: {}",
            c, file_name
        )));
    }
    Ok(())
}
