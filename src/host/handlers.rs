// 宿主端调用处理
// 解析桥接传入的脚本，分发到会话状态机，并以信封形式返回结果

use std::fs;

use super::importer::MediaImporter;
use super::session::{ClosedFile, SessionMachine};
use super::storage::WorkArea;
use crate::bridge::envelope::Envelope;
use crate::bridge::messages::{ChunkAck, FinishOutcome, PurgeReport};
use crate::bridge::script::ScriptCall;
use crate::bridge::traits::{ScriptEngine, EVAL_ERROR_SENTINEL};
use crate::config::BridgeConfig;
use crate::error::HostError;

/// 传输宿主
/// 持有唯一的会话状态机、工作目录和目标应用的导入接口
pub struct TransferHost<I> {
    session: SessionMachine,
    work_area: WorkArea,
    importer: I,
}

impl<I: MediaImporter> TransferHost<I> {
    pub fn new(config: &BridgeConfig, importer: I) -> Self {
        let mut host = Self {
            session: SessionMachine::new(config.max_session_bytes),
            work_area: WorkArea::new(config.work_dir()),
            importer,
        };

        if config.purge_on_start {
            let report = host.purge_all();
            if report.removed > 0 || report.failed > 0 {
                log::info!(
                    "Startup purge removed {} file(s), {} failure(s)",
                    report.removed,
                    report.failed
                );
            }
        }
        host
    }

    pub fn work_area(&self) -> &WorkArea {
        &self.work_area
    }

    pub fn importer(&self) -> &I {
        &self.importer
    }

    pub fn is_session_open(&self) -> bool {
        self.session.is_open()
    }

    /// 打开写入会话
    pub fn start_session(&mut self, file_name: &str) -> Result<(), HostError> {
        // 先检查独占性，保证已有会话不受影响
        if let Some(path) = self.session.open_path() {
            return Err(HostError::AlreadyOpen(path.display().to_string()));
        }
        if !self.importer.has_project() {
            return Err(HostError::NoTargetContext);
        }

        let path = self.work_area.path_for(file_name)?;
        self.work_area.ensure()?;
        self.session.start(path)?;

        log::info!("Session opened for {}", file_name);
        Ok(())
    }

    pub fn append_chunk(&mut self, index: u64, bytes: &[u8]) -> Result<ChunkAck, HostError> {
        self.session.append(index, bytes).map_err(|e| {
            if e != HostError::NoSession {
                log::warn!("Chunk {} rejected, session discarded: {}", index, e);
            }
            e
        })
    }

    /// 关闭会话并把文件交给目标应用导入
    /// 无论成功与否，会话都回到空闲状态
    pub fn finish_session(
        &mut self,
        expected_len: Option<u64>,
        sha256: Option<&str>,
    ) -> Result<FinishOutcome, HostError> {
        let closed = self.session.close()?;

        let result = self.import_closed(&closed, expected_len, sha256);
        match &result {
            Ok(outcome) => log::info!(
                "Imported {} ({} bytes, timeline: {})",
                closed.path.display(),
                closed.len,
                outcome.added_to_timeline
            ),
            Err(e) => {
                log::warn!("Finalize failed for {}: {}", closed.path.display(), e);
                let _ = fs::remove_file(&closed.path);
            }
        }
        result
    }

    fn import_closed(
        &mut self,
        closed: &ClosedFile,
        expected_len: Option<u64>,
        sha256: Option<&str>,
    ) -> Result<FinishOutcome, HostError> {
        let metadata = fs::metadata(&closed.path).map_err(|e| {
            HostError::Finalize(format!(
                "File {} missing after close: {}",
                closed.path.display(),
                e
            ))
        })?;

        if metadata.len() != closed.len {
            return Err(HostError::Finalize(format!(
                "File size {} does not match {} bytes written",
                metadata.len(),
                closed.len
            )));
        }
        if let Some(expected) = expected_len {
            if expected != closed.len {
                return Err(HostError::Finalize(format!(
                    "Expected {} bytes, received {}",
                    expected, closed.len
                )));
            }
        }
        if let Some(expected) = sha256 {
            if !expected.eq_ignore_ascii_case(&closed.sha256) {
                return Err(HostError::Finalize(format!(
                    "SHA-256 mismatch: expected {}, received {}",
                    expected, closed.sha256
                )));
            }
        }

        if !self.importer.has_project() {
            return Err(HostError::Finalize(
                "Project closed before import".to_string(),
            ));
        }

        let item = self
            .importer
            .import_file(&closed.path)
            .map_err(|e| HostError::Finalize(format!("Import rejected: {}", e)))?;

        // 插入时间线失败不影响导入结果
        let added_to_timeline = match self.importer.insertion_point() {
            Some(at) => match self.importer.insert_clip(&item, at) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Imported {} but could not insert clip: {}", item.name, e);
                    false
                }
            },
            None => false,
        };

        Ok(FinishOutcome {
            added_to_timeline,
            path: Some(item.path.display().to_string()),
            bytes: Some(closed.len),
            item_id: Some(item.id),
        })
    }

    /// 放弃当前会话，空闲时什么也不做
    pub fn abort_session(&mut self) {
        if let Some(path) = self.session.abort() {
            log::info!("Session aborted, discarded {}", path.display());
        }
    }

    /// 清空工作目录
    /// 打开中的会话会先被放弃，否则它的文件也会被删除
    pub fn purge_all(&mut self) -> PurgeReport {
        if self.session.is_open() {
            log::warn!("Purge requested while a session is open, aborting it first");
            self.abort_session();
        }
        self.work_area.purge_all()
    }

    /// 执行一次已解析的调用
    pub fn dispatch(&mut self, call: ScriptCall) -> Envelope {
        match call {
            ScriptCall::StartSession { file_name } => self
                .start_session(&file_name)
                .map(|_| Envelope::success())
                .into(),
            ScriptCall::AppendChunk { index, bytes } => self
                .append_chunk(index, &bytes)
                .map(|ack| Envelope::success_with(&ack))
                .into(),
            ScriptCall::FinishSession {
                expected_len,
                sha256,
            } => self
                .finish_session(expected_len, sha256.as_deref())
                .map(|outcome| Envelope::success_with(&outcome))
                .into(),
            ScriptCall::AbortSession => {
                self.abort_session();
                Envelope::success()
            }
            ScriptCall::PurgeAll => Envelope::success_with(&self.purge_all()),
        }
    }
}

impl<I: MediaImporter> ScriptEngine for TransferHost<I> {
    fn evaluate(&mut self, script: &str) -> String {
        match ScriptCall::parse(script) {
            Ok(call) => self.dispatch(call).to_json(),
            Err(e) => {
                log::warn!("Rejected script: {}", e);
                EVAL_ERROR_SENTINEL.to_string()
            }
        }
    }

    fn shutdown(&mut self) {
        self.abort_session();
        let report = self.purge_all();
        log::debug!(
            "Shutdown purge removed {} file(s), {} failure(s)",
            report.removed,
            report.failed
        );
    }
}
