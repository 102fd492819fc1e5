use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::bridge::messages::ChunkAck;
use crate::error::HostError;

/// 一个打开中的写入会话
pub struct OpenSession {
    writer: BufWriter<File>,
    path: PathBuf,
    bytes_written: u64,
    next_index: u64,
    hasher: Sha256,
}

/// 会话状态：空闲或打开
pub enum SessionState {
    Idle,
    Open(OpenSession),
}

/// 关闭后的文件信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedFile {
    pub path: PathBuf,
    pub len: u64,
    pub sha256: String,
}

/// 宿主唯一的文件写入会话
///
/// 同一时刻最多一个会话。start 只在 Idle 时有效，
/// append/close 只在 Open 时有效；任何写入失败都会丢弃会话并删除半成品文件。
pub struct SessionMachine {
    state: SessionState,
    max_bytes: u64,
}

impl SessionMachine {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            state: SessionState::Idle,
            max_bytes,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    pub fn open_path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Open(session) => Some(&session.path),
            SessionState::Idle => None,
        }
    }

    /// Idle -> Open
    /// 同名文件会被截断覆盖
    pub fn start(&mut self, path: PathBuf) -> Result<(), HostError> {
        if let SessionState::Open(session) = &self.state {
            return Err(HostError::AlreadyOpen(session.path.display().to_string()));
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| HostError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        self.state = SessionState::Open(OpenSession {
            writer: BufWriter::new(file),
            path,
            bytes_written: 0,
            next_index: 0,
            hasher: Sha256::new(),
        });
        Ok(())
    }

    /// Open -> Open，失败时 Open -> Idle
    pub fn append(&mut self, index: u64, bytes: &[u8]) -> Result<ChunkAck, HostError> {
        let result = match &mut self.state {
            SessionState::Open(session) => session.write_chunk(index, bytes, self.max_bytes),
            SessionState::Idle => return Err(HostError::NoSession),
        };

        if result.is_err() {
            self.abort();
        }
        result
    }

    /// Open -> Idle，关闭句柄并返回文件信息
    pub fn close(&mut self) -> Result<ClosedFile, HostError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Open(session) => session.close(),
            SessionState::Idle => Err(HostError::NoSession),
        }
    }

    /// 任意状态 -> Idle，丢弃半成品文件
    /// 返回被丢弃会话的路径，原本就空闲时返回 None
    pub fn abort(&mut self) -> Option<PathBuf> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Open(session) => Some(session.discard()),
            SessionState::Idle => None,
        }
    }
}

impl OpenSession {
    fn write_chunk(
        &mut self,
        index: u64,
        bytes: &[u8],
        max_bytes: u64,
    ) -> Result<ChunkAck, HostError> {
        if index != self.next_index {
            return Err(HostError::ChunkOutOfOrder {
                expected: self.next_index,
                received: index,
            });
        }

        let total = self.bytes_written + bytes.len() as u64;
        if total > max_bytes {
            return Err(HostError::Io(format!(
                "Session for {} would exceed {} bytes",
                self.path.display(),
                max_bytes
            )));
        }

        self.writer
            .write_all(bytes)
            .map_err(|e| HostError::Io(format!("Failed to write chunk {}: {}", index, e)))?;

        self.hasher.update(bytes);
        self.bytes_written = total;
        self.next_index += 1;

        Ok(ChunkAck {
            chunk_index: index,
            bytes_written: total,
            crc32: crc32fast::hash(bytes),
        })
    }

    fn close(self) -> Result<ClosedFile, HostError> {
        let OpenSession {
            writer,
            path,
            bytes_written,
            hasher,
            ..
        } = self;

        // 刷新缓冲并同步到磁盘，句柄在此处释放
        let flushed = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all());

        if let Err(e) = flushed {
            let _ = fs::remove_file(&path);
            return Err(HostError::Finalize(format!(
                "Failed to close {}: {}",
                path.display(),
                e
            )));
        }

        Ok(ClosedFile {
            path,
            len: bytes_written,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    fn discard(self) -> PathBuf {
        let OpenSession { writer, path, .. } = self;
        drop(writer);

        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove partial file {}: {}", path.display(), e);
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn machine() -> (TempDir, SessionMachine) {
        (TempDir::new().unwrap(), SessionMachine::new(1024))
    }

    #[test]
    fn chunks_are_written_in_order() {
        let (temp, mut machine) = machine();
        let path = temp.path().join("out.bin");

        machine.start(path.clone()).unwrap();
        let ack = machine.append(0, b"hello ").unwrap();
        assert_eq!(ack.bytes_written, 6);
        assert_eq!(ack.crc32, crc32fast::hash(b"hello "));
        let ack = machine.append(1, b"world").unwrap();
        assert_eq!(ack.chunk_index, 1);

        let closed = machine.close().unwrap();
        assert!(!machine.is_open());
        assert_eq!(closed.len, 11);
        assert_eq!(closed.sha256, hex::encode(Sha256::digest(b"hello world")));
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn start_while_open_keeps_existing_session() {
        let (temp, mut machine) = machine();
        let first = temp.path().join("first.bin");

        machine.start(first.clone()).unwrap();
        machine.append(0, b"abc").unwrap();

        let err = machine.start(temp.path().join("second.bin")).unwrap_err();
        assert!(matches!(err, HostError::AlreadyOpen(_)));
        assert_eq!(machine.open_path(), Some(first.as_path()));
        assert!(!temp.path().join("second.bin").exists());

        machine.append(1, b"def").unwrap();
        assert_eq!(machine.close().unwrap().len, 6);
    }

    #[test]
    fn idle_calls_fail_with_no_session() {
        let (_temp, mut machine) = machine();
        assert_eq!(machine.append(0, b"x").unwrap_err(), HostError::NoSession);
        assert_eq!(machine.close().unwrap_err(), HostError::NoSession);
    }

    #[test]
    fn out_of_order_chunk_discards_session() {
        let (temp, mut machine) = machine();
        let path = temp.path().join("out.bin");

        machine.start(path.clone()).unwrap();
        machine.append(0, b"a").unwrap();
        let err = machine.append(2, b"c").unwrap_err();

        assert_eq!(
            err,
            HostError::ChunkOutOfOrder {
                expected: 1,
                received: 2
            }
        );
        assert!(!machine.is_open());
        assert!(!path.exists());
    }

    #[test]
    fn quota_overflow_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let mut machine = SessionMachine::new(4);
        let path = temp.path().join("out.bin");

        machine.start(path.clone()).unwrap();
        machine.append(0, b"abc").unwrap();
        assert!(matches!(machine.append(1, b"de"), Err(HostError::Io(_))));
        assert!(!machine.is_open());
        assert!(!path.exists());
    }

    #[test]
    fn abort_is_idempotent() {
        let (temp, mut machine) = machine();
        let path = temp.path().join("out.bin");

        assert_eq!(machine.abort(), None);
        machine.start(path.clone()).unwrap();
        machine.append(0, b"partial").unwrap();

        assert_eq!(machine.abort(), Some(path.clone()));
        assert_eq!(machine.abort(), None);
        assert!(!path.exists());
    }

    #[test]
    fn restart_truncates_previous_content() {
        let (temp, mut machine) = machine();
        let path = temp.path().join("same.png");

        machine.start(path.clone()).unwrap();
        machine.append(0, b"long previous content").unwrap();
        machine.close().unwrap();

        machine.start(path.clone()).unwrap();
        machine.append(0, b"new").unwrap();
        machine.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn empty_session_produces_empty_file() {
        let (temp, mut machine) = machine();
        let path = temp.path().join("empty.bin");

        machine.start(path.clone()).unwrap();
        let closed = machine.close().unwrap();
        assert_eq!(closed.len, 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
