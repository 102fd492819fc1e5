use crate::bridge::envelope::ErrorCode;

/// 传输客户端错误类型
/// 宿主端的每个失败信封都会被映射为这里的某个具体变体
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Malformed envelope: {0}")]
    EnvelopeParse(String),

    #[error("A transfer session is already open: {0}")]
    AlreadyOpen(String),

    #[error("No transfer session is open: {0}")]
    NoSession(String),

    #[error("No target project: {0}")]
    NoTargetContext(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Finalize failed: {0}")]
    Finalize(String),

    #[error("Chunk out of order: {0}")]
    ChunkOutOfOrder(String),

    #[error("Acknowledgement mismatch: {0}")]
    AckMismatch(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl TransferError {
    /// 将失败信封中的错误码还原为类型化错误
    pub fn from_failure(code: Option<ErrorCode>, reason: String) -> Self {
        match code {
            Some(ErrorCode::AlreadyOpen) => TransferError::AlreadyOpen(reason),
            Some(ErrorCode::NoSession) => TransferError::NoSession(reason),
            Some(ErrorCode::NoTargetContext) => TransferError::NoTargetContext(reason),
            Some(ErrorCode::Io) | Some(ErrorCode::BadCall) => TransferError::Io(reason),
            Some(ErrorCode::Finalize) => TransferError::Finalize(reason),
            Some(ErrorCode::ChunkOutOfOrder) => TransferError::ChunkOutOfOrder(reason),
            // 旧版宿主不带错误码，只能按通用 IO 失败处理
            None => TransferError::Io(reason),
        }
    }
}

/// 宿主端错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("a session is already open for {0}")]
    AlreadyOpen(String),

    #[error("no session is open")]
    NoSession,

    #[error("no active project to import into")]
    NoTargetContext,

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Finalize(String),

    #[error("expected chunk {expected}, got {received}")]
    ChunkOutOfOrder { expected: u64, received: u64 },

    #[error("{0}")]
    BadCall(String),
}

impl HostError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HostError::AlreadyOpen(_) => ErrorCode::AlreadyOpen,
            HostError::NoSession => ErrorCode::NoSession,
            HostError::NoTargetContext => ErrorCode::NoTargetContext,
            HostError::Io(_) => ErrorCode::Io,
            HostError::Finalize(_) => ErrorCode::Finalize,
            HostError::ChunkOutOfOrder { .. } => ErrorCode::ChunkOutOfOrder,
            HostError::BadCall(_) => ErrorCode::BadCall,
        }
    }
}

/// 桥接层自身的故障，与信封里的 `success:false` 区分开
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("remote evaluation threw: {0}")]
    EvalFailed(String),

    #[error("bridge disconnected")]
    Disconnected,

    #[error("callback dropped before a result arrived")]
    CallbackDropped,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("environment variable {name}: {reason}")]
    Env { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_codes_map_to_typed_errors() {
        let err = TransferError::from_failure(Some(ErrorCode::AlreadyOpen), "busy".into());
        assert!(matches!(err, TransferError::AlreadyOpen(reason) if reason == "busy"));

        let err = TransferError::from_failure(Some(ErrorCode::NoSession), "idle".into());
        assert!(matches!(err, TransferError::NoSession(_)));

        let err = TransferError::from_failure(None, "legacy".into());
        assert!(matches!(err, TransferError::Io(_)));
    }

    #[test]
    fn host_errors_carry_wire_codes() {
        assert_eq!(HostError::NoSession.code(), ErrorCode::NoSession);
        assert_eq!(
            HostError::ChunkOutOfOrder {
                expected: 1,
                received: 3
            }
            .code(),
            ErrorCode::ChunkOutOfOrder
        );
        assert_eq!(
            HostError::ChunkOutOfOrder {
                expected: 1,
                received: 3
            }
            .to_string(),
            "expected chunk 1, got 3"
        );
    }
}
