use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HostError, TransferError};

/// 序列化信封本身失败时的兜底返回值
const SERIALIZE_FAILURE: &str =
    "{\"success\":false,\"error\":\"failed to serialize response\",\"code\":\"IO\"}";

/// 失败信封里携带的机器可读错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyOpen,
    NoSession,
    NoTargetContext,
    Io,
    Finalize,
    ChunkOutOfOrder,
    BadCall,
}

/// 宿主每次调用返回的信封
///
/// 线上格式为 `{ "success": bool, "error"?: string, "code"?: string, ...fields }`。
/// 任何无法按该格式解析的字符串都落到 [`Envelope::Malformed`]，不做兼容回退。
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Map<String, Value>),
    Failure {
        code: Option<ErrorCode>,
        reason: String,
    },
    Malformed(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Envelope {
    pub fn success() -> Self {
        Envelope::Success(Map::new())
    }

    /// 以可序列化结构体作为结果字段
    /// 非对象类型的值会放进 `value` 字段
    pub fn success_with<T: Serialize>(fields: &T) -> Self {
        match serde_json::to_value(fields) {
            Ok(Value::Object(map)) => Envelope::Success(map),
            Ok(Value::Null) => Envelope::success(),
            Ok(other) => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Envelope::Success(map)
            }
            Err(e) => Envelope::Failure {
                code: Some(ErrorCode::Io),
                reason: format!("failed to serialize result: {}", e),
            },
        }
    }

    pub fn failure(error: &HostError) -> Self {
        Envelope::Failure {
            code: Some(error.code()),
            reason: error.to_string(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<WireEnvelope>(raw) {
            Ok(wire) if wire.success => Envelope::Success(wire.fields),
            Ok(wire) => Envelope::Failure {
                code: wire
                    .code
                    .and_then(|code| serde_json::from_value(Value::String(code)).ok()),
                reason: wire.error.unwrap_or_else(|| "unknown error".to_string()),
            },
            Err(_) => Envelope::Malformed(raw.to_string()),
        }
    }

    pub fn to_json(&self) -> String {
        let wire = match self {
            Envelope::Success(fields) => WireEnvelope {
                success: true,
                error: None,
                code: None,
                fields: fields.clone(),
            },
            Envelope::Failure { code, reason } => WireEnvelope {
                success: false,
                error: Some(reason.clone()),
                code: code.and_then(|code| match serde_json::to_value(code) {
                    Ok(Value::String(s)) => Some(s),
                    _ => None,
                }),
                fields: Map::new(),
            },
            Envelope::Malformed(raw) => return raw.clone(),
        };
        serde_json::to_string(&wire).unwrap_or_else(|_| SERIALIZE_FAILURE.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// 转换为客户端结果，失败信封映射为类型化错误
    pub fn into_result(self) -> Result<Map<String, Value>, TransferError> {
        match self {
            Envelope::Success(fields) => Ok(fields),
            Envelope::Failure { code, reason } => Err(TransferError::from_failure(code, reason)),
            Envelope::Malformed(raw) => Err(TransferError::EnvelopeParse(preview(&raw))),
        }
    }
}

impl From<Result<Envelope, HostError>> for Envelope {
    fn from(result: Result<Envelope, HostError>) -> Self {
        result.unwrap_or_else(|e| Envelope::failure(&e))
    }
}

/// 截断过长的原始返回值，避免错误信息里塞满字节数组
fn preview(raw: &str) -> String {
    const LIMIT: usize = 120;
    match raw.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}
