use serde_json::Value;
use std::fmt::Write;

use crate::error::BridgeError;

/// 宿主脚本环境中的函数命名空间
pub const NAMESPACE: &str = "emoteBridge";

/// startSession 接受的文件名最大字节数
pub const MAX_FILE_NAME_LEN: usize = 255;

/// 客户端可发起的宿主调用
///
/// 渲染结果是一行脚本文本，例如 `emoteBridge.appendChunk(3, [137,80,78,71])`。
/// 参数一律写成 JSON 字面量，宿主端按同样的规则解析回来。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCall {
    StartSession {
        file_name: String,
    },
    AppendChunk {
        index: u64,
        bytes: Vec<u8>,
    },
    FinishSession {
        expected_len: Option<u64>,
        sha256: Option<String>,
    },
    AbortSession,
    PurgeAll,
}

impl ScriptCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            ScriptCall::StartSession { .. } => "startSession",
            ScriptCall::AppendChunk { .. } => "appendChunk",
            ScriptCall::FinishSession { .. } => "finishSession",
            ScriptCall::AbortSession => "abortSession",
            ScriptCall::PurgeAll => "purgeAll",
        }
    }

    /// 渲染为宿主可执行的脚本文本
    pub fn render(&self) -> String {
        let args = match self {
            ScriptCall::StartSession { file_name } => json_literal(&Value::from(file_name.as_str())),
            ScriptCall::AppendChunk { index, bytes } => {
                // 字节数组写成逗号分隔的数字字面量
                let mut out = String::with_capacity(bytes.len() * 4 + 16);
                let _ = write!(out, "{}, [", index);
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}", byte);
                }
                out.push(']');
                out
            }
            ScriptCall::FinishSession {
                expected_len,
                sha256,
            } => format!(
                "{}, {}",
                json_literal(&expected_len.map(Value::from).unwrap_or(Value::Null)),
                json_literal(&sha256.as_deref().map(Value::from).unwrap_or(Value::Null)),
            ),
            ScriptCall::AbortSession | ScriptCall::PurgeAll => String::new(),
        };
        format!("{}.{}({})", NAMESPACE, self.function_name(), args)
    }

    /// 解析脚本文本，任何不符合调用约定的输入都视为脚本执行抛错
    pub fn parse(script: &str) -> Result<Self, BridgeError> {
        let script = script.trim().trim_end_matches(';').trim_end();
        let call = script
            .strip_prefix(NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| eval_failed(format!("not a {} call", NAMESPACE)))?;

        let open = call
            .find('(')
            .ok_or_else(|| eval_failed("missing argument list".to_string()))?;
        let name = &call[..open];
        let args_text = call[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| eval_failed("unterminated argument list".to_string()))?;

        let args: Vec<Value> = serde_json::from_str(&format!("[{}]", args_text))
            .map_err(|e| eval_failed(format!("bad arguments for {}: {}", name, e)))?;

        match (name, args.as_slice()) {
            ("startSession", [Value::String(file_name)]) => Ok(ScriptCall::StartSession {
                file_name: file_name.clone(),
            }),
            ("appendChunk", [index, Value::Array(items)]) => {
                let index = index
                    .as_u64()
                    .ok_or_else(|| eval_failed("chunk index must be a non-negative integer".to_string()))?;
                let bytes = items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|n| u8::try_from(n).ok())
                            .ok_or_else(|| eval_failed(format!("not a byte value: {}", item)))
                    })
                    .collect::<Result<Vec<u8>, _>>()?;
                Ok(ScriptCall::AppendChunk { index, bytes })
            }
            ("finishSession", []) => Ok(ScriptCall::FinishSession {
                expected_len: None,
                sha256: None,
            }),
            ("finishSession", [len, digest]) => {
                let expected_len = match len {
                    Value::Null => None,
                    other => Some(other.as_u64().ok_or_else(|| {
                        eval_failed("expected length must be a non-negative integer".to_string())
                    })?),
                };
                let sha256 = match digest {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => return Err(eval_failed(format!("bad digest argument: {}", other))),
                };
                Ok(ScriptCall::FinishSession {
                    expected_len,
                    sha256,
                })
            }
            ("abortSession", []) => Ok(ScriptCall::AbortSession),
            ("purgeAll", []) => Ok(ScriptCall::PurgeAll),
            (name, args) => Err(eval_failed(format!(
                "no function {} taking {} argument(s)",
                name,
                args.len()
            ))),
        }
    }
}

fn json_literal(value: &Value) -> String {
    value.to_string()
}

fn eval_failed(reason: String) -> BridgeError {
    BridgeError::EvalFailed(reason)
}
