use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::envelope::Envelope;
use super::script::ScriptCall;
use super::traits::{ScriptBridge, EVAL_ERROR_SENTINEL};
use crate::error::{BridgeError, TransferError};

/// 在原始桥接之上叠加信封协议
/// 负责渲染调用、识别哨兵字符串、解析信封并映射为类型化错误
pub struct RpcChannel<B> {
    bridge: B,
}

impl<B: ScriptBridge> RpcChannel<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// 发起一次调用，返回成功信封中的结果字段
    pub async fn call(&self, call: &ScriptCall) -> Result<Map<String, Value>, TransferError> {
        let raw = self.bridge.eval_script(call.render()).await?;

        if raw == EVAL_ERROR_SENTINEL {
            return Err(BridgeError::EvalFailed(format!("{} threw", call.function_name())).into());
        }

        Envelope::parse(&raw).into_result()
    }

    /// 发起调用并把结果字段反序列化为具体类型
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        call: &ScriptCall,
    ) -> Result<T, TransferError> {
        let fields = self.call(call).await?;
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            TransferError::EnvelopeParse(format!(
                "unexpected {} result: {}",
                call.function_name(),
                e
            ))
        })
    }
}
