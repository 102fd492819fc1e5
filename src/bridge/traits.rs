use async_trait::async_trait;

use crate::error::BridgeError;

/// 宿主脚本执行失败时桥接返回的哨兵字符串
pub const EVAL_ERROR_SENTINEL: &str = "EvalScript error";

/// 最原始的脚本桥接接口
///
/// 只负责把一段脚本文本交给宿主执行并取回字符串结果，不理解结果的结构。
/// 调用方保证同一时刻最多只有一个未完成的调用。
#[async_trait]
pub trait ScriptBridge: Send + Sync {
    /// 执行脚本并返回宿主给出的原始字符串
    async fn eval_script(&self, script: String) -> Result<String, BridgeError>;
}

/// 桥接另一端的脚本执行环境
/// 每次只执行一段脚本，执行完毕后才会收到下一段
pub trait ScriptEngine: Send + 'static {
    fn evaluate(&mut self, script: &str) -> String;

    /// 桥接断开时调用，用于释放会话等资源
    fn shutdown(&mut self) {}
}
