use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

use super::traits::{ScriptBridge, ScriptEngine, EVAL_ERROR_SENTINEL};
use crate::error::BridgeError;

struct EvalRequest {
    script: String,
    reply: oneshot::Sender<String>,
}

/// 进程内桥接
///
/// 宿主运行在独立线程上并独占其状态，调用通过 mpsc 投递，
/// 结果通过 oneshot 回调返回。宿主线程按到达顺序逐个执行脚本。
#[derive(Clone)]
pub struct InProcessBridge {
    tx: mpsc::Sender<EvalRequest>,
}

/// 宿主线程句柄
pub struct HostThread {
    join: Option<JoinHandle<()>>,
}

impl InProcessBridge {
    /// 在新线程上启动宿主
    pub fn spawn<E: ScriptEngine>(engine: E) -> std::io::Result<(Self, HostThread)> {
        let (tx, rx) = mpsc::channel::<EvalRequest>(16);

        let join = std::thread::Builder::new()
            .name("emote-bridge-host".to_string())
            .spawn(move || run_engine(engine, rx))?;

        Ok((Self { tx }, HostThread { join: Some(join) }))
    }
}

fn run_engine<E: ScriptEngine>(mut engine: E, mut rx: mpsc::Receiver<EvalRequest>) {
    while let Some(request) = rx.blocking_recv() {
        let result = catch_unwind(AssertUnwindSafe(|| engine.evaluate(&request.script)))
            .unwrap_or_else(|_| {
                log::error!("Host panicked while evaluating script");
                EVAL_ERROR_SENTINEL.to_string()
            });
        // 调用方可能已经放弃等待
        let _ = request.reply.send(result);
    }

    log::debug!("Bridge closed, shutting down host");
    engine.shutdown();
}

#[async_trait]
impl ScriptBridge for InProcessBridge {
    async fn eval_script(&self, script: String) -> Result<String, BridgeError> {
        let (reply, reply_rx) = oneshot::channel();

        self.tx
            .send(EvalRequest { script, reply })
            .await
            .map_err(|_| BridgeError::Disconnected)?;

        reply_rx.await.map_err(|_| BridgeError::CallbackDropped)
    }
}

impl HostThread {
    /// 等待宿主线程退出
    /// 只有在所有桥接副本都被释放后才会返回
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("Host thread terminated abnormally");
            }
        }
    }
}
