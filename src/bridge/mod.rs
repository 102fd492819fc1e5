// 脚本桥接层
// 字符串进、字符串出的调用原语，以及叠加在其上的信封协议

pub mod channel;
pub mod envelope;
pub mod local;
pub mod messages;
pub mod script;
pub mod traits;

pub use channel::RpcChannel;
pub use envelope::{Envelope, ErrorCode};
pub use local::{HostThread, InProcessBridge};
pub use messages::{ChunkAck, FinishOutcome, PurgeReport};
pub use script::ScriptCall;
pub use traits::{ScriptBridge, ScriptEngine, EVAL_ERROR_SENTINEL};
