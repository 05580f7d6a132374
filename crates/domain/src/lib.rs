//! 聊天服务核心领域模型
//!
//! 包含行内命令协议的解析规则、线路文本格式，以及会话在处理命令时
//! 可能遇到的可恢复错误。本 crate 不做任何 I/O。

pub mod command;
pub mod errors;
pub mod value_objects;
pub mod wire;

// 重新导出常用类型
pub use command::*;
pub use errors::*;
pub use value_objects::*;
