//! # Avocet Backend
//!
//! 硬件后端适配器抽象层
//!
//! ## 模块
//!
//! - `error`: 后端错误类型
//! - `saving`: 记录型后端（无硬件依赖，测试/开发用）
//!
//! ## 契约
//!
//! 适配器对核心层不透明：核心只关心 `execute` 的成功/失败。
//! 批次在核心提交内部状态**之后**派发；适配器报告失败时核心
//! 不回滚（物理动作可能已部分发生），由上层区分
//! 「从未尝试」与「已尝试、结果不确定」。

pub mod error;
pub mod saving;

pub use error::BackendError;
pub use saving::{SavingBackend, SavingHandle};

use avocet_resources::OperationBatch;

/// 液体处理硬件后端适配器
///
/// 核心层经校验后把命令批次交给适配器执行。实现者负责
/// 硬件级超时策略；核心层不施加超时。
///
/// # 顺序保证
///
/// 同一会话上的 `execute` 调用由核心层的单写者锁串行化，
/// 适配器可以假定批次按提交顺序到达、且同一时刻至多一个在执行。
pub trait LiquidHandlerBackend: Send {
    /// 机头通道数量
    fn num_channels(&self) -> usize;

    /// 后端初始化（会话 `setup` 时调用，成功后会话才进入 Running）
    fn setup(&mut self) -> Result<(), BackendError>;

    /// 后端停机（会话 `stop` 时调用）
    fn stop(&mut self) -> Result<(), BackendError>;

    /// 执行一个已校验的命令批次
    fn execute(&mut self, batch: &OperationBatch) -> Result<(), BackendError>;
}
