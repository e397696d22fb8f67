//! 记录型后端
//!
//! 把收到的每个批次序列化后追加到内存日志，不驱动任何硬件。
//! 用于测试与开发：断言核心层实际派发了什么，以及注入
//! setup/execute 故障来覆盖错误路径。

use crate::LiquidHandlerBackend;
use crate::error::BackendError;
use avocet_resources::OperationBatch;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// 共享的记录状态
#[derive(Debug, Default)]
struct SavingState {
    /// 已执行批次的序列化日志（按派发顺序）
    sent: Vec<serde_json::Value>,
    /// 是否已完成 setup
    is_setup: bool,
    /// setup 调用计数
    setup_count: usize,
    /// stop 调用计数
    stop_count: usize,
    /// 下一次 setup 注入的故障
    fail_setup: Option<BackendError>,
    /// 下一次 execute 注入的故障（消费一次后清除）
    fail_next_execute: Option<BackendError>,
}

/// 记录型后端
///
/// 状态放在 `Arc<Mutex<_>>` 里，通过 [`SavingBackend::handle`] 克隆出
/// 观察句柄；后端本体移交给处理器后，测试仍可经句柄检查日志、
/// 注入故障。
#[derive(Debug)]
pub struct SavingBackend {
    num_channels: usize,
    state: Arc<Mutex<SavingState>>,
}

impl SavingBackend {
    /// 创建记录型后端
    pub fn new(num_channels: usize) -> Self {
        Self {
            num_channels,
            state: Arc::new(Mutex::new(SavingState::default())),
        }
    }

    /// 克隆观察句柄（后端移交后用于检查/注入）
    pub fn handle(&self) -> SavingHandle {
        SavingHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl LiquidHandlerBackend for SavingBackend {
    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn setup(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_setup.take() {
            return Err(err);
        }
        state.is_setup = true;
        state.setup_count += 1;
        debug!("SavingBackend setup complete");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.is_setup = false;
        state.stop_count += 1;
        debug!("SavingBackend stopped");
        Ok(())
    }

    fn execute(&mut self, batch: &OperationBatch) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if !state.is_setup {
            return Err(BackendError::NotReady);
        }
        if let Some(err) = state.fail_next_execute.take() {
            return Err(err);
        }
        // 序列化失败意味着批次类型本身损坏，按设备错误上抛
        let entry = serde_json::to_value(batch)
            .map_err(|e| BackendError::Device(format!("batch serialization failed: {e}")))?;
        debug!(ops = batch.len(), "SavingBackend recorded batch");
        state.sent.push(entry);
        Ok(())
    }
}

/// [`SavingBackend`] 的观察句柄
#[derive(Debug, Clone)]
pub struct SavingHandle {
    state: Arc<Mutex<SavingState>>,
}

impl SavingHandle {
    /// 已记录批次的快照副本
    pub fn sent_batches(&self) -> Vec<serde_json::Value> {
        self.state.lock().sent.clone()
    }

    /// 清空批次日志
    pub fn clear(&self) {
        self.state.lock().sent.clear();
    }

    /// 后端是否处于已 setup 状态
    pub fn is_setup(&self) -> bool {
        self.state.lock().is_setup
    }

    /// setup 调用计数
    pub fn setup_count(&self) -> usize {
        self.state.lock().setup_count
    }

    /// stop 调用计数
    pub fn stop_count(&self) -> usize {
        self.state.lock().stop_count
    }

    /// 注入：下一次 setup 失败
    pub fn fail_setup(&self, err: BackendError) {
        self.state.lock().fail_setup = Some(err);
    }

    /// 注入：下一次 execute 失败（消费一次后自动清除）
    pub fn fail_next_execute(&self, err: BackendError) {
        self.state.lock().fail_next_execute = Some(err);
    }
}
