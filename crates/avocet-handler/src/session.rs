//! 会话状态机定义
//!
//! 会话状态决定哪些操作可被接受。状态存放在原子变量里，
//! 纯查询（status 接口）无需会话锁。

use std::sync::atomic::{AtomicU8, Ordering};

/// 会话状态
///
/// # 状态说明
///
/// - **Idle**: 初始状态，从未挂载过甲板
/// - **Running**: `setup` 成功后进入，接受操作批次
/// - **Stopped**: `stop` 后进入；非终态，可再次 `setup` 回到 Running
///
/// 对外部查询者 `Idle` 与 `Stopped` 等价（都报告 "stopped"），
/// 区别仅在于 Idle 从未挂载过甲板。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// 初始状态（默认）
    #[default]
    Idle = 0,

    /// 运行中（setup 完成，接受操作批次）
    Running = 1,

    /// 已停止（可通过 setup 重新进入 Running）
    Stopped = 2,
}

impl SessionState {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Idle。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Idle, // 无效值默认为 Idle
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否正在运行
    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    /// 状态查询接口的对外表示（Idle 与 Stopped 均报告 "stopped"）
    pub fn status_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Idle | Self::Stopped => "stopped",
        }
    }
}

/// 会话状态（原子版本，用于无锁状态查询）
///
/// # 使用场景
///
/// - 状态查询接口无锁读取当前状态
/// - 所有状态写入都发生在会话锁内部，原子变量只是读取缓存
#[derive(Debug)]
pub struct AtomicSessionState {
    inner: AtomicU8,
}

impl AtomicSessionState {
    /// 创建新的原子状态
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 设置状态（仅在会话锁内调用）
    pub fn set(&self, state: SessionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }
}

impl Default for AtomicSessionState {
    fn default() -> Self {
        Self::new(SessionState::Idle)
    }
}
