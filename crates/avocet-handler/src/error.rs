//! 处理器层错误类型定义
//!
//! 所有错误以类型化结果返回给调用方（传输层），不允许静默吞掉。
//! [`HandlerError::class`] 把错误归入可区分的外部信号类别。

use avocet_backend::BackendError;
use avocet_resources::{LayoutError, PreconditionError, ResourceError};
use std::fmt;
use thiserror::Error;

/// 单通道前置条件失败
///
/// 批次校验把每个失败的 `(通道, 资源, 原因)` 逐一收集，
/// 整批拒绝时一次性返回全部失败。
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFailure {
    /// 失败的通道 id
    pub channel: usize,
    /// 操作目标资源名称
    pub resource: String,
    /// 失败原因
    pub reason: PreconditionError,
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} @ '{}': {}",
            self.channel, self.resource, self.reason
        )
    }
}

/// 处理器错误类型
#[derive(Error, Debug)]
pub enum HandlerError {
    /// 从未加载过甲板布局（setup 的前置条件）
    #[error("No deck layout has been loaded")]
    NoDeckLoaded,

    /// 会话未处于 Running，不接受操作批次
    #[error("Session is not running")]
    NotRunning,

    /// 会话已在运行，重复 setup
    #[error("Session is already running")]
    AlreadyRunning,

    /// 会话已停止（仅 StopPolicy::Error 时出现）
    #[error("Session is already stopped")]
    AlreadyStopped,

    /// 会话运行中不允许重载布局（可配置放开）
    #[error("Session is running; layout can only be loaded while stopped")]
    SessionRunning,

    /// 布局载荷非法
    #[error("Malformed layout: {0}")]
    Layout(#[from] LayoutError),

    /// 操作引用了当前甲板上不存在的资源
    #[error("Unknown resource: '{name}'")]
    UnknownResource { name: String },

    /// 同一批次内通道 id 重复
    #[error("Channel {channel} used more than once in batch")]
    DuplicateChannel { channel: usize },

    /// 通道 id 越界
    #[error("Channel {channel} out of range (head has {num_channels} channels)")]
    ChannelOutOfRange { channel: usize, num_channels: usize },

    /// 操作数与 use_channels 长度不一致（请求级错误）
    #[error("Got {ops} operations but {channels} channels in use_channels")]
    ChannelCountMismatch { ops: usize, channels: usize },

    /// 前置条件校验失败（整批拒绝，无任何修改）
    #[error("Batch rejected: {} precondition failure(s)", .0.len())]
    Preconditions(Vec<ChannelFailure>),

    /// 机头上没有已拾取的吸头（return_tips 的前置条件）
    #[error("No tips have been picked up")]
    NoTipsHeld,

    /// 资源树错误（按名解析等）
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// 后端在内部状态已提交后报告失败
    ///
    /// 此时建模状态与物理状态可能已经分歧，调用方据此区分
    /// 「从未尝试」与「已尝试、结果不确定」。
    #[error("Backend error after state commit: {0}")]
    Backend(#[from] BackendError),

    /// 文件读写失败（保存/加载布局）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 内部不变量被破坏（不可恢复）
    #[error("Internal invariant violated: {0}")]
    Internal(String),
}

/// 外部信号类别
///
/// 传输层据此把错误映射为可区分的响应（如 400 / 409 / 502 / 500）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 请求本身非法（载荷、通道表、未知资源）
    BadRequest,
    /// 请求合法但与当前状态冲突（会话状态、前置条件）
    Conflict,
    /// 后端/设备侧失败
    Backend,
    /// 内部错误
    Internal,
}

impl HandlerError {
    /// 错误归类（供传输层映射外部信号）
    pub fn class(&self) -> ErrorClass {
        match self {
            HandlerError::Layout(_)
            | HandlerError::UnknownResource { .. }
            | HandlerError::DuplicateChannel { .. }
            | HandlerError::ChannelOutOfRange { .. }
            | HandlerError::ChannelCountMismatch { .. }
            | HandlerError::Resource(_) => ErrorClass::BadRequest,

            HandlerError::NoDeckLoaded
            | HandlerError::NotRunning
            | HandlerError::AlreadyRunning
            | HandlerError::AlreadyStopped
            | HandlerError::SessionRunning
            | HandlerError::Preconditions(_)
            | HandlerError::NoTipsHeld => ErrorClass::Conflict,

            HandlerError::Backend(_) => ErrorClass::Backend,

            HandlerError::Io(_) | HandlerError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// 前置条件失败列表（非前置条件错误返回空切片）
    pub fn failures(&self) -> &[ChannelFailure] {
        match self {
            HandlerError::Preconditions(failures) => failures,
            _ => &[],
        }
    }
}
