//! 通道操作的线格式
//!
//! 操作是携带负载的标签联合体，校验器按标签分发，
//! 不依赖运行时方法解析。

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// 单条操作（标签联合体）
///
/// 负载只含资源名和操作特有参数；吸头/液量前置条件由校验器
/// 对照追踪器状态检查，不在线格式内携带。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// 从吸头槽位拾取吸头
    Pickup {
        /// 目标吸头槽位名称
        resource: String,
    },

    /// 把通道持有的吸头放回槽位
    Drop {
        /// 目标吸头槽位名称
        resource: String,
        /// 放回的吸头类型 id（与通道持有的吸头一致性校验）
        tip_kind: String,
    },

    /// 从井中吸液
    Aspirate {
        /// 目标井名称
        resource: String,
        /// 吸液量（uL，非负）
        volume: f64,
    },

    /// 向井中排液
    Dispense {
        /// 目标井名称
        resource: String,
        /// 排液量（uL，非负）
        volume: f64,
    },
}

impl Operation {
    /// 操作目标的资源名称
    pub fn resource(&self) -> &str {
        match self {
            Operation::Pickup { resource }
            | Operation::Drop { resource, .. }
            | Operation::Aspirate { resource, .. }
            | Operation::Dispense { resource, .. } => resource,
        }
    }

    /// 操作种类标签（日志用）
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Pickup { .. } => "pickup",
            Operation::Drop { .. } => "drop",
            Operation::Aspirate { .. } => "aspirate",
            Operation::Dispense { .. } => "dispense",
        }
    }
}

/// 通道寻址的操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelOp {
    /// 通道 id（0..num_channels-1）
    pub channel: usize,
    /// 操作
    pub op: Operation,
}

/// 操作批次（原子校验与执行的单位）
///
/// 栈上预留 8 个位置：常见 8 通道机头整批操作无需堆分配。
pub type OperationBatch = SmallVec<[ChannelOp; 8]>;
