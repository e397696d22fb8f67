//! # Avocet Resources
//!
//! 液体处理工作站的甲板/资源模型（无硬件依赖）
//!
//! ## 模块
//!
//! - `tracker`: 叶子资源状态追踪器（吸头占位、液量）
//! - `resource`: 空间资源树（封闭的类型标签集合）
//! - `deck`: 甲板根容器（导轨槽位几何）
//! - `layout`: 甲板布局的 JSON 线格式（加载/序列化）
//! - `ops`: 通道操作的线格式（拾取/放回/吸液/排液）
//! - `error`: 错误类型定义
//!
//! ## 设计约束
//!
//! 资源类型是封闭的标签变体集合（见 [`resource::ResourceKind`]），
//! 新增资源种类通过扩展变体实现，而不是开放继承。
//! 追踪器随所属资源一起创建，布局重载时整体丢弃并按载荷重新初始化。

pub mod deck;
pub mod error;
pub mod layout;
pub mod ops;
pub mod resource;
pub mod tracker;

// 重新导出常用类型
pub use deck::{Deck, NUM_RAILS, RAIL_PITCH_MM};
pub use error::{LayoutError, PreconditionError, ResourceError};
pub use layout::{DeckLayout, LayoutNode};
pub use ops::{ChannelOp, Operation, OperationBatch};
pub use resource::{Resource, ResourceKind};
pub use tracker::{Tip, TipSpotTracker, VolumeTracker};

use serde::{Deserialize, Serialize};

/// 资源在父容器内的偏移坐标（毫米）
///
/// # 设计目的
///
/// `Coordinate` 是资源树与线格式共享的几何类型：
/// - **相对定位**：每个资源只记录相对父容器的偏移，绝对位置由树路径累加得到
/// - **Copy trait**：零成本复制，树遍历和布局构建无需引用传递
/// - **serde 支持**：直接出现在布局线格式的 `position` 键中
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// X 偏移（毫米，沿导轨方向）
    pub x: f64,
    /// Y 偏移（毫米）
    pub y: f64,
    /// Z 偏移（毫米，竖直方向）
    pub z: f64,
}

impl Coordinate {
    /// 创建坐标
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 零偏移
    pub fn zero() -> Self {
        Self::default()
    }
}

impl std::ops::Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}
