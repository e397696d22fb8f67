//! 叶子资源状态追踪器
//!
//! 追踪器是纯状态转移：前置条件不满足时返回错误且不产生任何修改。
//! 校验器依赖这一点在脏跑（dry-run）阶段克隆追踪器做累积校验。

use crate::error::PreconditionError;
use serde::{Deserialize, Serialize};

/// 吸头描述
///
/// `kind` 是不透明的吸头类型 id（如 "standard_volume"、"low_volume"），
/// `max_volume` 为吸头自身的最大容量（uL）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    /// 吸头类型 id（不透明字符串，放回时用于一致性校验）
    pub kind: String,
    /// 吸头容量（uL）
    pub max_volume: f64,
}

impl Tip {
    /// 创建吸头
    pub fn new(kind: impl Into<String>, max_volume: f64) -> Self {
        Self {
            kind: kind.into(),
            max_volume,
        }
    }

    /// 默认吸头类型（吸头架节点未指定 `tip` 键时使用）
    pub fn standard() -> Self {
        Self::new("standard_volume", 400.0)
    }
}

/// 校验液量参数：必须有限且非负（零是合法的空操作）
pub fn check_amount(amount: f64) -> Result<(), PreconditionError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(PreconditionError::InvalidVolume { volume: amount });
    }
    Ok(())
}

/// 吸头槽位追踪器
///
/// 槽位要么持有一个吸头，要么为空：
/// - `pickup()`: 持有 → 空（槽位为空时失败）
/// - `place(tip)`: 空 → 持有（槽位已占用时失败）
///
/// 失败时状态保持不变。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TipSpotTracker {
    tip: Option<Tip>,
}

impl TipSpotTracker {
    /// 创建空槽位
    pub fn empty() -> Self {
        Self { tip: None }
    }

    /// 创建持有指定吸头的槽位
    pub fn with_tip(tip: Tip) -> Self {
        Self { tip: Some(tip) }
    }

    /// 槽位是否持有吸头
    pub fn has_tip(&self) -> bool {
        self.tip.is_some()
    }

    /// 查看持有的吸头（不取出）
    pub fn tip(&self) -> Option<&Tip> {
        self.tip.as_ref()
    }

    /// 脏跑检查：拾取的前置条件
    pub fn check_pickup(&self) -> Result<&Tip, PreconditionError> {
        self.tip.as_ref().ok_or(PreconditionError::TipSpotEmpty)
    }

    /// 拾取吸头（持有 → 空）
    pub fn pickup(&mut self) -> Result<Tip, PreconditionError> {
        self.tip.take().ok_or(PreconditionError::TipSpotEmpty)
    }

    /// 脏跑检查：放回的前置条件
    pub fn check_place(&self) -> Result<(), PreconditionError> {
        if self.tip.is_some() {
            return Err(PreconditionError::TipSpotOccupied);
        }
        Ok(())
    }

    /// 放回吸头（空 → 持有）
    pub fn place(&mut self, tip: Tip) -> Result<(), PreconditionError> {
        self.check_place()?;
        self.tip = Some(tip);
        Ok(())
    }
}

/// 井液量追踪器
///
/// 当前液量非负且受井容量约束：
/// - `withdraw(amount)`: 吸液，`amount > volume` 时失败
/// - `add(amount)`: 排液，`volume + amount > capacity` 时失败
///
/// 零量操作是合法的空操作。失败时液量保持不变（无部分扣减）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTracker {
    volume: f64,
    capacity: f64,
}

impl VolumeTracker {
    /// 创建空井
    pub fn new(capacity: f64) -> Self {
        Self {
            volume: 0.0,
            capacity,
        }
    }

    /// 创建带初始液量的井（布局加载时使用，调用方已校验 volume <= capacity）
    pub fn with_volume(volume: f64, capacity: f64) -> Self {
        debug_assert!(volume <= capacity);
        Self { volume, capacity }
    }

    /// 当前液量（uL）
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// 井容量（uL）
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// 脏跑检查：吸液的前置条件
    pub fn check_withdraw(&self, amount: f64) -> Result<(), PreconditionError> {
        check_amount(amount)?;
        if amount > self.volume {
            return Err(PreconditionError::InsufficientVolume {
                requested: amount,
                available: self.volume,
            });
        }
        Ok(())
    }

    /// 吸液（volume -= amount）
    pub fn withdraw(&mut self, amount: f64) -> Result<(), PreconditionError> {
        self.check_withdraw(amount)?;
        self.volume -= amount;
        Ok(())
    }

    /// 脏跑检查：排液的前置条件
    pub fn check_add(&self, amount: f64) -> Result<(), PreconditionError> {
        check_amount(amount)?;
        if self.volume + amount > self.capacity {
            return Err(PreconditionError::OverCapacity {
                requested: amount,
                volume: self.volume,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// 排液（volume += amount）
    pub fn add(&mut self, amount: f64) -> Result<(), PreconditionError> {
        self.check_add(amount)?;
        self.volume += amount;
        Ok(())
    }
}
