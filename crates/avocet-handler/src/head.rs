//! 机头通道状态追踪
//!
//! 每个通道至多持有一个吸头，并追踪吸头内的液量和拾取来源槽位。
//! 吸液/排液在逻辑上必须发生在拾取之后、放回之前，
//! 这一跨切面不变量由校验器对照本追踪器检查。

use avocet_resources::{PreconditionError, Tip, tracker};

/// 通道吸头追踪器
///
/// 纯状态转移：前置条件不满足时返回错误且不修改状态，
/// 校验器的脏跑阶段直接克隆本类型做累积校验。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelTipTracker {
    /// 当前持有的吸头
    tip: Option<Tip>,
    /// 吸头内液量（uL）
    tip_volume: f64,
    /// 拾取来源槽位名称（用于 return_tips）
    origin: Option<String>,
}

impl ChannelTipTracker {
    /// 通道是否持有吸头
    pub fn has_tip(&self) -> bool {
        self.tip.is_some()
    }

    /// 持有的吸头
    pub fn tip(&self) -> Option<&Tip> {
        self.tip.as_ref()
    }

    /// 吸头内液量（uL）
    pub fn tip_volume(&self) -> f64 {
        self.tip_volume
    }

    /// 拾取来源槽位名称
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// 脏跑检查：拾取前置条件（通道必须为空）
    pub fn check_pick(&self) -> Result<(), PreconditionError> {
        if self.tip.is_some() {
            return Err(PreconditionError::ChannelHasTip);
        }
        Ok(())
    }

    /// 拾取吸头（空 → 持有，记录来源槽位）
    pub fn pick(&mut self, tip: Tip, origin: &str) -> Result<(), PreconditionError> {
        self.check_pick()?;
        self.tip = Some(tip);
        self.tip_volume = 0.0;
        self.origin = Some(origin.to_string());
        Ok(())
    }

    /// 脏跑检查：放回前置条件（持有、类型一致、按配置要求空吸头）
    pub fn check_drop(
        &self,
        tip_kind: &str,
        allow_nonzero_volume: bool,
    ) -> Result<(), PreconditionError> {
        let tip = self.tip.as_ref().ok_or(PreconditionError::ChannelHasNoTip)?;
        if tip.kind != tip_kind {
            return Err(PreconditionError::TipMismatch {
                held: tip.kind.clone(),
                requested: tip_kind.to_string(),
            });
        }
        if self.tip_volume > 0.0 && !allow_nonzero_volume {
            return Err(PreconditionError::TipNotEmpty {
                in_tip: self.tip_volume,
            });
        }
        Ok(())
    }

    /// 放回吸头（持有 → 空）
    pub fn drop_tip(
        &mut self,
        tip_kind: &str,
        allow_nonzero_volume: bool,
    ) -> Result<Tip, PreconditionError> {
        self.check_drop(tip_kind, allow_nonzero_volume)?;
        self.tip_volume = 0.0;
        self.origin = None;
        self.tip.take().ok_or(PreconditionError::ChannelHasNoTip)
    }

    /// 脏跑检查：吸液前置条件（持有吸头、不超过吸头容量）
    pub fn check_aspirate(&self, volume: f64) -> Result<(), PreconditionError> {
        tracker::check_amount(volume)?;
        let tip = self.tip.as_ref().ok_or(PreconditionError::ChannelHasNoTip)?;
        if self.tip_volume + volume > tip.max_volume {
            return Err(PreconditionError::TipOverflow {
                requested: volume,
                in_tip: self.tip_volume,
                max_volume: tip.max_volume,
            });
        }
        Ok(())
    }

    /// 吸液入吸头
    pub fn aspirate(&mut self, volume: f64) -> Result<(), PreconditionError> {
        self.check_aspirate(volume)?;
        self.tip_volume += volume;
        Ok(())
    }

    /// 脏跑检查：排液前置条件（持有吸头、不超过吸头内液量）
    pub fn check_dispense(&self, volume: f64) -> Result<(), PreconditionError> {
        tracker::check_amount(volume)?;
        if self.tip.is_none() {
            return Err(PreconditionError::ChannelHasNoTip);
        }
        if volume > self.tip_volume {
            return Err(PreconditionError::TipUnderflow {
                requested: volume,
                in_tip: self.tip_volume,
            });
        }
        Ok(())
    }

    /// 从吸头排液
    pub fn dispense(&mut self, volume: f64) -> Result<(), PreconditionError> {
        self.check_dispense(volume)?;
        self.tip_volume -= volume;
        Ok(())
    }

    /// 手动覆盖通道状态（update_head_state 用）
    ///
    /// 覆盖会清零吸头内液量并清除来源槽位记录。
    pub fn set_tip(&mut self, tip: Option<Tip>) {
        self.tip = tip;
        self.tip_volume = 0.0;
        self.origin = None;
    }
}
