//! 资源层错误类型定义

use thiserror::Error;

/// 资源树错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// 按名称解析失败（名称区分大小写）
    #[error("Resource '{name}' not found on deck")]
    NotFound { name: String },

    /// 资源名称在树内重复（名称必须全树唯一）
    #[error("Duplicate resource name: '{name}'")]
    DuplicateName { name: String },

    /// 导轨槽位已被占用
    #[error("Rail {rail} already occupied by '{by}'")]
    RailOccupied { rail: usize, by: String },

    /// 导轨槽位越界（有效范围 1..=NUM_RAILS）
    #[error("Rail {rail} out of range (valid: 1..={max})")]
    RailOutOfRange { rail: usize, max: usize },
}

/// 布局载荷错误类型
///
/// 布局加载失败时返回，此时先前的甲板保持不变。
#[derive(Error, Debug)]
pub enum LayoutError {
    /// JSON 解析失败（载荷不是合法 JSON 或顶层不是对象）
    #[error("Layout payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// 缺少必需键（错误信息点名缺失的键）
    #[error("Missing key in layout data: '{key}'")]
    MissingKey { key: String },

    /// 未知的资源类型标签
    #[error("Unknown resource type: '{kind}'")]
    UnknownKind { kind: String },

    /// 键存在但取值非法
    #[error("Invalid value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// 树构建失败（重名、槽位冲突等）
    #[error("Layout rejected: {0}")]
    Resource(#[from] ResourceError),
}

/// 操作前置条件错误
///
/// 追踪器状态转移的失败原因。所有失败都不产生部分修改，
/// 校验器把 `(通道, 原因)` 对逐一收集后整批拒绝。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    /// 吸头槽位为空，无法拾取
    #[error("Tip spot has no tip")]
    TipSpotEmpty,

    /// 吸头槽位已有吸头，无法放回
    #[error("Tip spot already holds a tip")]
    TipSpotOccupied,

    /// 通道未持有吸头
    #[error("Channel has no tip")]
    ChannelHasNoTip,

    /// 通道已持有吸头
    #[error("Channel already holds a tip")]
    ChannelHasTip,

    /// 放回的吸头类型与通道持有的不一致
    #[error("Tip kind mismatch: channel holds '{held}', operation names '{requested}'")]
    TipMismatch { held: String, requested: String },

    /// 吸头内仍有液体，不允许放回
    #[error("Cannot drop tip holding {in_tip} uL of liquid")]
    TipNotEmpty { in_tip: f64 },

    /// 井内液量不足
    #[error("Insufficient volume: requested {requested} uL, only {available} uL present")]
    InsufficientVolume { requested: f64, available: f64 },

    /// 排液会超出井容量
    #[error("Over capacity: {volume} uL + {requested} uL exceeds capacity {capacity} uL")]
    OverCapacity {
        requested: f64,
        volume: f64,
        capacity: f64,
    },

    /// 吸液会超出吸头容量
    #[error("Tip overflow: {in_tip} uL + {requested} uL exceeds tip capacity {max_volume} uL")]
    TipOverflow {
        requested: f64,
        in_tip: f64,
        max_volume: f64,
    },

    /// 排液量超过吸头内液量
    #[error("Tip underflow: requested {requested} uL, tip holds {in_tip} uL")]
    TipUnderflow { requested: f64, in_tip: f64 },

    /// 液量参数非法（负数、NaN、无穷）
    #[error("Volume must be finite and non-negative, got {volume}")]
    InvalidVolume { volume: f64 },

    /// 操作目标的资源种类不匹配
    #[error("Operation targets a {actual}, expected a {expected}")]
    WrongKind {
        expected: &'static str,
        actual: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::{LayoutError, PreconditionError, ResourceError};

    /// 测试 ResourceError 的 Display 实现
    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound {
            name: "tip_rack_01".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("tip_rack_01") && msg.contains("not found"));

        let err = ResourceError::DuplicateName {
            name: "plate".to_string(),
        };
        assert!(format!("{}", err).contains("Duplicate"));

        let err = ResourceError::RailOccupied {
            rail: 1,
            by: "tip_carrier".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Rail 1") && msg.contains("tip_carrier"));

        let err = ResourceError::RailOutOfRange { rail: 99, max: 30 };
        let msg = format!("{}", err);
        assert!(msg.contains("99") && msg.contains("30"));
    }

    /// 测试 LayoutError 的 Display 实现
    #[test]
    fn test_layout_error_display() {
        let err = LayoutError::MissingKey {
            key: "deck".to_string(),
        };
        assert_eq!(format!("{}", err), "Missing key in layout data: 'deck'");

        let err = LayoutError::UnknownKind {
            kind: "centrifuge".to_string(),
        };
        assert!(format!("{}", err).contains("centrifuge"));
    }

    /// 测试 From<ResourceError> 转换
    #[test]
    fn test_layout_error_from_resource_error() {
        let err: LayoutError = ResourceError::DuplicateName {
            name: "w".to_string(),
        }
        .into();
        match err {
            LayoutError::Resource(ResourceError::DuplicateName { name }) => {
                assert_eq!(name, "w");
            },
            _ => panic!("Expected Resource variant"),
        }
    }

    /// 测试 PreconditionError 的 Display 实现
    #[test]
    fn test_precondition_error_display() {
        let err = PreconditionError::InsufficientVolume {
            requested: 500.0,
            available: 390.0,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("500") && msg.contains("390"));

        let err = PreconditionError::TipMismatch {
            held: "standard_volume".to_string(),
            requested: "low_volume".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("standard_volume") && msg.contains("low_volume"));

        let err = PreconditionError::WrongKind {
            expected: "well",
            actual: "tip_spot",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("well") && msg.contains("tip_spot"));
    }
}
