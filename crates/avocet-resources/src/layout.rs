//! 甲板布局的 JSON 线格式
//!
//! 线格式是 `{name, type, position, children[]}` 节点组成的树，
//! 根是 `{"deck": {...}}` 描述符。各资源种类的扩展键：
//!
//! - 甲板直属子节点：`rail`（导轨编号，必需）
//! - 井节点：`capacity`（必需）、`volume`（可选，缺省 0）
//! - 吸头槽位节点：`tip`（可选）——键缺省表示继承吸头架原型吸头（满架），
//!   显式 `null` 表示空槽位
//! - 吸头架节点：`tip`（可选）——本架槽位的原型吸头
//!
//! 缺少必需键的载荷被拒绝，错误信息点名缺失的键。
//! 加载整树替换先前甲板；追踪器按载荷声明的状态重新初始化，
//! 实时修改不跨加载存活。

use crate::Coordinate;
use crate::deck::Deck;
use crate::error::LayoutError;
use crate::resource::{Resource, ResourceKind};
use crate::tracker::{Tip, TipSpotTracker, VolumeTracker};
use serde::{Deserialize, Deserializer, Serialize};

/// 布局线格式节点
///
/// 所有键在反序列化阶段都是可选的，必需性在 [`DeckLayout::build`]
/// 中统一校验，以便产生点名缺失键的结构化错误。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutNode {
    /// 资源名称（全树唯一，必需）
    pub name: Option<String>,

    /// 资源种类标签（必需）
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// 相对父容器的偏移（除根节点外必需）
    pub position: Option<Coordinate>,

    /// 子节点（可选，缺省为空）
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutNode>,

    /// 导轨编号（仅甲板直属子节点，必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rail: Option<usize>,

    /// 井容量（仅井节点，必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,

    /// 井初始液量（仅井节点，可选，缺省 0，不得超过容量）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    /// 吸头规格（吸头架节点：槽位原型；吸头槽位节点：键缺省 = 满，
    /// 显式 null = 空，对象 = 指定吸头）
    #[serde(
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub tip: Option<Option<Tip>>,
}

/// 区分「键缺省」与「键为 null」：键存在时外层恒为 `Some`
fn double_option<'de, D>(de: D) -> Result<Option<Option<Tip>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Tip>::deserialize(de).map(Some)
}

/// 甲板布局描述符（线格式顶层）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckLayout {
    /// 甲板根节点
    pub deck: Option<LayoutNode>,
}

fn missing(key: &str) -> LayoutError {
    LayoutError::MissingKey {
        key: key.to_string(),
    }
}

impl DeckLayout {
    /// 从 JSON 字符串解析（只做语法解析，必需键在 `build` 中校验）
    pub fn from_json(payload: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string(self)?)
    }

    /// 从现有甲板导出布局（包含实时追踪器状态，用于保存/恢复）
    pub fn from_deck(deck: &Deck) -> Self {
        let mut root = LayoutNode {
            name: Some(deck.name().to_string()),
            kind: Some("deck".to_string()),
            position: Some(Coordinate::zero()),
            ..LayoutNode::default()
        };
        for (rail, child) in deck.children_with_rails() {
            let mut node = node_from_resource(child);
            node.rail = Some(rail);
            root.children.push(node);
        }
        DeckLayout { deck: Some(root) }
    }

    /// 构建甲板资源树
    ///
    /// 校验必需键、种类标签、液量约束，并通过 [`Deck::assign_child`]
    /// 强制名称唯一与导轨无冲突。失败时不产生任何甲板。
    pub fn build(&self) -> Result<Deck, LayoutError> {
        let node = self.deck.as_ref().ok_or_else(|| missing("deck"))?;
        let name = node.name.as_deref().ok_or_else(|| missing("name"))?;
        let kind = node.kind.as_deref().ok_or_else(|| missing("type"))?;
        if kind != "deck" {
            return Err(LayoutError::InvalidValue {
                key: "type".to_string(),
                reason: format!("layout root must have type 'deck', got '{kind}'"),
            });
        }

        let mut deck = Deck::new(name);
        for child in &node.children {
            let rail = child.rail.ok_or_else(|| missing("rail"))?;
            let resource = build_resource(child, None)?;
            deck.assign_child(resource, rail)?;
        }
        Ok(deck)
    }
}

fn build_resource(node: &LayoutNode, rack_tip: Option<&Tip>) -> Result<Resource, LayoutError> {
    let name = node.name.as_deref().ok_or_else(|| missing("name"))?;
    let kind_tag = node.kind.as_deref().ok_or_else(|| missing("type"))?;
    let position = node.position.ok_or_else(|| missing("position"))?;

    let kind = match kind_tag {
        "carrier" => ResourceKind::Carrier,
        "tip_rack" => ResourceKind::TipRack,
        "plate" => ResourceKind::Plate,
        "trash" => ResourceKind::Trash,
        "tip_spot" => {
            let tracker = match &node.tip {
                // 键缺省：继承吸头架原型（吸头架整架交付是满的）
                None => TipSpotTracker::with_tip(rack_tip.cloned().unwrap_or_else(Tip::standard)),
                // 显式 null：空槽位
                Some(None) => TipSpotTracker::empty(),
                // 显式对象：指定吸头
                Some(Some(tip)) => TipSpotTracker::with_tip(tip.clone()),
            };
            ResourceKind::TipSpot(tracker)
        },
        "well" => {
            let capacity = node.capacity.ok_or_else(|| missing("capacity"))?;
            if !capacity.is_finite() || capacity < 0.0 {
                return Err(LayoutError::InvalidValue {
                    key: "capacity".to_string(),
                    reason: format!("capacity must be finite and non-negative, got {capacity}"),
                });
            }
            let volume = node.volume.unwrap_or(0.0);
            if !volume.is_finite() || volume < 0.0 || volume > capacity {
                return Err(LayoutError::InvalidValue {
                    key: "volume".to_string(),
                    reason: format!("volume {volume} outside 0..={capacity}"),
                });
            }
            ResourceKind::Well(VolumeTracker::with_volume(volume, capacity))
        },
        "deck" => {
            return Err(LayoutError::InvalidValue {
                key: "type".to_string(),
                reason: "nested 'deck' nodes are not allowed".to_string(),
            });
        },
        other => {
            return Err(LayoutError::UnknownKind {
                kind: other.to_string(),
            });
        },
    };

    let mut resource = Resource::new(name, kind).at(position);

    // 吸头架把自己的原型吸头传给后代槽位
    let inherited: Option<Tip> = if kind_tag == "tip_rack" {
        node.tip.clone().flatten()
    } else {
        rack_tip.cloned()
    };
    for child in &node.children {
        resource
            .children
            .push(build_resource(child, inherited.as_ref())?);
    }
    Ok(resource)
}

fn node_from_resource(resource: &Resource) -> LayoutNode {
    let mut node = LayoutNode {
        name: Some(resource.name.clone()),
        kind: Some(resource.kind.tag().to_string()),
        position: Some(resource.location),
        children: resource.children.iter().map(node_from_resource).collect(),
        ..LayoutNode::default()
    };
    match &resource.kind {
        // 实时状态显式写入：有吸头 -> 对象，无吸头 -> null
        ResourceKind::TipSpot(tracker) => node.tip = Some(tracker.tip().cloned()),
        ResourceKind::Well(tracker) => {
            node.capacity = Some(tracker.capacity());
            node.volume = Some(tracker.volume());
        },
        _ => {},
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_layout_json() -> String {
        json!({
            "deck": {
                "name": "deck",
                "type": "deck",
                "children": [
                    {
                        "name": "tip_carrier",
                        "type": "carrier",
                        "position": {"x": 0.0, "y": 63.0, "z": 100.0},
                        "rail": 1,
                        "children": [
                            {
                                "name": "tip_rack_01",
                                "type": "tip_rack",
                                "position": {"x": 4.0, "y": 36.1, "z": 82.6},
                                "tip": {"kind": "standard_volume", "max_volume": 400.0},
                                "children": [
                                    {
                                        "name": "tip_rack_01_A1",
                                        "type": "tip_spot",
                                        "position": {"x": 7.2, "y": 68.3, "z": 0.0}
                                    },
                                    {
                                        "name": "tip_rack_01_B1",
                                        "type": "tip_spot",
                                        "position": {"x": 7.2, "y": 59.3, "z": 0.0},
                                        "tip": null
                                    }
                                ]
                            }
                        ]
                    },
                    {
                        "name": "plate_carrier",
                        "type": "carrier",
                        "position": {"x": 0.0, "y": 63.0, "z": 100.0},
                        "rail": 21,
                        "children": [
                            {
                                "name": "aspiration_plate",
                                "type": "plate",
                                "position": {"x": 4.0, "y": 8.5, "z": 86.2},
                                "children": [
                                    {
                                        "name": "aspiration_plate_A1",
                                        "type": "well",
                                        "position": {"x": 14.3, "y": 74.0, "z": 1.0},
                                        "capacity": 400.0,
                                        "volume": 400.0
                                    }
                                ]
                            }
                        ]
                    }
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn test_build_sample_layout() {
        let layout = DeckLayout::from_json(&sample_layout_json()).unwrap();
        let deck = layout.build().unwrap();

        // 槽位 A1 继承吸头架原型（满）
        let spot = deck.get_resource("tip_rack_01_A1").unwrap();
        match &spot.kind {
            ResourceKind::TipSpot(t) => {
                assert!(t.has_tip());
                assert_eq!(t.tip().unwrap().kind, "standard_volume");
            },
            _ => panic!("Expected tip spot"),
        }

        // 槽位 B1 显式 null（空）
        let spot = deck.get_resource("tip_rack_01_B1").unwrap();
        match &spot.kind {
            ResourceKind::TipSpot(t) => assert!(!t.has_tip()),
            _ => panic!("Expected tip spot"),
        }

        // 井带初始液量
        let well = deck.get_resource("aspiration_plate_A1").unwrap();
        match &well.kind {
            ResourceKind::Well(v) => {
                assert_eq!(v.volume(), 400.0);
                assert_eq!(v.capacity(), 400.0);
            },
            _ => panic!("Expected well"),
        }
    }

    #[test]
    fn test_missing_deck_key() {
        let layout = DeckLayout::from_json(r#"{"foo": "bar"}"#).unwrap();
        let err = layout.build().unwrap_err();
        assert_eq!(format!("{}", err), "Missing key in layout data: 'deck'");
    }

    #[test]
    fn test_missing_required_keys_named() {
        // name 缺失
        let layout: DeckLayout =
            serde_json::from_value(json!({"deck": {"type": "deck"}})).unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::MissingKey { key } if key == "name"
        ));

        // 子节点 position 缺失
        let layout: DeckLayout = serde_json::from_value(json!({
            "deck": {
                "name": "deck", "type": "deck",
                "children": [{"name": "c", "type": "carrier", "rail": 1}]
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::MissingKey { key } if key == "position"
        ));

        // 甲板直属子节点 rail 缺失
        let layout: DeckLayout = serde_json::from_value(json!({
            "deck": {
                "name": "deck", "type": "deck",
                "children": [{
                    "name": "c", "type": "carrier",
                    "position": {"x": 0.0, "y": 0.0, "z": 0.0}
                }]
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::MissingKey { key } if key == "rail"
        ));

        // 井 capacity 缺失
        let layout: DeckLayout = serde_json::from_value(json!({
            "deck": {
                "name": "deck", "type": "deck",
                "children": [{
                    "name": "w", "type": "well", "rail": 1,
                    "position": {"x": 0.0, "y": 0.0, "z": 0.0}
                }]
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::MissingKey { key } if key == "capacity"
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let layout: DeckLayout = serde_json::from_value(json!({
            "deck": {
                "name": "deck", "type": "deck",
                "children": [{
                    "name": "x", "type": "centrifuge", "rail": 1,
                    "position": {"x": 0.0, "y": 0.0, "z": 0.0}
                }]
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::UnknownKind { kind } if kind == "centrifuge"
        ));
    }

    #[test]
    fn test_volume_over_capacity_rejected() {
        let layout: DeckLayout = serde_json::from_value(json!({
            "deck": {
                "name": "deck", "type": "deck",
                "children": [{
                    "name": "w", "type": "well", "rail": 1,
                    "position": {"x": 0.0, "y": 0.0, "z": 0.0},
                    "capacity": 100.0, "volume": 100.5
                }]
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::InvalidValue { key, .. } if key == "volume"
        ));
    }

    #[test]
    fn test_duplicate_name_rejected_at_build() {
        let layout: DeckLayout = serde_json::from_value(json!({
            "deck": {
                "name": "deck", "type": "deck",
                "children": [
                    {"name": "c", "type": "carrier", "rail": 1,
                     "position": {"x": 0.0, "y": 0.0, "z": 0.0}},
                    {"name": "c", "type": "carrier", "rail": 2,
                     "position": {"x": 0.0, "y": 0.0, "z": 0.0}}
                ]
            }
        }))
        .unwrap();
        assert!(matches!(
            layout.build().unwrap_err(),
            LayoutError::Resource(_)
        ));
    }

    #[test]
    fn test_not_json_payload() {
        let err = DeckLayout::from_json("not json at all").unwrap_err();
        assert!(matches!(err, LayoutError::Json(_)));
    }

    #[test]
    fn test_from_deck_roundtrip_preserves_structure_and_state() {
        let layout = DeckLayout::from_json(&sample_layout_json()).unwrap();
        let deck = layout.build().unwrap();

        let exported = DeckLayout::from_deck(&deck);
        let rebuilt = exported.build().unwrap();

        assert!(deck.same_layout(&rebuilt));
        // 导出包含实时状态，重建后完全相等
        assert_eq!(deck, rebuilt);

        // JSON 往返
        let json = exported.to_json().unwrap();
        let reparsed = DeckLayout::from_json(&json).unwrap();
        assert_eq!(reparsed.build().unwrap(), deck);
    }

    #[test]
    fn test_reload_resets_live_mutations() {
        let layout = DeckLayout::from_json(&sample_layout_json()).unwrap();
        let mut deck = layout.build().unwrap();

        // 实时取走 A1 的吸头
        match &mut deck.get_resource_mut("tip_rack_01_A1").unwrap().kind {
            ResourceKind::TipSpot(t) => {
                t.pickup().unwrap();
            },
            _ => unreachable!(),
        }

        // 重新构建同一载荷：A1 回到满，B1 仍为空
        let fresh = layout.build().unwrap();
        match &fresh.get_resource("tip_rack_01_A1").unwrap().kind {
            ResourceKind::TipSpot(t) => assert!(t.has_tip()),
            _ => unreachable!(),
        }
        match &fresh.get_resource("tip_rack_01_B1").unwrap().kind {
            ResourceKind::TipSpot(t) => assert!(!t.has_tip()),
            _ => unreachable!(),
        }
        assert!(deck.same_layout(&fresh));
    }
}
