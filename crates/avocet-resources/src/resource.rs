//! 空间资源树
//!
//! 资源类型是封闭的标签变体集合，叶子变体内嵌各自的状态追踪器。
//! 新增资源种类通过扩展 [`ResourceKind`] 实现，所有变体共享统一的
//! 名称/偏移/子节点接口。

use crate::Coordinate;
use crate::tracker::{TipSpotTracker, VolumeTracker};

/// 资源种类（封闭变体集合）
///
/// 叶子变体（`TipSpot`、`Well`）携带自己的状态追踪器，
/// 追踪器随资源一起创建、一起销毁。
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    /// 甲板根容器
    Deck,
    /// 载架（在固定槽位上承载吸头架/板）
    Carrier,
    /// 吸头架
    TipRack,
    /// 孔板
    Plate,
    /// 吸头槽位（至多持有一个吸头）
    TipSpot(TipSpotTracker),
    /// 井（有界容量的液体容器）
    Well(VolumeTracker),
    /// 废弃区
    Trash,
}

impl ResourceKind {
    /// 种类标签（与布局线格式的 `type` 键一致）
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceKind::Deck => "deck",
            ResourceKind::Carrier => "carrier",
            ResourceKind::TipRack => "tip_rack",
            ResourceKind::Plate => "plate",
            ResourceKind::TipSpot(_) => "tip_spot",
            ResourceKind::Well(_) => "well",
            ResourceKind::Trash => "trash",
        }
    }

    /// 结构等价：比较种类标签和静态属性（井容量），忽略实时追踪器状态
    pub fn same_structure(&self, other: &ResourceKind) -> bool {
        match (self, other) {
            (ResourceKind::Well(a), ResourceKind::Well(b)) => a.capacity() == b.capacity(),
            _ => self.tag() == other.tag(),
        }
    }
}

/// 资源树节点
///
/// 名称全树唯一（加载时强制），`location` 是相对父容器的偏移，
/// 子节点按分配顺序排列。
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// 唯一名称（甲板范围内，区分大小写）
    pub name: String,
    /// 资源种类（含叶子追踪器）
    pub kind: ResourceKind,
    /// 相对父容器的偏移
    pub location: Coordinate,
    /// 子资源（有序）
    pub children: Vec<Resource>,
}

impl Resource {
    /// 创建无子节点的资源
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            location: Coordinate::zero(),
            children: Vec::new(),
        }
    }

    /// 设置偏移（构建时链式调用）
    pub fn at(mut self, location: Coordinate) -> Self {
        self.location = location;
        self
    }

    /// 追加子资源（构建时链式调用；名称唯一性由甲板分配时统一校验）
    pub fn with_child(mut self, child: Resource) -> Self {
        self.children.push(child);
        self
    }

    /// 按名称深度优先查找（含自身）
    pub fn find(&self, name: &str) -> Option<&Resource> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// 按名称深度优先查找（可变引用）
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Resource> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    /// 收集子树内全部名称（深度优先，含自身）
    pub fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.name);
        for child in &self.children {
            child.collect_names(out);
        }
    }

    /// 子树结构等价：名称、种类标签、偏移、子节点递归一致，
    /// 忽略实时追踪器状态（吸头在/不在、当前液量）
    pub fn same_layout(&self, other: &Resource) -> bool {
        self.name == other.name
            && self.kind.same_structure(&other.kind)
            && self.location == other.location
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.same_layout(b))
    }
}
