//! 甲板根容器
//!
//! 甲板是资源树的根，子资源分配在编号导轨上。
//! 导轨几何固定：槽位 1..=30，轨距 22.5mm。

use crate::error::ResourceError;
use crate::resource::{Resource, ResourceKind};

/// 甲板导轨数量
pub const NUM_RAILS: usize = 30;

/// 相邻导轨的 X 间距（毫米）
pub const RAIL_PITCH_MM: f64 = 22.5;

/// 甲板
///
/// 拥有一棵资源树并维护导轨分配表。名称唯一性在分配时强制，
/// 因此 [`Deck::get_resource`] 的按名解析是无歧义的。
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    root: Resource,
    /// rails[i] 是 root.children[i] 所在的导轨编号
    rails: Vec<usize>,
}

impl Deck {
    /// 创建空甲板
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            root: Resource::new(name, ResourceKind::Deck),
            rails: Vec::new(),
        }
    }

    /// 甲板名称
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// 根资源（只读遍历用）
    pub fn root(&self) -> &Resource {
        &self.root
    }

    /// 顶层子资源及其导轨编号
    pub fn children_with_rails(&self) -> impl Iterator<Item = (usize, &Resource)> {
        self.rails.iter().copied().zip(self.root.children.iter())
    }

    /// 在指定导轨上分配子资源
    ///
    /// 子资源的 X 偏移由导轨编号推导（`(rail - 1) * RAIL_PITCH_MM`）。
    ///
    /// # 错误
    /// - `RailOutOfRange`: 导轨编号不在 1..=NUM_RAILS
    /// - `RailOccupied`: 导轨已被其他资源占用
    /// - `DuplicateName`: 新子树引入了与现有树重复的名称
    pub fn assign_child(&mut self, mut resource: Resource, rail: usize) -> Result<(), ResourceError> {
        if rail == 0 || rail > NUM_RAILS {
            return Err(ResourceError::RailOutOfRange {
                rail,
                max: NUM_RAILS,
            });
        }
        if let Some(idx) = self.rails.iter().position(|&r| r == rail) {
            return Err(ResourceError::RailOccupied {
                rail,
                by: self.root.children[idx].name.clone(),
            });
        }

        // 名称全树唯一：新子树内部不重名，也不与现有树冲突
        let mut incoming = Vec::new();
        resource.collect_names(&mut incoming);
        for (i, name) in incoming.iter().enumerate() {
            if incoming[..i].contains(name) || self.root.find(name).is_some() {
                return Err(ResourceError::DuplicateName {
                    name: (*name).to_string(),
                });
            }
        }

        // X 由导轨编号推导，Y/Z 保留节点自带的偏移
        resource.location.x = (rail as f64 - 1.0) * RAIL_PITCH_MM;
        self.rails.push(rail);
        self.root.children.push(resource);
        Ok(())
    }

    /// 按名称解析资源（区分大小写）
    pub fn get_resource(&self, name: &str) -> Result<&Resource, ResourceError> {
        self.root.find(name).ok_or_else(|| ResourceError::NotFound {
            name: name.to_string(),
        })
    }

    /// 按名称解析资源（可变引用，校验器提交阶段使用）
    pub fn get_resource_mut(&mut self, name: &str) -> Result<&mut Resource, ResourceError> {
        self.root
            .find_mut(name)
            .ok_or_else(|| ResourceError::NotFound {
                name: name.to_string(),
            })
    }

    /// 结构等价：树形、资源身份、导轨分配一致，忽略实时追踪器状态
    pub fn same_layout(&self, other: &Deck) -> bool {
        self.rails == other.rails && self.root.same_layout(&other.root)
    }

    /// 全树资源名称（深度优先）
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.root.collect_names(&mut names);
        names
    }
}
