//! 处理器前端
//!
//! `LiquidHandler` 是一个会话的所有者对象：拥有一个甲板、一张机头
//! 通道表和一个后端适配器，启动时整体移交给传输层，没有全局可变
//! 状态。所有会话修改（load/setup/stop/批次提交）经由同一把单写者
//! 锁串行化；纯状态查询走原子变量和 ArcSwap 快照，不取锁。

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use avocet_backend::LiquidHandlerBackend;
use avocet_resources::{
    ChannelOp, Deck, DeckLayout, Operation, OperationBatch, ResourceKind, Tip,
};

use crate::config::{HandlerConfig, StopPolicy};
use crate::error::{ChannelFailure, HandlerError};
use crate::head::ChannelTipTracker;
use crate::session::{AtomicSessionState, SessionState};
use crate::validator;

/// 锁内可变状态
struct HandlerInner<B> {
    /// 当前甲板（Idle 状态下为 None）
    deck: Option<Deck>,
    /// 机头通道表（下标即通道 id）
    head: Vec<ChannelTipTracker>,
    /// 后端适配器
    backend: B,
}

/// 资源状态快照（状态查询接口用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInfo {
    /// 资源名称
    pub name: String,
    /// 种类标签
    pub kind: &'static str,
    /// 吸头槽位：是否持有吸头
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_tip: Option<bool>,
    /// 井：当前液量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// 井：容量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    /// 直接子资源数量
    pub children: usize,
}

/// 液体处理会话前端
///
/// # 并发模型
///
/// - 修改路径（`load_layout` / `setup` / `stop` / 批次提交）互斥：
///   校验器的「检查-提交」序列在交错下不安全（校验途中布局被重载
///   会对着已不存在的树校验），因此一次只允许一个修改在途
/// - 查询路径（`status_str` / `layout_snapshot`）无锁：状态读原子
///   变量，布局读 ArcSwap 快照，快照在每次成功修改后原子发布
///
/// 一旦批次通过提交点（追踪器已修改、开始派发后端），不支持取消；
/// 需要放弃的调用方必须在提交前放弃。
pub struct LiquidHandler<B: LiquidHandlerBackend> {
    inner: Mutex<HandlerInner<B>>,
    /// 会话状态（写入只发生在锁内，原子变量供无锁查询）
    state: AtomicSessionState,
    /// 当前甲板布局快照（含实时状态，成功修改后发布）
    layout_snapshot: ArcSwapOption<DeckLayout>,
    config: HandlerConfig,
    num_channels: usize,
}

impl<B: LiquidHandlerBackend> LiquidHandler<B> {
    /// 用默认配置创建会话
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, HandlerConfig::default())
    }

    /// 用指定配置创建会话
    pub fn with_config(backend: B, config: HandlerConfig) -> Self {
        let num_channels = backend.num_channels();
        Self {
            inner: Mutex::new(HandlerInner {
                deck: None,
                head: vec![ChannelTipTracker::default(); num_channels],
                backend,
            }),
            state: AtomicSessionState::default(),
            layout_snapshot: ArcSwapOption::const_empty(),
            config,
            num_channels,
        }
    }

    /// 机头通道数量
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// 当前会话状态（无锁）
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// 状态查询接口的对外表示："running" 或 "stopped"（无锁）
    pub fn status_str(&self) -> &'static str {
        self.state.get().status_str()
    }

    /// 当前布局快照（无锁；含实时追踪器状态，Idle 时为 None）
    pub fn layout_snapshot(&self) -> Option<Arc<DeckLayout>> {
        self.layout_snapshot.load_full()
    }

    // ============================================================
    // 布局加载
    // ============================================================

    /// 加载甲板布局（整树替换）
    ///
    /// 先前的全部追踪器状态被丢弃，新追踪器按载荷声明初始化。
    /// 失败时先前的甲板保持不变。机头状态不受影响：重载甲板不会
    /// 改变物理机头上已拾取的吸头。
    ///
    /// # 错误
    /// - `SessionRunning`: 会话运行中（除非配置放开）
    /// - `Layout`: 载荷缺键、重名、槽位冲突等
    pub fn load_layout(&self, layout: &DeckLayout) -> Result<(), HandlerError> {
        let mut inner = self.inner.lock();
        if self.state.get().is_running() && !self.config.allow_load_while_running {
            return Err(HandlerError::SessionRunning);
        }

        let deck = layout.build()?;
        info!(deck = deck.name(), resources = deck.resource_names().len(), "deck layout loaded");
        self.layout_snapshot
            .store(Some(Arc::new(DeckLayout::from_deck(&deck))));
        inner.deck = Some(deck);
        Ok(())
    }

    /// 从 JSON 字符串加载布局
    pub fn load_layout_json(&self, payload: &str) -> Result<(), HandlerError> {
        let layout = DeckLayout::from_json(payload)?;
        self.load_layout(&layout)
    }

    /// 从文件加载布局
    pub fn load_layout_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), HandlerError> {
        let payload = std::fs::read_to_string(path)?;
        self.load_layout_json(&payload)
    }

    /// 当前甲板与给定布局是否结构等价（忽略实时追踪器状态）
    ///
    /// 用于核对一次加载是否如请求生效。未加载甲板或布局非法时返回 false。
    pub fn deck_matches(&self, layout: &DeckLayout) -> bool {
        let inner = self.inner.lock();
        let Some(deck) = inner.deck.as_ref() else {
            return false;
        };
        match layout.build() {
            Ok(other) => deck.same_layout(&other),
            Err(_) => false,
        }
    }

    /// 资源状态快照
    pub fn resource_info(&self, name: &str) -> Result<ResourceInfo, HandlerError> {
        let inner = self.inner.lock();
        let deck = inner.deck.as_ref().ok_or(HandlerError::NoDeckLoaded)?;
        let resource = deck.get_resource(name)?;

        let mut info = ResourceInfo {
            name: resource.name.clone(),
            kind: resource.kind.tag(),
            has_tip: None,
            volume: None,
            capacity: None,
            children: resource.children.len(),
        };
        match &resource.kind {
            ResourceKind::TipSpot(spot) => info.has_tip = Some(spot.has_tip()),
            ResourceKind::Well(well) => {
                info.volume = Some(well.volume());
                info.capacity = Some(well.capacity());
            },
            _ => {},
        }
        Ok(info)
    }

    /// 把当前甲板序列化为布局 JSON 值（含实时状态）
    pub fn serialize(&self) -> Result<serde_json::Value, HandlerError> {
        let inner = self.inner.lock();
        let deck = inner.deck.as_ref().ok_or(HandlerError::NoDeckLoaded)?;
        serde_json::to_value(DeckLayout::from_deck(deck))
            .map_err(|e| HandlerError::Internal(format!("deck serialization failed: {e}")))
    }

    /// 把当前甲板保存到文件
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), HandlerError> {
        let value = self.serialize()?;
        let pretty = serde_json::to_string_pretty(&value)
            .map_err(|e| HandlerError::Internal(format!("deck serialization failed: {e}")))?;
        std::fs::write(path, pretty)?;
        Ok(())
    }

    // ============================================================
    // 会话生命周期
    // ============================================================

    /// 启动会话（Idle/Stopped → Running）
    ///
    /// 先做后端初始化，成功后才翻转状态；机头通道表重置为空。
    ///
    /// # 错误
    /// - `NoDeckLoaded`: 从未加载布局
    /// - `AlreadyRunning`: 重复 setup
    /// - `Backend`: 后端初始化失败（状态保持不变）
    pub fn setup(&self) -> Result<(), HandlerError> {
        let mut inner = self.inner.lock();
        if self.state.get().is_running() {
            return Err(HandlerError::AlreadyRunning);
        }
        if inner.deck.is_none() {
            return Err(HandlerError::NoDeckLoaded);
        }

        inner.backend.setup()?;
        for tracker in &mut inner.head {
            *tracker = ChannelTipTracker::default();
        }
        self.state.set(SessionState::Running);
        info!("session setup complete, now running");
        Ok(())
    }

    /// 停止会话（Running → Stopped）
    ///
    /// Stopped 非终态：之后可以再次 `setup`。对已停止/空闲会话的
    /// 调用按 `stop_when_stopped` 策略处理（默认幂等空操作）。
    pub fn stop(&self) -> Result<(), HandlerError> {
        let mut inner = self.inner.lock();
        if !self.state.get().is_running() {
            return match self.config.stop_when_stopped {
                StopPolicy::NoOp => {
                    debug!("stop on a non-running session, treated as no-op");
                    Ok(())
                },
                StopPolicy::Error => Err(HandlerError::AlreadyStopped),
            };
        }

        inner.backend.stop()?;
        self.state.set(SessionState::Stopped);
        info!("session stopped");
        Ok(())
    }

    // ============================================================
    // 操作批次
    // ============================================================

    /// 提交操作批次（ops 与 use_channels 一一对应）
    ///
    /// # 错误
    /// - `ChannelCountMismatch`: 两表长度不一致（请求级错误）
    /// - `NotRunning`: 会话未运行
    /// - 其余见 [`HandlerError`]
    pub fn submit(&self, ops: Vec<Operation>, use_channels: &[usize]) -> Result<(), HandlerError> {
        if ops.len() != use_channels.len() {
            return Err(HandlerError::ChannelCountMismatch {
                ops: ops.len(),
                channels: use_channels.len(),
            });
        }
        let batch: OperationBatch = use_channels
            .iter()
            .zip(ops)
            .map(|(&channel, op)| ChannelOp { channel, op })
            .collect();

        let mut inner = self.inner.lock();
        self.submit_locked(&mut inner, batch)
    }

    /// 从吸头槽位拾取吸头
    pub fn pick_up_tips(
        &self,
        tip_spots: &[&str],
        use_channels: &[usize],
    ) -> Result<(), HandlerError> {
        let ops = tip_spots
            .iter()
            .map(|spot| Operation::Pickup {
                resource: (*spot).to_string(),
            })
            .collect();
        self.submit(ops, use_channels)
    }

    /// 把通道持有的吸头放回槽位
    ///
    /// 放回的吸头类型取自各通道当前持有的吸头。
    pub fn drop_tips(&self, tip_spots: &[&str], use_channels: &[usize]) -> Result<(), HandlerError> {
        if tip_spots.len() != use_channels.len() {
            return Err(HandlerError::ChannelCountMismatch {
                ops: tip_spots.len(),
                channels: use_channels.len(),
            });
        }

        let mut inner = self.inner.lock();
        let mut batch = OperationBatch::new();
        for (&spot, &channel) in tip_spots.iter().zip(use_channels) {
            let tracker =
                inner
                    .head
                    .get(channel)
                    .ok_or(HandlerError::ChannelOutOfRange {
                        channel,
                        num_channels: self.num_channels,
                    })?;
            let Some(tip) = tracker.tip() else {
                return Err(HandlerError::Preconditions(vec![ChannelFailure {
                    channel,
                    resource: spot.to_string(),
                    reason: avocet_resources::PreconditionError::ChannelHasNoTip,
                }]));
            };
            batch.push(ChannelOp {
                channel,
                op: Operation::Drop {
                    resource: spot.to_string(),
                    tip_kind: tip.kind.clone(),
                },
            });
        }
        self.submit_locked(&mut inner, batch)
    }

    /// 从井中吸液
    pub fn aspirate(
        &self,
        wells: &[&str],
        volumes: &[f64],
        use_channels: &[usize],
    ) -> Result<(), HandlerError> {
        if wells.len() != volumes.len() {
            return Err(HandlerError::ChannelCountMismatch {
                ops: wells.len(),
                channels: volumes.len(),
            });
        }
        let ops = wells
            .iter()
            .zip(volumes)
            .map(|(well, &volume)| Operation::Aspirate {
                resource: (*well).to_string(),
                volume,
            })
            .collect();
        self.submit(ops, use_channels)
    }

    /// 向井中排液
    pub fn dispense(
        &self,
        wells: &[&str],
        volumes: &[f64],
        use_channels: &[usize],
    ) -> Result<(), HandlerError> {
        if wells.len() != volumes.len() {
            return Err(HandlerError::ChannelCountMismatch {
                ops: wells.len(),
                channels: volumes.len(),
            });
        }
        let ops = wells
            .iter()
            .zip(volumes)
            .map(|(well, &volume)| Operation::Dispense {
                resource: (*well).to_string(),
                volume,
            })
            .collect();
        self.submit(ops, use_channels)
    }

    /// 把机头上所有吸头放回各自的拾取来源槽位
    ///
    /// # 错误
    /// - `NoTipsHeld`: 没有任何通道持有带来源记录的吸头
    pub fn return_tips(&self) -> Result<(), HandlerError> {
        let mut inner = self.inner.lock();

        let mut batch = OperationBatch::new();
        for (channel, tracker) in inner.head.iter().enumerate() {
            if let (Some(tip), Some(origin)) = (tracker.tip(), tracker.origin()) {
                batch.push(ChannelOp {
                    channel,
                    op: Operation::Drop {
                        resource: origin.to_string(),
                        tip_kind: tip.kind.clone(),
                    },
                });
            }
        }
        if batch.is_empty() {
            return Err(HandlerError::NoTipsHeld);
        }
        self.submit_locked(&mut inner, batch)
    }

    // ============================================================
    // 机头状态
    // ============================================================

    /// 手动覆盖机头状态
    ///
    /// `state` 中的每个 `(通道, 吸头)` 覆盖对应通道；未提及的通道
    /// 保持原状。映射为 `None` 的通道清空。所有通道 id 先整体校验，
    /// 任一越界则整体不生效。
    pub fn update_head_state(&self, state: &[(usize, Option<Tip>)]) -> Result<(), HandlerError> {
        let mut inner = self.inner.lock();
        for &(channel, _) in state {
            if channel >= inner.head.len() {
                return Err(HandlerError::ChannelOutOfRange {
                    channel,
                    num_channels: self.num_channels,
                });
            }
        }
        for (channel, tip) in state {
            inner.head[*channel].set_tip(tip.clone());
        }
        Ok(())
    }

    /// 清空整张机头通道表
    pub fn clear_head_state(&self) {
        let mut inner = self.inner.lock();
        for tracker in &mut inner.head {
            tracker.set_tip(None);
        }
    }

    /// 查询某通道持有的吸头
    pub fn channel_tip(&self, channel: usize) -> Result<Option<Tip>, HandlerError> {
        let inner = self.inner.lock();
        inner
            .head
            .get(channel)
            .map(|tracker| tracker.tip().cloned())
            .ok_or(HandlerError::ChannelOutOfRange {
                channel,
                num_channels: self.num_channels,
            })
    }

    /// 机头通道表快照
    pub fn head_state(&self) -> Vec<ChannelTipTracker> {
        self.inner.lock().head.clone()
    }

    // ============================================================
    // 内部
    // ============================================================

    /// 锁内提交：校验 → 提交追踪器 → 发布快照 → 派发后端
    ///
    /// 追踪器提交后后端才执行；后端失败**不回滚**追踪器（物理动作
    /// 可能已部分发生），以 `Backend` 错误类别上抛，让调用方区分
    /// 「从未尝试」与「已尝试、结果不确定」。
    fn submit_locked(
        &self,
        inner: &mut HandlerInner<B>,
        batch: OperationBatch,
    ) -> Result<(), HandlerError> {
        if !self.state.get().is_running() {
            return Err(HandlerError::NotRunning);
        }
        let deck = inner
            .deck
            .as_mut()
            .ok_or_else(|| HandlerError::Internal("session running without a deck".to_string()))?;

        validator::validate_and_apply(deck, &mut inner.head, &self.config, &batch)?;

        // 提交点已过：先发布快照，后端结果不再影响建模状态
        self.layout_snapshot
            .store(Some(Arc::new(DeckLayout::from_deck(deck))));
        inner.backend.execute(&batch)?;
        debug!(ops = batch.len(), "batch dispatched to backend");
        Ok(())
    }
}
