//! 操作校验器
//!
//! 校验分三步：通道表筛查 → 目标解析 → 前置条件脏跑。
//! 脏跑在目标追踪器和机头状态的**克隆**上累积执行，因此同一批次内
//! 两个操作命中同一口井时会按叠加后的状态校验（两笔吸液不能合计透支）。
//! 任一前置条件失败则整批拒绝，真实状态零修改；全部通过才提交。

use std::collections::HashMap;

use avocet_resources::{Deck, Operation, OperationBatch, PreconditionError, Resource, ResourceKind};
use tracing::{debug, warn};

use crate::config::HandlerConfig;
use crate::error::{ChannelFailure, HandlerError};
use crate::head::ChannelTipTracker;

/// 校验并提交一个操作批次
///
/// 成功返回时所有追踪器修改已提交（后端派发由调用方负责）；
/// 失败返回时甲板与机头状态均未被触碰。
pub(crate) fn validate_and_apply(
    deck: &mut Deck,
    head: &mut [ChannelTipTracker],
    config: &HandlerConfig,
    batch: &OperationBatch,
) -> Result<(), HandlerError> {
    // 1. 通道表筛查：越界、批内重复
    let mut used = vec![false; head.len()];
    for entry in batch {
        if entry.channel >= head.len() {
            return Err(HandlerError::ChannelOutOfRange {
                channel: entry.channel,
                num_channels: head.len(),
            });
        }
        if used[entry.channel] {
            return Err(HandlerError::DuplicateChannel {
                channel: entry.channel,
            });
        }
        used[entry.channel] = true;
    }

    // 2. 目标解析：所有资源名必须存在于当前甲板
    for entry in batch {
        let name = entry.op.resource();
        if deck.get_resource(name).is_err() {
            return Err(HandlerError::UnknownResource {
                name: name.to_string(),
            });
        }
    }

    // 3. 脏跑：在克隆状态上累积执行，收集全部失败
    let mut scratch_head: Vec<ChannelTipTracker> = head.to_vec();
    let mut scratch_kinds: HashMap<&str, ResourceKind> = HashMap::new();
    let mut failures: Vec<ChannelFailure> = Vec::new();

    for entry in batch {
        let name = entry.op.resource();
        let kind = match scratch_kinds.entry(name) {
            std::collections::hash_map::Entry::Occupied(o) => o.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                // 第 2 步已确认存在
                let resource: &Resource = deck
                    .get_resource(name)
                    .map_err(|e| HandlerError::Internal(format!("resolved target vanished: {e}")))?;
                v.insert(resource.kind.clone())
            },
        };
        if let Err(reason) = exec_op(kind, &mut scratch_head[entry.channel], &entry.op, config) {
            failures.push(ChannelFailure {
                channel: entry.channel,
                resource: name.to_string(),
                reason,
            });
        }
    }

    // 4. 任一失败 → 整批拒绝，真实状态零修改
    if !failures.is_empty() {
        warn!(
            failures = failures.len(),
            ops = batch.len(),
            "batch rejected by precondition check"
        );
        return Err(HandlerError::Preconditions(failures));
    }

    // 5. 全部通过 → 提交真实状态。脏跑已证明每一步都能成功，
    //    这里再失败只能是内部不变量被破坏。
    for entry in batch {
        let resource = deck
            .get_resource_mut(entry.op.resource())
            .map_err(|e| HandlerError::Internal(format!("commit target vanished: {e}")))?;
        exec_op(&mut resource.kind, &mut head[entry.channel], &entry.op, config).map_err(|e| {
            HandlerError::Internal(format!(
                "commit diverged from dry-run on '{}': {e}",
                entry.op.resource()
            ))
        })?;
    }

    debug!(ops = batch.len(), "batch committed");
    Ok(())
}

/// 在给定目标/通道状态上执行单条操作
///
/// 单条操作内部也是全有或全无：所有前置检查先行，检查通过后的
/// 修改不会失败。脏跑与真实提交共用本函数，保证两阶段行为一致。
fn exec_op(
    kind: &mut ResourceKind,
    channel: &mut ChannelTipTracker,
    op: &Operation,
    config: &HandlerConfig,
) -> Result<(), PreconditionError> {
    match op {
        Operation::Pickup { resource } => match kind {
            ResourceKind::TipSpot(spot) => {
                channel.check_pick()?;
                let tip = spot.pickup()?;
                channel.pick(tip, resource)
            },
            other => Err(PreconditionError::WrongKind {
                expected: "tip_spot",
                actual: other.tag(),
            }),
        },

        Operation::Drop { tip_kind, .. } => match kind {
            ResourceKind::TipSpot(spot) => {
                channel.check_drop(tip_kind, config.allow_nonzero_tip_volume)?;
                spot.check_place()?;
                let tip = channel.drop_tip(tip_kind, config.allow_nonzero_tip_volume)?;
                spot.place(tip)
            },
            other => Err(PreconditionError::WrongKind {
                expected: "tip_spot",
                actual: other.tag(),
            }),
        },

        Operation::Aspirate { volume, .. } => match kind {
            ResourceKind::Well(well) => {
                channel.check_aspirate(*volume)?;
                well.withdraw(*volume)?;
                channel.aspirate(*volume)
            },
            other => Err(PreconditionError::WrongKind {
                expected: "well",
                actual: other.tag(),
            }),
        },

        Operation::Dispense { volume, .. } => match kind {
            ResourceKind::Well(well) => {
                channel.check_dispense(*volume)?;
                well.add(*volume)?;
                channel.dispense(*volume)
            },
            other => Err(PreconditionError::WrongKind {
                expected: "well",
                actual: other.tag(),
            }),
        },
    }
}
