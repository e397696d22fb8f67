//! 追踪器的属性测试
//!
//! 使用 proptest 验证状态转移的不变量：失败不产生部分修改，
//! 成功的吸/排互为逆操作。

use avocet_resources::{PreconditionError, Tip, TipSpotTracker, VolumeTracker};
use proptest::prelude::*;

proptest! {
    /// 吸液后立即等量排液，液量还原
    #[test]
    fn withdraw_then_add_restores_volume(
        volume in 0.0..1000.0f64,
        amount_frac in 0.0..1.0f64,
    ) {
        // 容量留出余量，避免浮点舍入把还原排液顶到容量边界
        let capacity = 2000.0;
        let amount = volume * amount_frac;
        let mut well = VolumeTracker::with_volume(volume, capacity);

        well.withdraw(amount).unwrap();
        well.add(amount).unwrap();
        prop_assert!((well.volume() - volume).abs() < 1e-9);
    }

    /// 吸液成功当且仅当 amount <= volume
    #[test]
    fn withdraw_succeeds_iff_within_volume(
        volume in 0.0..1000.0f64,
        amount in 0.0..2000.0f64,
    ) {
        let mut well = VolumeTracker::with_volume(volume, 1000.0);
        let before = well.volume();
        let result = well.withdraw(amount);

        if amount <= volume {
            prop_assert!(result.is_ok());
            prop_assert!((well.volume() - (volume - amount)).abs() < 1e-9);
        } else {
            prop_assert!(
                matches!(
                    result.unwrap_err(),
                    PreconditionError::InsufficientVolume { .. }
                ),
                "expected InsufficientVolume error"
            );
            // 失败无部分扣减
            prop_assert_eq!(well.volume(), before);
        }
    }

    /// 排液成功当且仅当 volume + amount <= capacity
    #[test]
    fn add_succeeds_iff_within_capacity(
        volume in 0.0..1000.0f64,
        amount in 0.0..2000.0f64,
    ) {
        let capacity = 1000.0;
        let mut well = VolumeTracker::with_volume(volume, capacity);
        let before = well.volume();
        let result = well.add(amount);

        if volume + amount <= capacity {
            prop_assert!(result.is_ok());
            prop_assert!((well.volume() - (volume + amount)).abs() < 1e-9);
        } else {
            prop_assert!(
                matches!(
                    result.unwrap_err(),
                    PreconditionError::OverCapacity { .. }
                ),
                "expected OverCapacity error"
            );
            prop_assert_eq!(well.volume(), before);
        }
    }

    /// 负液量和非有限液量总是被拒绝，状态不变
    #[test]
    fn invalid_amounts_always_rejected(volume in 0.0..1000.0f64) {
        let mut well = VolumeTracker::with_volume(volume, 1000.0);
        for bad in [-1.0, -0.001, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            prop_assert!(well.withdraw(bad).is_err());
            prop_assert!(well.add(bad).is_err());
            prop_assert_eq!(well.volume(), volume);
        }
    }

    /// 拾取后放回同一吸头，槽位还原
    #[test]
    fn pickup_then_place_restores_spot(max_volume in 1.0..1000.0f64) {
        let tip = Tip::new("standard_volume", max_volume);
        let mut spot = TipSpotTracker::with_tip(tip.clone());

        let taken = spot.pickup().unwrap();
        prop_assert_eq!(&taken, &tip);
        prop_assert!(!spot.has_tip());

        spot.place(taken).unwrap();
        prop_assert_eq!(spot.tip().unwrap(), &tip);
    }
}
