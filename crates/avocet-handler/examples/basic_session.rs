//! 基本会话演示
//!
//! 用记录型后端跑一遍完整生命周期：加载布局 → setup →
//! 拾取/吸液/排液/放回 → stop，最后打印后端收到的批次日志。
//!
//! 运行：
//! ```bash
//! cargo run -p avocet-handler --example basic_session
//! ```

use avocet_backend::SavingBackend;
use avocet_handler::LiquidHandler;
use avocet_resources::DeckLayout;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let layout = DeckLayout::from_json(
        r#"{
        "deck": {
            "name": "deck",
            "type": "deck",
            "children": [
                {
                    "name": "tip_carrier", "type": "carrier", "rail": 1,
                    "position": {"x": 0.0, "y": 63.0, "z": 100.0},
                    "children": [{
                        "name": "tip_rack_01", "type": "tip_rack",
                        "position": {"x": 4.1, "y": 36.1, "z": 82.6},
                        "tip": {"kind": "standard_volume", "max_volume": 400.0},
                        "children": [{
                            "name": "tip_rack_01_A1", "type": "tip_spot",
                            "position": {"x": 7.2, "y": 68.3, "z": 0.0}
                        }]
                    }]
                },
                {
                    "name": "plate_carrier", "type": "carrier", "rail": 21,
                    "position": {"x": 0.0, "y": 63.0, "z": 100.0},
                    "children": [{
                        "name": "aspiration_plate", "type": "plate",
                        "position": {"x": 4.1, "y": 8.5, "z": 86.2},
                        "children": [{
                            "name": "aspiration_plate_A1", "type": "well",
                            "position": {"x": 14.3, "y": 74.0, "z": 1.0},
                            "capacity": 400.0, "volume": 400.0
                        }]
                    }]
                }
            ]
        }
    }"#,
    )?;

    let backend = SavingBackend::new(8);
    let log = backend.handle();
    let handler = LiquidHandler::new(backend);

    handler.load_layout(&layout)?;
    handler.setup()?;
    println!("status: {}", handler.status_str());

    handler.pick_up_tips(&["tip_rack_01_A1"], &[0])?;
    handler.aspirate(&["aspiration_plate_A1"], &[10.0], &[0])?;
    handler.dispense(&["aspiration_plate_A1"], &[10.0], &[0])?;
    handler.drop_tips(&["tip_rack_01_A1"], &[0])?;

    let info = handler.resource_info("aspiration_plate_A1")?;
    println!(
        "well {} at {:?}/{:?} uL",
        info.name, info.volume, info.capacity
    );

    handler.stop()?;
    println!("status: {}", handler.status_str());

    println!("backend received {} batches:", log.sent_batches().len());
    for batch in log.sent_batches() {
        println!("  {batch}");
    }
    Ok(())
}
