use log::info;

use crate::tasks::FirmwareCoordinator;

/// Ticks the coordinator at its configured period until the robot is off.
#[embassy_executor::task]
pub async fn motion_task(coordinator: &'static FirmwareCoordinator) {
    info!("[MOTION_TASK] starting, {}ms per tick", coordinator.config().tick_period_ms);
    coordinator.run().await;
    info!("[MOTION_TASK] robot is off");
}
