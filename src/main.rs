#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use core::future::pending;
use embassy_executor::Spawner;
use embassy_time::Instant;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{AnyPin, Pin};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use robotling_motion::behavior::control_loop;
use robotling_motion::motion::gait::GaitTable;
use robotling_motion::motion::{CooperativeTicker, DedicatedTicker, MotionCoordinator, TickScheduler};
use robotling_motion::robot::config::{
    RobotConfig, SchedulingMode, CHANNEL_SIDES, GAIT_SEQUENCE, SCHEDULING, SERVO_COUNT,
};
use robotling_motion::robot::display::LogDisplay;
use robotling_motion::robot::sensors::NoSensors;
use robotling_motion::tasks::motion_task::motion_task;
use robotling_motion::tasks::servos::create_servos;
use robotling_motion::tasks::FirmwareCoordinator;

esp_bootloader_esp_idf::esp_app_desc!();

//SERVOS: [left leg, right leg, tilt]
//GPIO: [32, 33, 25]

macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.init_with(|| $val)
    }};
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let p = esp_hal::init(config);

    let timer0 = TimerGroup::new(p.TIMG1);
    esp_hal_embassy::init(timer0.timer0);
    info!("Embassy initialized");

    let mut rng = Rng::new(p.RNG);
    let servo_pins: [AnyPin<'static>; SERVO_COUNT] =
        [p.GPIO32.degrade(), p.GPIO33.degrade(), p.GPIO25.degrade()];
    let servos = create_servos(servo_pins, p.LEDC);

    let table = GaitTable::new(&GAIT_SEQUENCE, &CHANNEL_SIDES).expect("Invalid gait table");
    let coordinator: &'static FirmwareCoordinator = mk_static!(
        FirmwareCoordinator,
        MotionCoordinator::new(servos, table, RobotConfig::new())
    );
    coordinator.start();

    info!("Starting robotling ({:?} ticks)...", SCHEDULING);
    let mut coin = move || rng.random() & 1 == 1;
    match SCHEDULING {
        SchedulingMode::Dedicated => {
            spawner
                .spawn(motion_task(coordinator))
                .expect("Fail spawning motion task");
            drive(coordinator, &mut DedicatedTicker, &mut coin).await;
        }
        SchedulingMode::Cooperative => {
            let mut ticker = CooperativeTicker::new(coordinator, Instant::now());
            drive(coordinator, &mut ticker, &mut coin).await;
        }
    }

    loop {
        pending::<()>().await;
    }
}

async fn drive<S: TickScheduler>(
    coordinator: &'static FirmwareCoordinator,
    scheduler: &mut S,
    coin: &mut impl FnMut() -> bool,
) {
    if let Err(e) = control_loop(coordinator, scheduler, &mut NoSensors, &mut LogDisplay, coin).await {
        error!("Control loop: {}", e);
    }
    coordinator
        .shutdown(scheduler)
        .await
        .expect("Robot did not power down");
    info!("Done.");
}
