use esp_hal::gpio::AnyPin;
use esp_hal::ledc::channel::{self, ChannelIFace, Number};
use esp_hal::ledc::timer::{self, LSClockSource, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::LEDC;
use esp_hal::time::Rate;
use fugit::HertzU32;
use log::{error, info};
use static_cell::StaticCell;

use crate::robot::config::{CHANNEL_CALIBRATION, SERVO_COUNT, SERVO_FREQUENCY_HZ};
use crate::robot::joint::Joint;
use crate::robot::servo::Servo;
use crate::tasks::FirmwareServo;

static SERVO_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

/// Configures one low speed LEDC timer at the servo frequency and a channel
/// per servo on it.
///
/// A channel that fails to configure is left empty; the motion core skips it.
pub fn create_servos(servo_pins: [AnyPin<'static>; SERVO_COUNT], ledc: LEDC<'static>) -> [Option<FirmwareServo>; SERVO_COUNT] {
    let mut ledc = Ledc::new(ledc);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let timer = SERVO_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer0));
    timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: LSClockSource::APBClk,
            frequency: Rate::from_hz(SERVO_FREQUENCY_HZ),
        })
        .expect("Fail creating ledc timer");
    let timer: &'static timer::Timer<'static, LowSpeed> = timer;

    let numbers = [Number::Channel0, Number::Channel1, Number::Channel2];
    let mut servos: [Option<FirmwareServo>; SERVO_COUNT] = core::array::from_fn(|_| None);

    for (index, (pin, number)) in servo_pins.into_iter().zip(numbers).enumerate() {
        let joint = Joint::from(index);
        let mut channel = ledc.channel(number, pin);
        let configured = channel.configure(channel::config::Config {
            timer,
            duty_pct: 0,
            pin_config: channel::config::PinConfig::PushPull,
        });
        match configured {
            Ok(()) => {
                servos[index] = Some(Servo::new(
                    channel,
                    CHANNEL_CALIBRATION[index],
                    HertzU32::from_raw(SERVO_FREQUENCY_HZ),
                    joint,
                ));
            }
            Err(e) => error!("{} channel not configured: {:?}", joint, e),
        }
    }
    info!("{} servos ready", servos.iter().flatten().count());
    servos
}
