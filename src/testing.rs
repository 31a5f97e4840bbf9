//! Test doubles shared by the unit tests.
use core::convert::Infallible;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use fugit::HertzU32;

use crate::robot::config::{CHANNEL_CALIBRATION, SERVO_COUNT, SERVO_FREQUENCY_HZ};
use crate::robot::joint::Joint;
use crate::robot::servo::Servo;

/// PWM channel that remembers the last duty written.
#[derive(Debug, Default)]
pub struct MockPwm {
    pub duty: u16,
    pub writes: usize,
}

impl ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        self.writes += 1;
        Ok(())
    }
}

pub type MockServo = Servo<MockPwm>;

/// The robot's three servos with their real calibration.
pub fn robot_servos() -> [Option<MockServo>; SERVO_COUNT] {
    core::array::from_fn(|i| {
        Some(Servo::new(
            MockPwm::default(),
            CHANNEL_CALIBRATION[i],
            HertzU32::from_raw(SERVO_FREQUENCY_HZ),
            Joint::from(i),
        ))
    })
}
