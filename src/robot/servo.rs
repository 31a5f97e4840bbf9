use crate::robot::joint::Joint;
use embedded_hal::pwm::SetDutyCycle;
use fugit::Hertz;
use log::error;
use micromath::F32Ext;

/// What the motion core needs from an actuator, whatever drives it.
pub trait Actuator {
    /// Moves to the given pulse width (µs); clamped to the actuator's limits.
    fn set_timing(&mut self, timing_us: u16);

    /// Last pulse width written.
    fn timing(&self) -> u16;

    fn angle_to_timing(&self, angle_deg: f32) -> u16;

    /// Stops driving the output; a later `set_timing` powers it again.
    fn power_off(&mut self);

    /// Powers off for good. Further writes are ignored.
    fn release(&mut self);
}

/// Maps angles onto pulse widths for one servo.
///
/// `range_deg.0` maps onto `range_us.0` and `range_deg.1` onto `range_us.1`, so
/// a servo mounted the other way round is described by swapping either pair.
/// Whatever the mapping yields, the written timing never leaves `limits_us`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub range_us: (u16, u16),
    pub range_deg: (f32, f32),
    pub limits_us: (u16, u16),
}

impl Calibration {
    pub const fn new(range_us: (u16, u16), range_deg: (f32, f32), limits_us: (u16, u16)) -> Self {
        Self {
            range_us,
            range_deg,
            limits_us,
        }
    }

    pub fn angle_to_timing(&self, angle_deg: f32) -> u16 {
        let (deg0, deg1) = self.range_deg;
        let (us0, us1) = (self.range_us.0 as f32, self.range_us.1 as f32);
        let angle = if angle_deg.is_nan() { 0.0 } else { angle_deg };
        let angle = angle.clamp(deg0.min(deg1), deg0.max(deg1));

        let timing = us0 + (angle - deg0) / (deg1 - deg0) * (us1 - us0);
        self.clamp_timing(timing.round().max(0.0) as u16)
    }

    pub fn timing_to_angle(&self, timing_us: u16) -> f32 {
        let (deg0, deg1) = self.range_deg;
        let (us0, us1) = (self.range_us.0 as f32, self.range_us.1 as f32);
        deg0 + (timing_us as f32 - us0) / (us1 - us0) * (deg1 - deg0)
    }

    pub fn clamp_timing(&self, timing_us: u16) -> u16 {
        timing_us.clamp(self.limits_us.0, self.limits_us.1)
    }
}

#[derive(Debug)]
pub struct Servo<PWM> {
    pwm: PWM,
    calibration: Calibration,
    timing_us: u16,
    period_us: u32,
    joint: Joint,
    powered: bool,
    released: bool,
}

impl<PWM> Servo<PWM>
where
    PWM: SetDutyCycle,
{
    pub fn new(pwm: PWM, calibration: Calibration, frequency: Hertz<u32>, joint: Joint) -> Self {
        Self {
            pwm,
            timing_us: calibration.angle_to_timing(0.0),
            calibration,
            period_us: 1_000_000 / frequency.raw().max(1),
            joint,
            powered: false,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn write_duty(&mut self, timing_us: u16) {
        // THE WIDTH OF THE PULSE DRIVES THE ANGLE, NOT FREQ
        let max_duty = self.pwm.max_duty_cycle() as u32;
        let duty = ((timing_us as u32 * max_duty) / self.period_us).min(max_duty) as u16;
        if let Err(e) = self.pwm.set_duty_cycle(duty) {
            error!("{} error writing {}us: {:?}", self.joint, timing_us, e);
        }
    }
}

impl<PWM> Actuator for Servo<PWM>
where
    PWM: SetDutyCycle,
{
    fn set_timing(&mut self, timing_us: u16) {
        if self.released {
            return;
        }
        let timing_us = self.calibration.clamp_timing(timing_us);

        //Avoid setting the same timing again
        if self.powered && self.timing_us == timing_us {
            return;
        }
        self.timing_us = timing_us;
        self.powered = true;
        self.write_duty(timing_us);
    }

    fn timing(&self) -> u16 {
        self.timing_us
    }

    fn angle_to_timing(&self, angle_deg: f32) -> u16 {
        self.calibration.angle_to_timing(angle_deg)
    }

    fn power_off(&mut self) {
        self.powered = false;
        if let Err(e) = self.pwm.set_duty_cycle_fully_off() {
            error!("{} error turning off: {:?}", self.joint, e);
        }
    }

    fn release(&mut self) {
        self.power_off();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPwm;
    use fugit::HertzU32;

    const LEG: Calibration = Calibration::new((1110, 1810), (-40.0, 40.0), (500, 2500));

    fn servo() -> Servo<MockPwm> {
        Servo::new(MockPwm::default(), LEG, HertzU32::from_raw(50), Joint::LeftLeg)
    }

    #[test]
    fn angle_range_maps_onto_timing_range() {
        assert_eq!(LEG.angle_to_timing(-40.0), 1110);
        assert_eq!(LEG.angle_to_timing(0.0), 1460);
        assert_eq!(LEG.angle_to_timing(40.0), 1810);
    }

    #[test]
    fn angles_outside_the_range_are_clamped_first() {
        assert_eq!(LEG.angle_to_timing(-90.0), 1110);
        assert_eq!(LEG.angle_to_timing(75.0), 1810);
    }

    #[test]
    fn inverted_angle_range_mirrors_the_mapping() {
        let inverted = Calibration::new((1110, 1810), (40.0, -40.0), (500, 2500));
        assert_eq!(inverted.angle_to_timing(40.0), 1110);
        assert_eq!(inverted.angle_to_timing(-40.0), 1810);
    }

    #[test]
    fn timing_limits_win_over_the_mapping() {
        let narrow = Calibration::new((1110, 1810), (-40.0, 40.0), (1200, 1700));
        assert_eq!(narrow.angle_to_timing(-40.0), 1200);
        assert_eq!(narrow.angle_to_timing(40.0), 1700);
        assert_eq!(narrow.clamp_timing(2400), 1700);
    }

    #[test]
    fn timing_to_angle_recovers_the_angle_within_one_unit() {
        let per_us = 80.0 / 700.0;
        let mut angle = -40.0;
        while angle <= 40.0 {
            let back = LEG.timing_to_angle(LEG.angle_to_timing(angle));
            assert!((back - angle).abs() <= per_us, "{angle} came back as {back}");
            angle += 0.37;
        }
    }

    #[test]
    fn set_timing_writes_a_proportional_duty() {
        let mut servo = servo();
        servo.set_timing(1500);
        // 1500us of a 20000us period at 16 bit resolution
        assert_eq!(servo.pwm.duty, (1500u32 * 65535 / 20000) as u16);
        assert_eq!(servo.timing(), 1500);
    }

    #[test]
    fn repeated_timing_is_not_rewritten() {
        let mut servo = servo();
        servo.set_timing(1500);
        servo.set_timing(1500);
        assert_eq!(servo.pwm.writes, 1);
    }

    #[test]
    fn released_servo_ignores_writes() {
        let mut servo = servo();
        servo.set_timing(1500);
        servo.release();
        assert!(servo.is_released());
        assert_eq!(servo.pwm.duty, 0);
        servo.set_timing(1600);
        assert_eq!(servo.pwm.duty, 0);
        assert_eq!(servo.timing(), 1500);
    }

    #[test]
    fn power_off_then_same_timing_drives_again() {
        let mut servo = servo();
        servo.set_timing(1500);
        servo.power_off();
        assert_eq!(servo.pwm.duty, 0);
        servo.set_timing(1500);
        assert_ne!(servo.pwm.duty, 0);
    }
}
