/// Distances in millimeters; `None` when a sensor has no valid reading.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Distances {
    pub left: Option<u16>,
    pub center: Option<u16>,
    pub right: Option<u16>,
}

impl Distances {
    pub const fn new(left: Option<u16>, center: Option<u16>, right: Option<u16>) -> Self {
        Self { left, center, right }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PowerStatus {
    pub usb: bool,
    pub volts: f32,
}

pub trait Sensors {
    fn distances(&mut self) -> Distances;

    fn power(&mut self) -> PowerStatus {
        PowerStatus::default()
    }
}

/// Stand-in for a robot without sensors: the way ahead always looks free.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensors;

impl Sensors for NoSensors {
    fn distances(&mut self) -> Distances {
        Distances::default()
    }
}
