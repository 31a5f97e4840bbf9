use log::info;

/// Where the control loop reports what the robot is doing.
pub trait StatusDisplay {
    /// Shown whenever the robot state changes.
    fn show_state(&mut self, name: &str, extra: &str);

    fn show_message(&mut self, text: &str);

    /// Polled once per control loop iteration; `true` ends the loop.
    fn exit_requested(&mut self) -> bool {
        false
    }
}

/// Writes status lines to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show_state(&mut self, name: &str, extra: &str) {
        info!("[{}] {}", name, extra);
    }

    fn show_message(&mut self, text: &str) {
        info!("{}", text);
    }
}
