//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Rotary focus stage controller (Arduino-based) connected via a serial port.
//!
//! The controller accepts single-letter ASCII commands without any terminator and does not reply:
//!
//! * `A` - arm (enable the motor driver),
//! * `U<degrees>` - rotate "up" by the specified angle,
//! * `D<degrees>` - rotate "down" by the specified angle,
//! * `R` - release (disable the motor driver).
//!

use std::io::Write;

pub const BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Maximum angle accepted by the controller in a single rotation command.
pub const MAX_ANGLE: u32 = 360;

#[derive(Debug)]
pub enum StageError {
    NotConnected,
    SerialPort(serialport::Error),
    Io(std::io::Error)
}

impl From<serialport::Error> for StageError {
    fn from(e: serialport::Error) -> StageError {
        StageError::SerialPort(e)
    }
}

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> StageError {
        StageError::Io(e)
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageError::NotConnected => write!(f, "device not connected"),
            StageError::SerialPort(e) => write!(f, "serial port error: {}", e),
            StageError::Io(e) => write!(f, "I/O error: {}", e)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StageCommand {
    Arm,
    /// Rotation by the given number of degrees.
    Up(u32),
    /// Rotation in the opposite direction by the given number of degrees.
    Down(u32),
    Release
}

impl StageCommand {
    pub fn wire_string(&self) -> String {
        match self {
            StageCommand::Arm => "A".to_string(),
            StageCommand::Up(angle) => format!("U{}", angle),
            StageCommand::Down(angle) => format!("D{}", angle),
            StageCommand::Release => "R".to_string()
        }
    }
}

impl std::fmt::Display for StageCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_string())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction { Up, Down }

/// Fire-and-forget command channel to the stage controller.
///
/// Holds at most one open transport; sending without a transport is a logged no-op.
pub struct CommandChannel {
    transport: Option<Box<dyn Write>>,
    connection_str: Option<String>
}

impl CommandChannel {
    pub fn new() -> CommandChannel {
        CommandChannel{ transport: None, connection_str: None }
    }

    /// Uses an already opened transport (e.g., an in-memory buffer in tests).
    pub fn with_transport(transport: Box<dyn Write>, connection_str: &str) -> CommandChannel {
        CommandChannel{ transport: Some(transport), connection_str: Some(connection_str.to_string()) }
    }

    /// Opens `device` (8N1, no flow control); replaces the previous connection, if any.
    pub fn connect(&mut self, device: &str, baud_rate: u32) -> Result<(), StageError> {
        self.disconnect();

        let port = serialport::new(device, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(std::time::Duration::from_millis(100))
            .open()?;

        self.transport = Some(Box::new(port));
        self.connection_str = Some(format!("{} @ {} baud", device, baud_rate));
        log::info!("connected to stage controller on {}", self.info());

        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            log::info!("disconnected from stage controller on {}", self.info());
        }
        self.connection_str = None;
    }

    pub fn is_connected(&self) -> bool { self.transport.is_some() }

    pub fn info(&self) -> String {
        self.connection_str.clone().unwrap_or_else(|| "(not connected)".to_string())
    }

    /// Writes `command` to the controller; no reply is awaited.
    ///
    /// Errors are logged here; callers only need to record them.
    pub fn send(&mut self, command: StageCommand) -> Result<(), StageError> {
        let result = match &mut self.transport {
            None => Err(StageError::NotConnected),
            Some(transport) => transport.write_all(command.wire_string().as_bytes())
                .and_then(|_| transport.flush())
                .map_err(StageError::from)
        };

        match &result {
            Ok(()) => log::debug!("sent stage command {}", command),
            Err(StageError::NotConnected) => log::warn!("cannot send \"{}\": stage controller not connected", command),
            Err(e) => log::error!("failed to send \"{}\" to stage controller: {}", command, e)
        }

        result
    }

    /// Performs a complete manual move: arm, rotate, release.
    pub fn move_by(&mut self, direction: Direction, angle: u32) -> Result<(), StageError> {
        let angle = angle.min(MAX_ANGLE);
        self.send(StageCommand::Arm)?;
        let rotation = self.send(match direction {
            Direction::Up => StageCommand::Up(angle),
            Direction::Down => StageCommand::Down(angle)
        });
        // the motor must not stay armed
        let release = self.send(StageCommand::Release);

        rotation.and(release)
    }
}

/// Returns names of available serial devices, sorted.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => {
            let mut names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
            names.sort();
            names
        },
        Err(e) => {
            log::warn!("failed to enumerate serial ports: {}", e);
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    /// Transport recording everything written to it.
    #[derive(Clone, Default)]
    pub struct SharedBuffer(pub Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    struct FailingTransport;

    impl Write for FailingTransport {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    /// Records writes, but rejects rotation commands.
    #[derive(Clone, Default)]
    struct RotationRejectingTransport(Rc<RefCell<Vec<u8>>>);

    impl Write for RotationRejectingTransport {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.starts_with(b"U") || buf.starts_with(b"D") {
                return Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "no response"));
            }
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    #[test]
    fn given_commands_format_wire_strings() {
        assert_eq!("A", StageCommand::Arm.wire_string());
        assert_eq!("R", StageCommand::Release.wire_string());
        assert_eq!("U30", StageCommand::Up(30).wire_string());
        assert_eq!("D360", StageCommand::Down(360).wire_string());
        assert_eq!("U0", StageCommand::Up(0).to_string());
    }

    #[test]
    fn given_no_transport_send_reports_not_connected() {
        let mut channel = CommandChannel::new();
        assert!(!channel.is_connected());
        assert!(matches!(channel.send(StageCommand::Arm), Err(StageError::NotConnected)));
    }

    #[test]
    fn given_transport_send_writes_raw_bytes_without_terminator() {
        let buffer = SharedBuffer::default();
        let mut channel = CommandChannel::with_transport(Box::new(buffer.clone()), "test");
        channel.send(StageCommand::Arm).unwrap();
        channel.send(StageCommand::Up(15)).unwrap();
        channel.send(StageCommand::Release).unwrap();
        assert_eq!(b"AU15R".to_vec(), *buffer.0.borrow());
    }

    #[test]
    fn given_manual_move_send_arm_rotate_release() {
        let buffer = SharedBuffer::default();
        let mut channel = CommandChannel::with_transport(Box::new(buffer.clone()), "test");
        channel.move_by(Direction::Down, 45).unwrap();
        channel.move_by(Direction::Up, 500).unwrap();
        assert_eq!(b"AD45RAU360R".to_vec(), *buffer.0.borrow());
    }

    #[test]
    fn given_write_failure_send_returns_io_error() {
        let mut channel = CommandChannel::with_transport(Box::new(FailingTransport), "test");
        assert!(matches!(channel.send(StageCommand::Arm), Err(StageError::Io(_))));
    }

    #[test]
    fn given_disconnect_further_sends_are_no_ops() {
        let buffer = SharedBuffer::default();
        let mut channel = CommandChannel::with_transport(Box::new(buffer.clone()), "test");
        channel.disconnect();
        assert!(channel.send(StageCommand::Arm).is_err());
        assert!(buffer.0.borrow().is_empty());
    }

    #[test]
    fn given_rotation_write_failure_manual_move_still_releases_motor() {
        let transport = RotationRejectingTransport::default();
        let mut channel = CommandChannel::with_transport(Box::new(transport.clone()), "test");

        let result = channel.move_by(Direction::Up, 30);

        assert!(matches!(result, Err(StageError::Io(_))));
        assert_eq!(b"AR".to_vec(), *transport.0.borrow());
    }
}
