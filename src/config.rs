//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Program configuration.
//!
//! The configuration file is only read; settings changed in the UI are not persisted.
//!

use crate::devices::stage;
use crate::stack::CaptureFailurePolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod groups {
    pub const MAIN: &str = "Main";
    pub const STAGE: &str = "Stage";
    pub const STACK: &str = "Stack";
}

mod keys {
    // group: MAIN
    pub const CAPTURE_DIR: &str = "CaptureDir";
    pub const DISABLED_DRIVERS: &str = "DisabledDrivers";
    pub const PREVIEW_INTERVAL_MS: &str = "PreviewIntervalMs";
    pub const CAPTURE_FAILURE_POLICY: &str = "CaptureFailurePolicy";

    // group: STAGE
    pub const DEFAULT_DEVICE: &str = "DefaultDevice";
    pub const DEFAULT_BAUD_RATE: &str = "DefaultBaudRate";

    // group: STACK
    pub const FRAMES: &str = "Frames";
    pub const PRE_SHOT_DELAY: &str = "PreShotDelay";
    pub const PRE_FOCUS_DELAY: &str = "PreFocusDelay";
    pub const ANGLE: &str = "Angle";
    pub const MANUAL_ANGLE: &str = "ManualAngle";
}

const DEFAULT_CAPTURE_DIR: &str = "Capture";

pub const MAX_FRAMES: u32 = 100;
/// Max. pre-shot and pre-focus delay (in seconds).
pub const MAX_DELAY_SECS: u32 = 60;

/// Initial values of the stacking controls.
#[derive(Clone, Debug, PartialEq)]
pub struct StackDefaults {
    pub frames: u32,
    pub pre_shot_delay_secs: u32,
    pub pre_focus_delay_secs: u32,
    pub angle: u32,
    pub manual_angle: u32
}

impl Default for StackDefaults {
    fn default() -> StackDefaults {
        StackDefaults{
            frames: 3,
            pre_shot_delay_secs: 1,
            pre_focus_delay_secs: 0,
            angle: 30,
            manual_angle: 15
        }
    }
}

pub struct Configuration {
    key_file: glib::KeyFile
}

impl Configuration {
    pub fn new() -> Configuration {
        let key_file = glib::KeyFile::new();
        let file_path = config_file_path();
        if key_file.load_from_file(&file_path, glib::KeyFileFlags::NONE).is_err() {
            log::warn!("failed to load configuration from {}; using defaults", file_path.display());
        }

        Configuration{ key_file }
    }

    #[cfg(test)]
    pub fn from_data(data: &str) -> Configuration {
        let key_file = glib::KeyFile::new();
        key_file.load_from_data(data, glib::KeyFileFlags::NONE).unwrap();
        Configuration{ key_file }
    }

    pub fn capture_dir(&self) -> PathBuf {
        match self.key_file.string(groups::MAIN, keys::CAPTURE_DIR) {
            Ok(s) if !s.is_empty() => PathBuf::from(s.as_str()),
            _ => PathBuf::from(DEFAULT_CAPTURE_DIR)
        }
    }

    pub fn disabled_drivers(&self) -> Vec<String> {
        self.key_file.string(groups::MAIN, keys::DISABLED_DRIVERS)
            .map(|s| s.split(',').map(|d| d.trim().to_string()).filter(|d| !d.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn preview_interval(&self) -> Duration {
        match self.key_file.integer(groups::MAIN, keys::PREVIEW_INTERVAL_MS) {
            Ok(value) if value > 0 => Duration::from_millis(value as u64),
            Ok(value) => {
                log::warn!("invalid configuration value for {}/{}: {}", groups::MAIN, keys::PREVIEW_INTERVAL_MS, value);
                crate::preview::DEFAULT_PREVIEW_INTERVAL
            },
            Err(_) => crate::preview::DEFAULT_PREVIEW_INTERVAL
        }
    }

    pub fn capture_failure_policy(&self) -> CaptureFailurePolicy {
        match self.key_file.string(groups::MAIN, keys::CAPTURE_FAILURE_POLICY) {
            Ok(s) => s.parse().unwrap_or_else(|_| {
                log::warn!("invalid configuration value for {}/{}: {}", groups::MAIN, keys::CAPTURE_FAILURE_POLICY, s);
                CaptureFailurePolicy::default()
            }),
            Err(_) => CaptureFailurePolicy::default()
        }
    }

    pub fn stage_default_device(&self) -> Option<String> {
        self.key_file.string(groups::STAGE, keys::DEFAULT_DEVICE).ok().map(|s| s.to_string())
    }

    pub fn stage_default_baud_rate(&self) -> u32 {
        match self.key_file.integer(groups::STAGE, keys::DEFAULT_BAUD_RATE) {
            Ok(value) if stage::BAUD_RATES.contains(&(value as u32)) => value as u32,
            Ok(value) => {
                log::warn!("invalid configuration value for {}/{}: {}", groups::STAGE, keys::DEFAULT_BAUD_RATE, value);
                stage::DEFAULT_BAUD_RATE
            },
            Err(_) => stage::DEFAULT_BAUD_RATE
        }
    }

    pub fn stack_defaults(&self) -> StackDefaults {
        let defaults = StackDefaults::default();

        StackDefaults{
            frames: self.read_in_range(groups::STACK, keys::FRAMES, 1, MAX_FRAMES, defaults.frames),
            pre_shot_delay_secs: self.read_in_range(
                groups::STACK, keys::PRE_SHOT_DELAY, 0, MAX_DELAY_SECS, defaults.pre_shot_delay_secs
            ),
            pre_focus_delay_secs: self.read_in_range(
                groups::STACK, keys::PRE_FOCUS_DELAY, 0, MAX_DELAY_SECS, defaults.pre_focus_delay_secs
            ),
            angle: self.read_in_range(groups::STACK, keys::ANGLE, 0, stage::MAX_ANGLE, defaults.angle),
            manual_angle: self.read_in_range(groups::STACK, keys::MANUAL_ANGLE, 0, stage::MAX_ANGLE, defaults.manual_angle)
        }
    }

    fn read_in_range(&self, group: &str, key: &str, min: u32, max: u32, default: u32) -> u32 {
        match self.key_file.integer(group, key) {
            Ok(value) if value >= min as i32 && value <= max as i32 => value as u32,
            Ok(value) => {
                log::warn!("configuration value for {}/{} out of range [{}, {}]: {}", group, key, min, max, value);
                default
            },
            Err(_) => default
        }
    }
}

fn config_file_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| Path::new("").to_path_buf()).join("microstacker.cfg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_file_defaults_are_used() {
        let config = Configuration::from_data("");
        assert_eq!(PathBuf::from("Capture"), config.capture_dir());
        assert!(config.disabled_drivers().is_empty());
        assert_eq!(crate::preview::DEFAULT_PREVIEW_INTERVAL, config.preview_interval());
        assert_eq!(CaptureFailurePolicy::Continue, config.capture_failure_policy());
        assert_eq!(None, config.stage_default_device());
        assert_eq!(9600, config.stage_default_baud_rate());
        assert_eq!(StackDefaults::default(), config.stack_defaults());
    }

    #[test]
    fn given_valid_values_they_are_read() {
        let config = Configuration::from_data(
            "[Main]\n\
            CaptureDir=/data/stacks\n\
            DisabledDrivers=gphoto2, simulator\n\
            PreviewIntervalMs=100\n\
            CaptureFailurePolicy=abort\n\
            [Stage]\n\
            DefaultDevice=/dev/ttyACM0\n\
            DefaultBaudRate=115200\n\
            [Stack]\n\
            Frames=20\n\
            PreShotDelay=2\n\
            PreFocusDelay=1\n\
            Angle=45\n\
            ManualAngle=90\n"
        );

        assert_eq!(PathBuf::from("/data/stacks"), config.capture_dir());
        assert_eq!(vec!["gphoto2".to_string(), "simulator".to_string()], config.disabled_drivers());
        assert_eq!(Duration::from_millis(100), config.preview_interval());
        assert_eq!(CaptureFailurePolicy::Abort, config.capture_failure_policy());
        assert_eq!(Some("/dev/ttyACM0".to_string()), config.stage_default_device());
        assert_eq!(115200, config.stage_default_baud_rate());
        assert_eq!(
            StackDefaults{ frames: 20, pre_shot_delay_secs: 2, pre_focus_delay_secs: 1, angle: 45, manual_angle: 90 },
            config.stack_defaults()
        );
    }

    #[test]
    fn given_invalid_values_defaults_are_used() {
        let config = Configuration::from_data(
            "[Main]\n\
            PreviewIntervalMs=0\n\
            CaptureFailurePolicy=sometimes\n\
            [Stage]\n\
            DefaultBaudRate=1234\n\
            [Stack]\n\
            Frames=0\n\
            Angle=400\n\
            PreShotDelay=abc\n"
        );

        assert_eq!(crate::preview::DEFAULT_PREVIEW_INTERVAL, config.preview_interval());
        assert_eq!(CaptureFailurePolicy::Continue, config.capture_failure_policy());
        assert_eq!(9600, config.stage_default_baud_rate());
        assert_eq!(StackDefaults::default(), config.stack_defaults());
    }
}
