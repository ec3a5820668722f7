//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Common camera code.
//!

pub mod drivers;

use std::path::Path;

#[derive(Debug)]
pub enum CameraError {
    /// The camera is temporarily unable to respond (e.g., still processing a previous request).
    Busy,
    NotSupported(String),
    InvalidValue(String),
    Io(std::io::Error),
    SimulatorError(drivers::simulator::SimulatorError),
    #[cfg(feature = "camera_gphoto2")]
    GPhoto2Error(gphoto2::Error),
}

impl From<std::io::Error> for CameraError {
    fn from(e: std::io::Error) -> CameraError {
        CameraError::Io(e)
    }
}

impl std::fmt::Display for CameraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraError::Busy => write!(f, "camera busy"),
            CameraError::NotSupported(what) => write!(f, "not supported: {}", what),
            CameraError::InvalidValue(value) => write!(f, "invalid value: {}", value),
            CameraError::Io(e) => write!(f, "I/O error: {}", e),
            CameraError::SimulatorError(e) => write!(f, "simulator error: {:?}", e),
            #[cfg(feature = "camera_gphoto2")]
            CameraError::GPhoto2Error(e) => write!(f, "gphoto2 error: {}", e),
        }
    }
}

/// Location of a captured image in the camera's storage.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraFilePath {
    pub folder: String,
    pub name: String
}

/// Camera configuration settings exposed in the GUI.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum CameraSetting {
    ShutterSpeed,
    Iso,
    WhiteBalance,
    ImageFormat
}

impl CameraSetting {
    /// Name of the corresponding widget in the camera's configuration tree.
    pub fn config_key(&self) -> &'static str {
        match self {
            CameraSetting::ShutterSpeed => "shutterspeed",
            CameraSetting::Iso => "iso",
            CameraSetting::WhiteBalance => "whitebalance",
            CameraSetting::ImageFormat => "imageformat"
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CameraSetting::ShutterSpeed => "Shutter speed:",
            CameraSetting::Iso => "ISO:",
            CameraSetting::WhiteBalance => "White balance:",
            CameraSetting::ImageFormat => "Image format:"
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SettingChoices {
    pub choices: Vec<String>,
    pub current: String
}

pub trait Camera {
    fn name(&self) -> &str;

    fn setting_choices(&mut self, setting: CameraSetting) -> Result<SettingChoices, CameraError>;

    /// Sets one of the values returned by `setting_choices`.
    fn set_setting(&mut self, setting: CameraSetting, value: &str) -> Result<(), CameraError>;

    /// Takes a still image; it stays in the camera's storage until downloaded.
    fn capture_image(&mut self) -> Result<CameraFilePath, CameraError>;

    fn download(&mut self, file: &CameraFilePath, dest_path: &Path) -> Result<(), CameraError>;

    /// Returns an encoded (usually JPEG) live view frame.
    fn capture_preview(&mut self) -> Result<Vec<u8>, CameraError>;
}

pub trait Driver {
    fn name(&self) -> &'static str;

    /// Opens the first camera found by the driver.
    fn open_camera(&mut self) -> Result<Box<dyn Camera>, CameraError>;
}
