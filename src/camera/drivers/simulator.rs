//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Camera simulator.
//!
//! Renders a synthetic scene (a disc which moves a bit with every shot, to make consecutive images distinguishable)
//! and keeps captured images in a simulated memory card until they are downloaded.
//!

use crate::camera::*;
use std::collections::HashMap;
use strum::IntoEnumIterator;

const STILL_SIZE: (u32, u32) = (1200, 800);
const PREVIEW_SIZE: (u32, u32) = (600, 400);

const CARD_FOLDER: &str = "/store_00010001/DCIM/100SIMUL";

#[derive(Debug)]
pub enum SimulatorError {
    Encoding(String),
    NoSuchFile(String)
}

impl From<SimulatorError> for CameraError {
    fn from(sim_error: SimulatorError) -> CameraError {
        CameraError::SimulatorError(sim_error)
    }
}

pub struct SimDriver {
}

impl SimDriver {
    pub fn new() -> SimDriver {
        SimDriver{}
    }
}

impl Driver for SimDriver {
    fn name(&self) -> &'static str { "Sim" }

    fn open_camera(&mut self) -> Result<Box<dyn Camera>, CameraError> {
        Ok(Box::new(SimCamera::new()))
    }
}

/// Faults to be reported by the next calls.
#[derive(Default)]
struct Faults {
    failing_captures: usize,
    busy_previews: usize
}

pub struct SimCamera {
    settings: HashMap<CameraSetting, SettingChoices>,
    /// Simulated memory card; key: file name.
    card: HashMap<String, Vec<u8>>,
    shot_counter: usize,
    preview_counter: usize,
    faults: Faults
}

impl SimCamera {
    pub fn new() -> SimCamera {
        let settings = CameraSetting::iter().map(|setting| (setting, default_choices(setting))).collect();

        SimCamera{
            settings,
            card: HashMap::new(),
            shot_counter: 0,
            preview_counter: 0,
            faults: Faults::default()
        }
    }

    /// Makes the next `failing_captures` still captures fail and the next `busy_previews` preview captures
    /// report `CameraError::Busy`.
    #[cfg(test)]
    pub fn inject_faults(&mut self, failing_captures: usize, busy_previews: usize) {
        self.faults = Faults{ failing_captures, busy_previews };
    }

    fn file_extension(&self) -> &'static str {
        match self.settings.get(&CameraSetting::ImageFormat) {
            Some(format) if format.current.starts_with("RAW") => "CR2",
            _ => "JPG"
        }
    }
}

fn default_choices(setting: CameraSetting) -> SettingChoices {
    let (choices, current): (&[&str], &str) = match setting {
        CameraSetting::ShutterSpeed => (&["1/250", "1/125", "1/60", "1/30", "1/15", "1/8", "1/4", "1/2", "1"], "1/60"),
        CameraSetting::Iso => (&["100", "200", "400", "800", "1600", "3200"], "100"),
        CameraSetting::WhiteBalance => (&["Auto", "Daylight", "Shadow", "Cloudy", "Tungsten", "Fluorescent"], "Auto"),
        CameraSetting::ImageFormat => (&["Large Fine JPEG", "Medium Fine JPEG", "Small Fine JPEG", "RAW"], "Large Fine JPEG")
    };

    SettingChoices{ choices: choices.iter().map(|s| s.to_string()).collect(), current: current.to_string() }
}

impl Camera for SimCamera {
    fn name(&self) -> &str { "Simulator" }

    fn setting_choices(&mut self, setting: CameraSetting) -> Result<SettingChoices, CameraError> {
        self.settings.get(&setting)
            .cloned()
            .ok_or_else(|| CameraError::NotSupported(setting.config_key().to_string()))
    }

    fn set_setting(&mut self, setting: CameraSetting, value: &str) -> Result<(), CameraError> {
        let entry = self.settings.get_mut(&setting)
            .ok_or_else(|| CameraError::NotSupported(setting.config_key().to_string()))?;

        if !entry.choices.iter().any(|c| c == value) {
            return Err(CameraError::InvalidValue(format!("{}={}", setting.config_key(), value)));
        }
        entry.current = value.to_string();
        log::info!("simulator: {} set to {}", setting.config_key(), value);

        Ok(())
    }

    fn capture_image(&mut self) -> Result<CameraFilePath, CameraError> {
        if self.faults.failing_captures > 0 {
            self.faults.failing_captures -= 1;
            return Err(CameraError::Io(std::io::Error::new(std::io::ErrorKind::Other, "simulated capture failure")));
        }

        self.shot_counter += 1;
        let name = format!("IMG_{:04}.{}", self.shot_counter, self.file_extension());
        let contents = render_scene(STILL_SIZE, self.shot_counter)?;
        self.card.insert(name.clone(), contents);

        Ok(CameraFilePath{ folder: CARD_FOLDER.to_string(), name })
    }

    fn download(&mut self, file: &CameraFilePath, dest_path: &Path) -> Result<(), CameraError> {
        let contents = match self.card.get(&file.name) {
            Some(contents) if file.folder == CARD_FOLDER => contents,
            _ => return Err(SimulatorError::NoSuchFile(format!("{}/{}", file.folder, file.name)).into())
        };
        std::fs::write(dest_path, contents)?;

        Ok(())
    }

    fn capture_preview(&mut self) -> Result<Vec<u8>, CameraError> {
        if self.faults.busy_previews > 0 {
            self.faults.busy_previews -= 1;
            return Err(CameraError::Busy);
        }

        self.preview_counter += 1;
        render_scene(PREVIEW_SIZE, self.shot_counter + self.preview_counter)
    }
}

/// Returns a JPEG-encoded synthetic image.
fn render_scene((width, height): (u32, u32), counter: usize) -> Result<Vec<u8>, CameraError> {
    let radius = height as f32 / 4.0;
    let center_x = width as f32 / 2.0 + ((counter % 20) as f32 - 10.0) * width as f32 / 100.0;
    let center_y = height as f32 / 2.0;

    let image = image::RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - center_x;
        let dy = y as f32 - center_y;
        if dx * dx + dy * dy <= radius * radius {
            image::Rgb([230, 180, 40])
        } else {
            let shade = (64 + 128 * y / height) as u8;
            image::Rgb([shade / 2, shade / 2, shade])
        }
    });

    let mut contents = std::io::Cursor::new(vec![]);
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut contents, image::ImageFormat::Jpeg)
        .map_err(|e| SimulatorError::Encoding(e.to_string()))?;

    Ok(contents.into_inner())
}
