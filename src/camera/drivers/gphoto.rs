//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! libgphoto2 camera driver (DSLRs and mirrorless cameras connected via USB).
//!

use crate::camera::*;
use ::gphoto2::{error::ErrorKind, widget::RadioWidget, Context};

impl From<::gphoto2::Error> for CameraError {
    fn from(e: ::gphoto2::Error) -> CameraError {
        CameraError::GPhoto2Error(e)
    }
}

/// Live view I/O errors mean the camera is still busy with a previous request.
fn is_busy_during_preview(kind: ErrorKind) -> bool {
    kind == ErrorKind::Io
}

fn preview_error(e: ::gphoto2::Error) -> CameraError {
    if is_busy_during_preview(e.kind()) { CameraError::Busy } else { CameraError::GPhoto2Error(e) }
}

pub struct GPhoto2Driver {
    context: Context
}

impl GPhoto2Driver {
    pub fn new() -> Result<GPhoto2Driver, CameraError> {
        Ok(GPhoto2Driver{ context: Context::new()? })
    }
}

impl Driver for GPhoto2Driver {
    fn name(&self) -> &'static str { "gphoto2" }

    fn open_camera(&mut self) -> Result<Box<dyn Camera>, CameraError> {
        let camera = self.context.autodetect_camera().wait()?;
        let name = camera.abilities().model().to_string();

        Ok(Box::new(GPhoto2Camera{ context: self.context.clone(), camera, name }))
    }
}

pub struct GPhoto2Camera {
    context: Context,
    camera: ::gphoto2::Camera,
    name: String
}

impl Camera for GPhoto2Camera {
    fn name(&self) -> &str { &self.name }

    fn setting_choices(&mut self, setting: CameraSetting) -> Result<SettingChoices, CameraError> {
        let widget = self.camera.config_key::<RadioWidget>(setting.config_key()).wait()?;

        Ok(SettingChoices{
            choices: widget.choices_iter().collect(),
            current: widget.choice()
        })
    }

    fn set_setting(&mut self, setting: CameraSetting, value: &str) -> Result<(), CameraError> {
        let widget = self.camera.config_key::<RadioWidget>(setting.config_key()).wait()?;
        widget.set_choice(value)?;
        self.camera.set_config(&widget).wait()?;

        Ok(())
    }

    fn capture_image(&mut self) -> Result<CameraFilePath, CameraError> {
        let path = self.camera.capture_image().wait()?;

        Ok(CameraFilePath{ folder: path.folder().to_string(), name: path.name().to_string() })
    }

    fn download(&mut self, file: &CameraFilePath, dest_path: &Path) -> Result<(), CameraError> {
        self.camera.fs().download_to(&file.folder, &file.name, dest_path).wait()?;

        Ok(())
    }

    fn capture_preview(&mut self) -> Result<Vec<u8>, CameraError> {
        let preview = self.camera.capture_preview().wait().map_err(preview_error)?;
        let data = preview.get_data(&self.context).wait().map_err(preview_error)?;

        Ok(data.to_vec())
    }
}
