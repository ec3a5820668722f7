//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Still image capture and storage.
//!

use crate::camera::{Camera, CameraError};
use std::path::{Path, PathBuf};

/// Folder (under the capture root) for images captured outside of a stack.
pub const SINGLES_FOLDER: &str = "Singles";

const STACK_FOLDER_PREFIX: &str = "Stack_";

#[derive(Debug)]
pub enum CaptureError {
    NoCamera,
    Camera(CameraError),
    Io(std::io::Error)
}

impl From<CameraError> for CaptureError {
    fn from(e: CameraError) -> CaptureError {
        CaptureError::Camera(e)
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> CaptureError {
        CaptureError::Io(e)
    }
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoCamera => write!(f, "no camera connected"),
            CaptureError::Camera(e) => write!(f, "{}", e),
            CaptureError::Io(e) => write!(f, "I/O error: {}", e)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CapturedImage {
    pub file_path: PathBuf,
    /// `None` for single captures.
    pub source_frame_index: Option<usize>
}

pub struct CaptureOperation {
    capture_root: PathBuf
}

impl CaptureOperation {
    pub fn new(capture_root: &Path) -> CaptureOperation {
        CaptureOperation{ capture_root: capture_root.to_path_buf() }
    }

    /// Takes a still image and saves it as `<capture root>/<folder>/<camera file name>`.
    ///
    /// The folder is created if needed. Failures are logged before being returned.
    pub fn capture(
        &self,
        camera: Option<&mut (dyn Camera + 'static)>,
        folder: &str,
        frame_index: Option<usize>
    ) -> Result<CapturedImage, CaptureError> {
        let result = match camera {
            Some(camera) => self.capture_and_save(camera, folder, frame_index),
            None => Err(CaptureError::NoCamera)
        };

        if let Err(e) = &result {
            log::error!("failed to capture image{}: {}", frame_index.map(|i| format!(" #{}", i)).unwrap_or_default(), e);
        }

        result
    }

    fn capture_and_save(
        &self,
        camera: &mut dyn Camera,
        folder: &str,
        frame_index: Option<usize>
    ) -> Result<CapturedImage, CaptureError> {
        log::info!("capturing image");
        let t_start = std::time::Instant::now();
        let file = camera.capture_image()?;
        log::info!("time taken to capture image: {:.2} s", t_start.elapsed().as_secs_f64());

        let target_folder = self.capture_root.join(folder);
        std::fs::create_dir_all(&target_folder)?;
        let file_path = target_folder.join(&file.name);
        camera.download(&file, &file_path)?;
        log::info!("image saved to {}", file_path.display());

        Ok(CapturedImage{ file_path, source_frame_index: frame_index })
    }

    /// Creates a new folder for a stack run (`Stack_<YYYYMMDD_HHMMSS>`) and returns its name.
    ///
    /// If a folder with the same time stamp exists (two runs within a second), a numeric suffix is appended.
    pub fn create_stack_folder(&self, start_time: chrono::NaiveDateTime) -> Result<String, std::io::Error> {
        std::fs::create_dir_all(&self.capture_root)?;

        let base_name = stack_folder_name(start_time);
        let mut name = base_name.clone();
        let mut suffix = 1;
        loop {
            match std::fs::create_dir(self.capture_root.join(&name)) {
                Ok(()) => return Ok(name),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    name = format!("{}_{}", base_name, suffix);
                },
                Err(e) => return Err(e)
            }
        }
    }
}

pub fn stack_folder_name(start_time: chrono::NaiveDateTime) -> String {
    format!("{}{}", STACK_FOLDER_PREFIX, start_time.format("%Y%m%d_%H%M%S"))
}
