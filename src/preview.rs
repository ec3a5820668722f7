//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Live preview polling.
//!

use crate::camera::{Camera, CameraError};
use std::time::Duration;

pub const DEFAULT_PREVIEW_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// Wait before retrying a preview capture which reported `CameraError::Busy`.
pub const BUSY_RETRY_DELAY: Duration = Duration::from_millis(200);

pub struct PollResult {
    /// Encoded preview frame (if captured).
    pub frame: Option<Vec<u8>>,
    /// Delay after which `poll` is to be called again.
    pub next_delay: Duration
}

pub struct PreviewPoller {
    interval: Duration,
    active: bool,
    /// True if the previous poll got `CameraError::Busy` and the current one is its retry.
    retrying: bool
}

impl PreviewPoller {
    pub fn new(interval: Duration) -> PreviewPoller {
        PreviewPoller{ interval, active: false, retrying: false }
    }

    pub fn interval(&self) -> Duration { self.interval }

    pub fn is_active(&self) -> bool { self.active }

    pub fn start(&mut self) {
        log::info!("live preview started");
        self.active = true;
        self.retrying = false;
    }

    pub fn stop(&mut self) {
        if self.active { log::info!("live preview stopped"); }
        self.active = false;
        self.retrying = false;
    }

    /// Captures one preview frame. Returns `None` if polling is inactive.
    ///
    /// A busy camera is retried once after `BUSY_RETRY_DELAY`; all other failures are logged and polling continues
    /// at the normal interval.
    pub fn poll(&mut self, camera: Option<&mut (dyn Camera + 'static)>) -> Option<PollResult> {
        if !self.active { return None; }

        let camera = match camera {
            Some(camera) => camera,
            None => {
                log::warn!("no camera; stopping live preview");
                self.stop();
                return None;
            }
        };

        match camera.capture_preview() {
            Ok(frame) => {
                self.retrying = false;
                Some(PollResult{ frame: Some(frame), next_delay: self.interval })
            },

            Err(CameraError::Busy) if !self.retrying => {
                log::info!("camera busy; retrying preview capture in {} ms", BUSY_RETRY_DELAY.as_millis());
                self.retrying = true;
                Some(PollResult{ frame: None, next_delay: BUSY_RETRY_DELAY })
            },

            Err(e) => {
                log::error!("failed to capture preview: {}", e);
                self.retrying = false;
                Some(PollResult{ frame: None, next_delay: self.interval })
            }
        }
    }
}
