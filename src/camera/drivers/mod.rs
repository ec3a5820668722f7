//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Camera drivers.
//!

#[cfg(feature = "camera_gphoto2")]
pub mod gphoto;
pub mod simulator;

use crate::camera::{Camera, Driver};

pub fn init_drivers(disabled_drivers: &[&str]) -> Vec<Box<dyn Driver>> {
    let mut drivers: Vec<Box<dyn Driver>> = vec![];

    #[cfg(feature = "camera_gphoto2")]
    if !disabled_drivers.contains(&"gphoto2") {
        log::info!("initializing gphoto2 camera driver");
        match gphoto::GPhoto2Driver::new() {
            Ok(driver) => drivers.push(Box::new(driver)),
            Err(e) => log::error!("failed to initialize gphoto2 driver: {}", e)
        }
    }

    // add more drivers here

    if !disabled_drivers.contains(&"simulator") {
        log::info!("initializing camera simulator driver");
        drivers.push(Box::new(simulator::SimDriver::new()));
    }

    drivers
}

/// Returns the camera opened by the first driver which succeeds.
pub fn open_first_camera(drivers: &mut [Box<dyn Driver>]) -> Option<Box<dyn Camera>> {
    for driver in drivers.iter_mut() {
        match driver.open_camera() {
            Ok(camera) => {
                log::info!("opened camera \"{}\" via {} driver", camera.name(), driver.name());
                return Some(camera);
            },
            Err(e) => log::warn!("{} driver: failed to open camera: {}", driver.name(), e)
        }
    }

    log::error!("failed to initialize camera");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_all_drivers_disabled_no_camera_is_opened() {
        let mut drivers = init_drivers(&["gphoto2", "simulator"]);
        assert!(drivers.is_empty());
        assert!(open_first_camera(&mut drivers).is_none());
    }

    #[test]
    fn given_simulator_enabled_it_provides_a_camera() {
        let mut drivers = init_drivers(&["gphoto2"]);
        let camera = open_first_camera(&mut drivers).unwrap();
        assert_eq!("Simulator", camera.name());
    }
}
