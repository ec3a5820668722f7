//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Camera GUI: still capture, live preview and camera settings.
//!

use crate::camera::{Camera, CameraSetting};
use crate::capture::SINGLES_FOLDER;
use crate::gui::{freezeable::Freezeable, on_image_captured, show_last_selected_image, PADDING};
use crate::{imaging, ProgramData};
use glib::clone;
use gtk::prelude::*;
use std::{cell::RefCell, rc::Rc};
use strum::IntoEnumIterator;

pub struct CameraWidgets {
    frame: gtk::Frame,
    capture: gtk::Button,
    preview: gtk::ToggleButton,
    settings: Vec<(CameraSetting, Freezeable<gtk::ComboBoxText>)>
}

impl CameraWidgets {
    pub fn frame(&self) -> &gtk::Frame { &self.frame }

    /// Fills the settings' combo boxes with values reported by `camera` and enables the controls.
    pub fn on_camera_opened(&self, camera: &mut dyn Camera) {
        self.frame.set_label(Some(&format!("Camera: {}", camera.name())));

        for (setting, combo) in &self.settings {
            combo.freeze();
            combo.remove_all();
            match camera.setting_choices(*setting) {
                Ok(choices) => {
                    for choice in &choices.choices { combo.append_text(choice); }
                    combo.set_active(choices.choices.iter().position(|c| *c == choices.current).map(|idx| idx as u32));
                    combo.set_sensitive(true);
                },
                Err(e) => {
                    log::error!("failed to get {} values: {}", setting.config_key(), e);
                    combo.set_sensitive(false);
                }
            }
            combo.thaw();
        }

        self.capture.set_sensitive(true);
        self.preview.set_sensitive(true);
    }

    pub fn on_no_camera(&self) {
        self.frame.set_label(Some("Camera: not connected"));
        self.capture.set_sensitive(false);
        self.preview.set_sensitive(false);
        for (_, combo) in &self.settings { combo.set_sensitive(false); }
    }
}

pub fn create_camera_box(program_data_rc: &Rc<RefCell<ProgramData>>) -> CameraWidgets {
    let grid = gtk::Grid::new();
    grid.set_row_spacing(PADDING / 2);
    grid.set_column_spacing(PADDING);
    grid.set_border_width(PADDING);

    let capture = gtk::Button::with_label("Capture");
    capture.connect_clicked(clone!(@weak program_data_rc => @default-panic, move |_| on_capture(&program_data_rc)));
    grid.attach(&capture, 0, 0, 2, 1);

    let preview = gtk::ToggleButton::with_label("Start Preview");
    preview.connect_toggled(clone!(@weak program_data_rc => @default-panic, move |btn| {
        on_toggle_preview(btn, &program_data_rc);
    }));
    grid.attach(&preview, 0, 1, 2, 1);

    let mut settings = vec![];
    for (row, setting) in CameraSetting::iter().enumerate() {
        let label = gtk::LabelBuilder::new().label(setting.label()).halign(gtk::Align::End).build();
        grid.attach(&label, 0, 2 + row as i32, 1, 1);

        let combo = gtk::ComboBoxText::new();
        let signal = combo.connect_changed(clone!(@weak program_data_rc => @default-panic, move |combo| {
            on_setting_changed(setting, combo, &program_data_rc);
        }));
        grid.attach(&combo, 1, 2 + row as i32, 1, 1);
        settings.push((setting, Freezeable::new(combo, Some(signal))));
    }

    let frame = gtk::Frame::new(Some("Camera"));
    frame.add(&grid);

    CameraWidgets{ frame, capture, preview, settings }
}

fn on_setting_changed(setting: CameraSetting, combo: &gtk::ComboBoxText, program_data_rc: &Rc<RefCell<ProgramData>>) {
    let value = match combo.active_text() {
        Some(value) => value,
        None => return
    };

    if let Some(camera) = program_data_rc.borrow_mut().camera.as_mut() {
        match camera.set_setting(setting, &value) {
            Ok(()) => log::info!("camera {} set to {}", setting.config_key(), value),
            Err(e) => log::error!("failed to set {} value: {}", setting.config_key(), e)
        }
    }
}

fn on_capture(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let result = {
        let mut program_data = program_data_rc.borrow_mut();
        let pd = &mut *program_data;
        pd.capture_op.capture(pd.camera.as_deref_mut(), SINGLES_FOLDER, None)
    };

    // failures have been logged already
    if let Ok(image) = result {
        on_image_captured(&image, program_data_rc);
    }
}

fn on_toggle_preview(btn: &gtk::ToggleButton, program_data_rc: &Rc<RefCell<ProgramData>>) {
    if btn.is_active() {
        btn.set_label("Stop Preview");
        {
            let mut program_data = program_data_rc.borrow_mut();
            program_data.preview.start();
            log::info!("live preview started, frame interval {} ms", program_data.preview.interval().as_millis());
        }
        on_preview_timer(program_data_rc);
    } else {
        btn.set_label("Start Preview");
        {
            let mut program_data = program_data_rc.borrow_mut();
            program_data.preview.stop();
            program_data.preview_timer.stop();
        }
        show_last_selected_image(program_data_rc);
    }
}

fn on_preview_timer(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let mut program_data = program_data_rc.borrow_mut();
    let pd = &mut *program_data;

    let result = match pd.preview.poll(pd.camera.as_deref_mut()) {
        Some(result) => result,
        None => return
    };

    if let Some(frame) = result.frame {
        match imaging::decode(&frame) {
            Ok(image) => if let Some(gui) = pd.gui.as_ref() { gui.preview_area.set_image(image); },
            Err(e) => log::error!("failed to decode preview frame: {}", e)
        }
    }

    pd.preview_timer.run_once(result.next_delay, clone!(@weak program_data_rc => move || {
        on_preview_timer(&program_data_rc);
    }));
}
