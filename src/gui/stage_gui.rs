//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Focus stage GUI: serial connection and manual moves.
//!

use crate::devices::stage::{self, Direction};
use crate::gui::PADDING;
use crate::ProgramData;
use glib::clone;
use gtk::prelude::*;
use std::{cell::RefCell, rc::Rc};

pub struct StageWidgets {
    connection_frame: gtk::Frame,
    manual_frame: gtk::Frame,
    ports: gtk::ComboBoxText,
    baud_rate: gtk::ComboBoxText,
    status: gtk::Label,
    move_up: gtk::Button,
    move_down: gtk::Button
}

impl StageWidgets {
    pub fn connection_frame(&self) -> &gtk::Frame { &self.connection_frame }

    pub fn manual_frame(&self) -> &gtk::Frame { &self.manual_frame }

    /// Lists serial devices and selects `preferred` (if present) or the last one.
    pub fn update_ports(&self, preferred: Option<&str>) {
        let ports = stage::available_ports();
        self.ports.remove_all();
        for port in &ports { self.ports.append_text(port); }

        let selected = preferred
            .and_then(|p| ports.iter().position(|port| port == p))
            .or_else(|| ports.len().checked_sub(1));
        self.ports.set_active(selected.map(|idx| idx as u32));
    }

    fn set_status(&self, connected: bool) {
        let (text, color) = if connected { ("Status: Connected", "green") } else { ("Status: Unconnected", "red") };
        self.status.set_markup(&format!("<span foreground=\"{}\">{}</span>", color, text));
        self.move_up.set_sensitive(connected);
        self.move_down.set_sensitive(connected);
    }
}

pub fn create_stage_boxes(program_data_rc: &Rc<RefCell<ProgramData>>, default_baud_rate: u32, manual_angle: u32) -> StageWidgets {
    let grid = gtk::Grid::new();
    grid.set_row_spacing(PADDING / 2);
    grid.set_column_spacing(PADDING);
    grid.set_border_width(PADDING);

    let update = gtk::Button::with_label("Update TTY");
    grid.attach(&update, 0, 0, 2, 1);

    grid.attach(&gtk::LabelBuilder::new().label("Select TTY:").halign(gtk::Align::End).build(), 0, 1, 1, 1);
    let ports = gtk::ComboBoxText::new();
    grid.attach(&ports, 1, 1, 1, 1);

    grid.attach(&gtk::LabelBuilder::new().label("Baud rate:").halign(gtk::Align::End).build(), 0, 2, 1, 1);
    let baud_rate = gtk::ComboBoxText::new();
    for rate in stage::BAUD_RATES.iter() { baud_rate.append_text(&rate.to_string()); }
    baud_rate.set_active(stage::BAUD_RATES.iter().position(|r| *r == default_baud_rate).map(|idx| idx as u32));
    grid.attach(&baud_rate, 1, 2, 1, 1);

    let connect = gtk::Button::with_label("Connect");
    connect.connect_clicked(clone!(@weak program_data_rc => @default-panic, move |_| on_connect(&program_data_rc)));
    grid.attach(&connect, 0, 3, 2, 1);

    let status = gtk::Label::new(None);
    grid.attach(&status, 0, 4, 2, 1);

    let connection_frame = gtk::Frame::new(Some("Connection"));
    connection_frame.add(&grid);

    let manual_grid = gtk::Grid::new();
    manual_grid.set_row_spacing(PADDING / 2);
    manual_grid.set_column_spacing(PADDING);
    manual_grid.set_border_width(PADDING);

    manual_grid.attach(&gtk::LabelBuilder::new().label("Angle (degrees):").halign(gtk::Align::End).build(), 0, 0, 1, 1);
    let angle = gtk::SpinButton::with_range(0.0, stage::MAX_ANGLE as f64, 1.0);
    angle.set_value(manual_angle as f64);
    manual_grid.attach(&angle, 1, 0, 1, 1);

    let move_up = gtk::Button::with_label("↑");
    move_up.connect_clicked(clone!(@weak program_data_rc, @weak angle => @default-panic, move |_| {
        on_manual_move(Direction::Up, angle.value_as_int(), &program_data_rc);
    }));
    manual_grid.attach(&move_up, 0, 1, 2, 1);

    let move_down = gtk::Button::with_label("↓");
    move_down.connect_clicked(clone!(@weak program_data_rc, @weak angle => @default-panic, move |_| {
        on_manual_move(Direction::Down, angle.value_as_int(), &program_data_rc);
    }));
    manual_grid.attach(&move_down, 0, 2, 2, 1);

    let manual_frame = gtk::Frame::new(Some("Manual Controls"));
    manual_frame.add(&manual_grid);

    update.connect_clicked(clone!(@weak program_data_rc => @default-panic, move |_| {
        if let Some(gui) = program_data_rc.borrow().gui.as_ref() {
            gui.stage_widgets.update_ports(None);
        };
    }));

    let widgets = StageWidgets{ connection_frame, manual_frame, ports, baud_rate, status, move_up, move_down };
    widgets.set_status(false);

    widgets
}

/// Connects to the selected device; the result is shown in the status label.
pub fn on_connect(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let mut program_data = program_data_rc.borrow_mut();
    let pd = &mut *program_data;
    let gui = match pd.gui.as_ref() {
        Some(gui) => gui,
        None => return
    };

    let device = gui.stage_widgets.ports.active_text().map(|s| s.to_string()).unwrap_or_default();
    let baud_rate = gui.stage_widgets.baud_rate.active_text()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(stage::DEFAULT_BAUD_RATE);

    let connected = if device.is_empty() {
        log::warn!("no serial device selected");
        pd.stage.disconnect();
        false
    } else {
        match pd.stage.connect(&device, baud_rate) {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to connect to {}: {}", device, e);
                false
            }
        }
    };

    gui.stage_widgets.set_status(connected);
}

fn on_manual_move(direction: Direction, angle: i32, program_data_rc: &Rc<RefCell<ProgramData>>) {
    let mut program_data = program_data_rc.borrow_mut();
    if program_data.sequencer.is_running() {
        log::warn!("manual stage move ignored during stack capture");
        return;
    }
    // failures have been logged already
    let _ = program_data.stage.move_by(direction, angle.max(0) as u32);
}
