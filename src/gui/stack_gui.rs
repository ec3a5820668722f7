//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Stack capture GUI.
//!
//! Drives the stack sequencer with the program's one-shot timer. Sequencer side effects which touch the GUI are
//! collected while `ProgramData` is borrowed and applied afterwards.
//!

use crate::camera::Camera;
use crate::capture::{CaptureError, CaptureOperation, CapturedImage};
use crate::config::{StackDefaults, MAX_DELAY_SECS, MAX_FRAMES};
use crate::devices::stage::{self, CommandChannel, StageCommand, StageError};
use crate::gui::{on_image_captured, show_message, PADDING};
use crate::stack::{StackHost, StackOutcome, StackRequest, Step};
use crate::ProgramData;
use glib::clone;
use gtk::prelude::*;
use std::{cell::RefCell, rc::Rc, time::Duration};

/// CSS class of the "Capture Stack" button while a run is in progress.
pub const STACK_ACTIVE_CLASS: &str = "stack-active";

pub struct StackWidgets {
    frame: gtk::Frame,
    frames: gtk::SpinButton,
    pre_shot_delay: gtk::SpinButton,
    pre_focus_delay: gtk::SpinButton,
    angle: gtk::SpinButton,
    launch: gtk::Button,
    stop: gtk::Button
}

impl StackWidgets {
    pub fn frame(&self) -> &gtk::Frame { &self.frame }

    pub fn set_camera_available(&self, available: bool) {
        self.launch.set_sensitive(available);
        self.stop.set_sensitive(available);
    }

    fn set_active_style(&self, active: bool) {
        let style = self.launch.style_context();
        if active { style.add_class(STACK_ACTIVE_CLASS); } else { style.remove_class(STACK_ACTIVE_CLASS); }
    }

    fn request(&self) -> Result<StackRequest, crate::stack::StackError> {
        StackRequest::new(
            self.frames.value_as_int().max(0) as usize,
            Duration::from_secs(self.pre_shot_delay.value_as_int().max(0) as u64),
            Duration::from_secs(self.pre_focus_delay.value_as_int().max(0) as u64),
            self.angle.value_as_int().max(0) as u32
        )
    }
}

fn spin_button(grid: &gtk::Grid, row: i32, label: &str, min: u32, max: u32, value: u32) -> gtk::SpinButton {
    grid.attach(&gtk::LabelBuilder::new().label(label).halign(gtk::Align::End).build(), 0, row, 1, 1);
    let spin_button = gtk::SpinButton::with_range(min as f64, max as f64, 1.0);
    spin_button.set_value(value as f64);
    grid.attach(&spin_button, 1, row, 1, 1);

    spin_button
}

pub fn create_stack_box(program_data_rc: &Rc<RefCell<ProgramData>>, defaults: &StackDefaults) -> StackWidgets {
    let grid = gtk::Grid::new();
    grid.set_row_spacing(PADDING / 2);
    grid.set_column_spacing(PADDING);
    grid.set_border_width(PADDING);

    let frames = spin_button(&grid, 0, "Number of frames:", 1, MAX_FRAMES, defaults.frames);
    let pre_shot_delay = spin_button(&grid, 1, "Pre-shot delay (s):", 0, MAX_DELAY_SECS, defaults.pre_shot_delay_secs);
    let pre_focus_delay = spin_button(&grid, 2, "Pre-focus delay (s):", 0, MAX_DELAY_SECS, defaults.pre_focus_delay_secs);
    let angle = spin_button(&grid, 3, "Angle (degrees):", 0, stage::MAX_ANGLE, defaults.angle);

    let launch = gtk::Button::with_label("Capture Stack");
    launch.connect_clicked(clone!(@weak program_data_rc => @default-panic, move |_| on_start_stack(&program_data_rc)));
    grid.attach(&launch, 0, 4, 2, 1);

    let stop = gtk::Button::with_label("Stop");
    stop.connect_clicked(clone!(@weak program_data_rc => @default-panic, move |_| {
        let mut program_data = program_data_rc.borrow_mut();
        log::info!("stop requested in state {:?}", program_data.sequencer.state());
        program_data.sequencer.cancel();
    }));
    grid.attach(&stop, 0, 5, 2, 1);

    let frame = gtk::Frame::new(Some("Stacking"));
    frame.add(&grid);

    StackWidgets{ frame, frames, pre_shot_delay, pre_focus_delay, angle, launch, stop }
}

/// GUI-related consequences of a sequencer step.
enum GuiEvent {
    ActiveStyle(bool),
    ImageCaptured(CapturedImage)
}

/// Gives the sequencer access to the program's devices.
struct GuiStackHost<'a> {
    capture_op: &'a CaptureOperation,
    camera: Option<&'a mut (dyn Camera + 'static)>,
    stage: &'a mut CommandChannel,
    events: Vec<GuiEvent>
}

impl StackHost for GuiStackHost<'_> {
    fn create_run_folder(&mut self) -> Result<String, std::io::Error> {
        self.capture_op.create_stack_folder(chrono::Local::now().naive_local())
    }

    fn send_command(&mut self, command: StageCommand) -> Result<(), StageError> {
        self.stage.send(command)
    }

    fn capture(&mut self, folder: &str, frame_index: usize) -> Result<CapturedImage, CaptureError> {
        let image = self.capture_op.capture(self.camera.as_deref_mut(), folder, Some(frame_index))?;
        self.events.push(GuiEvent::ImageCaptured(image.clone()));
        Ok(image)
    }

    fn set_active_style(&mut self) { self.events.push(GuiEvent::ActiveStyle(true)); }

    fn set_idle_style(&mut self) { self.events.push(GuiEvent::ActiveStyle(false)); }
}

fn apply_events(events: Vec<GuiEvent>, program_data_rc: &Rc<RefCell<ProgramData>>) {
    for event in events {
        match event {
            GuiEvent::ActiveStyle(active) => if let Some(gui) = program_data_rc.borrow().gui.as_ref() {
                gui.stack_widgets.set_active_style(active);
            },
            GuiEvent::ImageCaptured(image) => on_image_captured(&image, program_data_rc)
        }
    }
}

fn schedule_tick(delay: Duration, program_data: &ProgramData, program_data_rc: &Rc<RefCell<ProgramData>>) {
    program_data.stack_timer.run_once(delay, clone!(@weak program_data_rc => move || {
        on_stack_timer(&program_data_rc);
    }));
}

fn on_start_stack(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let request = program_data_rc.borrow().gui.as_ref().map(|gui| gui.stack_widgets.request());
    let request = match request {
        Some(Ok(request)) => request,
        Some(Err(e)) => {
            show_message(&format!("Cannot start stack capture: {}.", e), "Error", gtk::MessageType::Error);
            return;
        },
        None => return
    };

    let (result, events) = {
        let mut program_data = program_data_rc.borrow_mut();
        let pd = &mut *program_data;
        let mut host = GuiStackHost{
            capture_op: &pd.capture_op,
            camera: pd.camera.as_deref_mut(),
            stage: &mut pd.stage,
            events: vec![]
        };
        let result = pd.sequencer.start(request, &mut host);
        let events = host.events;
        if let Ok(delay) = &result {
            schedule_tick(*delay, pd, program_data_rc);
        }
        (result, events)
    };

    apply_events(events, program_data_rc);

    if let Err(e) = result {
        log::error!("failed to start stack capture: {}", e);
        show_message(&format!("Cannot start stack capture: {}.", e), "Error", gtk::MessageType::Error);
    }
}

fn on_stack_timer(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let events = {
        let mut program_data = program_data_rc.borrow_mut();
        let pd = &mut *program_data;
        let mut host = GuiStackHost{
            capture_op: &pd.capture_op,
            camera: pd.camera.as_deref_mut(),
            stage: &mut pd.stage,
            events: vec![]
        };
        let step = pd.sequencer.tick(&mut host);
        let events = host.events;

        match step {
            Step::Wait(delay) => schedule_tick(delay, pd, program_data_rc),
            Step::Finished(report) => match report.outcome {
                StackOutcome::Completed => log::info!(
                    "stack of {} image(s) saved in {}", report.images.len(), report.folder
                ),
                StackOutcome::Cancelled(reason) => log::info!(
                    "stack capture cancelled ({:?}) after {} frame(s)", reason, report.frames_attempted
                )
            },
            Step::Idle => ()
        }

        events
    };

    apply_events(events, program_data_rc);
}
