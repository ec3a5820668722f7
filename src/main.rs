//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Entry point and main data structures of the `microstacker` executable.
//!

mod args;
mod camera;
mod capture;
mod config;
mod devices;
mod gallery;
mod gui;
mod imaging;
mod preview;
mod stack;
mod timer;

use camera::drivers;
use capture::CaptureOperation;
use config::Configuration;
use devices::stage::{CommandChannel, StageCommand};
use gallery::Gallery;
use glib::clone;
use gtk::gio::prelude::*;
use preview::PreviewPoller;
use stack::StackSequencer;
use std::{cell::RefCell, path::PathBuf, rc::Rc};
use timer::OneShotTimer;

pub const VERSION_STRING: &'static str = include_str!(concat!(env!("OUT_DIR"), "/version"));

pub struct ProgramData {
    config: Configuration,
    drivers: Vec<Box<dyn camera::Driver>>,
    camera: Option<Box<dyn camera::Camera>>,
    /// Focus stage controller.
    stage: CommandChannel,
    capture_op: CaptureOperation,
    sequencer: StackSequencer,
    /// Calls the sequencer's `tick` after each delay it requests.
    stack_timer: OneShotTimer,
    preview: PreviewPoller,
    preview_timer: OneShotTimer,
    gallery: Gallery,
    /// Image to show in the preview area when live preview is not active.
    last_selected_image: Option<PathBuf>,
    /// Non-empty after the main window creation.
    gui: Option<gui::GuiData>
}

impl ProgramData {
    /// Makes sure the stage is released and the camera is closed before the drivers.
    fn shut_down(&mut self) {
        self.stack_timer.stop();
        self.preview_timer.stop();
        if self.sequencer.is_running() {
            log::warn!("program ending during stack capture; releasing the stage");
            let _ = self.stage.send(StageCommand::Release);
        }
        self.stage.disconnect();
        self.camera = None;
        self.drivers.clear();
    }
}

fn main() {
    let args = args::parse_command_line(std::env::args());

    if args.logging { set_up_logging(); }

    if gtk::init().is_err() {
        println!("Failed to initialize GTK.");
        return;
    }

    log::info!("Microstacker ver. {} on {} started", VERSION_STRING, os_info::get());

    let main_context = glib::MainContext::default();
    let _guard = match main_context.acquire() {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to acquire the main context: {}.", e);
            return;
        }
    };

    let config = Configuration::new();
    let disabled_drivers = config.disabled_drivers();
    if !disabled_drivers.is_empty() {
        log::info!("the following drivers are disabled in the configuration file: {}", disabled_drivers.join(", "));
    }
    let disabled_drivers: Vec<&str> = disabled_drivers.iter().map(|d| d.as_str()).collect();
    let mut drivers = drivers::init_drivers(&disabled_drivers);
    let camera = drivers::open_first_camera(&mut drivers);

    let capture_root = args.capture_dir.unwrap_or_else(|| config.capture_dir());
    log::info!("capture folder: {}", capture_root.display());

    let program_data_rc = Rc::new(RefCell::new(ProgramData{
        drivers,
        camera,
        stage: CommandChannel::new(),
        capture_op: CaptureOperation::new(&capture_root),
        sequencer: StackSequencer::new(config.capture_failure_policy()),
        stack_timer: OneShotTimer::new(),
        preview: PreviewPoller::new(config.preview_interval()),
        preview_timer: OneShotTimer::new(),
        gallery: Gallery::scan(&capture_root),
        last_selected_image: None,
        gui: None,
        config
    }));

    let application = gtk::Application::new(
        None,
        Default::default(),
    );

    application.connect_activate(clone!(
        @weak program_data_rc
        => @default-panic, move |app| {
        gui::init_main_window(&app, &program_data_rc);
    }));

    application.run_with_args::<String>(&[]); // make GTK ignore command-line arguments

    program_data_rc.borrow_mut().shut_down();
}

fn set_up_logging() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("{}\n\n{}", info, backtrace);
    }));

    let tz_offset = chrono::Local::now().offset().local_minus_utc();
    let logfile = dirs::data_dir().unwrap_or(std::path::Path::new("").to_path_buf())
        .join(format!("microstacker_{}.log", chrono::Local::now().format("%Y-%m-%d_%H%M%S")));

    let file = match std::fs::File::create(&logfile) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to create log file {}: {}.", logfile.to_string_lossy(), e);
            return;
        }
    };
    println!("Logging to: {}", logfile.to_string_lossy());

    let result = simplelog::WriteLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::ConfigBuilder::new()
            .set_target_level(simplelog::LevelFilter::Error)
            .set_time_offset(time::UtcOffset::from_whole_seconds(tz_offset).unwrap_or(time::UtcOffset::UTC))
            .set_time_format_custom(simplelog::format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
            ))
            .build(),
        file
    );
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}.", e);
    }
}
