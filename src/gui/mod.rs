//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! GUI module.
//!

mod camera_gui;
mod freezeable;
mod img_view;
mod stack_gui;
mod stage_gui;
mod strip;

use camera_gui::CameraWidgets;
use crate::capture::CapturedImage;
use crate::gallery::GalleryEntry;
use crate::{imaging, timer::OneShotTimer, ProgramData};
use glib::clone;
use gtk::prelude::*;
use img_view::ImgView;
use stack_gui::{StackWidgets, STACK_ACTIVE_CLASS};
use stage_gui::StageWidgets;
use std::{cell::RefCell, path::Path, rc::Rc};
use strip::ImageStrip;

/// Control padding in pixels.
const PADDING: u32 = 10;

const CONTROLS_WIDTH: i32 = 300;

/// Delay between showing the main window and displaying the initially selected image.
const INITIAL_DISPLAY_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

pub struct GuiData {
    camera_widgets: CameraWidgets,
    stage_widgets: StageWidgets,
    stack_widgets: StackWidgets,
    preview_area: ImgView,
    strip: ImageStrip,
    initial_display_timer: OneShotTimer
}

fn install_css() {
    let provider = gtk::CssProvider::new();
    let css = format!(
        ".{} {{ background-image: none; background-color: #3c9c3c; color: white; }}",
        STACK_ACTIVE_CLASS
    );
    if let Err(e) = provider.load_from_data(css.as_bytes()) {
        log::error!("failed to load CSS: {}", e);
        return;
    }
    match gtk::gdk::Screen::default() {
        Some(screen) => gtk::StyleContext::add_provider_for_screen(
            &screen,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION as u32
        ),
        None => log::warn!("no default screen; custom styles not installed")
    }
}

pub fn init_main_window(app: &gtk::Application, program_data_rc: &Rc<RefCell<ProgramData>>) {
    install_css();

    let app_window = gtk::ApplicationWindow::new(app);
    app_window.set_title("Microstacker");
    app_window.resize(1280, 800);

    let (stage_defaults, stack_defaults, default_device) = {
        let program_data = program_data_rc.borrow();
        let config = &program_data.config;
        (config.stage_default_baud_rate(), config.stack_defaults(), config.stage_default_device())
    };

    let camera_widgets = camera_gui::create_camera_box(program_data_rc);
    let stage_widgets = stage_gui::create_stage_boxes(program_data_rc, stage_defaults, stack_defaults.manual_angle);
    let stack_widgets = stack_gui::create_stack_box(program_data_rc, &stack_defaults);

    let controls_box = gtk::Box::new(gtk::Orientation::Vertical, 0);
    controls_box.pack_start(camera_widgets.frame(), false, false, PADDING / 2);
    controls_box.pack_start(stage_widgets.connection_frame(), false, false, PADDING / 2);
    controls_box.pack_start(stage_widgets.manual_frame(), false, false, PADDING / 2);
    controls_box.pack_start(stack_widgets.frame(), false, false, PADDING / 2);

    let controls_scroller = gtk::ScrolledWindow::new::<gtk::Adjustment, gtk::Adjustment>(None, None);
    controls_scroller.set_policy(gtk::PolicyType::Never, gtk::PolicyType::Automatic);
    controls_scroller.set_size_request(CONTROLS_WIDTH, -1);
    controls_scroller.add(&controls_box);

    let preview_area = ImgView::new();

    let strip = ImageStrip::new(Box::new(clone!(@weak program_data_rc => @default-panic, move |entry| {
        on_strip_selection(&entry, &program_data_rc);
    })));

    let window_contents = gtk::Box::new(gtk::Orientation::Horizontal, 0);
    window_contents.pack_start(&controls_scroller, false, false, PADDING);
    window_contents.pack_start(preview_area.top_widget(), true, true, 0);
    window_contents.pack_start(strip.top_widget(), false, false, PADDING);

    app_window.add(&window_contents);
    app_window.show_all();

    let gui = GuiData{
        camera_widgets,
        stage_widgets,
        stack_widgets,
        preview_area,
        strip,
        initial_display_timer: OneShotTimer::new()
    };

    {
        let mut program_data = program_data_rc.borrow_mut();
        let pd = &mut *program_data;

        match pd.camera.as_deref_mut() {
            Some(camera) => gui.camera_widgets.on_camera_opened(camera),
            None => gui.camera_widgets.on_no_camera()
        }
        gui.stack_widgets.set_camera_available(pd.camera.is_some());

        gui.stage_widgets.update_ports(default_device.as_deref());

        pd.gui = Some(gui);
        if let Some(gui) = pd.gui.as_mut() {
            gui.strip.populate(&pd.gallery);
            gui.initial_display_timer.run_once(INITIAL_DISPLAY_DELAY, clone!(@weak program_data_rc => move || {
                display_initial_image(&program_data_rc);
            }));
        }
    }

    stage_gui::on_connect(program_data_rc);
}

/// WARNING: this recursively enters the main event loop until the message dialog closes; therefore active borrows
/// of `program_data_rc` MUST NOT be held when calling this function.
pub fn show_message(msg: &str, title: &str, msg_type: gtk::MessageType) {
    let dialog = gtk::MessageDialog::new::<gtk::Window>(None, gtk::DialogFlags::MODAL, msg_type, gtk::ButtonsType::Close, msg);
    dialog.set_title(title);
    dialog.run();
    dialog.close();
}

fn display_initial_image(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let entry = match program_data_rc.borrow().gallery.initial_selection() {
        Some(entry) => entry,
        None => return
    };

    if let Some(gui) = program_data_rc.borrow().gui.as_ref() {
        gui.strip.select(&entry);
    }
    on_strip_selection(&entry, program_data_rc);
}

fn on_strip_selection(entry: &GalleryEntry, program_data_rc: &Rc<RefCell<ProgramData>>) {
    let path = program_data_rc.borrow().gallery.image_path(entry);
    show_image_file(&path, None, program_data_rc);
}

/// Records `path` as the selected image and displays it (unless live preview is active).
///
/// `decoded` is the already decoded contents of `path`, if available.
fn show_image_file(path: &Path, decoded: Option<image::DynamicImage>, program_data_rc: &Rc<RefCell<ProgramData>>) {
    let mut program_data = program_data_rc.borrow_mut();
    program_data.last_selected_image = Some(path.to_path_buf());
    if program_data.preview.is_active() { return; }

    let image = match decoded {
        Some(image) => image,
        None => match imaging::load_file(path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("cannot display {}: {}", path.display(), e);
                return;
            }
        }
    };

    if let Some(gui) = program_data.gui.as_ref() {
        gui.preview_area.set_image(image);
    }
}

pub fn show_last_selected_image(program_data_rc: &Rc<RefCell<ProgramData>>) {
    let path = program_data_rc.borrow().last_selected_image.clone();
    if let Some(path) = path {
        show_image_file(&path, None, program_data_rc);
    }
}

/// Adds a newly captured image to the strip, selects and displays it.
pub fn on_image_captured(image: &CapturedImage, program_data_rc: &Rc<RefCell<ProgramData>>) {
    let decoded = match imaging::load_file(&image.file_path) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("cannot decode {}: {}", image.file_path.display(), e);
            None
        }
    };
    let thumbnail = decoded.as_ref().map(|d| img_view::to_pixbuf(imaging::thumbnail(d)));

    {
        let mut program_data = program_data_rc.borrow_mut();
        let pd = &mut *program_data;
        match pd.gallery.add(&image.file_path) {
            Some((entry, addition)) => if let Some(gui) = pd.gui.as_mut() {
                gui.strip.add_image(&entry, &addition, thumbnail);
            },
            None => log::warn!("{} is outside of the capture folder", image.file_path.display())
        }
    }

    show_image_file(&image.file_path, decoded, program_data_rc);
}
