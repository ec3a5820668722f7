//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Image view widget.
//!

use crate::{imaging, timer::OneShotTimer};
use glib::clone;
use gtk::gdk_pixbuf;
use gtk::prelude::*;
use image::{DynamicImage, RgbImage};
use std::cell::RefCell;
use std::rc::Rc;

/// Delay between the last size change and re-scaling of the image.
const RESIZE_DEBOUNCE: std::time::Duration = std::time::Duration::from_millis(50);

struct State {
    source: Option<DynamicImage>,
    /// Size of the view the displayed image was scaled for.
    rendered_for: Option<(i32, i32)>
}

/// Displays an image scaled to fit the available area (preserving aspect ratio), centered.
pub struct ImgView {
    top_widget: gtk::ScrolledWindow,
    image_widget: gtk::Image,
    state: Rc<RefCell<State>>,
    /// Keeps the debouncing timer alive together with the view.
    _resize_timer: Rc<OneShotTimer>
}

pub fn to_pixbuf(image: RgbImage) -> gdk_pixbuf::Pixbuf {
    let (width, height) = image.dimensions();
    gdk_pixbuf::Pixbuf::from_mut_slice(
        image.into_raw(),
        gdk_pixbuf::Colorspace::Rgb,
        false,
        8,
        width as i32,
        height as i32,
        3 * width as i32
    )
}

fn render(image_widget: &gtk::Image, state: &mut State, width: i32, height: i32) {
    state.rendered_for = Some((width, height));

    let source = match &state.source {
        Some(source) => source,
        None => { image_widget.clear(); return; }
    };

    match imaging::scale_to_fit(source, width.max(0) as u32, height.max(0) as u32) {
        Some(scaled) => image_widget.set_from_pixbuf(Some(&to_pixbuf(scaled))),
        None => image_widget.clear()
    }
}

impl ImgView {
    pub fn new() -> ImgView {
        let top_widget = gtk::ScrolledWindow::new::<gtk::Adjustment, gtk::Adjustment>(None, None);
        // the image follows the view's size, not the other way round
        top_widget.set_policy(gtk::PolicyType::External, gtk::PolicyType::External);
        top_widget.set_hexpand(true);
        top_widget.set_vexpand(true);

        let image_widget = gtk::Image::new();
        image_widget.set_halign(gtk::Align::Center);
        image_widget.set_valign(gtk::Align::Center);
        top_widget.add(&image_widget);

        let state = Rc::new(RefCell::new(State{ source: None, rendered_for: None }));
        let resize_timer = Rc::new(OneShotTimer::new());

        top_widget.connect_size_allocate(clone!(
            @weak state,
            @weak image_widget,
            @weak resize_timer
            => @default-panic, move |widget, _| {
                let size = (widget.allocated_width(), widget.allocated_height());
                if state.borrow().rendered_for == Some(size) { return; }

                resize_timer.run_once(RESIZE_DEBOUNCE, clone!(@weak state, @weak image_widget => move || {
                    render(&image_widget, &mut state.borrow_mut(), size.0, size.1);
                }));
            }
        ));

        ImgView{ top_widget, image_widget, state, _resize_timer: resize_timer }
    }

    pub fn top_widget(&self) -> &gtk::ScrolledWindow { &self.top_widget }

    pub fn set_image(&self, image: DynamicImage) {
        let mut state = self.state.borrow_mut();
        state.source = Some(image);
        render(
            &self.image_widget,
            &mut state,
            self.top_widget.allocated_width(),
            self.top_widget.allocated_height()
        );
    }
}
