//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Image strip: captured images grouped by folder.
//!

use crate::gallery::{Addition, Gallery, GalleryEntry};
use crate::capture::SINGLES_FOLDER;
use crate::gui::freezeable::Freezeable;
use gtk::gdk_pixbuf::Pixbuf;
use gtk::prelude::*;
use std::collections::HashMap;

mod columns {
    pub const THUMBNAIL: u32 = 0;
    /// Folder or file name.
    pub const LABEL: u32 = 1;
    /// For image rows: name of the parent folder; empty for folder rows.
    pub const FOLDER: u32 = 2;
}

const STRIP_WIDTH: i32 = 220;

pub struct ImageStrip {
    top_widget: gtk::ScrolledWindow,
    tree_view: gtk::TreeView,
    store: gtk::TreeStore,
    selection: Freezeable<gtk::TreeSelection>,
    /// Key: folder name.
    folder_rows: HashMap<String, gtk::TreeIter>
}

impl ImageStrip {
    /// Creates the strip; `on_select` is called when the user selects an image.
    pub fn new(on_select: Box<dyn Fn(GalleryEntry)>) -> ImageStrip {
        let store = gtk::TreeStore::new(&[Pixbuf::static_type(), String::static_type(), String::static_type()]);
        let tree_view = gtk::TreeView::with_model(&store);
        tree_view.set_headers_visible(false);

        let column = gtk::TreeViewColumn::new();
        let thumbnail_renderer = gtk::CellRendererPixbuf::new();
        column.pack_start(&thumbnail_renderer, false);
        column.add_attribute(&thumbnail_renderer, "pixbuf", columns::THUMBNAIL as i32);
        let text_renderer = gtk::CellRendererText::new();
        column.pack_start(&text_renderer, true);
        column.add_attribute(&text_renderer, "text", columns::LABEL as i32);
        tree_view.append_column(&column);

        let selection = tree_view.selection();
        selection.set_mode(gtk::SelectionMode::Single);
        let signal = selection.connect_changed(move |selection| {
            if let Some((model, iter)) = selection.selected() {
                let folder = model.value(&iter, columns::FOLDER as i32).get::<String>().unwrap_or_default();
                let name = model.value(&iter, columns::LABEL as i32).get::<String>().unwrap_or_default();
                if !folder.is_empty() {
                    on_select(GalleryEntry{ folder, name });
                }
            }
        });

        let top_widget = gtk::ScrolledWindow::new::<gtk::Adjustment, gtk::Adjustment>(None, None);
        top_widget.set_policy(gtk::PolicyType::Never, gtk::PolicyType::Automatic);
        top_widget.set_size_request(STRIP_WIDTH, -1);
        top_widget.add(&tree_view);

        ImageStrip{
            top_widget,
            tree_view,
            store,
            selection: Freezeable::new(selection, Some(signal)),
            folder_rows: HashMap::new()
        }
    }

    pub fn top_widget(&self) -> &gtk::ScrolledWindow { &self.top_widget }

    /// Fills the strip with the gallery's contents; `Singles` is expanded.
    pub fn populate(&mut self, gallery: &Gallery) {
        self.selection.freeze();
        self.store.clear();
        self.folder_rows.clear();

        for folder in gallery.folders() {
            let folder_row = self.insert_folder(&folder.name, None);
            for name in &folder.images {
                self.store.insert_with_values(
                    Some(&folder_row),
                    None,
                    &[(columns::LABEL, name), (columns::FOLDER, &folder.name)]
                );
            }
            if folder.name == SINGLES_FOLDER {
                if let Some(path) = self.store.path(&folder_row) {
                    self.tree_view.expand_row(&path, false);
                }
            }
        }
        self.selection.thaw();
    }

    /// Adds a newly captured image (and its folder at the gallery's position, if needed) and selects it without notifying `on_select`.
    pub fn add_image(&mut self, entry: &GalleryEntry, addition: &Addition, thumbnail: Option<Pixbuf>) {
        if *addition != Addition::AlreadyPresent {
            let folder_row = match (self.folder_rows.get(&entry.folder), addition) {
                (Some(row), _) => row.clone(),
                (None, Addition::AddedWithFolder{ folder_index }) => self.insert_folder(&entry.folder, Some(*folder_index)),
                (None, _) => self.insert_folder(&entry.folder, None)
            };
            let row = self.store.insert_with_values(
                Some(&folder_row),
                None,
                &[(columns::LABEL, &entry.name), (columns::FOLDER, &entry.folder)]
            );
            if let Some(thumbnail) = thumbnail {
                self.store.set_value(&row, columns::THUMBNAIL, &thumbnail.to_value());
            }
        }

        self.select(entry);
    }

    /// Selects the entry's row (if present) without notifying `on_select`.
    pub fn select(&self, entry: &GalleryEntry) {
        let row = match self.find_image_row(entry) {
            Some(row) => row,
            None => return
        };
        let path = match self.store.path(&row) {
            Some(path) => path,
            None => return
        };

        self.tree_view.expand_to_path(&path);
        self.selection.freeze();
        self.selection.select_iter(&row);
        self.selection.thaw();
        self.tree_view.scroll_to_cell(Some(&path), None::<&gtk::TreeViewColumn>, false, 0.0, 0.0);
    }

    /// Inserts a top-level folder row at `position` (or at the end).
    fn insert_folder(&mut self, name: &str, position: Option<usize>) -> gtk::TreeIter {
        let row = self.store.insert_with_values(
            None,
            position.map(|p| p as u32),
            &[(columns::LABEL, &name), (columns::FOLDER, &"")]
        );
        self.folder_rows.insert(name.to_string(), row.clone());
        row
    }

    fn find_image_row(&self, entry: &GalleryEntry) -> Option<gtk::TreeIter> {
        let folder_row = self.folder_rows.get(&entry.folder)?;
        let row = self.store.iter_children(Some(folder_row))?;
        loop {
            if self.store.value(&row, columns::LABEL as i32).get::<String>().ok().as_deref() == Some(entry.name.as_str()) {
                return Some(row);
            }
            if !self.store.iter_next(&row) { return None; }
        }
    }
}
