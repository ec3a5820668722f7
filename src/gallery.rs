//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Index of captured images, grouped by folder.
//!

use crate::capture::SINGLES_FOLDER;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions (lowercase) of files shown in the image strip.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "cr2"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryEntry {
    /// Folder path relative to the capture root, with '/' as separator.
    pub folder: String,
    pub name: String
}

#[derive(Debug, PartialEq, Eq)]
pub enum Addition {
    /// Image added to an existing folder.
    Added,
    /// Image added together with its folder, which is now at `folder_index` in `Gallery::folders`.
    AddedWithFolder{ folder_index: usize },
    AlreadyPresent
}

pub struct Folder {
    pub name: String,
    pub images: Vec<String>
}

pub struct Gallery {
    root: PathBuf,
    /// Sorted by name.
    folders: Vec<Folder>
}

pub fn is_image_file(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => IMAGE_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()),
        None => false
    }
}

impl Gallery {
    pub fn new(root: &Path) -> Gallery {
        Gallery{ root: root.to_path_buf(), folders: vec![] }
    }

    /// Recursively collects images under `root`. Files directly in `root` are not shown.
    pub fn scan(root: &Path) -> Gallery {
        let t_start = std::time::Instant::now();
        let mut gallery = Gallery::new(root);

        for entry in WalkDir::new(root).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_image_file(path) { continue; }

            match gallery.entry_for(path) {
                Some(entry) => gallery.folder_mut(&entry.folder).images.push(entry.name),
                None => log::debug!("skipping {}", path.display())
            }
        }

        for folder in &mut gallery.folders {
            folder.images.sort();
        }

        log::info!(
            "found {} image(s) in {} folder(s) under {}; time taken: {:.2} s",
            gallery.folders.iter().map(|f| f.images.len()).sum::<usize>(),
            gallery.folders.len(),
            root.display(),
            t_start.elapsed().as_secs_f64()
        );

        gallery
    }

    pub fn folders(&self) -> &[Folder] { &self.folders }

    pub fn image_path(&self, entry: &GalleryEntry) -> PathBuf {
        entry.folder.split('/').fold(self.root.clone(), |path, component| path.join(component)).join(&entry.name)
    }

    /// Adds a newly captured image (at the end of its folder).
    pub fn add(&mut self, path: &Path) -> Option<(GalleryEntry, Addition)> {
        let entry = self.entry_for(path)?;

        let new_folder = !self.folders.iter().any(|f| f.name == entry.folder);
        let folder_index = self.folder_index(&entry.folder);
        let folder = &mut self.folders[folder_index];
        if folder.images.contains(&entry.name) {
            return Some((entry, Addition::AlreadyPresent));
        }
        folder.images.push(entry.name.clone());

        Some((entry, if new_folder { Addition::AddedWithFolder{ folder_index } } else { Addition::Added }))
    }

    /// Image to show at startup: the first one in `Singles`, or else the first one overall.
    pub fn initial_selection(&self) -> Option<GalleryEntry> {
        let first_in = |folder: &Folder| folder.images.first().map(
            |name| GalleryEntry{ folder: folder.name.clone(), name: name.clone() }
        );

        self.folders.iter()
            .find(|f| f.name == SINGLES_FOLDER)
            .and_then(first_in)
            .or_else(|| self.folders.iter().find_map(first_in))
    }

    fn entry_for(&self, path: &Path) -> Option<GalleryEntry> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let name = relative.file_name()?.to_string_lossy().to_string();
        let folder = relative.parent()?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        if folder.is_empty() { None } else { Some(GalleryEntry{ folder, name }) }
    }

    /// Returns the index of the folder called `name`; creates the folder (keeping the order) if needed.
    fn folder_index(&mut self, name: &str) -> usize {
        match self.folders.binary_search_by(|f| f.name.as_str().cmp(name)) {
            Ok(idx) => idx,
            Err(idx) => {
                self.folders.insert(idx, Folder{ name: name.to_string(), images: vec![] });
                idx
            }
        }
    }

    fn folder_mut(&mut self, name: &str) -> &mut Folder {
        let idx = self.folder_index(name);
        &mut self.folders[idx]
    }
}
