//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Widget wrapper with a blockable signal handler.
//!

/// Wraps an object together with the handler of its "user changed something" signal.
///
/// Programmatic changes (filling a combo box, selecting a newly captured image) are made between `freeze` and `thaw`,
/// so that they are not mistaken for user actions.
pub struct Freezeable<T: glib::ObjectExt> {
    object: T,
    signal: Option<glib::SignalHandlerId>
}

impl<T: glib::ObjectExt> Freezeable<T> {
    pub fn new(object: T, signal: Option<glib::SignalHandlerId>) -> Freezeable<T> {
        Freezeable{ object, signal }
    }

    pub fn freeze(&self) {
        if let Some(signal) = &self.signal { self.object.block_signal(signal); }
    }

    pub fn thaw(&self) {
        if let Some(signal) = &self.signal { self.object.unblock_signal(signal); }
    }
}

impl<T: glib::ObjectExt> Drop for Freezeable<T> {
    fn drop(&mut self) {
        // widgets may emit change signals while being destroyed
        self.freeze();
    }
}

impl<T: glib::ObjectExt> std::ops::Deref for Freezeable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}
