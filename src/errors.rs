// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error type shared by every renderer and device.  All errors are
//! reported synchronously to whoever called the renderer; a buffer
//! that was being written when an error surfaced should not be
//! trusted.

use std::result;

/// Everything that can go wrong while rendering.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum MandelError {
    /// The inputs were malformed: an empty or inverted viewport, a
    /// zero iteration cap, a zero-sized image or launch geometry.
    /// Raised before any pixel is computed.
    #[fail(display = "precondition failed: {}", _0)]
    Precondition(String),

    /// The device could not provide or find the memory asked of it,
    /// or the host and device buffers disagree on shape.
    #[fail(display = "device resource error: {}", _0)]
    Resource(String),

    /// A worker thread died while rendering.
    #[fail(display = "a render worker panicked")]
    WorkerPanicked,
}

impl MandelError {
    pub(crate) fn precondition<S: Into<String>>(msg: S) -> Self {
        MandelError::Precondition(msg.into())
    }

    pub(crate) fn resource<S: Into<String>>(msg: S) -> Self {
        MandelError::Resource(msg.into())
    }

    /// True if the error was raised by input validation.
    pub fn is_precondition(&self) -> bool {
        match *self {
            MandelError::Precondition(_) => true,
            _ => false,
        }
    }

    /// True if the error came from device memory management.
    pub fn is_resource(&self) -> bool {
        match *self {
            MandelError::Resource(_) => true,
            _ => false,
        }
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = result::Result<T, MandelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_classify_themselves() {
        assert!(MandelError::precondition("bad").is_precondition());
        assert!(!MandelError::precondition("bad").is_resource());
        assert!(MandelError::resource("gone").is_resource());
        assert!(!MandelError::WorkerPanicked.is_precondition());
    }

    #[test]
    fn errors_display_their_cause() {
        let e = MandelError::resource("out of device memory");
        assert_eq!(format!("{}", e), "device resource error: out of device memory");
    }
}
