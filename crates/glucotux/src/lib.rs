//! Read stored measurements from Contour USB glucose meters.
//!
//! glucotux talks to the meter over the Linux hiddev interface, runs the
//! meter's ASTM E1394 transfer and turns every result record into one line
//! of a flat log file.
//!
//! # Crate Structure
//!
//! - [`transport`]: hiddev discovery, attachment polling, raw report I/O
//! - [`frame`]: ASTM frame codec, field splitting, paced HID link
//! - [`session`]: the readout state machine, record decoding, log output

/// Re-export transport types.
pub mod transport {
    pub use glucotux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use glucotux_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use glucotux_session::*;
}
