//! Audio capture and playback.
//!
//! The pipeline works on 16 kHz mono 16-bit PCM. Device backends convert to
//! and from whatever the hardware offers.

pub mod convert;
pub mod player;
pub mod recorder;

#[cfg(feature = "cpal-audio")]
pub mod capture;
#[cfg(feature = "cpal-audio")]
pub mod playback;
