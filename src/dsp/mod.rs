//! # DSP Building Blocks
//!
//! - **`delay_line`**: the stereo ring buffer pair with its scalar and
//!   vectorized kernels. This is where all the audio work happens.
//!
//! - **`load`**: measures each block's processing time against its
//!   real-time deadline and smooths it into a load estimate for display.

pub mod delay_line;
pub mod load;
