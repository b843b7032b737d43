pub mod device;
#[cfg(target_os = "linux")]
pub mod framebuffer;
pub mod playback;
pub mod screen;

pub use device::{DisplayDevice, MemoryDevice};
#[cfg(target_os = "linux")]
pub use framebuffer::FramebufferDevice;
pub use playback::{
    FeedbackLine, NullFeedback, PlaybackState, Scheduler, Signal, SignalPort, SignalSource, Start,
    signal_channel,
};
pub use screen::{LoadedSequence, Screen};
