mod framebuffer;
mod glyphs;
mod renderer;
mod window;

pub use renderer::SoftwareRenderer;
pub use window::{BackendError, FrameClock, WindowEventPump};
