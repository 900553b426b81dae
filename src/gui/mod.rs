//! Terminal front ends.

mod device_selector;
mod error;

pub use device_selector::{device_selector, SelectorState};
pub use error::GuiError;
