pub mod notification;
pub mod pdf;
pub mod presentation;
pub mod script;
pub mod settings;
pub mod tags;
pub mod view_state;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use settings::Settings;
pub use viewer::{PointerDown, Viewer};
