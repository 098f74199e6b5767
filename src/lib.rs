pub mod bridge;
pub mod config;
pub mod document;
pub mod drag;
pub mod gateway;
pub mod profile;
pub mod render;
pub mod section;
#[doc(hidden)]
pub mod test_support;
pub mod viewer;
