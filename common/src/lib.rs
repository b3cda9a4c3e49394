pub mod logging;
pub mod service;
