pub mod app;
pub mod map;
pub mod ui;
