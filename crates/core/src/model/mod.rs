pub mod entry;
pub mod frame;
