pub mod clipboard;
pub mod speech;
