pub mod car;
pub mod config;
pub mod ir;
pub mod listener;
pub mod messages;
pub mod motion;
pub mod runtime;
pub mod servo;

pub use car::DeskBit;
