//! Restaurant service simulation: a waiter seats parties, takes orders,
//! runs plates from the kitchen and sends diners home against the clock.

pub mod audio;
pub mod config;
pub mod debug;
pub mod ecs;
pub mod error;
pub mod input;
pub mod kitchen;
pub mod party;
pub mod queue;
pub mod render;
pub mod restaurant;
pub mod scoring;
pub mod session;
pub mod tables;
pub mod trail;
pub mod util;

pub use config::LevelConfig;
pub use restaurant::Restaurant;
