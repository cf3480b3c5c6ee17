pub mod config;
pub mod data;
pub mod error;
pub mod listener;
pub mod logic;
pub mod players;
pub mod session;
