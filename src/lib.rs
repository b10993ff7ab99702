pub mod audio;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod interval;
pub mod protocol;
pub mod remote;
pub mod scheduler;
pub mod serial_link;
