pub mod config;
pub mod counter;
pub mod depth;
pub mod pose;
pub mod raycast;
pub mod scheduler;
pub mod session;
pub mod triangulation;
