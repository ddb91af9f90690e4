pub mod commands;
pub mod cycle;
pub mod scheduler;

pub use scheduler::ReadingScheduler;
