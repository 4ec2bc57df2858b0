pub mod frames;
pub mod tick_clock;
pub mod time;
