pub mod set;
pub mod time;
