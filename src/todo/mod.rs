pub mod board;
pub mod data;
pub mod lenient;
pub mod timestamp;
pub mod util;

pub use board::{BoardState, TaskBoard};
pub use data::{Category, NewCategory, NewTask, Progress, Task};
