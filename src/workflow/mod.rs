//! 流程层
//!
//! 定义答题处理循环的完整流程与状态机

pub mod runner;

pub use runner::{AnswerRunner, RunState};
