//! 数据模型模块

pub mod question;

pub use question::{HarvestReport, HarvestedQuestion, RawContainer};
