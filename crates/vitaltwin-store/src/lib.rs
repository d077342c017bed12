//! # VitalTwin存储模块
//!
//! 定义读数与预测记录的存储接口，并提供内存参考实现。

pub mod memory;
pub mod repository;

pub use memory::{InMemoryStore, StoreSnapshot};
pub use repository::{PredictionStore, ReadingStore, SortOrder};
