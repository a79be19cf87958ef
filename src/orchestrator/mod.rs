//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整批调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<DataRow>)
//!     ↓
//! workflow::RowFlow (处理单行)
//!     ↓
//! services (能力层：layer_resolver / naming / export / report)
//!     ↓
//! host (宿主边界：ScriptingHost / MemoryHost)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有宿主会话
//! 2. **向下依赖**：编排层 → workflow → services → host
//! 3. **无业务逻辑**：只做调度和统计，不做具体替换

pub mod batch_processor;

pub use batch_processor::{run, BatchProcessor, BatchReport};
