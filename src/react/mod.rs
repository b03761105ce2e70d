//! 推理层：worker 单步解析与有界推理循环

pub mod loop_;
pub mod planner;

pub use loop_::{Worker, WorkerOutput};
pub use planner::{parse_llm_output, MalformedStep, ToolCall, WorkerStep};
