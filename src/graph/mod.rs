//! 路由图：Supervisor 决策、worker / 回复节点、拓扑构建与执行

pub mod builder;
pub mod engine;
pub mod responder;
pub mod supervisor;
pub mod types;

pub use builder::{GraphBuilder, DEFAULT_MAX_SUPERVISOR_DECISIONS};
pub use engine::{RoutingGraph, Transition};
pub use responder::Responder;
pub use supervisor::{decision_format_instructions, parse_decision, Supervisor, SupervisorDecision};
pub use types::{GraphError, NodeName, Route, RouteTable, TurnOutcome, TurnResult};
