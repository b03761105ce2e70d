//! 路由图构建器
//!
//! 提供流畅的 API 组装 Supervisor、worker 节点、终止节点与澄清节点，并在 build 时校验拓扑：
//! worker 一律回到 Supervisor，澄清节点执行后中断本轮并回到 Supervisor，终止节点结束本轮。

use std::collections::BTreeMap;

use crate::core::RecoveryEngine;
use crate::graph::engine::{RoutingGraph, Transition};
use crate::graph::{GraphError, NodeName, Responder, Supervisor};
use crate::react::Worker;

pub const DEFAULT_MAX_SUPERVISOR_DECISIONS: usize = 15;

pub struct GraphBuilder {
    supervisor: Option<Supervisor>,
    workers: BTreeMap<NodeName, Worker>,
    terminal: Option<(NodeName, Responder)>,
    clarification: Option<(NodeName, Responder)>,
    max_decisions: usize,
    recovery: RecoveryEngine,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            supervisor: None,
            workers: BTreeMap::new(),
            terminal: None,
            clarification: None,
            max_decisions: DEFAULT_MAX_SUPERVISOR_DECISIONS,
            recovery: RecoveryEngine::default(),
        }
    }

    pub fn supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// 添加 worker 节点
    pub fn worker(mut self, name: NodeName, worker: Worker) -> Self {
        self.workers.insert(name, worker);
        self
    }

    /// 设置终止节点
    pub fn terminal(mut self, name: NodeName, responder: Responder) -> Self {
        self.terminal = Some((name, responder));
        self
    }

    /// 设置澄清节点（执行后中断本轮）
    pub fn clarification(mut self, name: NodeName, responder: Responder) -> Self {
        self.clarification = Some((name, responder));
        self
    }

    pub fn max_supervisor_decisions(mut self, max: usize) -> Self {
        self.max_decisions = max;
        self
    }

    pub fn recovery(mut self, recovery: RecoveryEngine) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn build(self) -> Result<RoutingGraph, GraphError> {
        let supervisor = self
            .supervisor
            .ok_or_else(|| GraphError::InvalidConfiguration("supervisor is required".to_string()))?;
        let terminal = self.terminal.ok_or(GraphError::MissingTerminal)?;
        if self.workers.is_empty() {
            return Err(GraphError::NoWorkers);
        }
        if self.max_decisions == 0 {
            return Err(GraphError::InvalidConfiguration(
                "max_supervisor_decisions must be at least 1".to_string(),
            ));
        }

        let mut edges = BTreeMap::new();
        edges.insert(terminal.0, Transition::End);
        if let Some((name, _)) = &self.clarification {
            if *name == terminal.0 {
                return Err(GraphError::InvalidConfiguration(format!(
                    "{} cannot be both terminal and clarification node",
                    name
                )));
            }
            edges.insert(*name, Transition::InterruptThen(NodeName::Supervisor));
        }
        for name in self.workers.keys() {
            if *name == NodeName::Supervisor || edges.contains_key(name) {
                return Err(GraphError::InvalidConfiguration(format!(
                    "{} cannot be used as a worker node",
                    name
                )));
            }
            edges.insert(*name, Transition::Goto(NodeName::Supervisor));
        }
        if terminal.0 == NodeName::Supervisor {
            return Err(GraphError::InvalidConfiguration(
                "Supervisor cannot be the terminal node".to_string(),
            ));
        }

        let routes = supervisor.routes();
        if !routes.contains(supervisor.default_route()) {
            return Err(GraphError::DefaultRouteNotInTable(supervisor.default_route()));
        }
        for route in routes.routes() {
            if let Some(node) = routes.resolve(route) {
                if !edges.contains_key(&node) {
                    return Err(GraphError::DanglingRoute { route, node });
                }
            }
        }

        Ok(RoutingGraph::new(
            supervisor,
            self.workers,
            terminal,
            self.clarification,
            edges,
            self.max_decisions,
            self.recovery,
        ))
    }
}
