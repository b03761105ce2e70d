//! 路由图类型定义
//!
//! 节点名与路由均为封闭枚举；模型输出只有映射到 Route 之后才能作为控制流选择器。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 图中所有静态已知的节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeName {
    Supervisor,
    DateTime,
    Calendar,
    Communicate,
    HumanClarification,
}

impl NodeName {
    pub const ALL: [NodeName; 5] = [
        NodeName::Supervisor,
        NodeName::DateTime,
        NodeName::Calendar,
        NodeName::Communicate,
        NodeName::HumanClarification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeName::Supervisor => "Supervisor",
            NodeName::DateTime => "DateTime",
            NodeName::Calendar => "Calendar",
            NodeName::Communicate => "Communicate",
            NodeName::HumanClarification => "HumanClarification",
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeName {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| GraphError::UnknownNode(s.to_string()))
    }
}

/// Supervisor 可选择的决策值
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Route {
    DateTime,
    Calendar,
    Communicate,
    HumanClarification,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::DateTime,
        Route::Calendar,
        Route::Communicate,
        Route::HumanClarification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::DateTime => "DateTime",
            Route::Calendar => "Calendar",
            Route::Communicate => "Communicate",
            Route::HumanClarification => "HumanClarification",
        }
    }

    /// 严格匹配（区分大小写，允许首尾空白）
    pub fn parse(s: &str) -> Option<Route> {
        let s = s.trim();
        Route::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 决策值 -> 节点名；构建时固定，运行时只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: BTreeMap<Route, NodeName>,
}

impl RouteTable {
    pub fn new(entries: impl IntoIterator<Item = (Route, NodeName)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// 每个路由指向同名节点
    pub fn standard() -> Self {
        Self::new([
            (Route::DateTime, NodeName::DateTime),
            (Route::Calendar, NodeName::Calendar),
            (Route::Communicate, NodeName::Communicate),
            (Route::HumanClarification, NodeName::HumanClarification),
        ])
    }

    pub fn resolve(&self, route: Route) -> Option<NodeName> {
        self.entries.get(&route).copied()
    }

    pub fn contains(&self, route: Route) -> bool {
        self.entries.contains_key(&route)
    }

    pub fn routes(&self) -> Vec<Route> {
        self.entries.keys().copied().collect()
    }

    pub fn targets(&self) -> impl Iterator<Item = NodeName> + '_ {
        self.entries.values().copied()
    }
}

/// 一轮结束的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// 终止节点给出了回复
    Completed,
    /// 澄清节点提问后中断，等待用户回答
    AwaitingClarification,
    /// end_chat 结束了会话
    SessionEnded,
}

/// 一轮执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub reply: String,
    pub outcome: TurnOutcome,
    /// 按执行顺序记录的节点
    pub path: Vec<NodeName>,
}

/// 图构建错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
    #[error("Graph has no terminal node")]
    MissingTerminal,
    #[error("Graph has no worker nodes")]
    NoWorkers,
    #[error("Route {route} points to {node}, which is not part of the graph")]
    DanglingRoute { route: Route, node: NodeName },
    #[error("Default route {0} is not in the route table")]
    DefaultRouteNotInTable(Route),
    #[error("Invalid graph configuration: {0}")]
    InvalidConfiguration(String),
}
