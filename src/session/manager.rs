//! 会话管理
//!
//! submit_user_message 是对外唯一入口：按 session id 加载状态、追加用户消息、跑一轮路由图、保存状态。
//! 同一会话的多个请求由会话级互斥锁串行化；不同会话互不阻塞。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::{AgentError, ConversationState};
use crate::graph::{RoutingGraph, TurnOutcome};
use crate::memory::Message;
use crate::session::CheckpointStore;

/// 一轮的对外结果
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    /// end_chat 触发，会话已结束
    pub ended: bool,
    /// 本轮失败（已回滚并返回致歉）时为 None
    pub outcome: Option<TurnOutcome>,
}

pub struct SessionManager {
    graph: Arc<RoutingGraph>,
    store: Arc<dyn CheckpointStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(graph: Arc<RoutingGraph>, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            graph,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// 读取会话当前状态（不存在时为空状态）
    pub async fn state(&self, session_id: &str) -> Result<ConversationState, AgentError> {
        Ok(self.store.load(session_id).await?.unwrap_or_default())
    }

    /// 当前持有互斥锁条目的会话数
    pub async fn active_sessions(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn submit_user_message(&self, session_id: &str, text: &str) -> Result<TurnReply, AgentError> {
        let lock = self.lock_for(session_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(session_id, text).await
        };
        self.release_lock(session_id, lock).await;
        result
    }

    /// 与 submit_user_message 相同，但存储等错误也转为致歉回复，供 REPL 等长期运行的入口使用
    pub async fn reply_or_apologize(&self, session_id: &str, text: &str) -> TurnReply {
        match self.submit_user_message(session_id, text).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(session_id, error = %err, "turn failed");
                TurnReply {
                    text: self.graph.recovery().apology(&err),
                    ended: false,
                    outcome: None,
                }
            }
        }
    }

    /// 没有其他请求持有或等待该锁时移除条目
    async fn release_lock(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        let same = locks.get(session_id).is_some_and(|l| Arc::ptr_eq(l, &lock));
        if same && Arc::strong_count(&lock) == 2 {
            locks.remove(session_id);
        }
    }

    async fn run_locked(&self, session_id: &str, text: &str) -> Result<TurnReply, AgentError> {
        let mut state = self.store.load(session_id).await?.unwrap_or_default();
        let snapshot = state.clone();
        state.append_message(Message::user(text));

        match self.graph.run_turn(&mut state).await {
            Ok(result) => {
                tracing::info!(
                    session_id,
                    outcome = ?result.outcome,
                    nodes = result.path.len(),
                    "turn finished"
                );
                let ended = result.outcome == TurnOutcome::SessionEnded;
                if ended {
                    self.store.remove(session_id).await?;
                } else {
                    self.store.save(session_id, &state).await?;
                }
                Ok(TurnReply {
                    text: result.reply,
                    ended,
                    outcome: Some(result.outcome),
                })
            }
            Err(err) => {
                tracing::warn!(session_id, error = %err, "turn aborted, restoring pre-turn state");
                let apology = self.graph.recovery().apology(&err);
                let mut state = snapshot;
                state.append_message(Message::user(text));
                state.append_message(Message::from_node("Communicate", apology.clone()));
                self.store.save(session_id, &state).await?;
                Ok(TurnReply {
                    text: apology,
                    ended: false,
                    outcome: None,
                })
            }
        }
    }
}
