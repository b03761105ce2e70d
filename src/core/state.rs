//! 会话共享状态
//!
//! messages 是用户可见的对话线程，agent_history 是 worker 的内部输出记录，两者都只追加；
//! next 是下一个要执行的节点，每次 Supervisor 决策时覆盖。

use serde::{Deserialize, Serialize};

use crate::graph::NodeName;
use crate::memory::{Message, Role};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    agent_history: Vec<Message>,
    next: NodeName,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            agent_history: Vec::new(),
            next: NodeName::Supervisor,
        }
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn append_agent_history(&mut self, message: Message) {
        self.agent_history.push(message);
    }

    pub fn set_next(&mut self, next: NodeName) {
        self.next = next;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn agent_history(&self) -> &[Message] {
        &self.agent_history
    }

    pub fn next(&self) -> NodeName {
        self.next
    }

    /// 最近一条用户消息
    pub fn latest_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_only_views() {
        let mut state = ConversationState::new();
        assert_eq!(state.next(), NodeName::Supervisor);
        assert!(state.latest_user_message().is_none());

        state.append_message(Message::user("first"));
        state.append_message(Message::from_node("Communicate", "reply"));
        state.append_message(Message::user("second"));
        state.append_agent_history(Message::from_node("Calendar", "3 events"));
        state.set_next(NodeName::Calendar);

        assert_eq!(state.messages().len(), 3);
        assert_eq!(state.agent_history().len(), 1);
        assert_eq!(state.latest_user_message().unwrap().content, "second");
        assert_eq!(state.next(), NodeName::Calendar);
    }

    #[test]
    fn test_state_serializes_for_checkpoints() {
        let mut state = ConversationState::new();
        state.append_message(Message::user("hi"));
        state.set_next(NodeName::HumanClarification);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"next\":\"HumanClarification\""));
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
