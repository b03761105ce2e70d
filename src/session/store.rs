//! 会话 checkpoint 存储
//!
//! 按 session id 保存 ConversationState：内存实现用于测试与单进程，文件实现每个会话一个 JSON 文件。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::{AgentError, ConversationState};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// 不存在时返回 None
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, AgentError>;

    async fn save(&self, session_id: &str, state: &ConversationState) -> Result<(), AgentError>;

    async fn remove(&self, session_id: &str) -> Result<(), AgentError>;
}

#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, AgentError> {
        Ok(self.states.read().await.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, state: &ConversationState) -> Result<(), AgentError> {
        self.states
            .write()
            .await
            .insert(session_id.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<(), AgentError> {
        self.states.write().await.remove(session_id);
        Ok(())
    }
}

/// 文件存储：`<dir>/<session_id>.json`；父目录不存在时自动创建
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// session id 中非字母数字字符替换为 `_`，避免路径穿越
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    async fn read(&self, path: &Path) -> anyhow::Result<Option<ConversationState>> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn write(&self, path: &Path, state: &ConversationState) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(path, serde_json::to_string_pretty(state)?).await?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, AgentError> {
        self.read(&self.path_for(session_id))
            .await
            .map_err(|e| AgentError::Checkpoint(format!("load {}: {}", session_id, e)))
    }

    async fn save(&self, session_id: &str, state: &ConversationState) -> Result<(), AgentError> {
        self.write(&self.path_for(session_id), state)
            .await
            .map_err(|e| AgentError::Checkpoint(format!("save {}: {}", session_id, e)))
    }

    async fn remove(&self, session_id: &str) -> Result<(), AgentError> {
        match tokio::fs::remove_file(self.path_for(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AgentError::Checkpoint(format!("remove {}: {}", session_id, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;

    fn sample() -> ConversationState {
        let mut state = ConversationState::new();
        state.append_message(Message::user("hello"));
        state.append_agent_history(Message::from_node("Calendar", "No upcoming events!"));
        state
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("a").await.unwrap().is_none());
        store.save("a", &sample()).await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), Some(sample()));
        store.remove("a").await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_file_store_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("sessions"));

        assert!(store.load("thread-1").await.unwrap().is_none());
        store.save("thread-1", &sample()).await.unwrap();
        assert!(store.path_for("thread-1").exists());
        assert_eq!(store.load("thread-1").await.unwrap(), Some(sample()));

        store.remove("thread-1").await.unwrap();
        assert!(!store.path_for("thread-1").exists());
        // 再次删除不报错
        store.remove("thread-1").await.unwrap();
    }

    #[test]
    fn test_path_is_sanitized() {
        let store = FileCheckpointStore::new("/tmp/cp");
        assert_eq!(store.path_for("../etc/passwd"), PathBuf::from("/tmp/cp/___etc_passwd.json"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        std::fs::write(store.path_for("bad"), "not json").unwrap();
        assert!(matches!(store.load("bad").await, Err(AgentError::Checkpoint(_))));
    }
}
