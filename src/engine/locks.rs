use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use teloxide::types::ChatId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per chat. Holding it makes a read-modify-write of that
/// chat's session atomic across suspension points; chats never contend.
/// A chat's entry lives only while someone holds or waits for its lock.
#[derive(Debug, Default)]
pub(crate) struct ChatLocks {
    locks: Mutex<HashMap<ChatId, Arc<AsyncMutex<()>>>>,
}

/// Releases the chat lock on drop and forgets the chat once nobody else
/// is queued on it.
pub(crate) struct ChatGuard<'a> {
    chat_id: ChatId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a ChatLocks,
}

impl ChatLocks {
    pub(crate) async fn lock(&self, chat_id: ChatId) -> ChatGuard<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(chat_id)
            .or_default()
            .clone();
        ChatGuard {
            chat_id,
            guard: Some(lock.lock_owned().await),
            locks: self,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Drop for ChatGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.locks.lock().unwrap_or_else(|p| p.into_inner());
        // the map's own handle is the last one: no holder, no waiter
        if locks
            .get(&self.chat_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.chat_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn different_chats_do_not_block() {
        let locks = ChatLocks::default();
        let _first = locks.lock(ChatId(1)).await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.lock(ChatId(2))).await;
        assert!(second.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn same_chat_waits() {
        let locks = ChatLocks::default();
        let _first = locks.lock(ChatId(1)).await;
        let again = tokio::time::timeout(Duration::from_secs(1), locks.lock(ChatId(1))).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn released_chats_are_forgotten() {
        let locks = ChatLocks::default();
        for chat in 1..=50 {
            drop(locks.lock(ChatId(chat)).await);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_someone_waits() {
        let locks = Arc::new(ChatLocks::default());
        let first = locks.lock(ChatId(1)).await;

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.lock(ChatId(1)).await;
                locks.len()
            })
        };
        tokio::task::yield_now().await;

        drop(first);
        assert_eq!(waiting.await.unwrap(), 1);
        assert_eq!(locks.len(), 0);
    }
}
