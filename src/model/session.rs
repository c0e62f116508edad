//! 平台会话的状态机。
//!
//! 每个平台客户端独占一个 `SessionStore`，状态在
//! `Unauthenticated → Authenticating → Authenticated(expiry)` 之间流转。
//! 多个任务同时发现会话失效时，只有拿到刷新锁的那个任务会真正发起认证，
//! 其余任务等待后直接复用新会话。

use std::future::Future;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;

/// 会话的当前阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// 没有凭据，或凭据已过期。
    Unauthenticated,
    /// 正在认证。
    Authenticating,
    /// 持有有效期内的凭据。
    Authenticated,
}

#[derive(Debug)]
enum SessionState<S> {
    Unauthenticated,
    Authenticating,
    Authenticated {
        credentials: S,
        expires_at: DateTime<Utc>,
    },
}

/// 一次成功认证的结果。
#[derive(Debug, Clone)]
pub struct Grant<S> {
    /// 凭据。
    pub credentials: S,
    /// 过期时间。
    pub expires_at: DateTime<Utc>,
}

/// 平台会话的持有者。
#[derive(Debug)]
pub struct SessionStore<S> {
    state: RwLock<SessionState<S>>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl<S: Clone> Default for SessionStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> SessionStore<S> {
    /// 创建一个未认证的会话。
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Unauthenticated),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// 使用已有的凭据（例如从缓存加载）创建会话。
    #[must_use]
    pub fn with_grant(grant: Grant<S>) -> Self {
        Self {
            state: RwLock::new(SessionState::Authenticated {
                credentials: grant.credentials,
                expires_at: grant.expires_at,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// 当前阶段。过期的凭据视为未认证。
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match &*self.state.read() {
            SessionState::Unauthenticated => SessionPhase::Unauthenticated,
            SessionState::Authenticating => SessionPhase::Authenticating,
            SessionState::Authenticated { expires_at, .. } if *expires_at > Utc::now() => {
                SessionPhase::Authenticated
            }
            SessionState::Authenticated { .. } => SessionPhase::Unauthenticated,
        }
    }

    /// 返回有效期内的凭据。
    #[must_use]
    pub fn valid_credentials(&self) -> Option<S> {
        match &*self.state.read() {
            SessionState::Authenticated {
                credentials,
                expires_at,
            } if *expires_at > Utc::now() => Some(credentials.clone()),
            _ => None,
        }
    }

    /// 获取有效凭据，必要时调用 `authenticate` 完成认证。
    ///
    /// 认证失败时会话回到未认证状态，错误原样返回，不做重试。
    pub async fn get_or_authenticate<F, Fut>(&self, authenticate: F) -> Result<S>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Grant<S>>>,
    {
        if let Some(credentials) = self.valid_credentials() {
            return Ok(credentials);
        }

        let _gate = self.refresh_gate.lock().await;

        // 排队期间可能已有其他任务完成了认证
        if let Some(credentials) = self.valid_credentials() {
            debug!("复用其他任务刚刚建立的会话");
            return Ok(credentials);
        }

        *self.state.write() = SessionState::Authenticating;

        match authenticate().await {
            Ok(grant) => {
                let credentials = grant.credentials.clone();
                *self.state.write() = SessionState::Authenticated {
                    credentials: grant.credentials,
                    expires_at: grant.expires_at,
                };
                Ok(credentials)
            }
            Err(e) => {
                *self.state.write() = SessionState::Unauthenticated;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::Duration;

    use super::*;
    use crate::{error::LyricsError, model::song::Platform};

    #[tokio::test]
    async fn test_concurrent_refresh_has_single_winner() {
        let store = Arc::new(SessionStore::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                store
                    .get_or_authenticate(|| async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(Grant {
                            credentials: "token".to_string(),
                            expires_at: Utc::now() + Duration::hours(1),
                        })
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.phase(), SessionPhase::Authenticated);
    }

    #[tokio::test]
    async fn test_expired_grant_triggers_reauthentication() {
        let store = SessionStore::with_grant(Grant {
            credentials: 1_u32,
            expires_at: Utc::now() - Duration::seconds(1),
        });
        assert_eq!(store.phase(), SessionPhase::Unauthenticated);

        let value = store
            .get_or_authenticate(|| async {
                Ok(Grant {
                    credentials: 2_u32,
                    expires_at: Utc::now() + Duration::minutes(5),
                })
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_failed_authentication_resets_state() {
        let store = SessionStore::<u32>::new();
        let result = store
            .get_or_authenticate(|| async {
                Err(LyricsError::api(Platform::Netease, 400, "bad request"))
            })
            .await;
        assert!(matches!(result, Err(LyricsError::Api { code: 400, .. })));
        assert_eq!(store.phase(), SessionPhase::Unauthenticated);
    }
}
