//! Background purge of expired refresh tokens
//!
//! The refresh path never deletes rows, so expired ones accumulate until a
//! sweep removes them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::auth::domain::repositories::RefreshTokenRepository;
use crate::clock::Clock;

#[derive(Clone)]
pub struct RefreshTokenSweeper {
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    clock: Arc<dyn Clock>,
    every: Duration,
}

impl std::fmt::Debug for RefreshTokenSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenSweeper")
            .field("every", &self.every)
            .finish_non_exhaustive()
    }
}

impl RefreshTokenSweeper {
    pub fn new(
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        clock: Arc<dyn Clock>,
        every: Duration,
    ) -> Self {
        Self {
            refresh_tokens,
            clock,
            every,
        }
    }

    /// Delete rows expired as of now; returns how many went.
    pub async fn sweep_once(&self) -> anyhow::Result<u64> {
        let purged = self
            .refresh_tokens
            .delete_expired(self.clock.now())
            .await?;
        if purged > 0 {
            info!(purged, "purged expired refresh tokens");
        } else {
            debug!("no expired refresh tokens to purge");
        }
        Ok(purged)
    }

    /// Sweep on a fixed interval until the handle is aborted. The first
    /// sweep runs immediately; failures are logged and retried next tick.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if let Err(e) = self.sweep_once().await {
                    error!("Failed to purge expired refresh tokens: {e:#}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::domain::repositories::{MockRefreshTokenRepository, UserRepository};
    use crate::auth::domain::user::NewUser;
    use crate::auth::domain::value_objects::NewRefreshToken;
    use crate::auth::infrastructure::InMemoryAuthStore;
    use crate::clock::ManualClock;
    use chrono::Duration as ChronoDuration;

    async fn seeded_store(clock: &ManualClock) -> InMemoryAuthStore {
        let store = InMemoryAuthStore::new();
        let user = UserRepository::create(
            &store,
            NewUser {
                username: "alice".into(),
                email: "a@x.com".into(),
                role: "User".into(),
                password_hash: "hash".into(),
                created_at: clock.now(),
            },
        )
        .await
        .unwrap();

        for (value, ttl) in [("short", ChronoDuration::minutes(1)), ("long", ChronoDuration::days(7))] {
            RefreshTokenRepository::create(
                &store,
                NewRefreshToken {
                    user_id: user.id,
                    token: value.into(),
                    expires_at: clock.now() + ttl,
                    created_at: clock.now(),
                },
            )
            .await
            .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let clock = ManualClock::starting_now();
        let store = seeded_store(&clock).await;
        let sweeper = RefreshTokenSweeper::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Duration::from_secs(60),
        );

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

        clock.advance(ChronoDuration::minutes(1));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert!(store.find_by_token("long").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_sweeper_runs_and_survives_failures() {
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        let mut calls = 0;
        refresh_tokens
            .expect_delete_expired()
            .times(2..)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(anyhow::anyhow!("database unavailable"))
                } else {
                    Ok(0)
                }
            });

        let handle = RefreshTokenSweeper::new(
            Arc::new(refresh_tokens),
            Arc::new(ManualClock::starting_now()),
            Duration::from_secs(60),
        )
        .spawn();

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert!(!handle.is_finished());
        handle.abort();
        let _ = handle.await;
    }
}
