//! Like and view counters kept in Redis.

use std::collections::HashSet;

use anyhow::{Context, Result};
use redis::AsyncCommands;
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a user can like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTarget {
    Article,
    Comment,
}

impl LikeTarget {
    fn user_set_key(self, user_id: Uuid) -> String {
        match self {
            LikeTarget::Article => format!("article_user_like:{user_id}"),
            LikeTarget::Comment => format!("comment_user_like:{user_id}"),
        }
    }

    fn count_key(self) -> &'static str {
        match self {
            LikeTarget::Article => "article_like_count",
            LikeTarget::Comment => "comment_like_count",
        }
    }
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

/// Counters for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArticleCounters {
    pub view_count: i64,
    pub like_count: i64,
}

/// IDs a user has liked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LikeSets {
    pub article_like_set: Vec<String>,
    pub comment_like_set: Vec<String>,
}

const ARTICLE_VIEW_COUNT: &str = "article_view_count";

/// Engagement service.
#[derive(Clone)]
pub struct EngagementService {
    redis: RedisClient,
}

impl EngagementService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to get Redis connection")
    }

    /// Toggle a user's like on an item.
    ///
    /// The counter moves by what SADD / SREM actually changed, so concurrent
    /// toggles keep the count equal to the number of set members.
    pub async fn toggle_like(
        &self,
        target: LikeTarget,
        user_id: Uuid,
        item_id: &str,
    ) -> Result<LikeState> {
        let set_key = target.user_set_key(user_id);
        let mut conn = self.conn().await?;

        let added: i64 = conn
            .sadd(&set_key, item_id)
            .await
            .context("failed to add like")?;
        let removed: i64 = if added > 0 {
            0
        } else {
            conn.srem(&set_key, item_id)
                .await
                .context("failed to remove like")?
        };
        let (liked, delta) = toggle_outcome(added, removed);

        let like_count: i64 = conn
            .hincr(target.count_key(), item_id, delta)
            .await
            .context("failed to update like count")?;

        Ok(LikeState { liked, like_count })
    }

    /// Record a view of an article and return its counters.
    pub async fn record_view(&self, article_id: &str) -> Result<ArticleCounters> {
        let mut conn = self.conn().await?;

        let views: f64 = conn
            .zincr(ARTICLE_VIEW_COUNT, article_id, 1)
            .await
            .context("failed to increment view count")?;
        let likes: Option<i64> = conn
            .hget(LikeTarget::Article.count_key(), article_id)
            .await
            .context("failed to read like count")?;

        Ok(ArticleCounters {
            view_count: views as i64,
            like_count: likes.unwrap_or(0),
        })
    }

    /// The article and comment IDs a user has liked.
    pub async fn like_sets(&self, user_id: Uuid) -> Result<LikeSets> {
        let mut conn = self.conn().await?;

        let articles: HashSet<String> = conn
            .smembers(LikeTarget::Article.user_set_key(user_id))
            .await
            .context("failed to read article likes")?;
        let comments: HashSet<String> = conn
            .smembers(LikeTarget::Comment.user_set_key(user_id))
            .await
            .context("failed to read comment likes")?;

        Ok(LikeSets {
            article_like_set: sorted(articles),
            comment_like_set: sorted(comments),
        })
    }
}

/// Like state and counter delta from the SADD reply and, when nothing was
/// added, the SREM reply.
fn toggle_outcome(added: i64, removed: i64) -> (bool, i64) {
    if added > 0 {
        (true, 1)
    } else {
        (false, -removed.min(1))
    }
}

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut items: Vec<_> = set.into_iter().collect();
    items.sort();
    items
}
