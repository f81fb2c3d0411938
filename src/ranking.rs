//! Popularity ranking
//!
//! Engagement weighted by type, decayed by post age in hours:
//!
//! ```text
//! score = (2 * likes + 3 * comments) / max(age_hours, 1)
//! ```
//!
//! The one-hour floor keeps brand-new posts from dividing by a near-zero
//! age. Scores are recomputed over the whole candidate set on every
//! call - there is no incremental or cached ranking structure.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::db::schemas::{PostDoc, POST_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::error::Result;

/// Popularity score for one post's engagement counts at a given age
pub fn popularity_score(likes: usize, comments: usize, age_hours: f64) -> f64 {
    (2.0 * likes as f64 + 3.0 * comments as f64) / age_hours.max(1.0)
}

fn age_hours(created_at: bson::DateTime, now: DateTime<Utc>) -> f64 {
    let age = now - created_at.to_chrono();
    age.num_seconds() as f64 / 3600.0
}

/// Order posts by popularity score descending, truncated to `limit`
pub fn rank_popular(mut posts: Vec<PostDoc>, now: DateTime<Utc>, limit: usize) -> Vec<PostDoc> {
    posts.sort_by(|a, b| {
        let score_a = popularity_score(a.likes.len(), a.comments.len(), age_hours(a.created_at, now));
        let score_b = popularity_score(b.likes.len(), b.comments.len(), age_hours(b.created_at, now));
        score_b.partial_cmp(&score_a).unwrap_or(Ordering::Equal)
    });
    posts.truncate(limit);
    posts
}

/// Order posts by creation time descending, truncated to `limit`
pub fn rank_recent(mut posts: Vec<PostDoc>, limit: usize) -> Vec<PostDoc> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts.truncate(limit);
    posts
}

/// Read side over the content service's posts collection
#[derive(Clone)]
pub struct PostService {
    posts: MongoCollection<PostDoc>,
}

impl PostService {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            posts: client.collection(POST_COLLECTION).await?,
        })
    }

    /// Popularity-ranked feed
    pub async fn popular(&self, limit: usize) -> Result<Vec<PostDoc>> {
        let posts = self.posts.find_many(bson::doc! {}).await?;
        Ok(rank_popular(posts, Utc::now(), limit))
    }

    /// Reverse-chronological feed
    pub async fn recent(&self, limit: usize) -> Result<Vec<PostDoc>> {
        let posts = self.posts.find_many(bson::doc! {}).await?;
        Ok(rank_recent(posts, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Metadata;
    use chrono::Duration;

    fn post(id: &str, likes: usize, comments: usize, age_hours: i64, now: DateTime<Utc>) -> PostDoc {
        PostDoc {
            _id: None,
            metadata: Metadata::default(),
            post_id: id.to_string(),
            author: "author".to_string(),
            content: String::new(),
            likes: (0..likes).map(|i| format!("liker-{}", i)).collect(),
            comments: (0..comments)
                .map(|i| crate::db::schemas::CommentEntry {
                    comment_id: format!("c-{}", i),
                    user: "commenter".to_string(),
                    text: String::new(),
                    created_at: bson::DateTime::now(),
                })
                .collect(),
            created_at: bson::DateTime::from_chrono(now - Duration::hours(age_hours)),
        }
    }

    #[test]
    fn test_score_weights() {
        // Comments weigh 3, likes weigh 2
        assert_eq!(popularity_score(3, 0, 1.0), 6.0);
        assert_eq!(popularity_score(0, 2, 1.0), 6.0);
        assert_eq!(popularity_score(1, 1, 1.0), 5.0);
    }

    #[test]
    fn test_score_age_floor() {
        // Anything younger than an hour scores as if one hour old
        assert_eq!(popularity_score(10, 0, 0.01), 20.0);
        assert_eq!(popularity_score(10, 0, 1.0), 20.0);
        assert!(popularity_score(10, 0, 2.0) < 20.0);
    }

    #[test]
    fn test_score_monotonically_decays_with_age() {
        let fresh = popularity_score(10, 0, 1.0);
        let stale = popularity_score(10, 0, 10.0);
        assert!(fresh > stale);
    }

    #[test]
    fn test_rank_popular_orders_by_score() {
        let now = Utc::now();
        let posts = vec![
            post("old-hot", 100, 0, 100, now), // 200/100 = 2.0
            post("new-mild", 10, 0, 1, now),   // 20/1 = 20.0
            post("new-hot", 10, 10, 1, now),   // 50/1 = 50.0
        ];

        let ranked = rank_popular(posts, now, 10);
        let ids: Vec<&str> = ranked.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["new-hot", "new-mild", "old-hot"]);
    }

    #[test]
    fn test_rank_popular_truncates() {
        let now = Utc::now();
        let posts = (0..5).map(|i| post(&format!("p-{}", i), i, 0, 1, now)).collect();
        assert_eq!(rank_popular(posts, now, 2).len(), 2);
    }

    #[test]
    fn test_rank_recent_is_reverse_chronological() {
        let now = Utc::now();
        let posts = vec![
            post("oldest", 100, 100, 48, now),
            post("newest", 0, 0, 1, now),
            post("middle", 5, 5, 24, now),
        ];

        let ranked = rank_recent(posts, 10);
        let ids: Vec<&str> = ranked.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle", "oldest"]);
    }
}
