use chrono::{DateTime, Utc};
use tracing::warn;

use crate::api::ApiError;
use crate::catalog::Catalog;
use crate::data::FeedService;
use crate::model::Post;

#[derive(Debug, Clone, PartialEq)]
pub struct HomeRow {
    pub post_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub headline: String,
    pub comment_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Concatenates channel listings and orders them newest first.
pub fn merge_recent(batches: Vec<Vec<Post>>) -> Vec<Post> {
    let mut posts: Vec<Post> = batches.into_iter().flatten().collect();
    posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    posts
}

/// Loads every home channel. A channel that fails is skipped; the load
/// only fails when none of them answered.
pub fn load(service: &dyn FeedService, channels: &[String]) -> Result<Vec<Post>, ApiError> {
    let mut batches = Vec::with_capacity(channels.len());
    let mut last_err = None;
    for channel in channels {
        match service.channel_posts(channel, None) {
            Ok(posts) => batches.push(posts),
            Err(err) => {
                warn!(channel = %channel, error = %err, "home channel failed to load");
                last_err = Some(err);
            }
        }
    }
    match last_err {
        Some(err) if batches.is_empty() => Err(err),
        _ => Ok(merge_recent(batches)),
    }
}

pub fn rows(posts: &[Post], catalog: &Catalog) -> Vec<HomeRow> {
    posts
        .iter()
        .map(|post| {
            let channel_id = post.channel.id().to_string();
            HomeRow {
                post_id: post.id.clone(),
                channel_name: catalog.name(&channel_id).to_string(),
                channel_id,
                headline: post.decoded_title().headline().to_string(),
                comment_count: post.comments.len(),
                updated_at: post.updated_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Page;
    use crate::catalog::ChannelEntry;
    use crate::feed::tests::post;
    use crate::model::{Channel, Ref};
    use reqwest::StatusCode;

    struct FakeFeed;

    impl FeedService for FakeFeed {
        fn channels(&self) -> Result<Vec<Channel>, ApiError> {
            Ok(Vec::new())
        }

        fn channel_posts(&self, channel_id: &str, page: Option<Page>) -> Result<Vec<Post>, ApiError> {
            assert!(page.is_none());
            match channel_id {
                "maple" => Ok(vec![post("m1", 10, 0), post("m2", 30, 0)]),
                "lol" => Ok(vec![post("l1", 20, 0)]),
                _ => Err(ApiError::Status {
                    status: StatusCode::NOT_FOUND,
                    body: String::new(),
                }),
            }
        }

        fn post(&self, _post_id: &str) -> Result<Post, ApiError> {
            unreachable!()
        }

        fn create_post(&self, _channel_id: &str, _title: &str) -> Result<Post, ApiError> {
            unreachable!()
        }

        fn update_post(&self, _post_id: &str, _channel_id: &str, _title: &str) -> Result<Post, ApiError> {
            unreachable!()
        }
    }

    fn channels(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn merged_channels_are_newest_first() {
        let posts = load(&FakeFeed, &channels(&["maple", "lol"])).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "l1", "m1"]);
    }

    #[test]
    fn failing_channel_is_skipped() {
        let posts = load(&FakeFeed, &channels(&["gone", "lol"])).unwrap();
        assert_eq!(posts.len(), 1);
        assert!(load(&FakeFeed, &channels(&["gone"])).is_err());
    }

    #[test]
    fn rows_use_catalog_names_and_headlines() {
        let mut p = post("x", 1, 0);
        p.title = r#"{"tt":"Legacy headline"}"#.into();
        p.comments = vec![Ref::Id("c1".into()), Ref::Id("c2".into())];
        let catalog = Catalog::new(vec![ChannelEntry {
            id: "chan".into(),
            name: "Channel".into(),
            badge: String::new(),
        }]);
        let rows = rows(&[p], &catalog);
        assert_eq!(rows[0].channel_name, "Channel");
        assert_eq!(rows[0].headline, "Legacy headline");
        assert_eq!(rows[0].comment_count, 2);
    }
}
