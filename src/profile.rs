use tracing::warn;

use crate::catalog::Catalog;
use crate::favorites;
use crate::model::{Ref, User};
use crate::title::PostTitle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteRow {
    pub channel_id: String,
    pub name: String,
    pub badge: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePostRow {
    pub post_id: String,
    pub channel_name: String,
    pub headline: String,
    pub comment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub user_id: String,
    pub display_name: String,
    pub is_online: bool,
    pub is_me: bool,
    pub post_count: usize,
    pub comment_count: usize,
    pub like_count: usize,
    pub favorites: Vec<FavoriteRow>,
    pub recent_posts: Vec<ProfilePostRow>,
}

impl ProfileView {
    pub fn build(target: &User, viewer: Option<&User>, catalog: &Catalog, recent_limit: usize) -> Self {
        let is_me = viewer.is_some_and(|viewer| viewer.id == target.id);
        // The viewer's own record reflects renames made in this session.
        let display_name = match viewer {
            Some(viewer) if is_me => viewer.display_name().to_string(),
            _ => target.display_name().to_string(),
        };

        let favorite_ids = favorites::decode(target.favorites_field()).unwrap_or_else(|err| {
            warn!(user = %target.id, error = %err, "ignoring unreadable favorites");
            Vec::new()
        });
        let favorites = favorite_ids
            .into_iter()
            .map(|id| FavoriteRow {
                name: catalog.name(&id).to_string(),
                badge: catalog.badge(&id).to_string(),
                channel_id: id,
            })
            .collect();

        let recent_posts = target
            .posts
            .iter()
            .filter_map(Ref::record)
            .take(recent_limit)
            .map(|post| ProfilePostRow {
                post_id: post.id.clone(),
                channel_name: catalog.name(post.channel.id()).to_string(),
                headline: PostTitle::decode(&post.title).headline().to_string(),
                comment_count: post.comments.len(),
            })
            .collect();

        Self {
            user_id: target.id.clone(),
            display_name,
            is_online: target.is_online,
            is_me,
            post_count: target.posts.len(),
            comment_count: target.comments.len(),
            like_count: target.likes.len(),
            favorites,
            recent_posts,
        }
    }
}
