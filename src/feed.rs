use crate::api::Page;
use crate::model::{Like, Post};

pub const DEFAULT_PAGE_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Recent,
    Popular,
}

impl SortMode {
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Recent => "Newest",
            SortMode::Popular => "Popular",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortMode::Recent => SortMode::Popular,
            SortMode::Popular => SortMode::Recent,
        }
    }
}

pub fn sort_posts(posts: &mut [Post], mode: SortMode) {
    match mode {
        SortMode::Recent => posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        SortMode::Popular => posts.sort_by(|a, b| b.likes.len().cmp(&a.likes.len())),
    }
}

/// Offset/limit cursor. A page shorter than the limit ends the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    offset: usize,
    limit: usize,
    exhausted: bool,
}

impl Paginator {
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
            exhausted: false,
        }
    }

    pub fn next_page(&self) -> Option<Page> {
        if self.exhausted {
            return None;
        }
        Some(Page {
            offset: self.offset,
            limit: self.limit,
        })
    }

    pub fn record(&mut self, received: usize) {
        if received > 0 {
            self.offset += self.limit;
        }
        if received < self.limit {
            self.exhausted = true;
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Posts of one channel accumulated page by page.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    channel_id: String,
    posts: Vec<Post>,
    paginator: Paginator,
    sort: SortMode,
}

impl ChannelFeed {
    pub fn new(channel_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            channel_id: channel_id.into(),
            posts: Vec::new(),
            paginator: Paginator::new(page_size),
            sort: SortMode::default(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn has_more(&self) -> bool {
        !self.paginator.is_exhausted()
    }

    pub fn next_page(&self) -> Option<Page> {
        self.paginator.next_page()
    }

    /// Appends a page in server order. Items are not de-duplicated and the
    /// current sort is not re-applied to the new page.
    pub fn apply_page(&mut self, page: Vec<Post>) {
        self.paginator.record(page.len());
        self.posts.extend(page);
    }

    pub fn set_sort(&mut self, mode: SortMode) {
        self.sort = mode;
        sort_posts(&mut self.posts, mode);
    }

    pub fn record_like(&mut self, post_id: &str, like: Like) {
        if let Some(post) = self.posts.iter_mut().find(|post| post.id == post_id) {
            if post.likes.iter().all(|existing| existing.id != like.id) {
                post.likes.push(like);
            }
        }
    }

    pub fn drop_like(&mut self, post_id: &str, user_id: &str) {
        if let Some(post) = self.posts.iter_mut().find(|post| post.id == post_id) {
            post.likes.retain(|like| like.user != user_id);
        }
    }

    pub fn replace_post(&mut self, updated: &Post) {
        if let Some(post) = self.posts.iter_mut().find(|post| post.id == updated.id) {
            *post = updated.clone();
        }
    }
}
