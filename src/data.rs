use std::sync::Arc;

use crate::api::{self, ApiError, Page};
use crate::model::{AuthResponse, Channel, Comment, Like, Notification, Post, User};

pub trait FeedService: Send + Sync {
    fn channels(&self) -> Result<Vec<Channel>, ApiError>;
    fn channel_posts(&self, channel_id: &str, page: Option<Page>) -> Result<Vec<Post>, ApiError>;
    fn post(&self, post_id: &str) -> Result<Post, ApiError>;
    fn create_post(&self, channel_id: &str, title: &str) -> Result<Post, ApiError>;
    fn update_post(&self, post_id: &str, channel_id: &str, title: &str) -> Result<Post, ApiError>;
}

pub trait InteractionService: Send + Sync {
    fn like(&self, post_id: &str) -> Result<Like, ApiError>;
    fn unlike(&self, like_id: &str) -> Result<Like, ApiError>;
    fn comment(&self, post_id: &str, text: &str) -> Result<Comment, ApiError>;
    fn delete_comment(&self, comment_id: &str) -> Result<Comment, ApiError>;
    fn notify(&self, notification: &Notification) -> Result<(), ApiError>;
}

pub trait AccountService: Send + Sync {
    fn user(&self, user_id: &str) -> Result<User, ApiError>;
    fn auth_user(&self) -> Result<User, ApiError>;
    fn update_user(&self, full_name: &str, username: &str) -> Result<User, ApiError>;
    fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;
    fn signup(&self, email: &str, full_name: &str, password: &str) -> Result<AuthResponse, ApiError>;
    fn logout(&self) -> Result<(), ApiError>;
}

pub struct ApiFeedService {
    client: Arc<api::Client>,
}

impl ApiFeedService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for ApiFeedService {
    fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.client.channels()
    }

    fn channel_posts(&self, channel_id: &str, page: Option<Page>) -> Result<Vec<Post>, ApiError> {
        self.client.channel_posts(channel_id, page)
    }

    fn post(&self, post_id: &str) -> Result<Post, ApiError> {
        self.client.post(post_id)
    }

    fn create_post(&self, channel_id: &str, title: &str) -> Result<Post, ApiError> {
        self.client.create_post(channel_id, title)
    }

    fn update_post(&self, post_id: &str, channel_id: &str, title: &str) -> Result<Post, ApiError> {
        self.client.update_post(post_id, channel_id, title)
    }
}

pub struct ApiInteractionService {
    client: Arc<api::Client>,
}

impl ApiInteractionService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl InteractionService for ApiInteractionService {
    fn like(&self, post_id: &str) -> Result<Like, ApiError> {
        self.client.create_like(post_id)
    }

    fn unlike(&self, like_id: &str) -> Result<Like, ApiError> {
        self.client.delete_like(like_id)
    }

    fn comment(&self, post_id: &str, text: &str) -> Result<Comment, ApiError> {
        self.client.create_comment(post_id, text)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<Comment, ApiError> {
        self.client.delete_comment(comment_id)
    }

    fn notify(&self, notification: &Notification) -> Result<(), ApiError> {
        self.client.create_notification(notification)
    }
}

pub struct ApiAccountService {
    client: Arc<api::Client>,
}

impl ApiAccountService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl AccountService for ApiAccountService {
    fn user(&self, user_id: &str) -> Result<User, ApiError> {
        self.client.user(user_id)
    }

    fn auth_user(&self) -> Result<User, ApiError> {
        self.client.auth_user()
    }

    fn update_user(&self, full_name: &str, username: &str) -> Result<User, ApiError> {
        self.client.update_user(full_name, username)
    }

    fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.client.login(email, password)
    }

    fn signup(&self, email: &str, full_name: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.client.signup(email, full_name, password)
    }

    fn logout(&self) -> Result<(), ApiError> {
        self.client.logout()
    }
}
