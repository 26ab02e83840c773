use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api;
use crate::catalog::Catalog;
use crate::config;
use crate::data::{self, AccountService, FeedService, InteractionService};
use crate::logging;
use crate::session;
use crate::storage;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    if let Err(err) = logging::init(&cfg.log) {
        eprintln!("warning: logging disabled: {err:#}");
    }
    info!(base_url = %cfg.api.base_url, "starting");

    let store =
        Arc::new(storage::Store::open(storage::Options::default()).context("open storage")?);

    let token = Arc::new(session::SessionToken::default());
    let client = Arc::new(
        api::Client::new(
            token.clone(),
            api::ClientConfig {
                base_url: cfg.api.base_url.clone(),
                user_agent: cfg.api.user_agent.clone(),
                timeout: Some(cfg.api.timeout),
                http_client: None,
            },
        )
        .context("create api client")?,
    );

    let feed_service: Arc<dyn FeedService> = Arc::new(data::ApiFeedService::new(client.clone()));
    let interaction_service: Arc<dyn InteractionService> =
        Arc::new(data::ApiInteractionService::new(client.clone()));
    let account_service: Arc<dyn AccountService> =
        Arc::new(data::ApiAccountService::new(client.clone()));

    let session_manager = Arc::new(session::Manager::new(
        store.clone(),
        account_service.clone(),
        token,
    ));
    let status = match session_manager.resume() {
        Ok(Some(user)) => format!("Welcome back, {}.", user.display_name()),
        Ok(None) => "Browsing as a guest. Press L to sign in.".to_string(),
        Err(err) => {
            warn!(error = %err, "could not restore session");
            format!("Could not restore your session ({err}). Press L to sign in.")
        }
    };

    let options = ui::Options {
        status_message: status,
        catalog: Catalog::new(cfg.channels.clone()),
        home_channels: cfg.feed.home_channels.clone(),
        page_size: cfg.feed.page_size,
        profile_recent_posts: cfg.feed.profile_recent_posts,
        feed_service,
        interaction_service,
        account_service,
        session: session_manager,
        config_path: display_path,
        fetch_on_start: true,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    info!("exiting");
    Ok(())
}

pub fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/gameboard/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn paths_under_home_are_abbreviated() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let path = home.join(".config").join("gameboard").join("config.yaml");
        assert_eq!(friendly_path(Some(&path)), "~/.config/gameboard/config.yaml");
    }

    #[test]
    fn missing_path_falls_back_to_default_hint() {
        assert_eq!(friendly_path(None), "~/.config/gameboard/config.yaml");
        let outside = PathBuf::from("/etc/gameboard.yaml");
        assert!(friendly_path(Some(&outside)).ends_with("gameboard.yaml"));
    }
}
