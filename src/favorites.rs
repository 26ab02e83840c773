//! Favorite channels are stored as a JSON array inside the user's
//! `username` field. All encoding and decoding of that field goes through
//! this module.

#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    #[error("favorites field is not a JSON array of channel ids: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode(raw: &str) -> Result<Vec<String>, FavoritesError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

pub fn encode(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

pub fn contains(ids: &[String], channel_id: &str) -> bool {
    ids.iter().any(|id| id == channel_id)
}

/// Adds `channel_id` and returns the list sorted ascending.
pub fn add(ids: &[String], channel_id: &str) -> Vec<String> {
    let mut next = ids.to_vec();
    if !contains(&next, channel_id) {
        next.push(channel_id.to_string());
    }
    next.sort();
    next
}

/// Removes `channel_id`, keeping the relative order of what remains.
pub fn remove(ids: &[String], channel_id: &str) -> Vec<String> {
    ids.iter()
        .filter(|id| id.as_str() != channel_id)
        .cloned()
        .collect()
}
