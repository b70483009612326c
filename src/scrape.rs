use crate::image::ImageFetcher;
use crate::models::{ProfileInfo, ScrapeResult};
use crate::source::{LookupError, ProfileSource};

pub const DEFAULT_MAX_POSTS: usize = 5;

/// Strip surrounding whitespace and one leading `@`.
pub fn normalize_username(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

/// Resolve `username` and collect its profile picture plus recent post images
/// as embedded data URIs. Always returns a well-formed result: lookup
/// failures map to the categorized error messages the calling backend
/// matches on, and individual image failures are dropped from the list.
pub async fn scrape_profile_images(
    source: &dyn ProfileSource,
    fetcher: &dyn ImageFetcher,
    username: &str,
    max_posts: usize,
) -> ScrapeResult {
    let username = normalize_username(username);
    match collect_images(source, fetcher, username, max_posts).await {
        Ok((images, profile_info)) => ScrapeResult::success(images, profile_info),
        Err(LookupError::ProfileNotFound) => ScrapeResult::failure(format!(
            "Profile @{} does not exist or is private",
            username
        )),
        Err(LookupError::Connection(details)) => {
            ScrapeResult::failure(format!("Connection error: {}", details))
        }
        Err(LookupError::Other(details)) => {
            ScrapeResult::failure(format!("Unexpected error: {}", details))
        }
    }
}

async fn collect_images(
    source: &dyn ProfileSource,
    fetcher: &dyn ImageFetcher,
    username: &str,
    max_posts: usize,
) -> Result<(Vec<String>, ProfileInfo), LookupError> {
    let profile = source.lookup(username).await?;

    let mut images = Vec::new();

    // The profile picture rides along for free; it never counts against
    // `max_posts`.
    if let Some(pic_url) = &profile.profile_pic_url {
        if let Some(data_uri) = fetcher.fetch_data_uri(pic_url).await {
            images.push(data_uri);
        }
    }

    // `posts_processed` counts embedded images, not posts: a carousel draws
    // several units from the same budget, and sidecar iteration stops
    // mid-post once the cap is hit.
    let mut posts = source.posts(&profile);
    let mut posts_processed = 0usize;

    while let Some(post) = posts.next().await? {
        if posts_processed >= max_posts {
            break;
        }

        if let Some(url) = &post.url {
            if let Some(data_uri) = fetcher.fetch_data_uri(url).await {
                images.push(data_uri);
                posts_processed += 1;
            }
        }

        for node in &post.sidecar {
            if posts_processed >= max_posts {
                break;
            }
            let Some(display_url) = &node.display_url else {
                continue;
            };
            if let Some(data_uri) = fetcher.fetch_data_uri(display_url).await {
                images.push(data_uri);
                posts_processed += 1;
            }
        }
    }

    let profile_info = ProfileInfo {
        username: profile.username,
        full_name: profile.full_name,
        followers: profile.followers,
        posts_count: profile.posts_count,
    };

    Ok((images, profile_info))
}
