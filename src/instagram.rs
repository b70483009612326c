use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::source::{LookupError, Post, PostStream, Profile, ProfileSource, SidecarNode};

// ── Constants ────────────────────────────────────────────────────────────────

const WEB_PROFILE_ENDPOINT: &str = "https://i.instagram.com/api/v1/users/web_profile_info/";
const GRAPHQL_ENDPOINT: &str = "https://www.instagram.com/graphql/query/";
const PROFILE_PAGE_BASE: &str = "https://www.instagram.com/";

/// App id the web client sends on JSON endpoints; requests without it are
/// answered with a login wall.
const IG_APP_ID: &str = "936619743392459";
/// Query hash for the profile-to-timeline-media connection.
const TIMELINE_QUERY_HASH: &str = "003056d32c2554def87228bc3fd9668a";
const TIMELINE_PAGE_SIZE: u32 = 12;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

static SHARED_DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)window\._sharedData\s*=\s*(\{.*\});?\s*$").unwrap());

// ── Remote payload shapes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WebProfileEnvelope {
    data: Option<WebProfileData>,
}

#[derive(Debug, Deserialize)]
struct WebProfileData {
    user: Option<RemoteUser>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    username: String,
    #[serde(default)]
    full_name: Option<String>,
    edge_followed_by: CountEdge,
    edge_owner_to_timeline_media: CountEdge,
    #[serde(default)]
    profile_pic_url_hd: Option<String>,
    #[serde(default)]
    profile_pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountEdge {
    count: u64,
}

impl RemoteUser {
    fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            username: self.username,
            full_name: self.full_name.unwrap_or_default(),
            followers: self.edge_followed_by.count,
            posts_count: self.edge_owner_to_timeline_media.count,
            profile_pic_url: self.profile_pic_url_hd.or(self.profile_pic_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimelineEnvelope {
    data: Option<TimelineData>,
}

#[derive(Debug, Deserialize)]
struct TimelineData {
    user: Option<TimelineUser>,
}

#[derive(Debug, Deserialize)]
struct TimelineUser {
    edge_owner_to_timeline_media: TimelineConnection,
}

#[derive(Debug, Deserialize)]
struct TimelineConnection {
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<TimelineEdge>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelineEdge {
    node: TimelineNode,
}

#[derive(Debug, Deserialize)]
struct TimelineNode {
    #[serde(default)]
    display_url: Option<String>,
    #[serde(default)]
    edge_sidecar_to_children: Option<SidecarConnection>,
}

#[derive(Debug, Deserialize)]
struct SidecarConnection {
    #[serde(default)]
    edges: Vec<SidecarEdge>,
}

#[derive(Debug, Deserialize)]
struct SidecarEdge {
    node: SidecarChild,
}

#[derive(Debug, Deserialize)]
struct SidecarChild {
    #[serde(default)]
    display_url: Option<String>,
}

impl TimelineNode {
    fn into_post(self) -> Post {
        let sidecar = self
            .edge_sidecar_to_children
            .map(|children| {
                children
                    .edges
                    .into_iter()
                    .map(|edge| SidecarNode {
                        display_url: edge.node.display_url,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Post {
            url: self.display_url,
            sidecar,
        }
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

fn request_error(err: reqwest::Error) -> LookupError {
    if err.is_timeout() || err.is_connect() {
        LookupError::Connection(err.to_string())
    } else {
        LookupError::Other(err.to_string())
    }
}

// ── Profile source ───────────────────────────────────────────────────────────

pub struct InstagramSource {
    client: reqwest::Client,
}

impl InstagramSource {
    pub fn new() -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        // An authenticated session is optional; anonymous access works but is
        // throttled much sooner.
        if let Ok(session) = std::env::var("IG_SESSIONID") {
            if let Ok(value) = format!("sessionid={}", session).parse() {
                headers.insert(reqwest::header::COOKIE, value);
            }
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Fallback for when the JSON endpoint refuses the request: the profile
    /// page itself still carries the bootstrap payload in a script tag.
    async fn lookup_from_profile_page(&self, username: &str) -> Result<Profile, LookupError> {
        let page_url = format!("{}{}/", PROFILE_PAGE_BASE, username);
        let response = self
            .client
            .get(&page_url)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::ProfileNotFound);
        }
        if !status.is_success() {
            return Err(LookupError::Connection(format!(
                "HTTP {} from {}",
                status, page_url
            )));
        }

        let html = response.text().await.map_err(request_error)?;
        profile_from_shared_data(&html).ok_or(LookupError::ProfileNotFound)
    }
}

#[async_trait]
impl ProfileSource for InstagramSource {
    async fn lookup(&self, username: &str) -> Result<Profile, LookupError> {
        let mut endpoint =
            Url::parse(WEB_PROFILE_ENDPOINT).map_err(|e| LookupError::Other(e.to_string()))?;
        endpoint.query_pairs_mut().append_pair("username", username);

        let response = self
            .client
            .get(endpoint)
            .header("x-ig-app-id", IG_APP_ID)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::ProfileNotFound);
        }
        if !status.is_success() {
            tracing::debug!("web profile endpoint returned HTTP {}, trying profile page", status);
            return self.lookup_from_profile_page(username).await;
        }

        let body = response.text().await.map_err(request_error)?;
        let envelope: WebProfileEnvelope =
            serde_json::from_str(&body).map_err(|e| LookupError::Other(e.to_string()))?;

        match envelope.data.and_then(|data| data.user) {
            Some(user) => Ok(user.into_profile()),
            None => Err(LookupError::ProfileNotFound),
        }
    }

    fn posts(&self, profile: &Profile) -> Box<dyn PostStream> {
        Box::new(TimelinePager::new(self.client.clone(), profile.id.clone()))
    }
}

/// Pull the `window._sharedData` bootstrap JSON out of a profile page and
/// read the user object at `entry_data.ProfilePage[0].graphql.user`.
fn profile_from_shared_data(html: &str) -> Option<Profile> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;

    for script in document.select(&selector) {
        let text: String = script.text().collect();
        let Some(captures) = SHARED_DATA_RE.captures(text.trim()) else {
            continue;
        };
        let Ok(payload) = serde_json::from_str::<serde_json::Value>(&captures[1]) else {
            continue;
        };
        if let Some(user) = payload.pointer("/entry_data/ProfilePage/0/graphql/user") {
            if let Ok(remote) = serde_json::from_value::<RemoteUser>(user.clone()) {
                return Some(remote.into_profile());
            }
        }
    }
    None
}

// ── Timeline pager ───────────────────────────────────────────────────────────

/// Buffered single-pass pager over the profile timeline. Fetches pages of
/// `TIMELINE_PAGE_SIZE` on demand and stops once the remote reports no next
/// page.
struct TimelinePager {
    client: reqwest::Client,
    user_id: String,
    buffer: VecDeque<Post>,
    end_cursor: Option<String>,
    has_next_page: bool,
}

impl TimelinePager {
    fn new(client: reqwest::Client, user_id: String) -> Self {
        Self {
            client,
            user_id,
            buffer: VecDeque::new(),
            end_cursor: None,
            has_next_page: true,
        }
    }

    async fn fetch_page(&mut self) -> Result<(), LookupError> {
        let variables = serde_json::json!({
            "id": self.user_id,
            "first": TIMELINE_PAGE_SIZE,
            "after": self.end_cursor,
        });

        let mut endpoint =
            Url::parse(GRAPHQL_ENDPOINT).map_err(|e| LookupError::Other(e.to_string()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("query_hash", TIMELINE_QUERY_HASH)
            .append_pair("variables", &variables.to_string());

        let response = self
            .client
            .get(endpoint)
            .header("x-ig-app-id", IG_APP_ID)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Connection(format!(
                "HTTP {} from timeline query",
                status
            )));
        }

        let body = response.text().await.map_err(request_error)?;
        let envelope: TimelineEnvelope =
            serde_json::from_str(&body).map_err(|e| LookupError::Other(e.to_string()))?;

        let connection = envelope
            .data
            .and_then(|data| data.user)
            .map(|user| user.edge_owner_to_timeline_media)
            .ok_or_else(|| LookupError::Other("timeline payload missing user".to_string()))?;

        self.has_next_page = connection.page_info.has_next_page;
        self.end_cursor = connection.page_info.end_cursor;
        self.buffer
            .extend(connection.edges.into_iter().map(|edge| edge.node.into_post()));
        Ok(())
    }
}

#[async_trait]
impl PostStream for TimelinePager {
    async fn next(&mut self) -> Result<Option<Post>, LookupError> {
        while self.buffer.is_empty() && self.has_next_page {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }
}
