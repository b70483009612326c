use async_trait::async_trait;

/// A public profile as resolved by the remote service. `id` is the opaque
/// numeric identifier the timeline query is keyed on.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub followers: u64,
    pub posts_count: u64,
    pub profile_pic_url: Option<String>,
}

/// One timeline post. `url` is the primary display image (video posts report
/// their thumbnail here). `sidecar` is empty for single-image posts; for
/// carousels it holds every child node, the first of which typically
/// duplicates `url`.
#[derive(Debug, Clone)]
pub struct Post {
    pub url: Option<String>,
    pub sidecar: Vec<SidecarNode>,
}

#[derive(Debug, Clone)]
pub struct SidecarNode {
    pub display_url: Option<String>,
}

/// Failures at the profile-service boundary. Callers branch on the variant,
/// never on provider-specific error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("profile does not exist or is private")]
    ProfileNotFound,
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Other(String),
}

/// Lazily yields timeline posts, newest first. Single pass, not restartable:
/// once `next` returns `Ok(None)` or an error the stream is exhausted.
#[async_trait]
pub trait PostStream: Send {
    async fn next(&mut self) -> Result<Option<Post>, LookupError>;
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<Profile, LookupError>;

    fn posts(&self, profile: &Profile) -> Box<dyn PostStream>;
}
