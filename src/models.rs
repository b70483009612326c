use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileInfo {
    pub username: String,
    pub full_name: String,
    pub followers: u64,
    pub posts_count: u64,
}

/// The single JSON line printed to stdout. Exactly one of the two shapes is
/// ever emitted; the spawning backend branches on `success`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScrapeResult {
    Success {
        success: bool,
        images: Vec<String>,
        profile_info: ProfileInfo,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl ScrapeResult {
    pub fn success(images: Vec<String>, profile_info: ProfileInfo) -> Self {
        Self::Success {
            success: true,
            images,
            profile_info,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }
}
