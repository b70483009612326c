use std::process::ExitCode;

mod image;
mod instagram;
mod models;
mod scrape;
mod source;

use image::HttpImageFetcher;
use instagram::InstagramSource;
use models::ScrapeResult;
use scrape::{scrape_profile_images, DEFAULT_MAX_POSTS};

const USAGE: &str = "Usage: ig-image-scraper <username> [max_posts]";

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries nothing but the result line.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some(username) = args.first() else {
        emit(&ScrapeResult::failure(USAGE));
        return ExitCode::FAILURE;
    };

    let max_posts = match args.get(1) {
        None => DEFAULT_MAX_POSTS,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                emit(&ScrapeResult::failure(USAGE));
                return ExitCode::FAILURE;
            }
        },
    };

    let source = InstagramSource::new();
    let fetcher = HttpImageFetcher::new();
    let result = scrape_profile_images(&source, &fetcher, username, max_posts).await;

    emit(&result);
    ExitCode::SUCCESS
}

fn emit(result: &ScrapeResult) {
    match serde_json::to_string(result) {
        Ok(line) => println!("{}", line),
        Err(err) => {
            // These DTOs cannot actually fail to serialize; the stdout
            // contract holds either way.
            tracing::error!("could not serialize result: {}", err);
            println!(r#"{{"success":false,"error":"internal serialization failure"}}"#);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_is_a_single_json_object() {
        assert_eq!(
            serde_json::to_string(&ScrapeResult::failure(USAGE)).unwrap(),
            r#"{"success":false,"error":"Usage: ig-image-scraper <username> [max_posts]"}"#
        );
    }
}
