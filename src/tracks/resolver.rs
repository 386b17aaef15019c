//! Ranked track sources
//!
//! Sources are tried in order until one yields tracks. Errors from a
//! source are logged and swallowed; only an unparseable link is fatal.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::record::Track;
use crate::spotify::{LinkError, SpotifyLink};

/// Something that can turn a playlist/album link into track records
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch the tracks behind `link`
    async fn fetch(&self, link: &SpotifyLink) -> Result<Vec<Track>>;
}

/// Ordered list of track sources
pub struct TrackResolver {
    sources: Vec<Box<dyn TrackSource>>,
}

impl TrackResolver {
    pub fn new(sources: Vec<Box<dyn TrackSource>>) -> Self {
        Self { sources }
    }

    /// Names of the configured sources, in order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve a link into tracks
    ///
    /// Returns the first non-empty result. If every source fails or comes
    /// back empty the result is an empty list, not an error.
    pub async fn resolve(&self, url: &str) -> Result<Vec<Track>, LinkError> {
        let link = SpotifyLink::parse(url)?;
        debug!("Resolving {} {}", link.kind, link.id);

        for source in &self.sources {
            info!("Using {} for {}...", source.name(), link.kind);
            match source.fetch(&link).await {
                Ok(tracks) if !tracks.is_empty() => {
                    info!("{} returned {} tracks", source.name(), tracks.len());
                    return Ok(tracks);
                }
                Ok(_) => {
                    warn!("{} returned no tracks, trying next source", source.name());
                }
                Err(e) => {
                    warn!("{} failed: {:#}", source.name(), e);
                }
            }
        }

        warn!("No source could resolve {}", url);
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Fail,
        Empty,
        Tracks(usize),
    }

    struct FakeSource {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn boxed(name: &'static str, behavior: Behavior, calls: &Arc<AtomicUsize>) -> Box<dyn TrackSource> {
            Box::new(Self {
                name,
                behavior,
                calls: calls.clone(),
            })
        }
    }

    #[async_trait]
    impl TrackSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _link: &SpotifyLink) -> Result<Vec<Track>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Fail => anyhow::bail!("upstream unavailable"),
                Behavior::Empty => Ok(Vec::new()),
                Behavior::Tracks(n) => Ok((0..n)
                    .map(|i| Track {
                        title: format!("{} track {}", self.name, i),
                        ..Default::default()
                    })
                    .collect()),
            }
        }
    }

    const PLAYLIST: &str = "https://open.spotify.com/playlist/37i9dQZF1E393PuWkPIAWl";

    #[tokio::test]
    async fn test_primary_result_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = TrackResolver::new(vec![
            FakeSource::boxed("api", Behavior::Tracks(3), &calls),
            FakeSource::boxed("scraper", Behavior::Tracks(5), &calls),
        ]);

        let tracks = resolver.resolve(PLAYLIST).await.unwrap();
        assert_eq!(tracks.len(), 3);
        assert!(tracks.iter().all(|t| t.title.starts_with("api")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_after_error_and_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = TrackResolver::new(vec![
            FakeSource::boxed("api", Behavior::Fail, &calls),
            FakeSource::boxed("cache", Behavior::Empty, &calls),
            FakeSource::boxed("scraper", Behavior::Tracks(2), &calls),
        ]);

        let tracks = resolver.resolve(PLAYLIST).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| !t.title.is_empty()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_sources_failing_gives_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = TrackResolver::new(vec![
            FakeSource::boxed("api", Behavior::Fail, &calls),
            FakeSource::boxed("scraper", Behavior::Fail, &calls),
        ]);

        let tracks = resolver.resolve(PLAYLIST).await.unwrap();
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal_before_any_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver =
            TrackResolver::new(vec![FakeSource::boxed("api", Behavior::Tracks(1), &calls)]);

        let err = resolver.resolve("https://open.spotify.com").await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidUrl(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
