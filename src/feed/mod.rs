//! Podcast feed generation.
//!
//! Rebuilds the published RSS feed from scratch out of all stored episodes
//! and atomically replaces the feed file in the public directory.

use std::sync::Arc;

use async_trait::async_trait;
use rss::extension::itunes::{
    ITunesCategory, ITunesCategoryBuilder, ITunesChannelExtensionBuilder,
    ITunesItemExtensionBuilder,
};
use rss::{
    Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, Item, ItemBuilder,
};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, FeedCategory};
use crate::error::{Error, Result};
use crate::pipeline::contracts::{Builder, Store};
use crate::types::Episode;

/// Rebuilds the published podcast feed from stored episodes
pub struct FeedService {
    config: Arc<Config>,
    store: Arc<dyn Store>,
}

impl FeedService {
    /// Create the service
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Absolute URL of the published feed file
    pub fn feed_url(&self) -> Result<url::Url> {
        self.config
            .media
            .public_url
            .join(&self.config.feed.file_name)
            .map_err(|e| Error::InvalidRequest(format!("bad feed url: {e}")))
    }

    fn channel(&self, episodes: &[Episode]) -> Result<Channel> {
        let feed = &self.config.feed;

        let itunes = ITunesChannelExtensionBuilder::default()
            .author(not_empty(&feed.author))
            .explicit(Some(explicit_str(feed.explicit).to_string()))
            .image(not_empty(&feed.image_url))
            .keywords(not_empty(&feed.keywords))
            .categories(itunes_categories(&feed.categories))
            .build();

        let items = episodes
            .iter()
            .map(|e| self.item(e))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = ChannelBuilder::default();
        builder
            .title(&feed.title)
            .link(&feed.website_link)
            .description(&feed.description)
            .language(not_empty(&feed.language))
            .generator(Some(concat!("podforge/", env!("CARGO_PKG_VERSION")).to_string()))
            // Episodes arrive newest first, so the head carries the feed's recency
            .pub_date(episodes.first().map(|e| e.created_at.to_rfc2822()))
            .last_build_date(Some(chrono::Utc::now().to_rfc2822()))
            .itunes_ext(Some(itunes))
            .items(items);
        if !feed.image_url.is_empty() {
            builder.image(Some(
                ImageBuilder::default()
                    .url(&feed.image_url)
                    .title(&feed.title)
                    .link(&feed.website_link)
                    .build(),
            ));
        }
        Ok(builder.build())
    }

    fn item(&self, episode: &Episode) -> Result<Item> {
        let media_url = self
            .config
            .media
            .public_url
            .join(&episode.media_file)
            .map_err(|e| Error::InvalidRequest(format!("bad media url: {e}")))?;

        let enclosure = EnclosureBuilder::default()
            .url(media_url.as_str())
            .length(episode.media_size.to_string())
            .mime_type(episode.media_type.as_str())
            .build();

        let mut itunes = ITunesItemExtensionBuilder::default();
        itunes
            .author(not_empty(&episode.author))
            .duration(Some(format_duration(episode.media_duration)));
        if !episode.thumbnail_file.is_empty() {
            let thumb_url = self
                .config
                .media
                .public_url
                .join(&episode.thumbnail_file)
                .map_err(|e| Error::InvalidRequest(format!("bad thumbnail url: {e}")))?;
            itunes.image(Some(thumb_url.to_string()));
        }

        Ok(ItemBuilder::default()
            .title(Some(episode.title.clone()))
            .description(Some(episode.description.clone()))
            .link(not_empty(&episode.canonical_url))
            .guid(Some(
                GuidBuilder::default()
                    .value(media_url.as_str())
                    .permalink(false)
                    .build(),
            ))
            .pub_date(Some(episode.created_at.to_rfc2822()))
            .enclosure(Some(enclosure))
            .itunes_ext(Some(itunes.build()))
            .build())
    }

    /// Write the feed atomically: temp file in the same directory, then rename
    async fn publish(&self, channel: &Channel) -> Result<()> {
        let final_path = self.config.media.public_dir.join(&self.config.feed.file_name);
        let tmp_path = self
            .config
            .media
            .public_dir
            .join(format!(".{}.tmp", self.config.feed.file_name));

        let xml = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{channel}");
        tokio::fs::write(&tmp_path, xml.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }
}

#[async_trait]
impl Builder for FeedService {
    async fn build(&self, _cancel: &CancellationToken) -> Result<()> {
        let episodes = self.store.episodes_all().await?;
        if episodes.is_empty() {
            return Err(Error::EmptyFeed);
        }

        let channel = self.channel(&episodes)?;
        self.publish(&channel).await?;
        tracing::info!(
            items = episodes.len(),
            file = %self.config.feed.file_name,
            "Feed published"
        );
        Ok(())
    }
}

fn not_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn explicit_str(explicit: bool) -> &'static str {
    if explicit { "true" } else { "false" }
}

/// iTunes allows one subcategory per category element, so a configured
/// category with several subcategories becomes several elements.
fn itunes_categories(categories: &[FeedCategory]) -> Vec<ITunesCategory> {
    let mut out = Vec::new();
    for category in categories {
        if category.subcategories.is_empty() {
            out.push(ITunesCategoryBuilder::default().text(&category.text).build());
            continue;
        }
        for sub in &category.subcategories {
            out.push(
                ITunesCategoryBuilder::default()
                    .text(&category.text)
                    .subcategory(Some(Box::new(
                        ITunesCategoryBuilder::default().text(sub).build(),
                    )))
                    .build(),
            );
        }
    }
    out
}

/// Seconds to "HH:MM:SS"
fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_helpers::{MockStore, episode_for};

    fn service_in(dir: &std::path::Path, store: Arc<MockStore>) -> FeedService {
        let mut config = Config::default();
        config.media.public_dir = dir.to_path_buf();
        config.media.public_url = url::Url::parse("https://podcast.example.com/").unwrap();
        config.feed.title = "Saved Videos".to_string();
        config.feed.description = "Videos as podcast episodes".to_string();
        config.feed.website_link = "https://podcast.example.com".to_string();
        config.feed.author = "podforge".to_string();
        config.feed.categories = vec![FeedCategory {
            text: "Technology".to_string(),
            subcategories: vec!["Podcasting".to_string()],
        }];
        FeedService::new(Arc::new(config), store)
    }

    #[tokio::test]
    async fn empty_store_cannot_produce_a_feed() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path(), Arc::new(MockStore::default()));

        let error = service.build(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(error, Error::EmptyFeed));
        assert!(!dir.path().join("podcast.xml").exists());
    }

    #[tokio::test]
    async fn builds_a_parseable_feed_with_one_item_per_episode() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::default());
        let mut first = episode_for("https://youtube.com/watch?v=a");
        first.title = "First".to_string();
        first.media_file = "aaaaaaaaaa.mp3".to_string();
        first.media_size = 2048;
        first.media_duration = 3725; // 01:02:05
        store.seed_episode(first);
        let mut second = episode_for("https://youtube.com/watch?v=b");
        second.title = "Second".to_string();
        second.media_file = "bbbbbbbbbb.mp3".to_string();
        store.seed_episode(second);

        let service = service_in(dir.path(), store);
        service.build(&CancellationToken::new()).await.unwrap();

        let xml = std::fs::read_to_string(dir.path().join("podcast.xml")).unwrap();
        let channel: Channel = xml.parse().unwrap();
        assert_eq!(channel.title(), "Saved Videos");
        assert_eq!(channel.items().len(), 2);
        // Newest first: the later insert leads
        assert_eq!(channel.items()[0].title(), Some("Second"));

        // Channel recency comes from the newest episode; a rebuild stamps now
        assert_eq!(
            channel.pub_date(),
            channel.items()[0].pub_date(),
            "channel pub date must track the newest episode"
        );
        assert!(channel.last_build_date().is_some());

        let enclosure = channel.items()[1].enclosure().unwrap();
        assert_eq!(
            enclosure.url(),
            "https://podcast.example.com/aaaaaaaaaa.mp3"
        );
        assert_eq!(enclosure.length(), "2048");
        assert_eq!(enclosure.mime_type(), "audio/mpeg");
        assert_eq!(
            channel.items()[1].itunes_ext().unwrap().duration(),
            Some("01:02:05")
        );
    }

    #[tokio::test]
    async fn rebuilding_replaces_the_previous_feed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::default());
        store.seed_episode(episode_for("https://youtube.com/watch?v=a"));
        let service = service_in(dir.path(), store.clone());

        service.build(&CancellationToken::new()).await.unwrap();
        store.seed_episode(episode_for("https://youtube.com/watch?v=b"));
        service.build(&CancellationToken::new()).await.unwrap();

        let xml = std::fs::read_to_string(dir.path().join("podcast.xml")).unwrap();
        let channel: Channel = xml.parse().unwrap();
        assert_eq!(channel.items().len(), 2);
        // No temp file left behind
        assert!(!dir.path().join(".podcast.xml.tmp").exists());
    }

    #[test]
    fn duration_formats_as_hms() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(3725), "01:02:05");
        assert_eq!(format_duration(-5), "00:00:00");
    }

    #[test]
    fn categories_expand_one_element_per_subcategory() {
        let categories = itunes_categories(&[
            FeedCategory {
                text: "Technology".to_string(),
                subcategories: vec!["Podcasting".to_string(), "Software".to_string()],
            },
            FeedCategory {
                text: "Education".to_string(),
                subcategories: Vec::new(),
            },
        ]);
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[0].text(), "Technology");
        assert_eq!(categories[0].subcategory().unwrap().text(), "Podcasting");
        assert!(categories[2].subcategory().is_none());
    }
}
