//! Publication: slug and canonical URL, the rendered page artifact, and
//! the master index update.
//!
//! The HTML emitted here is a deliberately small shell (head metadata,
//! JSON-LD script, the markdown body in an article element); full visual
//! templating belongs to the static front-end, not the pipeline.

pub mod index;
pub mod jsonld;
pub mod text;

use std::path::PathBuf;

use crate::config::{SiteConfig, StorageConfig};
use crate::error::StorageError;
use crate::fsutil;
use crate::record::ArticleRecord;
use self::index::{ArticleSummary, MasterIndex};
use self::text::slugify;

/// Writes page artifacts and maintains the master index.
pub struct Publisher {
    site: SiteConfig,
    articles_dir: PathBuf,
    index: MasterIndex,
}

impl Publisher {
    /// Build a publisher from configuration.
    pub fn new(site: SiteConfig, storage: &StorageConfig) -> Self {
        Self {
            site,
            articles_dir: storage.articles_dir(),
            index: MasterIndex::new(storage.master_index_path()),
        }
    }

    /// The master index this publisher maintains.
    pub fn index(&self) -> &MasterIndex {
        &self.index
    }

    /// Canonical URL for a slug.
    pub fn canonical_url(&self, slug: &str) -> String {
        format!(
            "{}/articles/{slug}.html",
            self.site.base_url.trim_end_matches('/')
        )
    }

    /// Publish a record: ensure slug and JSON-LD, write the page
    /// artifact, and upsert the index entry. Returns the slug.
    pub fn publish(&self, record: &mut ArticleRecord) -> Result<String, StorageError> {
        let slug = match &record.slug {
            Some(slug) if !slug.is_empty() => slug.clone(),
            _ => {
                let derived = slugify(record.display_title());
                tracing::warn!(id = %record.id, slug = %derived, "record had no slug; derived one");
                record.slug = Some(derived.clone());
                derived
            }
        };

        if record.generated_json_ld_object.is_none() {
            record.generated_json_ld_object =
                Some(jsonld::generate_news_article_json_ld(record, &self.site));
        }

        let html = self.render_page(record);
        let page_path = self.articles_dir.join(format!("{slug}.html"));
        fsutil::atomic_write(&page_path, html.as_bytes())?;
        tracing::info!(id = %record.id, path = %page_path.display(), "article page written");

        self.index.upsert(self.summary_projection(record, &slug))?;
        Ok(slug)
    }

    fn summary_projection(&self, record: &ArticleRecord, slug: &str) -> ArticleSummary {
        ArticleSummary {
            id: record.id.clone(),
            title: record.display_title().to_string(),
            slug: slug.to_string(),
            link: format!("articles/{slug}.html"),
            summary: record.generated_meta_description.clone(),
            image_url: record.selected_image_url.clone(),
            published_iso: record.published_iso_utc.clone(),
            topic: record.primary_topic.clone(),
            audio_url: record.audio_url.clone(),
        }
    }

    fn render_page(&self, record: &ArticleRecord) -> String {
        let title_tag = record
            .generated_title_tag
            .as_deref()
            .unwrap_or_else(|| record.display_title());
        let h1 = record.display_title();
        let description = record.generated_meta_description.as_deref().unwrap_or("");
        let body_md = record
            .generated_article_body_md_final
            .as_deref()
            .or(record.assembled_article_body_md.as_deref())
            .unwrap_or("");
        let json_ld = record
            .generated_json_ld_object
            .as_ref()
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_default();
        let canonical = self.canonical_url(record.slug.as_deref().unwrap_or(""));
        let favicon = self
            .site
            .favicon_url
            .as_deref()
            .map(|url| format!("\n  <link rel=\"icon\" href=\"{url}\">"))
            .unwrap_or_default();
        let audio = record
            .audio_url
            .as_deref()
            .map(|url| format!("\n  <audio controls src=\"/{url}\"></audio>"))
            .unwrap_or_default();

        format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head>\n\
             \x20 <meta charset=\"utf-8\">\n\
             \x20 <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             \x20 <title>{title}</title>\n\
             \x20 <meta name=\"description\" content=\"{description}\">\n\
             \x20 <link rel=\"canonical\" href=\"{canonical}\">{favicon}\n\
             \x20 <script type=\"application/ld+json\">\n{json_ld}\n  </script>\n\
             </head>\n\
             <body>\n\
             \x20 <h1>{h1}</h1>{audio}\n\
             \x20 <article data-format=\"markdown\">\n{body}\n  </article>\n\
             </body>\n\
             </html>\n",
            title = html_escape(title_tag),
            description = html_escape(description),
            canonical = canonical,
            favicon = favicon,
            json_ld = json_ld,
            h1 = html_escape(h1),
            audio = audio,
            body = body_md,
        )
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
