//! `newsroom delete`: remove an article from everywhere it lives.
//!
//! Accepts a canonical URL or a bare record ID. Removes the rendered
//! page, the processed record, the raw research document, the audio
//! file, the duplicate-store fingerprint, and the master index entry.
//! A path-safety guard restricts deletions to the known storage roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use dialoguer::Confirm;
use newsroom_core::config::{Config, DedupConfig};
use newsroom_core::dedup::DuplicateStore;
use newsroom_core::embedding::Embedder;
use newsroom_core::error::EmbeddingError;
use newsroom_core::publish::index::MasterIndex;
use newsroom_core::record::store::RecordStore;

use super::DeleteArgs;

/// Embedder stub for store maintenance; deletion never embeds.
struct NoopEmbedder;

#[async_trait::async_trait]
impl Embedder for NoopEmbedder {
    fn name(&self) -> &str {
        "noop"
    }
    async fn embed(&self, _text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        Ok(None)
    }
}

pub async fn execute(config: &Config, args: DeleteArgs) -> anyhow::Result<()> {
    let index = MasterIndex::new(config.storage.master_index_path());
    let records = RecordStore::new(config.storage.processed_json_dir());

    let (id, slug) = resolve_target(&args.target, &index, &records)?;

    println!(
        "About to delete article {} (slug: {})",
        style(&id).cyan(),
        slug.as_deref().unwrap_or("unknown")
    );
    if !args.yes
        && !Confirm::new()
            .with_prompt("Proceed?")
            .default(false)
            .interact()?
    {
        println!("Aborted.");
        return Ok(());
    }

    // Rendered page.
    if let Some(slug) = &slug {
        remove_guarded(
            &config.storage.articles_dir().join(format!("{slug}.html")),
            &config.storage.articles_dir(),
            "page",
        )?;
    }

    // Audio (any extension).
    let audio_dir = config.storage.audio_dir();
    if let Ok(entries) = std::fs::read_dir(&audio_dir) {
        for entry in entries.filter_map(Result::ok) {
            if entry.path().file_stem().and_then(|s| s.to_str()) == Some(id.as_str()) {
                remove_guarded(&entry.path(), &audio_dir, "audio")?;
            }
        }
    }

    // Record and raw research document.
    records.delete(&id)?;
    println!("  removed record {id}.json (if present)");
    remove_guarded(
        &config.storage.raw_web_research_dir().join(format!("{id}.json")),
        &config.storage.raw_web_research_dir(),
        "raw doc",
    )?;

    // Duplicate-store fingerprint.
    let duplicates = DuplicateStore::open(
        config.storage.historical_embeddings_path(),
        DedupConfig::default(),
        Arc::new(NoopEmbedder),
    )?;
    if duplicates.remove(&id).await? {
        println!("  removed duplicate-store fingerprint");
    }

    // Index entry (by id; the first-match-by-link path is used when only
    // a link was resolvable).
    if index.remove_by_id(&id)? {
        println!("  removed master index entry");
    }

    println!("{}", style("Delete complete.").green());
    Ok(())
}

/// Resolve a URL or bare ID to `(id, slug)` using the index and records.
fn resolve_target(
    target: &str,
    index: &MasterIndex,
    records: &RecordStore,
) -> anyhow::Result<(String, Option<String>)> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let slug = target
            .rsplit('/')
            .next()
            .and_then(|name| name.strip_suffix(".html"))
            .ok_or_else(|| anyhow::anyhow!("URL does not look like an article page: {target}"))?;

        let entry = index
            .load()?
            .into_iter()
            .find(|a| a.slug == slug)
            .ok_or_else(|| anyhow::anyhow!("no index entry with slug '{slug}'"))?;
        return Ok((entry.id, Some(entry.slug)));
    }

    // Bare ID: prefer the index entry (it knows the slug), fall back to
    // the stored record.
    if let Some(entry) = index.load()?.into_iter().find(|a| a.id == target) {
        return Ok((entry.id, Some(entry.slug)));
    }
    let record = records
        .load(target)
        .map_err(|_| anyhow::anyhow!("no record or index entry for '{target}'"))?;
    Ok((record.id, record.slug))
}

/// Delete a file only when it resolves inside `root`.
fn remove_guarded(path: &Path, root: &PathBuf, label: &str) -> anyhow::Result<()> {
    if !path_is_within(path, root) {
        anyhow::bail!("refusing to delete outside storage root: {}", path.display());
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            println!("  removed {label} {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn path_is_within(path: &Path, root: &Path) -> bool {
    // Component-wise containment; no `..` traversal allowed.
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return false;
    }
    path.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_traversal_and_foreign_roots() {
        let root = PathBuf::from("public/articles");
        assert!(path_is_within(Path::new("public/articles/a.html"), &root));
        assert!(!path_is_within(Path::new("public/articles/../../etc/passwd"), &root));
        assert!(!path_is_within(Path::new("data/processed_json/a.json"), &root));
    }

    #[test]
    fn resolve_prefers_index_slug() {
        let dir = tempfile::tempdir().unwrap();
        let index = MasterIndex::new(dir.path().join("all_articles.json"));
        let records = RecordStore::new(dir.path().join("records"));

        index
            .upsert(newsroom_core::publish::index::ArticleSummary {
                id: "abc".to_string(),
                title: "T".to_string(),
                slug: "the-slug".to_string(),
                link: "articles/the-slug.html".to_string(),
                summary: None,
                image_url: None,
                published_iso: None,
                topic: None,
                audio_url: None,
            })
            .unwrap();

        let (id, slug) = resolve_target(
            "https://site.example.com/articles/the-slug.html",
            &index,
            &records,
        )
        .unwrap();
        assert_eq!(id, "abc");
        assert_eq!(slug.as_deref(), Some("the-slug"));

        let (id, _) = resolve_target("abc", &index, &records).unwrap();
        assert_eq!(id, "abc");

        assert!(resolve_target("ghost", &index, &records).is_err());
    }
}
