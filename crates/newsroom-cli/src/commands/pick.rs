//! `newsroom pick`: manually add article URLs for processing.
//!
//! Two modes: flag-driven (one URL per invocation) and interactive
//! quick-add / advanced-add. Both write a raw research document that the
//! next `newsroom run` picks up.

use console::style;
use dialoguer::{Confirm, Input, Select};
use newsroom_core::config::Config;
use newsroom_core::pipeline::ingest::{self, IMPORTANCE_LEVELS};

use super::PickArgs;

pub fn execute(config: &Config, args: PickArgs) -> anyhow::Result<()> {
    match args.url.clone() {
        Some(url) => add_single(config, &url, args),
        None => interactive(config),
    }
}

fn add_single(config: &Config, url: &str, args: PickArgs) -> anyhow::Result<()> {
    let importance = normalize_importance(&args.importance)?;
    let doc = ingest::manual_pick_doc(
        url,
        args.title.as_deref(),
        importance,
        args.trending,
        args.image.as_deref(),
    );
    ingest::save_raw_doc(&config.storage, &doc)?;
    println!(
        "{} {url} (id {}, importance {importance}{})",
        style("Added").green(),
        doc.id,
        if doc.manual_is_trending { ", trending" } else { "" },
    );
    Ok(())
}

fn interactive(config: &Config) -> anyhow::Result<()> {
    let mode = Select::new()
        .with_prompt("Pick mode")
        .items(&["Quick-add (URLs, optional '| title')", "Advanced-add"])
        .default(0)
        .interact()?;

    match mode {
        0 => quick_add(config),
        _ => advanced_add(config),
    }
}

/// Quick-add: one URL per line, optional `| title` suffix, empty line to
/// finish.
fn quick_add(config: &Config) -> anyhow::Result<()> {
    println!("Enter URLs (optionally 'url | title'), empty line to finish:");
    let mut added = 0usize;
    loop {
        let line: String = Input::new().with_prompt(">").allow_empty(true).interact_text()?;
        let line = line.trim().to_string();
        if line.is_empty() {
            break;
        }

        let (url, title) = match line.split_once('|') {
            Some((url, title)) => (url.trim().to_string(), Some(title.trim().to_string())),
            None => (line, None),
        };

        let doc = ingest::manual_pick_doc(&url, title.as_deref(), "Interesting", false, None);
        ingest::save_raw_doc(&config.storage, &doc)?;
        println!("  {} {url} (id {})", style("added").green(), doc.id);
        added += 1;
    }
    println!("{added} pick(s) saved.");
    Ok(())
}

fn advanced_add(config: &Config) -> anyhow::Result<()> {
    let url: String = Input::new().with_prompt("URL").interact_text()?;
    let title: String = Input::new()
        .with_prompt("Title (empty to let the pipeline decide)")
        .allow_empty(true)
        .interact_text()?;

    let importance_idx = Select::new()
        .with_prompt("Importance")
        .items(IMPORTANCE_LEVELS)
        .default(0)
        .interact()?;
    let importance = IMPORTANCE_LEVELS[importance_idx];

    // Breaking implies trending; only ask otherwise.
    let trending = importance == "Breaking"
        || Confirm::new()
            .with_prompt("Mark as trending?")
            .default(false)
            .interact()?;

    let image: String = Input::new()
        .with_prompt("Image URL (optional)")
        .allow_empty(true)
        .interact_text()?;

    let doc = ingest::manual_pick_doc(
        &url,
        (!title.is_empty()).then_some(title.as_str()),
        importance,
        trending,
        (!image.is_empty()).then_some(image.as_str()),
    );
    ingest::save_raw_doc(&config.storage, &doc)?;
    println!(
        "{} {url} (id {}, importance {importance}{})",
        style("Added").green(),
        doc.id,
        if doc.manual_is_trending { ", trending" } else { "" },
    );
    Ok(())
}

fn normalize_importance(raw: &str) -> anyhow::Result<&'static str> {
    IMPORTANCE_LEVELS
        .iter()
        .find(|level| level.eq_ignore_ascii_case(raw))
        .copied()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "invalid importance '{raw}', expected one of: {}",
                IMPORTANCE_LEVELS.join(", ")
            )
        })
}
