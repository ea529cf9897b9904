// src/output.rs
// =============================================================================
// Renders crawled pages as text or JSON and writes them out.
//
// Text format, one block per page, blocks separated by a blank line:
//
//   <page>
//     <title>Intro</title>
//     <url>https://example.com/docs/intro</url>
//     <content>...</content>
//   </page>
//
// JSON format: an array of {"url", "title", "content"} objects.
// =============================================================================

use crate::crawl::{Page, PageMap};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    /// JSON when the output file ends in `.json`, text otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Text,
        }
    }
}

pub fn serialize_pages(pages: &PageMap, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let list: Vec<&Page> = pages.iter().collect();
            Ok(serde_json::to_string_pretty(&list)?)
        }
        Format::Text => Ok(pages.iter().map(text_block).collect::<Vec<_>>().join("\n\n")),
    }
}

fn text_block(page: &Page) -> String {
    format!(
        "<page>\n  <title>{}</title>\n  <url>{}</url>\n  <content>{}</content>\n</page>",
        page.title, page.url, page.content
    )
}

// Writes the pages to `outfile` (format picked from its extension), or as
// text to stdout when no file is given
pub fn write_pages(pages: &PageMap, outfile: Option<&Path>) -> Result<()> {
    match outfile {
        Some(path) => {
            let output = serialize_pages(pages, Format::from_path(path))?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
            fs::write(path, output).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            println!("{}", serialize_pages(pages, Format::Text)?);
        }
    }
    Ok(())
}
