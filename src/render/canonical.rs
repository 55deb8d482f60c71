//! Canonical text serialization of a snapshot.
//!
//! Each record renders as
//!
//! ```text
//! ================================================
//! FILE: <path>
//! ================================================
//! <content>
//! ```
//!
//! and records are separated by one blank line.

use crate::domain::{DocumentPage, FileContent, FileRecord};

pub const BANNER_WIDTH: usize = 48;

pub fn format_files<'a, I>(files: I) -> String
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let banner = "=".repeat(BANNER_WIDTH);
    files
        .into_iter()
        .map(|file| {
            let body = render_content(&file.content);
            format!("{banner}\nFILE: {}\n{banner}\n{body}", file.path)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_content(content: &FileContent) -> String {
    match content {
        FileContent::Text { text } => text.clone(),
        FileContent::Document { pages } => render_pages(pages),
        FileContent::ImageDescription { description } => description.clone(),
        FileContent::Degraded { strategy, reason, .. } => {
            format!("[{strategy} extraction failed: {reason}]")
        }
    }
}

fn render_pages(pages: &[DocumentPage]) -> String {
    pages.iter().map(|p| format!("{}\n", p.markdown)).collect::<Vec<_>>().join("\n")
}
