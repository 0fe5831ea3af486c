//! CLI output formatting.
//!
//! # Information-First Display
//!
//! The primary display for every photo is its positional index and file
//! name, with the id, source path, and size shown as indented context
//! lines. The output reads as an inventory of what the server would serve.
//!
//! ## Scan
//!
//! ```text
//! Photos (2)
//! 001 beach.jpg
//!     Id: 4b1c…
//!     Source: trip/beach.jpg
//!     Size: 800x600, 52.3 KB
//! 002 icon.png
//!     Id: 90fe…
//!     Source: icon.png
//!     Size: 40x40, 1.1 KB
//!
//! Total: 2 photos, 53.4 KB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::index::{PhotoIndex, PhotoRecord, format_size};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Source path relative to `root`, or the full path if it lies elsewhere.
fn display_source(record: &PhotoRecord, root: &Path) -> String {
    record
        .source_path
        .strip_prefix(root)
        .unwrap_or(&record.source_path)
        .display()
        .to_string()
}

fn photo_lines(pos: usize, record: &PhotoRecord, root: &Path) -> Vec<String> {
    vec![
        format!("{} {}", format_index(pos), record.name),
        format!("{}Id: {}", indent(1), record.id),
        format!("{}Source: {}", indent(1), display_source(record, root)),
        format!(
            "{}Size: {}x{}, {}",
            indent(1),
            record.dimensions.width,
            record.dimensions.height,
            record.size_display()
        ),
    ]
}

/// Inventory of a scanned photo root, in serving order.
pub fn format_scan_output(index: &PhotoIndex, root: &Path) -> Vec<String> {
    if index.is_empty() {
        return vec![format!("No photos found under {}", root.display())];
    }

    let mut lines = vec![format!("Photos ({})", index.len())];
    for (i, record) in index.iter().enumerate() {
        lines.extend(photo_lines(i + 1, record, root));
    }

    let total: u64 = index.iter().map(|r| r.size_on_disk).sum();
    let noun = if index.len() == 1 { "photo" } else { "photos" };
    lines.push(String::new());
    lines.push(format!(
        "Total: {} {}, {}",
        index.len(),
        noun,
        format_size(total)
    ));
    lines
}

pub fn print_scan_output(index: &PhotoIndex, root: &Path) {
    for line in format_scan_output(index, root) {
        println!("{}", line);
    }
}
