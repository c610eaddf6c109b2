//! Plain-text rendering of a layout
//!
//! ```text
//! ------------------------------------------
//! |    0 -   99 | Allocated (size 100)
//! |  100 - 1023 | Free
//! ------------------------------------------
//! ```

use crate::layout::{Layout, SpanStatus};
use std::fmt;

const RULE: &str = "------------------------------------------";

/// Tabular view of a [`Layout`], one row per span
pub struct LayoutReport<'a> {
    layout: &'a Layout,
}

impl<'a> LayoutReport<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        LayoutReport { layout }
    }
}

impl fmt::Display for LayoutReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Column width grows with the largest address
        let width = self
            .layout
            .capacity()
            .saturating_sub(1)
            .to_string()
            .len()
            .max(4);

        writeln!(f, "{}", RULE)?;
        for span in self.layout {
            write!(
                f,
                "| {:>w$} - {:>w$} | ",
                span.start,
                span.last(),
                w = width
            )?;
            match span.status {
                SpanStatus::Free => writeln!(f, "Free")?,
                SpanStatus::Allocated { size, .. } => writeln!(f, "Allocated (size {})", size)?,
            }
        }
        writeln!(f, "{}", RULE)
    }
}
