//! Page selection.
//!
//! A page specification is a comma-separated list of single page numbers and
//! inclusive `a-b` ranges, e.g. `"1,3-5,7,10-12"`. Parsing yields a
//! [`PageSet`]: sorted, duplicates collapsed. Whether a page actually exists
//! is only known once the document is open, so range validation happens in
//! [`PageSet::select`] and produces warnings rather than errors.

use std::collections::BTreeSet;
use std::fmt;

/// Upper bound on page numbers produced by range expansion.
///
/// Keeps `1-999999999` from allocating a billion entries; anything above this
/// is out of range for every document lopdf can open anyway.
pub const MAX_PAGE_NUMBER: i64 = 100_000;

/// Sorted, deduplicated set of requested page numbers.
///
/// Numbers are kept as given, including zero and negatives, so that they can
/// be reported as out of range later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    pages: BTreeSet<i64>,
    malformed: Vec<String>,
    spec: String,
}

/// Outcome of matching a [`PageSet`] against a document's page count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    /// Requested pages inside `[1, total]`, ascending.
    pub valid: Vec<u32>,

    /// Requested pages outside `[1, total]`, ascending.
    pub out_of_range: Vec<i64>,

    /// Human-readable warnings for malformed tokens and out-of-range pages.
    pub warnings: Vec<String>,
}

impl PageSet {
    /// Parse a textual page specification.
    ///
    /// Tokens that are neither a number nor an `a-b` range are kept aside as
    /// malformed and surface as warnings from [`PageSet::select`].
    ///
    /// # Examples
    ///
    /// ```
    /// use docpipe::pdf::PageSet;
    ///
    /// let set = PageSet::parse("5,3,5,1-2");
    /// assert_eq!(set.pages(), vec![1, 2, 3, 5]);
    /// ```
    pub fn parse(spec: &str) -> Self {
        Self::from_tokens(spec.split(','))
    }

    /// Parse a list of tokens, each of which may itself be a single number
    /// or a range.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        let mut seen = Vec::new();

        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            seen.push(token.to_string());

            if let Ok(page) = token.parse::<i64>() {
                set.pages.insert(page);
                continue;
            }

            match parse_range(token) {
                Some((start, end)) => {
                    let end = end.min(MAX_PAGE_NUMBER.max(start));
                    set.pages.extend(start..=end);
                }
                None => set.malformed.push(token.to_string()),
            }
        }

        set.spec = seen.join(",");
        set
    }

    /// All parsed page numbers, ascending. Non-positive numbers are omitted.
    pub fn pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter_map(|&p| u32::try_from(p).ok())
            .filter(|&p| p > 0)
            .collect()
    }

    /// Tokens that could not be parsed.
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }

    /// Number of distinct page numbers requested.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when no page number was parsed.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Check whether `page` was requested.
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&i64::from(page))
    }

    /// Match the set against a document with `total` pages.
    pub fn select(&self, total: u32) -> PageSelection {
        let total_i = i64::from(total);
        let mut selection = PageSelection::default();

        for token in &self.malformed {
            selection
                .warnings
                .push(format!("Ignored malformed page token '{token}'"));
        }

        for &page in &self.pages {
            if (1..=total_i).contains(&page) {
                selection.valid.push(page as u32);
            } else {
                selection.out_of_range.push(page);
            }
        }

        for (start, end) in contiguous_runs(&selection.out_of_range) {
            let warning = if start == end {
                format!("Page {start} is out of range (1-{total})")
            } else {
                format!("Pages {start}-{end} are out of range (1-{total})")
            };
            selection.warnings.push(warning);
        }

        selection
    }
}

impl fmt::Display for PageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec)
    }
}

/// Parse `a-b` into an ordered pair. Reversed ranges are normalized.
fn parse_range(token: &str) -> Option<(i64, i64)> {
    let (start, end) = token.split_once('-')?;
    let start: u32 = start.trim().parse().ok()?;
    let end: u32 = end.trim().parse().ok()?;
    let (start, end) = (i64::from(start), i64::from(end));
    Some((start.min(end), start.max(end)))
}

/// Collapse a sorted list of numbers into inclusive runs.
fn contiguous_runs(sorted: &[i64]) -> Vec<(i64, i64)> {
    let mut runs: Vec<(i64, i64)> = Vec::new();
    for &n in sorted {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => runs.push((n, n)),
        }
    }
    runs
}
