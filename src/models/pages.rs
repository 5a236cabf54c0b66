//! Page selector parsing.
//!
//! A selector is a comma-separated list of terms. Each term is a single
//! 1-based page number (`7`), an inclusive range (`2-5`), or an open-ended
//! range (`9-`) that runs to the document's last page. The empty selector
//! means every page.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::error::BridgeError;

/// Reasons a selector string can be rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageSelectorError {
    #[error("empty term at position {0}")]
    EmptyTerm(usize),

    #[error("'{0}' is not a page number")]
    NotANumber(String),

    #[error("range start {start} exceeds range end {end}")]
    ReversedRange { start: u32, end: u32 },

    #[error("page numbers start at 1, got 0")]
    ZeroPage,

    #[error("page {page} exceeds the document's {page_count} pages")]
    OutOfBounds { page: u32, page_count: u32 },
}

/// Normalized set of pages to translate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelector {
    /// Every page of the document
    #[default]
    All,

    /// Ascending, de-duplicated 1-based page numbers (never empty)
    Pages(Vec<u32>),
}

impl PageSelector {
    /// Parse `input` against a document with `page_count` pages
    pub fn parse(input: &str, page_count: u32) -> Result<Self, PageSelectorError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::All);
        }

        let mut pages = BTreeSet::new();
        for (position, term) in input.split(',').enumerate() {
            let term = term.trim();
            if term.is_empty() {
                return Err(PageSelectorError::EmptyTerm(position + 1));
            }

            let (start, end) = match term.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page(start)?;
                    let end = if end.trim().is_empty() {
                        page_count
                    } else {
                        parse_page(end)?
                    };
                    (start, end)
                }
                None => {
                    let page = parse_page(term)?;
                    (page, page)
                }
            };

            if start == 0 || end == 0 {
                return Err(PageSelectorError::ZeroPage);
            }
            if start > page_count {
                return Err(PageSelectorError::OutOfBounds {
                    page: start,
                    page_count,
                });
            }
            if end > page_count {
                return Err(PageSelectorError::OutOfBounds {
                    page: end,
                    page_count,
                });
            }
            if start > end {
                return Err(PageSelectorError::ReversedRange { start, end });
            }

            pages.extend(start..=end);
        }

        Ok(Self::Pages(pages.into_iter().collect()))
    }

    /// Whether this selector covers the whole document
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Selected pages, or `None` when every page is selected
    pub fn pages(&self) -> Option<&[u32]> {
        match self {
            Self::All => None,
            Self::Pages(pages) => Some(pages),
        }
    }

    /// Number of selected pages given the document's page count
    pub fn count(&self, page_count: u32) -> usize {
        match self {
            Self::All => page_count as usize,
            Self::Pages(pages) => pages.len(),
        }
    }
}

fn parse_page(raw: &str) -> Result<u32, PageSelectorError> {
    let raw = raw.trim();
    // `u32::from_str` also accepts a leading '+'
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageSelectorError::NotANumber(raw.to_string()));
    }
    raw.parse::<u32>()
        .map_err(|_| PageSelectorError::NotANumber(raw.to_string()))
}

/// Formats as an ascending comma list with consecutive runs collapsed
/// (`1-3,5,8-9`); the `All` selector formats as the empty string.
impl fmt::Display for PageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self::Pages(pages) = self else {
            return Ok(());
        };

        let mut terms = Vec::new();
        let mut iter = pages.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }
            if start == end {
                terms.push(start.to_string());
            } else {
                terms.push(format!("{}-{}", start, end));
            }
        }
        write!(f, "{}", terms.join(","))
    }
}

impl Serialize for PageSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("all"),
            Self::Pages(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl PageSelectorError {
    /// Attach the raw selector text, producing the bridge-level error
    pub fn into_bridge_error(self, raw: &str) -> BridgeError {
        BridgeError::InvalidPageSelector {
            value: raw.to_string(),
            reason: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_means_all_pages() {
        assert_eq!(PageSelector::parse("", 10).unwrap(), PageSelector::All);
        assert_eq!(PageSelector::parse("   ", 1).unwrap(), PageSelector::All);
        assert!(PageSelector::parse("", 0).unwrap().is_all());
    }

    #[test]
    fn test_closed_range() {
        let sel = PageSelector::parse("1-5", 10).unwrap();
        assert_eq!(sel.pages(), Some(&[1, 2, 3, 4, 5][..]));
    }

    #[test]
    fn test_open_ended_range() {
        let sel = PageSelector::parse("3-", 10).unwrap();
        assert_eq!(sel.pages(), Some(&[3, 4, 5, 6, 7, 8, 9, 10][..]));
    }

    #[test]
    fn test_list_is_sorted_and_deduplicated() {
        let sel = PageSelector::parse("7, 1,3-5,4,1", 10).unwrap();
        assert_eq!(sel.pages(), Some(&[1, 3, 4, 5, 7][..]));
        assert_eq!(sel.to_string(), "1,3-5,7");
    }

    #[test]
    fn test_out_of_bounds_fails_even_with_valid_terms() {
        let err = PageSelector::parse("1,2,11", 10).unwrap_err();
        assert_eq!(
            err,
            PageSelectorError::OutOfBounds {
                page: 11,
                page_count: 10
            }
        );
        assert!(PageSelector::parse("9-12", 10).is_err());
        assert!(PageSelector::parse("11-", 10).is_err());
    }

    #[test]
    fn test_rejects_malformed_terms() {
        assert_eq!(
            PageSelector::parse("a", 10).unwrap_err(),
            PageSelectorError::NotANumber("a".to_string())
        );
        assert_eq!(
            PageSelector::parse("1,,2", 10).unwrap_err(),
            PageSelectorError::EmptyTerm(2)
        );
        assert_eq!(
            PageSelector::parse("5-3", 10).unwrap_err(),
            PageSelectorError::ReversedRange { start: 5, end: 3 }
        );
        assert_eq!(
            PageSelector::parse("0", 10).unwrap_err(),
            PageSelectorError::ZeroPage
        );
        assert!(PageSelector::parse("-3", 10).is_err());
        assert!(PageSelector::parse("1-2-3", 10).is_err());
        assert!(PageSelector::parse("-1", 10).is_err());
        assert_eq!(
            PageSelector::parse("+3", 10).unwrap_err(),
            PageSelectorError::NotANumber("+3".to_string())
        );
        assert_eq!(
            PageSelector::parse("1-+3", 10).unwrap_err(),
            PageSelectorError::NotANumber("+3".to_string())
        );
    }

    #[test]
    fn test_into_bridge_error_keeps_raw_value() {
        let err = PageSelector::parse("1-99", 12)
            .unwrap_err()
            .into_bridge_error("1-99");
        assert_eq!(err.kind(), "InvalidPageSelector");
        assert_eq!(err.value().as_deref(), Some("1-99"));
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_value(PageSelector::All).unwrap(), "all");
        let sel = PageSelector::parse("1,2,3", 5).unwrap();
        assert_eq!(serde_json::to_value(sel).unwrap(), "1-3");
    }

    #[test]
    fn test_count() {
        assert_eq!(PageSelector::All.count(12), 12);
        assert_eq!(PageSelector::parse("2-4", 12).unwrap().count(12), 3);
    }

    fn term_strategy(page_count: u32) -> impl Strategy<Value = String> {
        prop_oneof![
            (1..=page_count).prop_map(|p| p.to_string()),
            (1..=page_count, 1..=page_count).prop_map(|(a, b)| {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                format!("{}-{}", lo, hi)
            }),
            (1..=page_count).prop_map(|p| format!("{}-", p)),
        ]
    }

    proptest! {
        #[test]
        fn prop_format_then_parse_is_stable(
            page_count in 1u32..60,
            seed in proptest::collection::vec(any::<u32>(), 1..8),
        ) {
            let terms: Vec<String> = seed
                .iter()
                .map(|s| {
                    let a = s % page_count + 1;
                    let b = (s / 7) % page_count + 1;
                    match s % 3 {
                        0 => a.to_string(),
                        1 => format!("{}-{}", a.min(b), a.max(b)),
                        _ => format!("{}-", a),
                    }
                })
                .collect();
            let input = terms.join(",");

            let first = PageSelector::parse(&input, page_count).unwrap();
            let second = PageSelector::parse(&first.to_string(), page_count).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_generated_terms_parse(page_count in 1u32..40, term in (1u32..40).prop_flat_map(term_strategy)) {
            // Terms are generated against their own bound, so only compare when in range.
            let result = PageSelector::parse(&term, page_count);
            let max_page = term
                .split('-')
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse::<u32>().ok())
                .max()
                .unwrap_or(0);
            if max_page <= page_count {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }

        #[test]
        fn prop_pages_ascending_and_in_bounds(page_count in 1u32..50, a in 1u32..50, b in 1u32..50) {
            let input = format!("{},{}", a, b);
            match PageSelector::parse(&input, page_count) {
                Ok(PageSelector::Pages(pages)) => {
                    prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
                    prop_assert!(pages.iter().all(|p| *p >= 1 && *p <= page_count));
                }
                Ok(PageSelector::All) => prop_assert!(false, "explicit selector parsed to All"),
                Err(_) => prop_assert!(a > page_count || b > page_count),
            }
        }
    }
}
