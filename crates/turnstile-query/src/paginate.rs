//! Paginator: slices a stably ordered result set into bounded pages.
//!
//! Pages are 1-based. Requested sizes are clamped to `[1, max_size]` rather
//! than rejected; page 0 is rejected with `InvalidPagination`; a page past
//! the end of the data is an empty page, not an error. Ordering stability
//! (ties broken by entity id) is part of the storage contract, so repeated
//! requests for the same page see the same rows.

use serde::{Deserialize, Serialize};

use turnstile_core::{PipelineError, Result};

/// Configured page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Size applied when the request names none.
    pub default_size: u32,
    /// Upper clamp for requested sizes.
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

/// A requested page: 1-based number plus optional size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: u32,
    pub size: Option<u32>,
}

impl PageRequest {
    #[must_use]
    pub fn new(number: u32) -> Self {
        Self { number, size: None }
    }

    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Extracts `page` / `per_page` from raw query parameters.
    ///
    /// Absent `page` means page 1. Non-numeric or zero/negative values fail
    /// with `InvalidPagination`.
    pub fn from_query(params: &[(String, String)]) -> Result<Self> {
        let mut number = 1u32;
        let mut size = None;

        for (name, value) in params {
            match name.as_str() {
                "page" => {
                    number = value.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                        PipelineError::invalid_pagination(format!(
                            "page must be a positive integer, got '{value}'"
                        ))
                    })?;
                }
                "per_page" => {
                    size = Some(value.parse::<u32>().map_err(|_| {
                        PipelineError::invalid_pagination(format!(
                            "per_page must be an integer, got '{value}'"
                        ))
                    })?);
                }
                _ => {}
            }
        }

        Ok(Self { number, size })
    }

    /// Resolves the request into a concrete offset window, clamping the size.
    pub fn resolve(&self, limits: PageLimits) -> Result<PageWindow> {
        if self.number == 0 {
            return Err(PipelineError::invalid_pagination("page numbers are 1-based"));
        }
        let size = self
            .size
            .unwrap_or(limits.default_size)
            .clamp(1, limits.max_size);
        Ok(PageWindow {
            offset: (self.number as usize - 1) * size as usize,
            limit: size as usize,
            number: self.number,
        })
    }
}

/// A resolved slice position: offset plus bounded limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
    /// The 1-based page number this window was resolved from.
    pub number: u32,
}

/// An ordered slice of entities with pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: u32,
    /// Effective (clamped) page size.
    pub size: u32,
    /// Total count of matching entities across all pages.
    pub total: usize,
    /// Whether pages exist beyond this one.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Assembles a page from a window's worth of items and the total count.
    #[must_use]
    pub fn new(items: Vec<T>, window: PageWindow, total: usize) -> Self {
        let has_more = window.offset + items.len() < total;
        Self {
            items,
            number: window.number,
            size: window.limit as u32,
            total,
            has_more,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maps the items while keeping the pagination metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total: self.total,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_page_is_one() {
        let request = PageRequest::from_query(&[]).unwrap();
        assert_eq!(request.number, 1);
        assert_eq!(request.size, None);

        let window = request.resolve(PageLimits::default()).unwrap();
        assert_eq!(window.offset, 0);
        assert_eq!(window.limit, 20);
    }

    #[test]
    fn test_page_zero_rejected() {
        let err = PageRequest::from_query(&params(&[("page", "0")])).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPagination(_)));

        let err = PageRequest::new(0).resolve(PageLimits::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPagination(_)));
    }

    #[test]
    fn test_negative_and_garbage_pages_rejected() {
        assert!(PageRequest::from_query(&params(&[("page", "-1")])).is_err());
        assert!(PageRequest::from_query(&params(&[("page", "two")])).is_err());
        assert!(PageRequest::from_query(&params(&[("per_page", "x")])).is_err());
    }

    #[test]
    fn test_oversized_page_clamps_to_max() {
        let limits = PageLimits {
            default_size: 20,
            max_size: 100,
        };
        let window = PageRequest::new(1)
            .with_size(5000)
            .resolve(limits)
            .unwrap();
        assert_eq!(window.limit, 100);
    }

    #[test]
    fn test_zero_size_clamps_to_one() {
        let window = PageRequest::new(1)
            .with_size(0)
            .resolve(PageLimits::default())
            .unwrap();
        assert_eq!(window.limit, 1);
    }

    #[test]
    fn test_window_offsets() {
        let limits = PageLimits {
            default_size: 10,
            max_size: 100,
        };
        let window = PageRequest::new(3).resolve(limits).unwrap();
        assert_eq!(window.offset, 20);
        assert_eq!(window.limit, 10);
        assert_eq!(window.number, 3);
    }

    #[test]
    fn test_page_beyond_data_is_empty_not_error() {
        let window = PageRequest::new(99)
            .with_size(10)
            .resolve(PageLimits::default())
            .unwrap();
        let page: Page<u32> = Page::new(Vec::new(), window, 15);
        assert!(page.is_empty());
        assert_eq!(page.total, 15);
        assert!(!page.has_more);
    }

    #[test]
    fn test_has_more() {
        let window = PageRequest::new(1)
            .with_size(10)
            .resolve(PageLimits::default())
            .unwrap();
        let page = Page::new((0..10).collect::<Vec<_>>(), window, 25);
        assert!(page.has_more);

        let window = PageRequest::new(3)
            .with_size(10)
            .resolve(PageLimits::default())
            .unwrap();
        let page = Page::new((20..25).collect::<Vec<_>>(), window, 25);
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let window = PageRequest::new(2)
            .with_size(2)
            .resolve(PageLimits::default())
            .unwrap();
        let page = Page::new(vec![3, 4], window, 6).map(|n| n * 10);
        assert_eq!(page.items, vec![30, 40]);
        assert_eq!(page.number, 2);
        assert_eq!(page.total, 6);
        assert!(page.has_more);
    }
}
