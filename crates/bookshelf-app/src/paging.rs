use crate::error::{ApiError, ApiResult};
use bookshelf_dal::{Batch, ListingParams};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Which slice of the catalog to show, pages are numbered from 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
    search: Option<String>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest {
            page: page.max(1),
            page_size: page_size.max(1),
            search: None,
        }
    }

    pub fn with_search(mut self, term: Option<&str>) -> Self {
        self.search = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn listing_params(&self) -> ListingParams {
        let offset = (i64::from(self.page) - 1).saturating_mul(i64::from(self.page_size));
        let params = ListingParams::new(offset, self.page_size.into());
        match &self.search {
            Some(term) => params.with_search(term),
            None => params,
        }
    }
}

pub fn parse_page(raw: &str) -> ApiResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(ApiError::InvalidQuery(format!("Invalid page number {raw}"))),
    }
}

#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
pub struct SearchQuery {
    #[garde(length(max = 255))]
    pub query: Option<String>,
}

impl SearchQuery {
    /// Trimmed search term, `None` when blank
    pub fn term(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn checked(self) -> ApiResult<Self> {
        self.validate()
            .map_err(|report| ApiError::InvalidQuery(report.to_string()))?;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total: u64,
    pub rows: Vec<T>,
}

impl<T> Page<T>
where
    T: Serialize,
{
    /// Page numbers come from the request, so pages past the end stay valid
    pub fn new(request: &PageRequest, batch: Batch<T>) -> Self {
        let total_pages = batch.total.div_ceil(u64::from(request.page_size()));
        Self {
            page: request.page(),
            page_size: request.page_size(),
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total: batch.total,
            rows: batch.rows,
        }
    }
}

/// Result of a listing request.
///
/// A search that matched nothing at all is reported as `NoResults`; an empty
/// page past the end of a non-empty result is still a `Page`.
#[derive(Debug)]
pub enum Listing<T> {
    Page(Page<T>),
    NoResults { query: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(offset: i64, rows: usize, total: u64) -> Batch<u32> {
        Batch {
            offset,
            limit: 8,
            rows: (0..rows as u32).collect(),
            total,
        }
    }

    #[test]
    fn test_listing_params() {
        let params = PageRequest::new(3, 8).listing_params();
        assert_eq!(16, params.offset);
        assert_eq!(8, params.limit);
        assert!(params.search.is_none());

        let params = PageRequest::new(1, 8)
            .with_search(Some("  tolkien "))
            .listing_params();
        assert_eq!(0, params.offset);
        assert_eq!(Some("tolkien".to_string()), params.search);

        let request = PageRequest::new(1, 8).with_search(Some("   "));
        assert_eq!(None, request.search());
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(1, parse_page("1").unwrap());
        assert_eq!(12, parse_page("12").unwrap());
        assert!(matches!(parse_page("0"), Err(ApiError::InvalidQuery(_))));
        assert!(matches!(parse_page("-1"), Err(ApiError::InvalidQuery(_))));
        assert!(matches!(parse_page("two"), Err(ApiError::InvalidQuery(_))));
    }

    #[test]
    fn test_total_pages() {
        let request = PageRequest::new(1, 8);
        let page = Page::new(&request, batch(0, 8, 10));
        assert_eq!(1, page.page);
        assert_eq!(2, page.total_pages);
        assert_eq!(8, page.rows.len());

        let page = Page::new(&PageRequest::new(2, 8), batch(8, 2, 10));
        assert_eq!(2, page.page);
        assert_eq!(2, page.rows.len());

        let page = Page::new(&request, batch(0, 8, 16));
        assert_eq!(2, page.total_pages);

        let empty = Page::new(&request, batch(0, 0, 0));
        assert_eq!(0, empty.total_pages);
    }

    #[test]
    fn test_huge_page_number() {
        let request = PageRequest::new(u32::MAX, 1000);
        let params = request.listing_params();
        assert_eq!((i64::from(u32::MAX) - 1) * 1000, params.offset);

        let page = Page::new(&request, batch(params.offset, 0, 3));
        assert_eq!(u32::MAX, page.page);
        assert_eq!(1, page.total_pages);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_search_query() {
        let query = SearchQuery {
            query: Some(" dune ".to_string()),
        };
        assert_eq!(Some("dune"), query.term());
        assert!(SearchQuery::default().term().is_none());

        let too_long = SearchQuery {
            query: Some("x".repeat(256)),
        };
        assert!(matches!(too_long.checked(), Err(ApiError::InvalidQuery(_))));
    }
}
