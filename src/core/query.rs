//! Query state, request descriptors and result pages exchanged with the search backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::models::{Category, FileRecord};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The record field a search is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    UploadedAt,
    Title,
    Filename,
    Category,
    UploadedBy,
    FileSize,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::UploadedAt => "uploadedAt",
            SortField::Title => "title",
            SortField::Filename => "filename",
            SortField::Category => "category",
            SortField::UploadedBy => "uploadedBy",
            SortField::FileSize => "fileSize",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploadedAt" | "uploaded_at" => Ok(SortField::UploadedAt),
            "title" => Ok(SortField::Title),
            "filename" | "fileName" => Ok(SortField::Filename),
            "category" => Ok(SortField::Category),
            "uploadedBy" | "uploaded_by" => Ok(SortField::UploadedBy),
            "fileSize" | "file_size" => Ok(SortField::FileSize),
            other => Err(format!("Unknown sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn flipped(self) -> SortDir {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

/// The user's current filter, sort and pagination choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    /// Free-text query.
    pub q: String,
    /// Selected categories; a `BTreeSet` iterates in declaration order.
    pub categories: BTreeSet<Category>,
    pub sort_field: SortField,
    pub sort_dir: SortDir,
    /// 1-indexed, never below 1.
    pub page: u32,
    /// Never below 1.
    pub size: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl QueryState {
    pub fn with_page_size(size: u32) -> Self {
        Self {
            q: String::new(),
            categories: BTreeSet::new(),
            sort_field: SortField::UploadedAt,
            sort_dir: SortDir::Desc,
            page: 1,
            size: size.max(1),
        }
    }

    /// Selected categories in declaration order.
    pub fn selected_categories(&self) -> Vec<Category> {
        self.categories.iter().copied().collect()
    }

    /// Builds the request descriptor sent to the search backend.
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            q: self.q.clone(),
            categories: self.selected_categories(),
            sort_field: self.sort_field,
            sort_dir: self.sort_dir,
            page: self.page,
            size: self.size,
        }
    }
}

/// The request descriptor understood by every `SearchService`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub q: String,
    pub categories: Vec<Category>,
    pub sort_field: SortField,
    pub sort_dir: SortDir,
    pub page: u32,
    pub size: u32,
}

/// One page as returned by the backend, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<Value>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

/// The last applied search outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultPage {
    pub results: Vec<FileRecord>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

impl ResultPage {
    pub fn empty(size: u32) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            page: 1,
            size,
        }
    }

    /// `ceil(total / size)`, zero when there are no results.
    pub fn total_pages(&self, size: u32) -> u64 {
        if size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_lists_categories_in_declaration_order() {
        let mut state = QueryState::default();
        state.categories.insert(Category::Code);
        state.categories.insert(Category::Document);
        state.categories.insert(Category::Audio);

        let request = state.to_request();
        assert_eq!(
            request.categories,
            vec![Category::Document, Category::Audio, Category::Code]
        );
    }

    #[test]
    fn test_request_serializes_with_wire_names() {
        let mut state = QueryState::default();
        state.q = "test".into();
        state.categories.insert(Category::Document);
        state.sort_field = SortField::Title;
        state.sort_dir = SortDir::Asc;
        state.page = 2;

        assert_eq!(
            serde_json::to_value(state.to_request()).unwrap(),
            json!({
                "q": "test",
                "categories": ["DOCUMENT"],
                "sortField": "title",
                "sortDir": "asc",
                "page": 2,
                "size": 10
            })
        );
    }

    #[test]
    fn test_total_pages() {
        let mut page = ResultPage::empty(10);
        assert_eq!(page.total_pages(10), 0);
        page.total = 25;
        assert_eq!(page.total_pages(10), 3);
        page.total = 30;
        assert_eq!(page.total_pages(10), 3);
        page.total = 1;
        assert_eq!(page.total_pages(10), 1);
    }

    #[test]
    fn test_sort_field_parses_both_conventions() {
        assert_eq!("uploaded_at".parse::<SortField>(), Ok(SortField::UploadedAt));
        assert_eq!("fileSize".parse::<SortField>(), Ok(SortField::FileSize));
        assert!("colour".parse::<SortField>().is_err());
    }
}
