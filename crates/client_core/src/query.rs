//! Query state of the customer list view and its translation into one request
//! against the customers collection.
//!
//! The state is plain data; [`crate::controller::CustomerListController`] owns
//! it and is the only thing that mutates it.

use std::{fmt, str::FromStr};

use shared::domain::CustomerStatus;
use url::form_urlencoded;

use crate::error::ControllerError;

/// The only sortable field of the customers collection.
pub const SORT_FIELD: &str = "registrationDate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    None,
    Descending,
    Ascending,
}

impl SortDirection {
    /// `None -> Descending -> Ascending -> None`.
    pub fn cycle(self) -> Self {
        match self {
            SortDirection::None => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
            SortDirection::Ascending => SortDirection::None,
        }
    }

    /// Value of the `sort` query parameter, absent when unsorted.
    pub fn as_param(self) -> Option<String> {
        match self {
            SortDirection::None => None,
            SortDirection::Descending => Some(format!("{SORT_FIELD},desc")),
            SortDirection::Ascending => Some(format!("{SORT_FIELD},asc")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSize {
    #[default]
    Five,
    Ten,
    Fifteen,
    Twenty,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Five,
        PageSize::Ten,
        PageSize::Fifteen,
        PageSize::Twenty,
    ];

    pub const fn get(self) -> u32 {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Fifteen => 15,
            PageSize::Twenty => 20,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ControllerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or(ControllerError::InvalidPageSize(value))
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Username,
    FullName,
    Phone,
    Address,
    Status,
    RegistrationDate,
    Notes,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Username,
        Column::FullName,
        Column::Phone,
        Column::Address,
        Column::Status,
        Column::RegistrationDate,
        Column::Notes,
    ];

    /// `username` and `fullName` are always shown.
    pub const fn is_optional(self) -> bool {
        !matches!(self, Column::Username | Column::FullName)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Column::Username => "username",
            Column::FullName => "fullName",
            Column::Phone => "phone",
            Column::Address => "address",
            Column::Status => "status",
            Column::RegistrationDate => "registrationDate",
            Column::Notes => "notes",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Column::ALL
            .into_iter()
            .find(|column| column.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ControllerError::UnknownColumn(s.to_string()))
    }
}

/// Visibility of the optional columns; every column starts visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnVisibility {
    phone: bool,
    address: bool,
    status: bool,
    registration_date: bool,
    notes: bool,
}

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self {
            phone: true,
            address: true,
            status: true,
            registration_date: true,
            notes: true,
        }
    }
}

impl ColumnVisibility {
    pub fn is_visible(&self, column: Column) -> bool {
        match column {
            Column::Username | Column::FullName => true,
            Column::Phone => self.phone,
            Column::Address => self.address,
            Column::Status => self.status,
            Column::RegistrationDate => self.registration_date,
            Column::Notes => self.notes,
        }
    }

    /// Flips an optional column. Returns `false` for the fixed columns, which
    /// are left untouched.
    pub fn toggle(&mut self, column: Column) -> bool {
        let flag = match column {
            Column::Username | Column::FullName => return false,
            Column::Phone => &mut self.phone,
            Column::Address => &mut self.address,
            Column::Status => &mut self.status,
            Column::RegistrationDate => &mut self.registration_date,
            Column::Notes => &mut self.notes,
        };
        *flag = !*flag;
        true
    }

    pub fn visible_columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|column| self.is_visible(*column))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /customers`
    List,
    /// `GET /customers/search`
    Search,
}

impl Endpoint {
    pub const fn path(self) -> &'static str {
        match self {
            Endpoint::List => "/customers",
            Endpoint::Search => "/customers/search",
        }
    }
}

/// One outbound request against the customers collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub endpoint: Endpoint,
    pub page: u32,
    pub size: PageSize,
    pub search_term: Option<String>,
    pub status: Option<CustomerStatus>,
    pub sort: SortDirection,
}

impl ListRequest {
    /// Query parameters in wire order; parameters without a meaningful value
    /// are left out rather than sent empty.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("size", self.size.get().to_string()),
        ];
        if self.endpoint == Endpoint::Search {
            if let Some(term) = &self.search_term {
                pairs.push(("searchTerm", term.clone()));
            }
            if let Some(status) = self.status {
                pairs.push(("status", status.as_str().to_string()));
            }
        }
        if let Some(sort) = self.sort.as_param() {
            pairs.push(("sort", sort));
        }
        pairs
    }

    /// Path plus encoded query string, relative to the api base url.
    ///
    /// Values are form encoded, except that `,` `:` `$` `[` `]` stay literal
    /// the way browser http clients send them, so the sort parameter reads
    /// `registrationDate,desc` on the wire.
    pub fn path_and_query(&self) -> String {
        let query = self
            .query_pairs()
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.endpoint.path(), query)
    }
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace("%2C", ",")
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

/// Everything the list view remembers between requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryState {
    pub search_term: String,
    pub status_filter: Option<CustomerStatus>,
    pub sort_direction: SortDirection,
    pub page_index: u32,
    pub page_size: PageSize,
    pub column_visibility: ColumnVisibility,
    pub total_pages: u32,
}

impl QueryState {
    pub fn with_page_size(page_size: PageSize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Search text as transmitted: trimmed, `None` when blank.
    pub fn trimmed_search_term(&self) -> Option<&str> {
        let trimmed = self.search_term.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn has_active_filter(&self) -> bool {
        self.trimmed_search_term().is_some() || self.status_filter.is_some()
    }

    /// Builds the request for `page` from the current filters, sort and size.
    pub fn request_for_page(&self, page: u32) -> ListRequest {
        let endpoint = if self.has_active_filter() {
            Endpoint::Search
        } else {
            Endpoint::List
        };
        ListRequest {
            endpoint,
            page,
            size: self.page_size,
            search_term: self.trimmed_search_term().map(str::to_string),
            status: self.status_filter,
            sort: self.sort_direction,
        }
    }

    pub fn clear_filters(&mut self) {
        self.search_term.clear();
        self.status_filter = None;
        self.sort_direction = SortDirection::None;
    }

    pub fn can_go_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
