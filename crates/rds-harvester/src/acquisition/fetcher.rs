//! Paged retrieval of one date partition from the search API.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::acquisition::retry::RetryPolicy;
use crate::config::FilterCodes;
use crate::error::FetchError;
use crate::model::{DatePartition, Declaration};
use crate::session::client::RegistryClient;

/// Search request body. Only `page` changes between follow-up requests.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub page: u32,
    pub size: u32,
    pub filter: SearchFilter,
    #[serde(rename = "columnsSort")]
    pub columns_sort: Vec<ColumnSort>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFilter {
    pub status: Vec<i64>,
    #[serde(rename = "idDeclType")]
    pub decl_types: Vec<i64>,
    #[serde(rename = "idApplicantType")]
    pub applicant_types: Vec<i64>,
    #[serde(rename = "regDate")]
    pub reg_date: DateRange,
    #[serde(rename = "columnsSearch")]
    pub columns_search: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    #[serde(rename = "minDate")]
    pub min_date: String,
    #[serde(rename = "maxDate")]
    pub max_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSort {
    pub column: String,
    pub sort: String,
}

impl SearchRequest {
    /// First-page request for one partition.
    pub fn for_partition(codes: &FilterCodes, partition: &DatePartition, size: u32) -> Self {
        Self {
            page: 0,
            size,
            filter: SearchFilter {
                status: codes.status.clone(),
                decl_types: codes.decl_types.clone(),
                applicant_types: codes.applicant_types.clone(),
                reg_date: DateRange {
                    min_date: partition.min_date(),
                    max_date: partition.max_date(),
                },
                columns_search: Vec::new(),
            },
            columns_sort: vec![ColumnSort {
                column: "declDate".to_string(),
                sort: "ASC".to_string(),
            }],
        }
    }
}

/// One parsed response page.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub total: u64,
    pub items: Vec<Declaration>,
}

impl SearchPage {
    /// Best-effort parse of `{ "total": N, "items": [...] }`.
    ///
    /// Only items that do not carry a usable id are dropped, with a warning.
    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        let Value::Object(mut body) = value else {
            return Err(FetchError::Decode("response is not a JSON object".into()));
        };

        let total = body.get("total").and_then(Value::as_u64).unwrap_or(0);
        let raw_items = match body.remove("items") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(FetchError::Decode(format!(
                    "`items` is not an array: {}",
                    type_name(&other)
                )))
            }
        };

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            match serde_json::from_value::<Declaration>(raw) {
                Ok(decl) => items.push(decl),
                Err(e) => warn!("skipping unreadable item: {e}"),
            }
        }

        Ok(Self { total, items })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Number of pages needed for `total` items at `size` per page.
pub fn page_count(total: u64, size: u32) -> u32 {
    let size = u64::from(size.max(1));
    total.div_ceil(size).min(u64::from(u32::MAX)) as u32
}

/// Fetches every page of one partition under a retry policy.
#[derive(Clone)]
pub struct PagedFetcher {
    client: RegistryClient,
    endpoint: String,
    codes: FilterCodes,
    page_size: u32,
    retry: RetryPolicy,
}

impl PagedFetcher {
    pub fn new(
        client: RegistryClient,
        endpoint: impl Into<String>,
        codes: FilterCodes,
        page_size: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            codes,
            page_size: page_size.max(1),
            retry,
        }
    }

    /// All declarations registered within `partition`, in server order.
    ///
    /// Page 0 reports `total`; pages `1..N` are then fetched sequentially
    /// with the same body. Any page that fails after retries fails the
    /// whole partition.
    pub async fn fetch_partition(
        &self,
        partition: &DatePartition,
    ) -> Result<Vec<Declaration>, FetchError> {
        let mut request = SearchRequest::for_partition(&self.codes, partition, self.page_size);

        let first = self.fetch_page(&request, partition).await?;
        let pages = page_count(first.total, self.page_size);
        debug!(
            "partition {partition}: total {}, {} page(s)",
            first.total,
            pages.max(1)
        );

        let mut items = first.items;
        for page in 1..pages {
            request.page = page;
            let next = self.fetch_page(&request, partition).await?;
            items.extend(next.items);
        }

        Ok(items)
    }

    async fn fetch_page(
        &self,
        request: &SearchRequest,
        partition: &DatePartition,
    ) -> Result<SearchPage, FetchError> {
        let what = format!("partition {partition} page {}", request.page);
        let value = self
            .retry
            .run(&what, || self.client.post_json(&self.endpoint, request))
            .await?;
        let page = SearchPage::from_value(value)?;
        debug!("{what}: {} item(s)", page.items.len());
        Ok(page)
    }
}
