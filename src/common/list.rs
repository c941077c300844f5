//! Query parameters shared by the filterable list endpoints.
//!
//! The wire format is the react-admin one used by the web client:
//! `filter={"name":"ada"}`, `sort=["name","ASC"]` and an inclusive
//! `range=[0,24]`. Responses carry a `Content-Range` header with the total.

use super::validation::{Violations, field_path};
use axum::{
    Json,
    http::{HeaderMap, HeaderValue, header},
};
use sea_orm::Order;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::IntoParams;

const FILTER: &str = "filter";
const SORT: &str = "sort";
const RANGE: &str = "range";

#[derive(Deserialize, IntoParams, Debug, Default, Clone)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// JSON object of column to value, e.g. `{"name":"ada"}`
    pub filter: Option<String>,
    /// JSON pair of column and direction, e.g. `["name","ASC"]`
    pub sort: Option<String>,
    /// Inclusive JSON pair of row indexes, e.g. `[0,24]`
    pub range: Option<String>,
}

/// A checked [`ListQuery`]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListParams {
    pub filter: Map<String, Value>,
    pub sort: Option<(String, Order)>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl ListQuery {
    /// Checks the raw parameters against the columns a resource exposes
    pub fn parse(&self, filterable: &[&str], sortable: &[&str]) -> Result<ListParams, Violations> {
        let filter = match self.filter.as_deref().map(str::trim) {
            None | Some("") => Map::new(),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                _ => return Err(Violations::single(FILTER, "must be a JSON object")),
            },
        };
        if let Some(key) = filter.keys().find(|key| !filterable.contains(&key.as_str())) {
            return Err(Violations::single(
                field_path(FILTER, key),
                format!("is not filterable, expected one of: {}", filterable.join(", ")),
            ));
        }

        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_sort(raw, sortable)?),
        };

        let (offset, limit) = match self.range.as_deref().map(str::trim) {
            None | Some("") => (0, None),
            Some(raw) => parse_range(raw)?,
        };

        Ok(ListParams {
            filter,
            sort,
            offset,
            limit,
        })
    }
}

fn parse_sort(raw: &str, sortable: &[&str]) -> Result<(String, Order), Violations> {
    let Ok((column, direction)) = serde_json::from_str::<(String, String)>(raw) else {
        return Err(Violations::single(SORT, r#"must be a pair like ["name","ASC"]"#));
    };
    if !sortable.contains(&column.as_str()) {
        return Err(Violations::single(
            SORT,
            format!("cannot sort by '{column}', expected one of: {}", sortable.join(", ")),
        ));
    }
    let order = match direction.to_ascii_uppercase().as_str() {
        "ASC" => Order::Asc,
        "DESC" => Order::Desc,
        _ => return Err(Violations::single(SORT, "direction must be ASC or DESC")),
    };
    Ok((column, order))
}

fn parse_range(raw: &str) -> Result<(u64, Option<u64>), Violations> {
    match serde_json::from_str::<(u64, u64)>(raw) {
        Ok((start, end)) if end >= start => Ok((start, Some(end - start + 1))),
        _ => Err(Violations::single(
            RANGE,
            "must be a pair of row indexes like [0,24] with start <= end",
        )),
    }
}

impl ListParams {
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.filter.get(key).filter(|value| !value.is_null())
    }

    /// Lower-cased, trimmed text for a case-insensitive substring match
    pub fn text(&self, key: &str) -> Result<Option<String>, Violations> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(text)) => {
                Ok(Some(text.trim().to_lowercase()).filter(|text| !text.is_empty()))
            }
            Some(_) => Err(Violations::single(field_path(FILTER, key), "must be a string")),
        }
    }
}

/// One page of a listing and the size of the whole filtered set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: u64,
    pub total: u64,
}

impl<T: Serialize> Page<T> {
    /// `Content-Range: <resource> <first>-<last>/<total>`, `*` for an empty page
    pub fn content_range(&self, resource: &str) -> String {
        match u64::try_from(self.items.len()) {
            Ok(len) if len > 0 => format!(
                "{resource} {}-{}/{}",
                self.offset,
                self.offset + len - 1,
                self.total
            ),
            _ => format!("{resource} */{}", self.total),
        }
    }

    pub fn into_response(self, resource: &str) -> (HeaderMap, Json<Vec<T>>) {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.content_range(resource)) {
            headers.insert(header::CONTENT_RANGE, value);
        }
        (headers, Json(self.items))
    }
}
