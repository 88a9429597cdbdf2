//! Response envelopes.

use serde_json::{Map, Value};
use sift_types::{NamingConvention, PageMeta, Response};

use crate::{error::PipelineError, extract::Extracted};

const RESULTS_KEY: &str = "results";

/// Wraps extracted data in a success envelope.
///
/// Actions that produce nothing answer with an empty object so clients can
/// always read `data`.
pub fn format_success(extracted: Extracted, naming: NamingConvention) -> Response {
    let data = match extracted {
        Extracted::Record(record) => record,
        Extracted::Records(records) => Value::Array(records),
        Extracted::Page { results, meta } => format_page(results, &meta, naming),
        Extracted::Passthrough(value) => value,
        Extracted::Nothing => Value::Object(Map::new()),
    };
    Response::success(Some(data))
}

/// Renders a page: projected `results` followed by the envelope metadata, unchanged.
pub fn format_page(results: Vec<Value>, meta: &PageMeta, naming: NamingConvention) -> Value {
    let mut page = Map::new();
    page.insert(RESULTS_KEY.to_string(), Value::Array(results));
    let mut put = |key: &str, value: Value| {
        page.insert(naming.apply(key), value);
    };
    match meta {
        PageMeta::Offset {
            limit,
            offset,
            has_more,
            count,
        } => {
            put("limit", Value::from(*limit));
            put("offset", Value::from(*offset));
            put("has_more", Value::Bool(*has_more));
            if let Some(count) = count {
                put("count", Value::from(*count));
            }
        }
        PageMeta::Keyset {
            limit,
            after,
            before,
            has_more,
            count,
            previous_page,
            next_page,
        } => {
            put("limit", Value::from(*limit));
            for (key, cursor) in [("after", after), ("before", before)] {
                if let Some(cursor) = cursor {
                    put(key, Value::String(cursor.clone()));
                }
            }
            put("has_more", Value::Bool(*has_more));
            if let Some(count) = count {
                put("count", Value::from(*count));
            }
            for (key, cursor) in [("previous_page", previous_page), ("next_page", next_page)] {
                if let Some(cursor) = cursor {
                    put(key, Value::String(cursor.clone()));
                }
            }
        }
    }
    Value::Object(page)
}

pub fn format_error(error: &PipelineError) -> Response {
    Response::failure(vec![error.to_error_object()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offset_page_metadata_sits_beside_results() {
        let meta = PageMeta::Offset {
            limit: 2,
            offset: 0,
            has_more: true,
            count: None,
        };
        let page = format_page(vec![json!({"id": "1"}), json!({"id": "2"})], &meta, NamingConvention::CamelCase);
        assert_eq!(page, json!({"results": [{"id": "1"}, {"id": "2"}], "limit": 2, "offset": 0, "hasMore": true}));
    }

    #[test]
    fn keyset_metadata_omits_absent_cursors() {
        let meta = PageMeta::Keyset {
            limit: 10,
            after: Some("c1".into()),
            before: None,
            has_more: false,
            count: Some(11),
            previous_page: None,
            next_page: Some("c2".into()),
        };
        let page = format_page(Vec::new(), &meta, NamingConvention::SnakeCase);
        assert_eq!(
            page,
            json!({"results": [], "limit": 10, "after": "c1", "has_more": false, "count": 11, "next_page": "c2"})
        );
    }

    #[test]
    fn nothing_formats_as_empty_object() {
        let response = format_success(Extracted::Nothing, NamingConvention::CamelCase);
        assert!(response.success);
        assert_eq!(response.data, Some(json!({})));
    }
}
