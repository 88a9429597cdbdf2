//! Action input and page validation.

use serde_json::{Map, Value};
use sift_types::{ActionSpec, NamingConvention, PageRequest};

use crate::{
    arguments::cast_arguments,
    error::{FieldPath, ValidationError},
};

const INPUT_SEGMENT: &str = "input";
const PAGE_SEGMENT: &str = "page";

/// Casts client input against the action's declared arguments.
///
/// The result is keyed by source argument name.
pub fn validate_input(action: &ActionSpec, input: &Map<String, Value>, naming: NamingConvention) -> Result<Map<String, Value>, ValidationError> {
    cast_arguments(&action.arguments, input, naming, &FieldPath::root().child(INPUT_SEGMENT))
}

/// Checks a requested page window against what the action supports and
/// applies the default limit.
pub fn validate_page(action: &ActionSpec, page: Option<&PageRequest>) -> Result<Option<PageRequest>, ValidationError> {
    let page_path = FieldPath::root().child(PAGE_SEGMENT);
    let Some(support) = action.pagination() else {
        return match page {
            None => Ok(None),
            Some(_) => Err(ValidationError::invalid_argument(page_path, PAGE_SEGMENT, format!("action '{}' does not paginate", action.name))),
        };
    };

    let Some(page) = page else {
        return Ok(support.default_limit.map(|limit| PageRequest {
            limit: Some(limit),
            ..PageRequest::default()
        }));
    };

    if page.offset.is_some() && page.is_keyset() {
        return Err(ValidationError::invalid_argument(
            page_path.child("offset"),
            "offset",
            "offset cannot be combined with after/before",
        ));
    }
    if page.offset.is_some() && !support.offset {
        return Err(ValidationError::invalid_argument(
            page_path.child("offset"),
            "offset",
            "offset pagination is not supported",
        ));
    }
    if page.is_keyset() && !support.keyset {
        let key = if page.after.is_some() { "after" } else { "before" };
        return Err(ValidationError::invalid_argument(page_path.child(key), key, "keyset pagination is not supported"));
    }

    let limit = match (page.limit, support.max_limit) {
        (Some(0), _) => {
            return Err(ValidationError::invalid_argument(page_path.child("limit"), "limit", "must be greater than zero"));
        }
        (Some(limit), Some(max_limit)) if limit > max_limit => {
            return Err(ValidationError::invalid_argument(
                page_path.child("limit"),
                "limit",
                format!("{limit} exceeds the maximum of {max_limit}"),
            ));
        }
        (Some(limit), _) => Some(limit),
        (None, _) => support.default_limit,
    };

    Ok(Some(PageRequest { limit, ..page.clone() }))
}
