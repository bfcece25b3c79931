use serde::Serialize;
use utoipa::ToSchema;

/// One selectable option of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Choice {
    /// Whether the current request already selects this option
    pub selected: bool,
    /// Link that selects this option, keeping every other argument
    pub query_string: String,
    /// Label shown to the user
    pub display: String,
}

/// Rendering data for one filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FilterEntry {
    pub title: String,
    pub choices: Vec<Choice>,
    /// Current URL without this filter's parameters, if any of them are set
    pub clear_url: Option<String>,
}

/// Filter data contributed to a list view's template context.
///
/// # Example
/// ```json
/// {
///   "non_page_args": ["color__exact"],
///   "filter_list": [
///     {
///       "title": "Color",
///       "choices": [
///         {"selected": false, "query_string": "/items/", "display": "All"},
///         {"selected": true, "query_string": "/items/?color__exact=red", "display": "Red"}
///       ],
///       "clear_url": "/items/"
///     }
///   ],
///   "clear_filter_fragment": "/items/"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct FilterContext {
    /// Query-string argument names other than the pagination key
    pub non_page_args: Vec<String>,
    /// Filters with output, in declaration order
    pub filter_list: Vec<FilterEntry>,
    /// Path without query, present only when a non-pagination argument is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_filter_fragment: Option<String>,
}
