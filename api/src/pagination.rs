//! List query parsing and pagination link headers

use inv_common::{Error, GroupName, Result};
use inv_search::{Filter, Pagination, SortSpec, DEFAULT_PER_PAGE};
use inv_store::ListQuery;

/// Parse the device listing query string. The reserved parameters
/// (`page`, `per_page`, `sort`, `has_group`, `group`) drive pagination,
/// sorting and group selection; every other parameter is an attribute
/// filter expression.
pub fn parse_list_query(params: &[(String, String)]) -> Result<ListQuery> {
    let mut page = 1usize;
    let mut per_page = DEFAULT_PER_PAGE;
    let mut sort = None;
    let mut has_group = None;
    let mut group = None;
    let mut filters = Vec::new();

    for (name, value) in params {
        match name.as_str() {
            "page" => {
                page = value
                    .parse()
                    .map_err(|_| Error::invalid(format!("invalid page '{}'", value)))?;
            }
            "per_page" => {
                per_page = value
                    .parse()
                    .map_err(|_| Error::invalid(format!("invalid per_page '{}'", value)))?;
            }
            "sort" => sort = Some(SortSpec::parse(value)?),
            "has_group" => {
                has_group = Some(match value.as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(Error::invalid(format!(
                            "invalid has_group '{}': expected true or false",
                            value
                        )))
                    }
                });
            }
            "group" => group = Some(GroupName::new(value.clone())?),
            _ => filters.push(Filter::parse(name, value)?),
        }
    }

    Ok(ListQuery {
        filters,
        sort,
        has_group,
        group,
        page: Pagination::new(page, per_page)?,
    })
}

/// Build the `Link` header for a listing response: `first` always,
/// `prev` when there is a prior page, `next` exactly when a following
/// page is non-empty. Relations are comma-joined into one header value.
pub fn page_link_header(
    path: &str,
    params: &[(String, String)],
    page: Pagination,
    has_next: bool,
) -> String {
    let mut links = vec![link(path, params, 1, page.per_page, "first")];
    if page.page > 1 {
        links.push(link(path, params, page.page - 1, page.per_page, "prev"));
    }
    if has_next {
        links.push(link(path, params, page.page + 1, page.per_page, "next"));
    }
    links.join(", ")
}

fn link(path: &str, params: &[(String, String)], page: usize, per_page: usize, rel: &str) -> String {
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .filter(|(name, _)| name != "page" && name != "per_page")
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();
    pairs.push(("page", page.to_string()));
    pairs.push(("per_page", per_page.to_string()));

    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    format!("<{}?{}>; rel=\"{}\"", path, query, rel)
}
