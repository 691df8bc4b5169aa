use serde::Deserialize;

/// Query-string filter shared by every list endpoint.
///
/// An absent value, an empty string, or the literal `all` leaves that dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub center: Option<String>,
    #[serde(default)]
    pub student: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Fields a record exposes to `ListFilter`.
pub trait Filterable {
    fn status_label(&self) -> &str;
    fn search_text(&self) -> Vec<&str>;

    fn region(&self) -> Option<&str> {
        None
    }

    fn center(&self) -> Option<&str> {
        None
    }

    fn student(&self) -> Option<&str> {
        None
    }
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
}

fn matches_exact(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual.map(str::trim) == Some(wanted),
    }
}

impl ListFilter {
    pub fn by_region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..Self::default()
        }
    }

    pub fn by_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn is_identity(&self) -> bool {
        constraint(&self.region).is_none()
            && constraint(&self.status).is_none()
            && constraint(&self.center).is_none()
            && constraint(&self.student).is_none()
            && constraint(&self.search).is_none()
    }

    pub fn matches<T: Filterable + ?Sized>(&self, item: &T) -> bool {
        if !matches_exact(constraint(&self.region), item.region()) {
            return false;
        }
        if !matches_exact(constraint(&self.center), item.center()) {
            return false;
        }
        if !matches_exact(constraint(&self.student), item.student()) {
            return false;
        }
        if let Some(status) = constraint(&self.status) {
            // "منتهية" is the legacy spelling of the completed course status.
            let status = if status == "منتهية" { "مكتملة" } else { status };
            if item.status_label() != status {
                return false;
            }
        }
        if let Some(needle) = constraint(&self.search) {
            let needle = needle.to_lowercase();
            return item
                .search_text()
                .iter()
                .any(|haystack| haystack.to_lowercase().contains(&needle));
        }
        true
    }

    /// Linear scan keeping the input order.
    pub fn apply<T: Filterable>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_identity() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}
