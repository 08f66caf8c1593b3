use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{ColumnTrait, Order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Unknown spellings fall back to descending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") | Some("ascending") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn to_order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// 1-based page plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Zero-based index for `Paginator::fetch_page`.
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

/// Escape LIKE metacharacters so user input matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// `lower(col) LIKE '%needle%'`
pub fn contains_ci<C: ColumnTrait>(col: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.trim().to_lowercase()));
    Expr::expr(Func::lower(Expr::col(col))).like(pattern)
}

/// Case-insensitive substring test mirroring [`contains_ci`].
pub fn contains_ci_str(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.trim().to_lowercase())
}
