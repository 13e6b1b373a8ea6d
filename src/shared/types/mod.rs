//! 共享类型定义模块

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::bad_request;
use crate::shared::constants::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::shared::error::AppResult;

/// 分页参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: usize,
    pub limit: usize,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub page_range: String,
}

/// 对内存中的列表分页
///
/// `length` 为总条数，缺省时取 `items.len()`；页码超过总页数时取最后一页。
pub fn paginate<T: Clone>(
    items: &[T],
    params: PaginationParams,
    length: Option<usize>,
) -> AppResult<Page<T>> {
    let PaginationParams { page, limit } = params;

    if page < 1 {
        error!("无效的页码: {}", page);
        return Err(bad_request!("Page number must be a positive integer."));
    }
    if limit < 1 {
        error!("无效的每页数量: {}", limit);
        return Err(bad_request!("Limit must be a positive integer."));
    }

    let length = length.unwrap_or(items.len());
    if length == 0 {
        info!("没有需要分页的数据");
        return Ok(Page {
            items: Vec::new(),
            pages: 0,
            page_range: "0-0 of 0".to_string(),
        });
    }

    let pages = length.div_ceil(limit);
    let page = page.min(pages);

    let start = (page - 1) * limit;
    let end = (start + limit).min(length);

    info!("分页: page={}, limit={}, total={}", page, limit, length);

    let slice_end = end.min(items.len());
    let items = if start < slice_end {
        items[start..slice_end].to_vec()
    } else {
        Vec::new()
    };

    Ok(Page {
        items,
        pages,
        page_range: format!("{}-{} of {}", start + 1, end, length),
    })
}
