//! 四种分页协议: offset、页码、marker(上一页最后一项的id)、next-marker(服务端返回的游标)

use crate::error::Result;
use crate::transport::Query;
use async_stream::try_stream;
use serde_json::Value;
use std::future::Future;
use tokio_stream::Stream;

/// 按`a.b.c`取嵌套字段
pub fn json_path<'a>(v: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(v, |cur, key| cur.get(key))
}

fn as_count(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[derive(Clone, Debug)]
enum Flavor {
    Offset {
        limit: u32,
    },
    PageNumber {
        page_key: &'static str,
        size_key: &'static str,
        page_size: u32,
    },
    Marker {
        limit: Option<u32>,
        id_key: &'static str,
    },
    NextMarker {
        limit: Option<u32>,
        paths: &'static [&'static str],
    },
}

pub const DEFAULT_NEXT_MARKER_PATHS: &[&str] = &["page_info.next_marker", "NextMarker"];

/// 分页方式，每个接口自己选择
#[derive(Clone, Debug)]
pub struct Paginator {
    items_key: &'static str,
    flavor: Flavor,
    total_key: Option<&'static str>,
    // 少数接口使用 `>` total 判断结束
    total_exclusive: bool,
    marker_param: &'static str,
    limit_param: &'static str,
}

impl Paginator {
    fn with_flavor(items_key: &'static str, flavor: Flavor) -> Self {
        Self {
            items_key,
            flavor,
            total_key: None,
            total_exclusive: false,
            marker_param: "marker",
            limit_param: "limit",
        }
    }

    /// `limit`/`offset`
    pub fn offset(items_key: &'static str, limit: u32) -> Self {
        Self::with_flavor(items_key, Flavor::Offset { limit })
    }

    /// `page`/`page_size`，页码从1开始
    pub fn page_number(items_key: &'static str, page_size: u32) -> Self {
        Self::with_flavor(
            items_key,
            Flavor::PageNumber {
                page_key: "page",
                size_key: "page_size",
                page_size,
            },
        )
    }

    /// 下一页的marker为本页最后一项的`id`
    pub fn marker(items_key: &'static str, limit: Option<u32>) -> Self {
        Self::with_flavor(items_key, Flavor::Marker { limit, id_key: "id" })
    }

    /// 游标取自`page_info.next_marker`或`NextMarker`
    pub fn next_marker(items_key: &'static str, limit: Option<u32>) -> Self {
        Self::with_flavor(
            items_key,
            Flavor::NextMarker {
                limit,
                paths: DEFAULT_NEXT_MARKER_PATHS,
            },
        )
    }

    pub fn total_key(mut self, key: &'static str) -> Self {
        self.total_key = Some(key);
        self
    }

    pub fn total_exclusive(mut self) -> Self {
        self.total_exclusive = true;
        self
    }

    pub fn page_keys(mut self, page: &'static str, size: &'static str) -> Self {
        if let Flavor::PageNumber {
            page_key, size_key, ..
        } = &mut self.flavor
        {
            *page_key = page;
            *size_key = size;
        }
        self
    }

    pub fn marker_param(mut self, param: &'static str) -> Self {
        self.marker_param = param;
        self
    }

    pub fn limit_param(mut self, param: &'static str) -> Self {
        self.limit_param = param;
        self
    }

    pub fn next_marker_paths(mut self, new_paths: &'static [&'static str]) -> Self {
        if let Flavor::NextMarker { paths, .. } = &mut self.flavor {
            *paths = new_paths;
        }
        self
    }

    pub fn id_key(mut self, key: &'static str) -> Self {
        if let Flavor::Marker { id_key, .. } = &mut self.flavor {
            *id_key = key;
        }
        self
    }

    fn cursor(&self) -> Cursor<'_> {
        Cursor {
            p: self,
            offset: 0,
            page: 1,
            marker: None,
            seen: 0,
            done: false,
        }
    }

    /// 依次请求每一页并把所有项按顺序合并
    ///
    /// `fetch`的参数为本页需要追加的query
    pub async fn collect<F, Fut>(&self, mut fetch: F) -> Result<Vec<Value>>
    where
        F: FnMut(Query) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let mut cursor = self.cursor();
        let mut all = Vec::new();
        while !cursor.done {
            let resp = fetch(cursor.query()).await?;
            all.extend(cursor.advance(&resp));
        }
        Ok(all)
    }

    /// 以stream的形式逐项返回，中途丢弃stream即停止请求
    pub fn stream<F, Fut>(self, mut fetch: F) -> impl Stream<Item = Result<Value>>
    where
        F: FnMut(Query) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        try_stream! {
            let mut cursor = self.cursor();
            while !cursor.done {
                let resp = fetch(cursor.query()).await?;
                for item in cursor.advance(&resp) {
                    yield item;
                }
            }
        }
    }
}

struct Cursor<'a> {
    p: &'a Paginator,
    offset: u64,
    page: u64,
    marker: Option<String>,
    seen: u64,
    done: bool,
}

impl Cursor<'_> {
    fn query(&self) -> Query {
        let p = self.p;
        let mut q = Query::new();
        let mut push = |k: &str, v: String| q.push((k.to_owned(), v));
        match &p.flavor {
            Flavor::Offset { limit } => {
                push(p.limit_param, limit.to_string());
                push("offset", self.offset.to_string());
            }
            Flavor::PageNumber {
                page_key,
                size_key,
                page_size,
            } => {
                push(*page_key, self.page.to_string());
                push(*size_key, page_size.to_string());
            }
            Flavor::Marker { limit, .. } | Flavor::NextMarker { limit, .. } => {
                if let Some(l) = limit {
                    push(p.limit_param, l.to_string());
                }
                if let Some(m) = &self.marker {
                    push(p.marker_param, m.clone());
                }
            }
        }
        q
    }

    fn total_reached(&self, resp: &Value) -> bool {
        let Some(total) = self
            .p
            .total_key
            .and_then(|k| json_path(resp, k))
            .and_then(as_count)
        else {
            return false;
        };
        if self.p.total_exclusive {
            self.seen > total
        } else {
            self.seen >= total
        }
    }

    /// 处理一页响应，返回本页的项，并决定是否还有下一页
    fn advance(&mut self, resp: &Value) -> Vec<Value> {
        let items = match json_path(resp, self.p.items_key) {
            Some(Value::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        };
        let n = items.len() as u64;
        self.seen += n;
        if n == 0 || self.total_reached(resp) {
            self.done = true;
            return items;
        }
        let p = self.p;
        match &p.flavor {
            Flavor::Offset { limit } => {
                self.offset += n;
                self.done = n < u64::from(*limit);
            }
            Flavor::PageNumber { page_size, .. } => {
                self.page += 1;
                self.done = n < u64::from(*page_size);
            }
            Flavor::Marker { limit, id_key } => {
                let last = items
                    .last()
                    .and_then(|it| it.get(*id_key))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty());
                self.marker = last.map(str::to_owned);
                self.done = last.is_none() || limit.is_some_and(|l| n < u64::from(l));
            }
            Flavor::NextMarker { paths, .. } => {
                let next = paths
                    .iter()
                    .find_map(|path| json_path(resp, path).and_then(Value::as_str))
                    .filter(|s| !s.is_empty());
                self.marker = next.map(str::to_owned);
                self.done = next.is_none();
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// 按请求顺序返回预设的页，同时记录每次的query
    fn replay(pages: Vec<Value>) -> (RefCell<Vec<Query>>, RefCell<std::vec::IntoIter<Value>>) {
        (RefCell::new(Vec::new()), RefCell::new(pages.into_iter()))
    }

    fn run(p: &Paginator, pages: Vec<Value>) -> (Vec<Value>, Vec<Query>) {
        let (calls, pages) = replay(pages);
        let fut = p.collect(|q| {
            calls.borrow_mut().push(q);
            let page = pages.borrow_mut().next().unwrap_or_else(|| json!({}));
            async move { Ok(page) }
        });
        let items = block_on(fut).unwrap();
        (items, calls.into_inner())
    }

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    fn get<'a>(q: &'a Query, k: &str) -> Option<&'a str> {
        q.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str())
    }

    #[test]
    fn offset_stops_at_total() {
        let p = Paginator::offset("servers", 2).total_key("count");
        let (items, calls) = run(
            &p,
            vec![
                json!({"count": 3, "servers": [{"id": "A"}, {"id": "B"}]}),
                json!({"count": 3, "servers": [{"id": "C"}]}),
            ],
        );
        assert_eq!(items.len(), 3);
        assert_eq!(calls.len(), 2);
        assert_eq!(get(&calls[1], "offset"), Some("2"));
        assert_eq!(get(&calls[1], "limit"), Some("2"));
    }

    #[test]
    fn offset_inconsistent_total_still_terminates() {
        // total偏大时依赖空页结束
        let p = Paginator::offset("items", 2).total_key("total");
        let (items, calls) = run(
            &p,
            vec![
                json!({"total": 10, "items": [1, 2]}),
                json!({"total": 10, "items": []}),
            ],
        );
        assert_eq!(items.len(), 2);
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn exclusive_total_makes_one_more_request() {
        let p = Paginator::page_number("domains", 2)
            .page_keys("page_number", "page_size")
            .total_key("total")
            .total_exclusive();
        let (items, calls) = run(
            &p,
            vec![
                json!({"total": 2, "domains": [1, 2]}),
                json!({"total": 2, "domains": []}),
            ],
        );
        assert_eq!(items.len(), 2);
        assert_eq!(calls.len(), 2);
        assert_eq!(get(&calls[1], "page_number"), Some("2"));
    }

    #[test]
    fn marker_uses_last_id() {
        let p = Paginator::marker("vpcs", Some(2));
        let (items, calls) = run(
            &p,
            vec![
                json!({"vpcs": [{"id": "a"}, {"id": "b"}]}),
                json!({"vpcs": [{"id": "c"}]}),
            ],
        );
        assert_eq!(items.len(), 3);
        assert_eq!(calls.len(), 2);
        assert_eq!(get(&calls[0], "marker"), None);
        assert_eq!(get(&calls[1], "marker"), Some("b"));
    }

    #[test]
    fn marker_never_calls_after_empty_page() {
        let p = Paginator::marker("vpcs", None);
        let (items, calls) = run(
            &p,
            vec![json!({"vpcs": [{"id": "a"}]}), json!({"vpcs": []})],
        );
        assert_eq!(items.len(), 1);
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn next_marker_stops_on_empty_token() {
        let p = Paginator::next_marker("loadbalancers", Some(1));
        let (items, calls) = run(
            &p,
            vec![
                json!({"loadbalancers": [{"id": 1}], "page_info": {"next_marker": "tok"}}),
                json!({"loadbalancers": [{"id": 2}], "page_info": {"next_marker": ""}}),
                json!({"loadbalancers": [{"id": 3}]}),
            ],
        );
        assert_eq!(items, vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(calls.len(), 2);
        assert_eq!(get(&calls[1], "marker"), Some("tok"));
    }

    #[test]
    fn next_marker_upper_camel() {
        let p = Paginator::next_marker("items", None);
        let (items, calls) = run(
            &p,
            vec![
                json!({"items": [1], "NextMarker": "m"}),
                json!({"items": [2]}),
            ],
        );
        assert_eq!(items.len(), 2);
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn exact_pages_with_truthful_total() {
        // N=4, P=2 -> 2 次请求
        let p = Paginator::offset("x", 2).total_key("count");
        let (items, calls) = run(
            &p,
            vec![
                json!({"count": 4, "x": [1, 2]}),
                json!({"count": 4, "x": [3, 4]}),
            ],
        );
        assert_eq!(items, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn json_path_nested() {
        let v = json!({"a": {"b": {"c": 1}}});
        assert_eq!(json_path(&v, "a.b.c"), Some(&json!(1)));
        assert_eq!(json_path(&v, "a.x"), None);
    }
}
