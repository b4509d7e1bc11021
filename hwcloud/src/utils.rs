use std::collections::BTreeSet;
use std::hash::Hash;

/// 集合差异: 需要新增的、需要删除的、保持不变的
#[derive(Debug, PartialEq, Eq)]
pub struct SetDiff<T> {
    pub add: Vec<T>,
    pub remove: Vec<T>,
    pub keep: Vec<T>,
}

/// 对比当前和期望的集合，结果各自有序且去重
pub fn compare_set<T>(current: &[T], desired: &[T]) -> SetDiff<T>
where
    T: Ord + Hash + Clone,
{
    let cur: BTreeSet<&T> = current.iter().collect();
    let want: BTreeSet<&T> = desired.iter().collect();
    SetDiff {
        add: want.difference(&cur).map(|t| (*t).clone()).collect(),
        remove: cur.difference(&want).map(|t| (*t).clone()).collect(),
        keep: cur.intersection(&want).map(|t| (*t).clone()).collect(),
    }
}

/// 去掉`<`、`>`和换行并截断到`max`个字符，IMS的描述不接受这些字符
pub fn sanitize_description(desc: &str, max: usize) -> String {
    desc.chars()
        .filter(|c| !matches!(c, '<' | '>' | '\n' | '\r'))
        .take(max)
        .collect()
}

/// 逗号分隔的字符串转为列表，忽略空项
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
