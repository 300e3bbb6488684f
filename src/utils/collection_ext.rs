//! 集合扩展工具模块
//!
//! 提供子集枚举、有序去重等集合辅助函数

use std::collections::HashSet;
use std::hash::Hash;

/// 枚举所有非空、保持原顺序的子序列，按长度递增
///
/// # Example
/// ```ignore
/// let subsets = ordered_subsets(&["a", "b", "c"]);
/// // [a] [b] [c] [a,b] [a,c] [b,c] [a,b,c]
/// ```
pub fn ordered_subsets<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let mut result = Vec::new();
    for size in 1..=items.len() {
        let mut indices: Vec<usize> = (0..size).collect();
        loop {
            result.push(indices.iter().map(|&i| items[i].clone()).collect());

            // advance to the next combination in lexicographic index order
            let mut pos = size;
            while pos > 0 && indices[pos - 1] == items.len() - size + pos - 1 {
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
            indices[pos - 1] += 1;
            for next in pos..size {
                indices[next] = indices[next - 1] + 1;
            }
        }
    }
    result
}

/// 去重并保持顺序
///
/// # Example
/// ```ignore
/// let ids = vec![1, 2, 1, 3, 2];
/// let unique = unique_ordered(ids); // [1, 2, 3]
/// ```
#[inline]
pub fn unique_ordered<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// 生成集合成员判断用的规范键：排序后的名称序列
#[inline]
pub fn canonical_key<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut key: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    key.sort();
    key
}

/// `needle` 的每个元素都出现在 `haystack` 中，且两者不相等
pub fn is_proper_subset<T: PartialEq>(needle: &[T], haystack: &[T]) -> bool {
    needle.len() < haystack.len() && needle.iter().all(|item| haystack.contains(item))
}
