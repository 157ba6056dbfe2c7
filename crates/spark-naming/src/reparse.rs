//! # 名称重解析
//!
//! 在分发边界处把名称拆成 `(scheme, 剩余名称)`，且只拆一次。

use crate::name::Name;

/// 重解析结果。
///
/// # 契约说明（What）
/// - `url_scheme` 为 `None` 当且仅当首段不含 `:`，或 `:` 之前为空；
/// - `url_scheme` 为 `None` 且 `name` 为零段时表示"当前上下文自身"，见 [`is_empty`](Self::is_empty)。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReparsedName {
    pub url_scheme: Option<String>,
    pub name: Name,
}

impl ReparsedName {
    pub fn is_empty(&self) -> bool {
        self.url_scheme.is_none() && self.name.is_empty()
    }

    pub fn url_scheme(&self) -> Option<&str> {
        self.url_scheme.as_deref()
    }
}

/// 拆分首段中的 `scheme:` 前缀。
///
/// # 执行逻辑（How）
/// 1. 复制输入，调用方的实例保持不变；
/// 2. 零段或首段不含 `:` 时原样返回；
/// 3. 以首个 `:` 切分首段并移除首段；仅当切出的尾部非空，或原名称的第二段存在且非空时，
///    才把尾部重新插回首位，避免产生多余的前导空段；
/// 4. 空 scheme 归一为 `None`。
pub fn reparse(name: &Name) -> ReparsedName {
    let mut remainder = name.clone();
    let Some((scheme, tail)) = name.get(0).and_then(|first| first.split_once(':')) else {
        return ReparsedName {
            url_scheme: None,
            name: remainder,
        };
    };

    remainder.remove(0);
    let next_is_non_empty = name.get(1).is_some_and(|second| !second.is_empty());
    if !tail.is_empty() || next_is_non_empty {
        remainder.insert(0, tail);
    }

    ReparsedName {
        url_scheme: (!scheme.is_empty()).then(|| scheme.to_owned()),
        name: remainder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(segments: &[&str]) -> (Option<String>, Vec<String>) {
        let reparsed = reparse(&Name::from_segments(segments.iter().copied()));
        (reparsed.url_scheme, reparsed.name.segments().to_vec())
    }

    #[test]
    fn scheme_is_split_from_first_segment() {
        assert_eq!(
            run(&["java:comp", "env"]),
            (Some("java".into()), vec!["comp".into(), "env".into()])
        );
        assert_eq!(run(&["remote:"]), (Some("remote".into()), vec![]));
        assert_eq!(
            run(&["remote:", "x"]),
            (Some("remote".into()), vec!["".into(), "x".into()])
        );
        assert_eq!(run(&["remote:", ""]), (Some("remote".into()), vec!["".into()]));
    }

    #[test]
    fn empty_scheme_is_normalized_to_none() {
        assert_eq!(run(&[":x"]), (None, vec!["x".into()]));
        assert_eq!(run(&[":"]), (None, vec![]));
        assert!(reparse(&Name::parse(":").unwrap()).is_empty());
    }

    #[test]
    fn only_the_first_colon_counts() {
        assert_eq!(
            run(&["a:b:c", "d:e"]),
            (Some("a".into()), vec!["b:c".into(), "d:e".into()])
        );
        assert_eq!(run(&["plain", "x:y"]), (None, vec!["plain".into(), "x:y".into()]));
    }

    #[test]
    fn empty_name_refers_to_self() {
        let reparsed = reparse(&Name::empty());
        assert!(reparsed.is_empty());
        assert!(!reparse(&Name::parse("/").unwrap()).is_empty());
    }
}
