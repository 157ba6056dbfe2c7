//! 名称重解析与环境规范化的性质验证。
//!
//! - **目标 (Why)**：重解析是分发边界上唯一的名称改写点，任何偏差都会把名称送到错误的提供者；
//!   规范化在没有旧式连接键时必须是恒等变换，否则会悄悄改写调用方的配置；
//! - **手法 (How)**：以 proptest 生成任意段序列与环境，逐条断言重解析的三种形态与输入不变性，
//!   以及规范化的幂等性。

use proptest::prelude::*;
use spark_naming::{Environment, Name, Value, normalize_environment, reparse};

fn plain_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._ -]{0,8}"
}

fn scheme() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9+.-]{0,8}"
}

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9:._-]{0,8}", 0..5)
}

fn environment_without_legacy_keys() -> impl Strategy<Value = Environment> {
    let key = "[a-z]{1,6}(\\.[a-z]{1,6}){0,2}".prop_filter("legacy keys are excluded", |key| {
        !key.starts_with("remote.connection")
    });
    let value = prop_oneof![
        "[ -~]{0,12}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
    ];
    prop::collection::vec((key, value), 0..8).prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn names_without_scheme_are_unchanged(
        first in plain_segment(),
        rest in segments(),
    ) {
        let name: Name = std::iter::once(first).chain(rest).collect();
        let reparsed = reparse(&name);
        prop_assert_eq!(reparsed.url_scheme, None);
        prop_assert_eq!(reparsed.name, name);
    }

    #[test]
    fn bare_scheme_segment_collapses(
        scheme in scheme(),
        rest in segments(),
        second_is_empty in any::<bool>(),
    ) {
        let mut segments = vec![format!("{scheme}:")];
        if second_is_empty {
            segments.push(String::new());
            segments.extend(rest);
        }
        let name = Name::from_segments(segments);
        let reparsed = reparse(&name);
        prop_assert_eq!(reparsed.url_scheme.as_deref(), Some(scheme.as_str()));
        // 首段被整体移除，不留下多余的前导空段。
        prop_assert_eq!(reparsed.name, name.suffix(1));
    }

    #[test]
    fn scheme_tail_becomes_first_segment(
        scheme in scheme(),
        tail in "[a-zA-Z0-9:._-]{1,8}",
        rest in segments(),
    ) {
        let name: Name = std::iter::once(format!("{scheme}:{tail}"))
            .chain(rest.iter().cloned())
            .collect();
        let reparsed = reparse(&name);
        prop_assert_eq!(reparsed.url_scheme.as_deref(), Some(scheme.as_str()));
        let expected: Name = std::iter::once(tail).chain(rest).collect();
        prop_assert_eq!(reparsed.name, expected);
    }

    #[test]
    fn reparse_never_mutates_its_input(raw in segments()) {
        let name = Name::from_segments(raw);
        let before = name.clone();
        let _ = reparse(&name);
        prop_assert_eq!(name, before);
    }

    #[test]
    fn normalizing_without_legacy_keys_is_identity(env in environment_without_legacy_keys()) {
        let once = normalize_environment(env.clone());
        prop_assert_eq!(&once, &env);
        prop_assert_eq!(normalize_environment(once.clone()), once);
    }
}
