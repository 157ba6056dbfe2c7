//! # 旧式连接属性规范化
//!
//! 将 `remote.connections` + `remote.connection.<name>.*` 这一族旧式连接配置改写为规范的
//! 提供者 URL 与安全属性。
//!
//! ## 契约（What）
//! - 连接列表缺失、为空、不是文本，或包含 `,`（多个连接，无法合成单一 URL）时原样返回；
//!   连接名与布尔开关按原文匹配，不裁剪空白；
//! - 仅改写 `remote.connection.<name>.` 前缀下的键，按属性后缀：
//!   - `host`、`port`：移出结果并记录（可为文本或整数）；
//!   - `username` → [`keys::SECURITY_PRINCIPAL`]，`password` → [`keys::SECURITY_CREDENTIALS`]；
//!   - `callback.handler.class` → [`keys::CALLBACK_HANDLER`]；
//!   - `ssl.enabled`（或 `connect.options.ssl.enabled`）：移出结果，按布尔解析，无法解析视为 `false`；
//!   - `connect.options.<x>` → `naming.client.connect.options.<x>`；
//! - 其余键原样保留；同时记录到 host 与 port 时写入
//!   `remote+http(s)://{host}:{port}`，覆盖已有的提供者 URL；
//! - 纯函数，从不失败。

use std::borrow::Cow;

use crate::{
    environment::{Environment, keys},
    value::Value,
};

const HOST: &str = "host";
const PORT: &str = "port";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const CALLBACK_HANDLER_CLASS: &str = "callback.handler.class";
const CONNECT_OPTIONS: &str = "connect.options.";
const SSL_ENABLED: &str = "ssl.enabled";

/// 规范化环境，见模块文档。
pub fn normalize_environment(environment: Environment) -> Environment {
    let connection = match environment
        .get(keys::LEGACY_CONNECTIONS)
        .and_then(Value::as_str)
    {
        Some(name) if !name.is_empty() && !name.contains(',') => name.to_owned(),
        _ => return environment,
    };

    let prefix = format!("{}{connection}.", keys::LEGACY_CONNECTION_PREFIX);
    let mut normalized = Environment::new();
    let mut host: Option<String> = None;
    let mut port: Option<String> = None;
    let mut ssl_enabled = false;

    for (key, value) in environment {
        let action = match key.strip_prefix(prefix.as_str()) {
            Some(property) => classify(property),
            None => Action::Keep,
        };
        match action {
            Action::Keep => {
                normalized.insert(key, value);
            }
            Action::Host => host = value.to_text().map(Cow::into_owned),
            Action::Port => port = value.to_text().map(Cow::into_owned),
            Action::Ssl => ssl_enabled = parse_flag(&value),
            Action::Rename(renamed) => {
                normalized.insert(renamed, value);
            }
        }
    }

    if let (Some(host), Some(port)) = (host, port) {
        let scheme = if ssl_enabled {
            "remote+https"
        } else {
            "remote+http"
        };
        tracing::debug!(
            connection = %connection,
            scheme,
            "synthesized provider URL from legacy connection properties"
        );
        normalized.insert(keys::PROVIDER_URL, format!("{scheme}://{host}:{port}"));
    }
    normalized
}

enum Action {
    Keep,
    Host,
    Port,
    Ssl,
    Rename(String),
}

/// 按 `remote.connection.<name>.` 之后的属性后缀决定去向。
fn classify(property: &str) -> Action {
    match property {
        HOST => Action::Host,
        PORT => Action::Port,
        SSL_ENABLED => Action::Ssl,
        USERNAME => Action::Rename(keys::SECURITY_PRINCIPAL.to_owned()),
        PASSWORD => Action::Rename(keys::SECURITY_CREDENTIALS.to_owned()),
        CALLBACK_HANDLER_CLASS => Action::Rename(keys::CALLBACK_HANDLER.to_owned()),
        other => match other.strip_prefix(CONNECT_OPTIONS) {
            // ssl 开关必须先于通用连接选项匹配。
            Some(SSL_ENABLED) => Action::Ssl,
            Some(option) => Action::Rename(format!("{}{option}", keys::CONNECT_OPTIONS_PREFIX)),
            None => Action::Keep,
        },
    }
}

fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        other => other
            .as_str()
            .is_some_and(|text| text.eq_ignore_ascii_case("true")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(extra: &[(&str, &str)]) -> Environment {
        let mut env: Environment = [
            ("remote.connections", "a"),
            ("remote.connection.a.host", "h"),
            ("remote.connection.a.port", "9999"),
        ]
        .into_iter()
        .collect();
        env.extend(extra.iter().copied());
        env
    }

    #[test]
    fn single_connection_synthesizes_http_url() {
        let env = normalize_environment(legacy(&[]));
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+http://h:9999"));
        assert!(!env.contains_key("remote.connection.a.host"));
        assert!(!env.contains_key("remote.connection.a.port"));
        assert_eq!(env.get_text("remote.connections"), Some("a"));
    }

    #[test]
    fn ssl_flag_selects_https_and_is_consumed() {
        let env = normalize_environment(legacy(&[("remote.connection.a.ssl.enabled", "true")]));
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+https://h:9999"));
        assert!(!env.contains_key("remote.connection.a.ssl.enabled"));

        let env = normalize_environment(legacy(&[(
            "remote.connection.a.connect.options.ssl.enabled",
            "TRUE",
        )]));
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+https://h:9999"));
    }

    #[test]
    fn unparseable_ssl_flag_means_plain_http() {
        let env = normalize_environment(legacy(&[("remote.connection.a.ssl.enabled", "yes")]));
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+http://h:9999"));
    }

    #[test]
    fn security_and_options_are_renamed() {
        let env = normalize_environment(legacy(&[
            ("remote.connection.a.username", "alice"),
            ("remote.connection.a.password", "secret"),
            ("remote.connection.a.callback.handler.class", "com.example.Handler"),
            ("remote.connection.a.connect.options.sasl.policy", "noanon"),
            ("remote.connection.a.timeout", "30"),
            ("remote.connection.b.host", "other"),
            ("unrelated", "kept"),
        ]));
        assert_eq!(env.get_text(keys::SECURITY_PRINCIPAL), Some("alice"));
        assert_eq!(env.get_text(keys::SECURITY_CREDENTIALS), Some("secret"));
        assert_eq!(env.get_text(keys::CALLBACK_HANDLER), Some("com.example.Handler"));
        assert_eq!(
            env.get_text("naming.client.connect.options.sasl.policy"),
            Some("noanon")
        );
        assert_eq!(env.get_text("remote.connection.a.timeout"), Some("30"));
        assert_eq!(env.get_text("remote.connection.b.host"), Some("other"));
        assert_eq!(env.get_text("unrelated"), Some("kept"));
        assert!(!env.contains_key("remote.connection.a.username"));
    }

    #[test]
    fn connection_name_and_flags_are_matched_verbatim() {
        // 带空白的连接名指向 `remote.connection. a.*`，不存在 host/port，因此不合成 URL。
        let padded = normalize_environment(legacy(&[("remote.connections", " a")]));
        assert!(!padded.contains_key(keys::PROVIDER_URL));
        assert_eq!(padded.get_text("remote.connection.a.host"), Some("h"));

        // 带空白的开关无法解析为 `true`。
        let env = normalize_environment(legacy(&[("remote.connection.a.ssl.enabled", " true")]));
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+http://h:9999"));
    }

    #[test]
    fn synthesized_url_overrides_existing_value() {
        let env = normalize_environment(legacy(&[(keys::PROVIDER_URL, "remote+http://old:1")]));
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+http://h:9999"));
    }

    #[test]
    fn integer_port_is_accepted() {
        let mut env = legacy(&[]);
        env.insert("remote.connection.a.port", 8080_i64);
        let env = normalize_environment(env);
        assert_eq!(env.get_text(keys::PROVIDER_URL), Some("remote+http://h:8080"));
    }

    #[test]
    fn ambiguous_or_missing_connection_list_is_untouched() {
        let mut multi = legacy(&[]);
        multi.insert("remote.connections", "a,b");
        assert_eq!(normalize_environment(multi.clone()), multi);

        let mut empty = legacy(&[]);
        empty.insert("remote.connections", "");
        assert_eq!(normalize_environment(empty.clone()), empty);
    }

    #[test]
    fn host_without_port_keeps_provider_url_absent() {
        let mut env = legacy(&[]);
        env.remove("remote.connection.a.port");
        let env = normalize_environment(env);
        assert!(!env.contains_key(keys::PROVIDER_URL));
        assert!(!env.contains_key("remote.connection.a.host"));
    }
}
