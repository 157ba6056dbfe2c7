//! # Environment：命名上下文的配置面
//!
//! ## 契约（What）
//! - 区分大小写的有序键值表，键为字符串，值为不透明的 [`Value`]；
//! - 每个分发器独占一份；`Clone` 为浅拷贝，克隆后任何一方的增删互不影响，复杂对象保持同一身份；
//! - 识别的键见 [`keys`]；其余键原样透传给提供者与上下文工厂。
//!
//! ## 配置来源（How）
//! - 代码中逐项构造（`insert` / `FromIterator`）；
//! - [`Environment::from_toml_str`] 读取 TOML 文本，嵌套表展开为点分键。

use std::{
    collections::{BTreeMap, btree_map},
    fmt,
};

use crate::{
    error::{NamingError, Result},
    value::Value,
};

/// 已识别的环境键。
pub mod keys {
    /// 提供者 URL，`scheme` 决定使用哪个连接提供者工厂。
    pub const PROVIDER_URL: &str = "naming.provider.url";
    /// 认证主体。
    pub const SECURITY_PRINCIPAL: &str = "naming.security.principal";
    /// 认证凭据。
    pub const SECURITY_CREDENTIALS: &str = "naming.security.credentials";
    /// 认证回调处理器的类型名。
    pub const CALLBACK_HANDLER: &str = "naming.client.callback.handler";
    /// 规范化后的连接选项前缀。
    pub const CONNECT_OPTIONS_PREFIX: &str = "naming.client.connect.options.";

    /// 旧式连接列表键，值为 `,` 分隔的连接名。
    pub const LEGACY_CONNECTIONS: &str = "remote.connections";
    /// 旧式单连接属性前缀：`remote.connection.<name>.<property>`。
    pub const LEGACY_CONNECTION_PREFIX: &str = "remote.connection.";
}

/// 命名环境。
///
/// `Debug` 输出会遮蔽凭据类键的值，见 [`is_secret_key`]。
#[derive(Clone, Default, PartialEq)]
pub struct Environment {
    entries: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一项并返回旧值。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// 读取文本值；缺失或非文本返回 `None`。
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// 解析 TOML 文本。
    ///
    /// # 契约说明（What）
    /// - 嵌套表展开为点分键：`[remote.connection.a] host = "h"` 得到 `remote.connection.a.host`；
    /// - 字符串、整数、布尔分别映射为 `Text`、`Integer`、`Bool`；
    /// - 数组按 `,` 连接为文本（元素本身需为标量），因此 `remote.connections = ["a"]` 与
    ///   `remote.connections = "a"` 等价；浮点与日期时间按其 TOML 文本表示保存；
    /// - 语法错误返回 [`NamingError::InvalidConfiguration`]。
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table = source
            .parse::<toml::Table>()
            .map_err(|err| NamingError::InvalidConfiguration {
                detail: err.to_string(),
            })?;
        let mut environment = Self::new();
        flatten_table(&mut environment, None, &table)?;
        Ok(environment)
    }
}

/// 凭据类键：[`keys::SECURITY_CREDENTIALS`] 与任意以 `.password` 结尾的键。
pub fn is_secret_key(key: &str) -> bool {
    key == keys::SECURITY_CREDENTIALS || key.ends_with(".password")
}

struct Redacted;

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            if is_secret_key(key) {
                map.entry(key, &Redacted);
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

fn flatten_table(target: &mut Environment, prefix: Option<&str>, table: &toml::Table) -> Result<()> {
    for (key, value) in table {
        let full_key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            toml::Value::Table(nested) => flatten_table(target, Some(&full_key), nested)?,
            toml::Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| scalar_text(&full_key, item))
                    .collect::<Result<Vec<_>>>()?
                    .join(",");
                target.insert(full_key, joined);
            }
            scalar => {
                let converted = scalar_value(scalar);
                target.insert(full_key, converted);
            }
        }
    }
    Ok(())
}

fn scalar_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::text(text.as_str()),
        toml::Value::Integer(number) => Value::Integer(*number),
        toml::Value::Boolean(flag) => Value::Bool(*flag),
        other => Value::text(other.to_string()),
    }
}

fn scalar_text(key: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(text) => Ok(text.clone()),
        toml::Value::Array(_) | toml::Value::Table(_) => Err(NamingError::InvalidConfiguration {
            detail: format!("`{key}` must be an array of scalars"),
        }),
        other => Ok(other.to_string()),
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Environment {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_independent_but_shares_objects() {
        let marker = Value::opaque(String::from("handler"));
        let mut original: Environment = [("k", Value::from("v"))].into_iter().collect();
        original.insert("obj", marker.clone());

        let mut copy = original.clone();
        copy.insert("k", "changed");
        copy.remove("obj");

        assert_eq!(original.get_text("k"), Some("v"));
        assert_eq!(original.get("obj"), Some(&marker));
        assert_eq!(copy.get_text("k"), Some("changed"));
        assert!(!copy.contains_key("obj"));
    }

    #[test]
    fn toml_tables_flatten_to_dotted_keys() {
        let env = Environment::from_toml_str(
            r#"
            "naming.provider.url" = "remote+http://localhost:8080"

            [remote]
            connections = ["main"]

            [remote.connection.main]
            host = "h"
            port = 9999
            "ssl.enabled" = true
            "#,
        )
        .unwrap();

        assert_eq!(
            env.get_text(keys::PROVIDER_URL),
            Some("remote+http://localhost:8080")
        );
        assert_eq!(env.get_text("remote.connections"), Some("main"));
        assert_eq!(env.get_text("remote.connection.main.host"), Some("h"));
        assert_eq!(env.get("remote.connection.main.port"), Some(&Value::Integer(9999)));
        assert_eq!(
            env.get("remote.connection.main.ssl.enabled"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let env: Environment = [
            (keys::SECURITY_PRINCIPAL, "alice"),
            (keys::SECURITY_CREDENTIALS, "s3cret"),
            ("remote.connection.a.password", "legacy-s3cret"),
        ]
        .into_iter()
        .collect();

        let rendered = format!("{env:?}");
        assert!(!rendered.contains("s3cret"), "{rendered}");
        assert!(rendered.contains("alice"));
        assert!(rendered.contains(keys::SECURITY_CREDENTIALS));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(env.get_text(keys::SECURITY_CREDENTIALS), Some("s3cret"));
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = Environment::from_toml_str("remote = [").unwrap_err();
        assert_eq!(err.code(), crate::error::codes::INVALID_CONFIGURATION);

        let err = Environment::from_toml_str("list = [[1], [2]]").unwrap_err();
        assert!(err.to_string().contains("array of scalars"));
    }
}
