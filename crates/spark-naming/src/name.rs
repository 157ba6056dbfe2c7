//! # 复合名称
//!
//! [`Name`] 是有序的字符串段序列，相等性与排序逐段比较。
//!
//! ## 字符串语法
//! - `/` 分隔各段；`\` 转义紧随其后的 `/`、`\`、`"`、`'`，其它字符前的 `\` 按字面保留；
//! - 一段可整体用 `"` 或 `'` 引起来，引号内的 `/` 不再分段；
//! - `""` 解析为零段，`"/"` 解析为单个空段；非空段之后的结尾 `/` 追加一个空尾段；
//! - 未闭合的引号、闭合引号后紧跟非分隔符内容、结尾悬空的 `\` 均为 [`NamingError::InvalidName`]。
//!
//! [`fmt::Display`] 输出与解析互逆。

use std::{fmt, str::FromStr};

use crate::error::{NamingError, Result};

const SEPARATOR: char = '/';
const ESCAPE: char = '\\';

/// 层级化命名标识。
///
/// # 契约说明（What）
/// - 调用方持有的实例永不被就地修改：分发层总是先 `clone` 再修改副本；
/// - `Clone` 为深拷贝（段为 `String`）。
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    segments: Vec<String>,
}

impl Name {
    /// 空名称，指代"当前上下文自身"。
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由若干段直接构造，不做任何转义处理。
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// 按复合名称语法解析字符串。
    pub fn parse(text: &str) -> Result<Self> {
        Parser::new(text).parse()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// 在 `index` 处插入一段；`index > len` 时 panic，与 `Vec::insert` 一致。
    pub fn insert(&mut self, index: usize, segment: impl Into<String>) {
        self.segments.insert(index, segment.into());
    }

    /// 移除并返回 `index` 处的段，越界返回 `None`。
    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.segments.len()).then(|| self.segments.remove(index))
    }

    /// 前 `count` 段组成的新名称。
    pub fn prefix(&self, count: usize) -> Name {
        Name::from_segments(self.segments.iter().take(count).cloned())
    }

    /// 自 `start` 起的剩余段组成的新名称。
    pub fn suffix(&self, start: usize) -> Name {
        Name::from_segments(self.segments.iter().skip(start).cloned())
    }

    /// 追加另一名称的全部段。
    pub fn extend_from(&mut self, other: &Name) {
        self.segments.extend(other.segments.iter().cloned());
    }

    /// 返回 `self + other` 的新名称，两者均不被修改。
    pub fn join(&self, other: &Name) -> Name {
        let mut joined = self.clone();
        joined.extend_from(other);
        joined
    }
}

impl FromStr for Name {
    type Err = NamingError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl<S: Into<String>> FromIterator<S> for Name {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_segments(iter)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut all_empty = true;
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            if !segment.is_empty() {
                all_empty = false;
            }
            write_escaped(f, segment)?;
        }
        // 全空段名称需要额外的结尾分隔符，否则 [""] 会被打印成 "" 而丢失一段。
        if all_empty && !self.segments.is_empty() {
            f.write_str("/")?;
        }
        Ok(())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, segment: &str) -> fmt::Result {
    for (index, ch) in segment.char_indices() {
        let needs_escape = match ch {
            SEPARATOR | ESCAPE => true,
            '"' | '\'' => index == 0,
            _ => false,
        };
        if needs_escape {
            write!(f, "{ESCAPE}")?;
        }
        write!(f, "{ch}")?;
    }
    Ok(())
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
        }
    }

    fn parse(&self) -> Result<Name> {
        let len = self.chars.len();
        let mut segments = Vec::new();
        let mut all_empty = true;
        let mut pos = 0;
        while pos < len {
            let (segment, next) = self.component(pos)?;
            if !segment.is_empty() {
                all_empty = false;
            }
            segments.push(segment);
            pos = next;
            if pos < len {
                // component() 只会停在分隔符上。
                pos += 1;
                if pos == len && !all_empty {
                    segments.push(String::new());
                }
            }
        }
        Ok(Name { segments })
    }

    fn component(&self, start: usize) -> Result<(String, usize)> {
        match self.chars.get(start) {
            Some(&quote @ ('"' | '\'')) => self.quoted(start + 1, quote),
            _ => self.plain(start),
        }
    }

    fn plain(&self, mut pos: usize) -> Result<(String, usize)> {
        let mut segment = String::new();
        while let Some(&ch) = self.chars.get(pos) {
            match ch {
                SEPARATOR => break,
                ESCAPE => {
                    let escaped = self.escaped(pos)?;
                    segment.push_str(escaped.0);
                    pos = escaped.1;
                    continue;
                }
                other => segment.push(other),
            }
            pos += 1;
        }
        Ok((segment, pos))
    }

    fn quoted(&self, mut pos: usize, quote: char) -> Result<(String, usize)> {
        let mut segment = String::new();
        loop {
            match self.chars.get(pos) {
                None => return Err(NamingError::invalid_name(self.text, "unterminated quote")),
                Some(&ch) if ch == quote => {
                    pos += 1;
                    return match self.chars.get(pos) {
                        None | Some(&SEPARATOR) => Ok((segment, pos)),
                        Some(_) => Err(NamingError::invalid_name(
                            self.text,
                            "unexpected characters after closing quote",
                        )),
                    };
                }
                Some(&ESCAPE) => {
                    let escaped = self.escaped(pos)?;
                    segment.push_str(escaped.0);
                    pos = escaped.1;
                }
                Some(&ch) => {
                    segment.push(ch);
                    pos += 1;
                }
            }
        }
    }

    /// 处理 `pos` 处的转义符，返回应写入的文本与下一个位置。
    fn escaped(&self, pos: usize) -> Result<(&'static str, usize)> {
        match self.chars.get(pos + 1).copied() {
            None => Err(NamingError::invalid_name(self.text, "dangling escape")),
            Some(SEPARATOR) => Ok(("/", pos + 2)),
            Some(ESCAPE) => Ok(("\\", pos + 2)),
            Some('"') => Ok(("\"", pos + 2)),
            Some('\'') => Ok(("'", pos + 2)),
            Some(_) => Ok(("\\", pos + 1)),
        }
    }
}
