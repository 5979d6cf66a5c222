//! 输出 schema 与响应解析
//!
//! 推理服务按 `## <Section>` 分段作答，段内通常包在 ``` 代码块里。
//! schema 声明每个段落的形状（文本 / 列表 / 键值对）及是否必填；必填段落缺失或无法解析即 MalformedResponse。

use std::sync::OnceLock;

use regex::Regex;

use crate::core::ActionError;
use crate::memory::{ActionId, FieldValue, InstructContent};

/// 段落期望形状
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    List,
    Pairs,
}

#[derive(Clone, Debug)]
pub struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Action 声明的输出 schema（有序）；空 schema 表示自由文本
#[derive(Clone, Debug, Default)]
pub struct OutputSchema {
    fields: Vec<SchemaField>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(SchemaField {
            name,
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(SchemaField {
            name,
            kind,
            required: false,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 按 schema 解析原始响应
    pub fn parse(&self, action: &ActionId, raw: &str) -> Result<InstructContent, ActionError> {
        let blocks = parse_blocks(raw);
        let mut out = InstructContent::new();
        for field in &self.fields {
            let body = blocks
                .iter()
                .find(|(title, _)| title.eq_ignore_ascii_case(field.name))
                .map(|(_, body)| body.as_str());

            let malformed = |reason: &str| ActionError::MalformedResponse {
                action: action.to_string(),
                section: field.name.to_string(),
                reason: reason.to_string(),
            };

            let Some(body) = body else {
                if field.required {
                    return Err(malformed("is missing"));
                }
                continue;
            };

            let value = match field.kind {
                FieldKind::Text => parse_text(body).map(FieldValue::Text),
                FieldKind::List => parse_list(body).map(FieldValue::List),
                FieldKind::Pairs => parse_pairs(body).map(FieldValue::Pairs),
            };
            match value {
                Some(v) => out.insert(field.name, v),
                None if field.required => {
                    return Err(malformed(&format!("is not a valid {:?}", field.kind)))
                }
                None => tracing::debug!(section = field.name, "optional section unparsable, skipped"),
            }
        }
        Ok(out)
    }
}

/// 按 `## ` 标题切分段落；代码块内的 `##` 不作为标题
pub fn parse_blocks(text: &str) -> Vec<(String, String)> {
    let mut blocks: Vec<(String, String)> = Vec::new();
    let mut in_fence = false;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(title) = trimmed.strip_prefix("## ") {
                let title = title.trim().trim_end_matches(':').trim().to_string();
                blocks.push((title, String::new()));
                continue;
            }
        }
        if let Some((_, body)) = blocks.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    blocks
}

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[\w+\-]*[ \t]*\n(.*?)```").expect("static regex"))
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("static regex"))
}

fn pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[\(\[]\s*["']([^"']*)["']\s*,\s*["']([^"']*)["']\s*[\)\]]"#)
            .expect("static regex")
    })
}

/// 取第一个 ``` 代码块的内容；没有代码块时返回整段（去首尾空白）
pub fn extract_code(text: &str) -> String {
    code_block_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .unwrap_or_else(|| text.trim().to_string())
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for q in ["\"\"\"", "'''", "\"", "'"] {
        if s.len() >= 2 * q.len() && s.starts_with(q) && s.ends_with(q) {
            return s[q.len()..s.len() - q.len()].trim();
        }
    }
    s
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    match line.split_once(". ") {
        Some((n, rest)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => line,
    }
}

fn parse_text(body: &str) -> Option<String> {
    let text = strip_quotes(&extract_code(body)).to_string();
    (!text.is_empty()).then_some(text)
}

fn parse_list(body: &str) -> Option<Vec<String>> {
    let code = extract_code(body);
    let code = code.trim();
    let items: Vec<String> = if code.starts_with('[') {
        quoted_re()
            .captures_iter(code)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        code.lines()
            .map(|l| strip_quotes(strip_bullet(l).trim_end_matches(',')).to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };
    (!items.is_empty()).then_some(items)
}

fn parse_pairs(body: &str) -> Option<Vec<(String, String)>> {
    let code = extract_code(body);
    let mut pairs: Vec<(String, String)> = pair_re()
        .captures_iter(&code)
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
        .collect();
    if pairs.is_empty() {
        pairs = code
            .lines()
            .filter_map(|l| strip_bullet(l).split_once(':'))
            .map(|(k, v)| (strip_quotes(k).to_string(), strip_quotes(v).to_string()))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();
    }
    (!pairs.is_empty()).then_some(pairs)
}
