// src/transform/template.rs

use std::path::Path;

use toml::Value;

use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const STAGE: &str = "template";

/// Substitute `<%= key %>` (raw) and `<%- key %>` (HTML-escaped)
/// placeholders from the `[template.data]` table.
///
/// Dotted keys (`<%= site.title %>`) walk nested tables. Placeholders that
/// name no value, or blocks that are not one of the two forms above, reject
/// the file.
#[derive(Debug, Clone, Default)]
pub struct TemplateVariables {
    data: toml::Table,
}

impl TemplateVariables {
    pub fn new(data: toml::Table) -> Self {
        Self { data }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    fn render(&self, path: &Path, text: &str) -> Result<String, TransformError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("<%") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("%>") else {
                return Err(TransformError::rejected(STAGE, path, "unterminated `<%` tag"));
            };
            let tag = &after_open[..end];
            rest = &after_open[end + 2..];

            let (escape, key) = match tag.chars().next() {
                Some('=') => (false, tag[1..].trim()),
                Some('-') => (true, tag[1..].trim()),
                _ => {
                    return Err(TransformError::rejected(
                        STAGE,
                        path,
                        format!("unsupported template block `<%{tag}%>`"),
                    ));
                }
            };

            let value = self
                .lookup(key)
                .ok_or_else(|| TransformError::rejected(STAGE, path, format!("{key} is not defined")))?;
            let rendered = scalar_to_string(value).ok_or_else(|| {
                TransformError::rejected(STAGE, path, format!("{key} is not a scalar value"))
            })?;

            if escape {
                out.push_str(&escape_html(&rendered));
            } else {
                out.push_str(&rendered);
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl Transform for TemplateVariables {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                let rendered = self.render(&file.source, file.text(STAGE)?)?;
                file.contents = rendered.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> toml::Table {
        toml::from_str(
            r#"
            title = "Fish & Chips"
            year = 2024
            [site]
            name = "<Mediatec>"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn substitutes_raw_escaped_and_nested_values() {
        let t = TemplateVariables::new(data());
        let out = t
            .render(
                Path::new("index.html"),
                "<title><%= title %></title><h1><%- site.name %></h1>&copy; <%=year%>",
            )
            .unwrap();
        assert_eq!(
            out,
            "<title>Fish & Chips</title><h1>&lt;Mediatec&gt;</h1>&copy; 2024"
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        let t = TemplateVariables::new(data());
        let err = t.render(Path::new("index.html"), "<%= missing %>").unwrap_err();
        assert!(err.to_string().contains("missing is not defined"));
    }

    #[test]
    fn code_blocks_and_unterminated_tags_are_rejected() {
        let t = TemplateVariables::new(data());
        assert!(t.render(Path::new("a.html"), "<% if (x) { %>").is_err());
        assert!(t.render(Path::new("a.html"), "<%= title").is_err());
    }

    #[test]
    fn text_without_tags_is_unchanged() {
        let t = TemplateVariables::default();
        let page = "<p>100% plain</p>";
        assert_eq!(t.render(Path::new("a.html"), page).unwrap(), page);
    }
}
