//! `.docx` template rendering.
//!
//! A `.docx` file is a zip archive. The body, headers and footers are XML
//! parts in which `{{ name }}` placeholders are substituted and
//! `{% if name %} ... {% else %} ... {% endif %}` blocks are evaluated.
//! Every other entry is copied through untouched.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// Plain text, XML-escaped on output.
    Text(String),
    /// WordprocessingML inserted verbatim (e.g. `<w:br/>` line breaks).
    Raw(String),
    Flag(bool),
}

impl TemplateValue {
    fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Text(s) | TemplateValue::Raw(s) => !s.is_empty(),
            TemplateValue::Flag(b) => *b,
        }
    }

    fn render(&self) -> String {
        match self {
            TemplateValue::Text(s) => xml_escape(s),
            TemplateValue::Raw(s) => s.clone(),
            TemplateValue::Flag(true) => "True".to_string(),
            TemplateValue::Flag(false) => "False".to_string(),
        }
    }
}

/// Values available to a template, keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: BTreeMap<String, TemplateValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(key.to_string(), TemplateValue::Text(value.into()));
        self
    }

    pub fn raw(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(key.to_string(), TemplateValue::Raw(value.into()));
        self
    }

    pub fn flag(mut self, key: &str, value: bool) -> Self {
        self.values.insert(key.to_string(), TemplateValue::Flag(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.values.get(key)
    }

    fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(TemplateValue::is_truthy)
    }
}

pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Lines of a multi-line value joined with Word line breaks.
pub fn line_breaks(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(xml_escape)
        .collect::<Vec<_>>()
        .join("<w:br/>")
}

// Word splits typed text into runs at will, so `{{` may arrive as
// `{</w:t></w:r><w:r><w:t>{`.
static SPLIT_OPEN_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?:<[^>]*>)+\{").expect("valid regex"));
static SPLIT_CLOSE_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}(?:<[^>]*>)+\}").expect("valid regex"));
static SPLIT_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?:<[^>]*>)+%").expect("valid regex"));
static SPLIT_CLOSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(?:<[^>]*>)+\}").expect("valid regex"));
static DELIMITED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("valid regex"));
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static IF_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%[pr]?\s*if\s+(not\s+)?(\w+)\s*%\}(.*?)\{%[pr]?\s*endif\s*%\}")
        .expect("valid regex")
});
static ELSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%[pr]?\s*else\s*%\}").expect("valid regex"));
static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid regex"));

/// Removes markup that Word inserted inside template delimiters.
fn clean_markup(xml: &str) -> String {
    let xml = SPLIT_OPEN_VAR.replace_all(xml, "{{");
    let xml = SPLIT_CLOSE_VAR.replace_all(&xml, "}}");
    let xml = SPLIT_OPEN_TAG.replace_all(&xml, "{%");
    let xml = SPLIT_CLOSE_TAG.replace_all(&xml, "%}");
    DELIMITED
        .replace_all(&xml, |caps: &Captures| MARKUP.replace_all(&caps[0], "").into_owned())
        .into_owned()
}

/// Renders one XML part. Blocks do not nest; unknown names render empty.
pub fn render_xml(xml: &str, ctx: &Context) -> String {
    let mut out = clean_markup(xml);

    while IF_BLOCK.is_match(&out) {
        out = IF_BLOCK
            .replace_all(&out, |caps: &Captures| {
                let negate = caps.get(1).is_some();
                let truthy = ctx.is_truthy(&caps[2]) != negate;
                let body = &caps[3];
                let (then_part, else_part) = match ELSE_TAG.find(body) {
                    Some(m) => (&body[..m.start()], &body[m.end()..]),
                    None => (body, ""),
                };
                if truthy {
                    then_part.to_string()
                } else {
                    else_part.to_string()
                }
            })
            .into_owned();
    }

    VARIABLE
        .replace_all(&out, |caps: &Captures| {
            ctx.get(&caps[1]).map(TemplateValue::render).unwrap_or_default()
        })
        .into_owned()
}

fn is_rendered_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml")
}

fn template_error(err: impl std::fmt::Display) -> AppError {
    AppError::Template(err.to_string())
}

/// A loaded `.docx` template.
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxTemplate {
    pub fn open(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::Template(format!("cannot read template {}: {e}", path.display()))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> AppResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(template_error)?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(template_error)?;
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push((name, data));
        }

        if !entries.iter().any(|(name, _)| name == "word/document.xml") {
            return Err(AppError::Template(
                "template has no word/document.xml".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    /// Renders the template and returns the bytes of the new document.
    pub fn render(&self, ctx: &Context) -> AppResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            if name.ends_with('/') {
                writer
                    .add_directory(name.as_str(), options)
                    .map_err(template_error)?;
                continue;
            }

            writer
                .start_file(name.as_str(), options)
                .map_err(template_error)?;
            if is_rendered_part(name) {
                let xml = std::str::from_utf8(data).map_err(template_error)?;
                writer.write_all(render_xml(xml, ctx).as_bytes())?;
            } else {
                writer.write_all(data)?;
            }
        }

        let cursor = writer.finish().map_err(template_error)?;
        Ok(cursor.into_inner())
    }
}

/// Test helper: a minimal `.docx` whose body holds `body_xml`.
#[cfg(test)]
pub fn docx_with_body(body_xml: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer
        .write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types/>"#)
        .unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer
        .write_all(
            format!(
                r#"<w:document><w:body><w:p><w:r><w:t>{body_xml}</w:t></w:r></w:p></w:body></w:document>"#
            )
            .as_bytes(),
        )
        .unwrap();
    writer.finish().unwrap().into_inner()
}

/// Test helper: the body XML of a rendered document.
#[cfg(test)]
pub fn document_xml(docx: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut file = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_and_escapes() {
        let ctx = Context::new().text("name", "Rao & Sons <Pvt>");
        assert_eq!(
            render_xml("Dear {{ name }},", &ctx),
            "Dear Rao &amp; Sons &lt;Pvt&gt;,"
        );
    }

    #[test]
    fn raw_values_are_verbatim() {
        let ctx = Context::new().raw("address", line_breaks("12 MG Road\n\n Bengaluru "));
        assert_eq!(
            render_xml("{{address}}", &ctx),
            "12 MG Road<w:br/>Bengaluru"
        );
    }

    #[test]
    fn unknown_placeholders_render_empty() {
        assert_eq!(render_xml("[{{ missing }}]", &Context::new()), "[]");
    }

    #[test]
    fn placeholders_split_across_runs() {
        let xml = "<w:t>{</w:t></w:r><w:r><w:t>{ first_</w:t></w:r><w:r><w:t>name }}</w:t>";
        let ctx = Context::new().text("first_name", "Asha");
        assert_eq!(render_xml(xml, &ctx), "<w:t>Asha</w:t>");
    }

    #[test]
    fn conditional_blocks() {
        let xml = "A{% if placed %} placed at {{ company }}{% else %} not placed{% endif %}.";
        let yes = Context::new().flag("placed", true).text("company", "Acme");
        let no = Context::new().flag("placed", false);
        assert_eq!(render_xml(xml, &yes), "A placed at Acme.");
        assert_eq!(render_xml(xml, &no), "A not placed.");
    }

    #[test]
    fn negated_and_sequential_conditionals() {
        let xml = "{% if not x %}1{% endif %}{% if y %}2{% endif %}";
        let ctx = Context::new().text("y", "yes");
        assert_eq!(render_xml(xml, &ctx), "12");
    }

    #[test]
    fn renders_whole_document() {
        let template = DocxTemplate::from_bytes(&docx_with_body("Hello {{ name }}")).unwrap();
        let out = template.render(&Context::new().text("name", "Asha")).unwrap();
        let xml = document_xml(&out);
        assert!(xml.contains("Hello Asha"));
        assert!(!xml.contains("{{"));
    }

    #[test]
    fn rejects_non_docx() {
        let err = DocxTemplate::from_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, AppError::Template(_)));
    }
}
