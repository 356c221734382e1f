// src/transform/sprite.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::transform::svg::{
    attrs_of, build_start, declared_ids, element_name, is_blank, parse_events, rewrite_refs, Attrs,
};
use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const STAGE: &str = "assemble-sprite";
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const SYMBOL_ATTRS: &[&str] = &["viewBox", "preserveAspectRatio"];

/// Merge every SVG of the stream into one inline sprite.
///
/// Each input becomes `<symbol id="<file stem>">` carrying its `viewBox`;
/// ids inside a symbol are prefixed with the symbol id so files cannot
/// clash. Namespace declarations are merged onto the root.
#[derive(Debug, Clone, Default)]
pub struct AssembleSprite;

impl AssembleSprite {
    pub fn assemble(&self, files: &[AssetFile]) -> Result<Option<AssetFile>, TransformError> {
        let Some(first) = files.first() else {
            return Ok(None);
        };

        let mut namespaces: BTreeMap<String, String> = BTreeMap::new();
        let mut body = Writer::new(Vec::new());
        let mut symbols = BTreeSet::new();

        for file in files {
            let reject = |msg: String| TransformError::rejected(STAGE, &file.source, msg);
            let symbol_id = file
                .relative
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .ok_or_else(|| reject("file has no name".to_string()))?;
            if !symbols.insert(symbol_id.clone()) {
                return Err(reject(format!("file name should be unique: {symbol_id}")));
            }

            let events = parse_events(file.text(STAGE)?).map_err(reject)?;
            let prefixed: BTreeMap<String, String> = declared_ids(&events)
                .map_err(reject)?
                .into_iter()
                .map(|id| {
                    let new = format!("{symbol_id}-{id}");
                    (id, new)
                })
                .collect();

            let mut depth = 0usize;
            for event in events {
                let out = match event {
                    Event::Start(elem) if depth == 0 => {
                        depth = 1;
                        let symbol = symbol_start(&elem, &symbol_id, &mut namespaces).map_err(reject)?;
                        Event::Start(symbol)
                    }
                    Event::Empty(elem) if depth == 0 => {
                        let symbol = symbol_start(&elem, &symbol_id, &mut namespaces).map_err(reject)?;
                        Event::Empty(symbol)
                    }
                    Event::End(_) if depth == 1 => {
                        depth = 0;
                        Event::End(BytesEnd::new("symbol"))
                    }
                    _ if depth == 0 => continue,
                    Event::Start(elem) => {
                        depth += 1;
                        Event::Start(prefix_ids(&elem, &prefixed).map_err(reject)?)
                    }
                    Event::Empty(elem) => Event::Empty(prefix_ids(&elem, &prefixed).map_err(reject)?),
                    Event::End(elem) => {
                        depth -= 1;
                        Event::End(elem)
                    }
                    Event::Comment(_) | Event::DocType(_) => continue,
                    e if is_blank(&e) => continue,
                    other => other,
                };
                body.write_event(out).map_err(|e| reject(e.to_string()))?;
            }
        }

        let mut root: Attrs = vec![("xmlns".to_string(), SVG_NS.to_string())];
        root.extend(namespaces);

        let mut doc = Writer::new(Vec::new());
        let write_err = |e: std::io::Error| TransformError::rejected(STAGE, &first.source, e.to_string());
        doc.write_event(Event::Start(build_start("svg", &root)))
            .map_err(write_err)?;
        doc.get_mut().extend_from_slice(&body.into_inner());
        doc.write_event(Event::End(BytesEnd::new("svg")))
            .map_err(write_err)?;

        Ok(Some(AssetFile::new(
            first.source.clone(),
            sprite_name(first),
            doc.into_inner(),
        )))
    }
}

/// `<symbol>` replacing a file's root `<svg>`; `xmlns:*` go to the sprite root.
fn symbol_start(
    elem: &BytesStart<'_>,
    symbol_id: &str,
    namespaces: &mut BTreeMap<String, String>,
) -> Result<BytesStart<'static>, String> {
    if elem.name().as_ref() != b"svg" {
        return Err(format!("root element is <{}>, expected <svg>", element_name(elem)));
    }

    let mut attrs: Attrs = vec![("id".to_string(), symbol_id.to_string())];
    for (key, value) in attrs_of(elem)? {
        if key.starts_with("xmlns:") {
            namespaces.entry(key).or_insert(value);
        } else if SYMBOL_ATTRS.contains(&key.as_str()) {
            attrs.push((key, value));
        }
    }
    Ok(build_start("symbol", &attrs))
}

fn prefix_ids(
    elem: &BytesStart<'_>,
    prefixed: &BTreeMap<String, String>,
) -> Result<BytesStart<'static>, String> {
    let attrs: Attrs = attrs_of(elem)?
        .into_iter()
        .map(|(key, value)| {
            let value = if key == "id" {
                prefixed.get(&value).cloned().unwrap_or(value)
            } else {
                rewrite_refs(&key, &value, prefixed)
            };
            (key, value)
        })
        .collect();
    Ok(build_start(&element_name(elem), &attrs))
}

/// The sprite is named after the directory its symbols come from.
fn sprite_name(first: &AssetFile) -> PathBuf {
    first
        .source
        .parent()
        .and_then(|p| p.file_name())
        .map(|dir| PathBuf::from(format!("{}.svg", dir.to_string_lossy())))
        .unwrap_or_else(|| PathBuf::from("sprite.svg"))
}

impl Transform for AssembleSprite {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        Ok(self.assemble(&files)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(path: &str, body: &str) -> AssetFile {
        AssetFile::new(
            format!("src/assets/img/svg/sprite/{path}"),
            path,
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn builds_one_symbol_per_file() {
        let files = vec![
            svg(
                "arrow.svg",
                r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 10 10"><path id="a" d="M0 0"/><use xlink:href="#a"/></svg>"##,
            ),
            svg("close.svg", r#"<svg viewBox="0 0 5 5"><path d="M1 1"/></svg>"#),
        ];

        let sprite = AssembleSprite.assemble(&files).unwrap().unwrap();
        let out = String::from_utf8(sprite.contents).unwrap();

        assert_eq!(sprite.relative, PathBuf::from("sprite.svg"));
        assert_eq!(
            out,
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
                r##"<symbol id="arrow" viewBox="0 0 10 10"><path id="arrow-a" d="M0 0"/><use xlink:href="#arrow-a"/></symbol>"##,
                r#"<symbol id="close" viewBox="0 0 5 5"><path d="M1 1"/></symbol>"#,
                r#"</svg>"#
            )
        );
    }

    #[test]
    fn no_input_means_no_sprite() {
        assert!(AssembleSprite.assemble(&[]).unwrap().is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let files = vec![svg("a.svg", "<svg/>"), svg("a.svg", "<svg/>")];
        assert!(AssembleSprite.assemble(&files).is_err());
    }

    #[test]
    fn non_svg_root_is_rejected() {
        let files = vec![svg("a.svg", "<html></html>")];
        assert!(AssembleSprite.assemble(&files).is_err());
    }
}
