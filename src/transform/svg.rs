// src/transform/svg.rs

//! SVG rewriting on top of `quick-xml` events.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::{Captures, Regex};

use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const OPTIMIZE: &str = "optimize-svg";
const STRIP: &str = "strip-dimensions";

static URL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?#([^'")\s]+)['"]?\s*\)"#).expect("valid regex"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?(?:px)?").expect("valid regex")
});
static NUMBER_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?(?:px)?[\s,]*)+$").expect("valid regex")
});

const COLOR_ATTRS: &[&str] = &[
    "fill",
    "stroke",
    "stop-color",
    "flood-color",
    "lighting-color",
    "color",
];

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Attribute list of an element, values kept in their escaped form.
pub(crate) type Attrs = Vec<(String, String)>;

/// Read every event of a document.
pub(crate) fn parse_events(text: &str) -> Result<Vec<Event<'_>>, String> {
    let mut reader = Reader::from_str(text);
    let mut events = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => events.push(event),
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                ));
            }
        }
    }
    Ok(events)
}

pub(crate) fn element_name(elem: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(elem.name().as_ref()).into_owned()
}

pub(crate) fn attrs_of(elem: &BytesStart<'_>) -> Result<Attrs, String> {
    elem.attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| e.to_string())?;
            Ok((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ))
        })
        .collect()
}

pub(crate) fn build_start(name: &str, attrs: &Attrs) -> BytesStart<'static> {
    let mut elem = BytesStart::new(name.to_string());
    for (key, value) in attrs {
        elem.push_attribute((key.as_bytes(), value.as_bytes()));
    }
    elem
}

pub(crate) fn is_blank(event: &Event<'_>) -> bool {
    matches!(event, Event::Text(t) if t.iter().all(u8::is_ascii_whitespace))
}

fn is_href(key: &str) -> bool {
    key == "href" || key == "xlink:href"
}

/// Ids referenced through `url(#id)` or `href="#id"`.
pub(crate) fn referenced_ids(events: &[Event<'_>]) -> Result<BTreeSet<String>, String> {
    let mut ids = BTreeSet::new();
    for event in events {
        let (Event::Start(elem) | Event::Empty(elem)) = event else {
            continue;
        };
        for (key, value) in attrs_of(elem)? {
            for caps in URL_REF.captures_iter(&value) {
                ids.insert(caps[1].to_string());
            }
            if is_href(&key)
                && let Some(id) = value.strip_prefix('#')
            {
                ids.insert(id.to_string());
            }
        }
    }
    Ok(ids)
}

/// Ids declared by any element, in document order.
pub(crate) fn declared_ids(events: &[Event<'_>]) -> Result<Vec<String>, String> {
    let mut ids = Vec::new();
    for event in events {
        let (Event::Start(elem) | Event::Empty(elem)) = event else {
            continue;
        };
        for (key, value) in attrs_of(elem)? {
            if key == "id" && !ids.contains(&value) {
                ids.push(value);
            }
        }
    }
    Ok(ids)
}

/// Rewrite `url(#id)` and `href="#id"` references through `rename`.
/// References `rename` does not know are left alone.
pub(crate) fn rewrite_refs(key: &str, value: &str, rename: &BTreeMap<String, String>) -> String {
    if is_href(key)
        && let Some(new) = value.strip_prefix('#').and_then(|id| rename.get(id))
    {
        return format!("#{new}");
    }
    URL_REF
        .replace_all(value, |caps: &Captures<'_>| match rename.get(&caps[1]) {
            Some(new) => format!("url(#{new})"),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Short id for the `n`-th referenced element: a..z, A..Z, aa, ab, ...
fn short_id(mut n: usize) -> String {
    let base = ID_ALPHABET.len();
    let mut out = Vec::new();
    loop {
        out.push(ID_ALPHABET[n % base]);
        if n < base {
            break;
        }
        n = n / base - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Round every number in `value` to `precision` decimals, dropping `px`
/// units, trailing zeros and the leading zero of fractions.
fn round_numbers(value: &str, precision: u8) -> String {
    NUMBER
        .replace_all(value, |caps: &Captures<'_>| {
            let raw = caps[0].trim_end_matches("px");
            match raw.parse::<f64>() {
                Ok(n) => format_number(n, precision),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn format_number(n: f64, precision: u8) -> String {
    let factor = 10f64.powi(i32::from(precision));
    let rounded = (n * factor).round() / factor;
    let mut s = format!("{:.*}", usize::from(precision), rounded);
    if s.contains('.') {
        s = s.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    if let Some(rest) = s.strip_prefix("0.") {
        s = format!(".{rest}");
    } else if let Some(rest) = s.strip_prefix("-0.") {
        s = format!("-.{rest}");
    }
    s
}

/// Colour names and `rgb()` to hex, hex lowercased and shortened.
fn normalize_color(value: &str) -> String {
    let lower = value.trim().to_ascii_lowercase();

    let hex = if let Some(hex) = named_color(&lower) {
        hex.to_string()
    } else if let Some(args) = lower.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        match rgb_to_hex(args) {
            Some(hex) => hex,
            None => return value.to_string(),
        }
    } else if lower.starts_with('#') {
        lower
    } else {
        return value.to_string();
    };

    shorten_hex(&hex)
}

fn rgb_to_hex(args: &str) -> Option<String> {
    let parts: Vec<&str> = args.split([',', ' ']).filter(|p| !p.is_empty()).collect();
    if parts.len() != 3 {
        return None;
    }
    let mut hex = String::from("#");
    for part in parts {
        let channel = match part.strip_suffix('%') {
            Some(pct) => (pct.parse::<f64>().ok()?.clamp(0.0, 100.0) * 2.55).round(),
            None => part.parse::<f64>().ok()?.clamp(0.0, 255.0).round(),
        };
        hex.push_str(&format!("{:02x}", channel as u8));
    }
    Some(hex)
}

fn shorten_hex(hex: &str) -> String {
    let b = hex.as_bytes();
    if b.len() == 7 && b[1] == b[2] && b[3] == b[4] && b[5] == b[6] {
        format!("#{}{}{}", b[1] as char, b[3] as char, b[5] as char)
    } else {
        hex.to_string()
    }
}

fn named_color(name: &str) -> Option<&'static str> {
    NAMED_COLORS
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|idx| NAMED_COLORS[idx].1)
}

/// CSS colour keywords, sorted by name.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("aliceblue", "#f0f8ff"), ("antiquewhite", "#faebd7"), ("aqua", "#00ffff"),
    ("aquamarine", "#7fffd4"), ("azure", "#f0ffff"), ("beige", "#f5f5dc"),
    ("bisque", "#ffe4c4"), ("black", "#000000"), ("blanchedalmond", "#ffebcd"),
    ("blue", "#0000ff"), ("blueviolet", "#8a2be2"), ("brown", "#a52a2a"),
    ("burlywood", "#deb887"), ("cadetblue", "#5f9ea0"), ("chartreuse", "#7fff00"),
    ("chocolate", "#d2691e"), ("coral", "#ff7f50"), ("cornflowerblue", "#6495ed"),
    ("cornsilk", "#fff8dc"), ("crimson", "#dc143c"), ("cyan", "#00ffff"),
    ("darkblue", "#00008b"), ("darkcyan", "#008b8b"), ("darkgoldenrod", "#b8860b"),
    ("darkgray", "#a9a9a9"), ("darkgreen", "#006400"), ("darkgrey", "#a9a9a9"),
    ("darkkhaki", "#bdb76b"), ("darkmagenta", "#8b008b"), ("darkolivegreen", "#556b2f"),
    ("darkorange", "#ff8c00"), ("darkorchid", "#9932cc"), ("darkred", "#8b0000"),
    ("darksalmon", "#e9967a"), ("darkseagreen", "#8fbc8f"), ("darkslateblue", "#483d8b"),
    ("darkslategray", "#2f4f4f"), ("darkslategrey", "#2f4f4f"), ("darkturquoise", "#00ced1"),
    ("darkviolet", "#9400d3"), ("deeppink", "#ff1493"), ("deepskyblue", "#00bfff"),
    ("dimgray", "#696969"), ("dimgrey", "#696969"), ("dodgerblue", "#1e90ff"),
    ("firebrick", "#b22222"), ("floralwhite", "#fffaf0"), ("forestgreen", "#228b22"),
    ("fuchsia", "#ff00ff"), ("gainsboro", "#dcdcdc"), ("ghostwhite", "#f8f8ff"),
    ("gold", "#ffd700"), ("goldenrod", "#daa520"), ("gray", "#808080"),
    ("green", "#008000"), ("greenyellow", "#adff2f"), ("grey", "#808080"),
    ("honeydew", "#f0fff0"), ("hotpink", "#ff69b4"), ("indianred", "#cd5c5c"),
    ("indigo", "#4b0082"), ("ivory", "#fffff0"), ("khaki", "#f0e68c"),
    ("lavender", "#e6e6fa"), ("lavenderblush", "#fff0f5"), ("lawngreen", "#7cfc00"),
    ("lemonchiffon", "#fffacd"), ("lightblue", "#add8e6"), ("lightcoral", "#f08080"),
    ("lightcyan", "#e0ffff"), ("lightgoldenrodyellow", "#fafad2"), ("lightgray", "#d3d3d3"),
    ("lightgreen", "#90ee90"), ("lightgrey", "#d3d3d3"), ("lightpink", "#ffb6c1"),
    ("lightsalmon", "#ffa07a"), ("lightseagreen", "#20b2aa"), ("lightskyblue", "#87cefa"),
    ("lightslategray", "#778899"), ("lightslategrey", "#778899"), ("lightsteelblue", "#b0c4de"),
    ("lightyellow", "#ffffe0"), ("lime", "#00ff00"), ("limegreen", "#32cd32"),
    ("linen", "#faf0e6"), ("magenta", "#ff00ff"), ("maroon", "#800000"),
    ("mediumaquamarine", "#66cdaa"), ("mediumblue", "#0000cd"), ("mediumorchid", "#ba55d3"),
    ("mediumpurple", "#9370db"), ("mediumseagreen", "#3cb371"), ("mediumslateblue", "#7b68ee"),
    ("mediumspringgreen", "#00fa9a"), ("mediumturquoise", "#48d1cc"), ("mediumvioletred", "#c71585"),
    ("midnightblue", "#191970"), ("mintcream", "#f5fffa"), ("mistyrose", "#ffe4e1"),
    ("moccasin", "#ffe4b5"), ("navajowhite", "#ffdead"), ("navy", "#000080"),
    ("oldlace", "#fdf5e6"), ("olive", "#808000"), ("olivedrab", "#6b8e23"),
    ("orange", "#ffa500"), ("orangered", "#ff4500"), ("orchid", "#da70d6"),
    ("palegoldenrod", "#eee8aa"), ("palegreen", "#98fb98"), ("paleturquoise", "#afeeee"),
    ("palevioletred", "#db7093"), ("papayawhip", "#ffefd5"), ("peachpuff", "#ffdab9"),
    ("peru", "#cd853f"), ("pink", "#ffc0cb"), ("plum", "#dda0dd"),
    ("powderblue", "#b0e0e6"), ("purple", "#800080"), ("rebeccapurple", "#663399"),
    ("red", "#ff0000"), ("rosybrown", "#bc8f8f"), ("royalblue", "#4169e1"),
    ("saddlebrown", "#8b4513"), ("salmon", "#fa8072"), ("sandybrown", "#f4a460"),
    ("seagreen", "#2e8b57"), ("seashell", "#fff5ee"), ("sienna", "#a0522d"),
    ("silver", "#c0c0c0"), ("skyblue", "#87ceeb"), ("slateblue", "#6a5acd"),
    ("slategray", "#708090"), ("slategrey", "#708090"), ("snow", "#fffafa"),
    ("springgreen", "#00ff7f"), ("steelblue", "#4682b4"), ("tan", "#d2b48c"),
    ("teal", "#008080"), ("thistle", "#d8bfd8"), ("tomato", "#ff6347"),
    ("turquoise", "#40e0d0"), ("violet", "#ee82ee"), ("wheat", "#f5deb3"),
    ("white", "#ffffff"), ("whitesmoke", "#f5f5f5"), ("yellow", "#ffff00"),
    ("yellowgreen", "#9acd32"),
];

/// svgo-style cleanup: drops declarations, doctypes, comments and blank
/// text, rounds numeric attributes, normalises colours and minifies ids.
/// Ids nothing refers to are removed.
#[derive(Debug, Clone)]
pub struct OptimizeSvg {
    precision: u8,
}

impl OptimizeSvg {
    pub fn new(precision: u8) -> Self {
        Self { precision }
    }

    pub fn optimize(&self, text: &str) -> Result<String, String> {
        let events = parse_events(text)?;
        let referenced = referenced_ids(&events)?;
        let rename: BTreeMap<String, String> = declared_ids(&events)?
            .into_iter()
            .filter(|id| referenced.contains(id))
            .enumerate()
            .map(|(n, id)| (id, short_id(n)))
            .collect();

        let mut writer = Writer::new(Vec::with_capacity(text.len()));
        for event in events {
            let event = match event {
                Event::Decl(_) | Event::DocType(_) | Event::Comment(_) => continue,
                e if is_blank(&e) => continue,
                Event::Start(elem) => Event::Start(self.rewrite(&elem, &rename)?),
                Event::Empty(elem) => Event::Empty(self.rewrite(&elem, &rename)?),
                other => other,
            };
            writer.write_event(event).map_err(|e| e.to_string())?;
        }

        String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
    }

    fn rewrite(
        &self,
        elem: &BytesStart<'_>,
        rename: &BTreeMap<String, String>,
    ) -> Result<BytesStart<'static>, String> {
        let mut attrs = Attrs::new();
        for (key, value) in attrs_of(elem)? {
            if key == "id" {
                if let Some(new) = rename.get(&value) {
                    attrs.push((key, new.clone()));
                }
                continue;
            }

            let mut value = rewrite_refs(&key, &value, rename);
            if COLOR_ATTRS.contains(&key.as_str()) {
                value = normalize_color(&value);
            } else if !key.starts_with("xmlns") && NUMBER_LIST.is_match(&value) {
                value = round_numbers(&value, self.precision);
            }
            attrs.push((key, value));
        }
        Ok(build_start(&element_name(elem), &attrs))
    }
}

impl Transform for OptimizeSvg {
    fn name(&self) -> &'static str {
        OPTIMIZE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                let out = self
                    .optimize(file.text(OPTIMIZE)?)
                    .map_err(|msg| TransformError::rejected(OPTIMIZE, &file.source, msg))?;
                file.contents = out.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

/// Remove `width`/`height` from every `<svg>` element; with `hide`, also
/// set `style="display: none"`.
#[derive(Debug, Clone, Default)]
pub struct StripDimensions {
    hide: bool,
}

impl StripDimensions {
    pub fn new(hide: bool) -> Self {
        Self { hide }
    }

    pub fn strip(&self, text: &str) -> Result<String, String> {
        let mut writer = Writer::new(Vec::with_capacity(text.len()));
        for event in parse_events(text)? {
            let event = match event {
                Event::Start(elem) if elem.name().as_ref() == b"svg" => Event::Start(self.rewrite(&elem)?),
                Event::Empty(elem) if elem.name().as_ref() == b"svg" => Event::Empty(self.rewrite(&elem)?),
                other => other,
            };
            writer.write_event(event).map_err(|e| e.to_string())?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
    }

    fn rewrite(&self, elem: &BytesStart<'_>) -> Result<BytesStart<'static>, String> {
        let mut attrs: Attrs = attrs_of(elem)?
            .into_iter()
            .filter(|(key, _)| key != "width" && key != "height" && !(self.hide && key == "style"))
            .collect();
        if self.hide {
            attrs.push(("style".to_string(), "display: none".to_string()));
        }
        Ok(build_start(&element_name(elem), &attrs))
    }
}

impl Transform for StripDimensions {
    fn name(&self) -> &'static str {
        STRIP
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                let out = self
                    .strip(file.text(STRIP)?)
                    .map_err(|msg| TransformError::rejected(STRIP, &file.source, msg))?;
                file.contents = out.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors_are_sorted_for_lookup() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(named_color("red"), Some("#ff0000"));
    }

    #[test]
    fn colors_are_normalised() {
        assert_eq!(normalize_color("Red"), "#f00");
        assert_eq!(normalize_color("rgb(255, 255, 255)"), "#fff");
        assert_eq!(normalize_color("rgb(100%,0%,0%)"), "#f00");
        assert_eq!(normalize_color("#AABBCC"), "#abc");
        assert_eq!(normalize_color("#123456"), "#123456");
        assert_eq!(normalize_color("none"), "none");
        assert_eq!(normalize_color("url(#grad)"), "url(#grad)");
    }

    #[test]
    fn numbers_are_rounded() {
        assert_eq!(round_numbers("0 0 24.000 24.456", 2), "0 0 24 24.46");
        assert_eq!(round_numbers("0.5", 2), ".5");
        assert_eq!(round_numbers("-0.001", 2), "0");
        assert_eq!(round_numbers("10px", 2), "10");
    }

    #[test]
    fn short_ids_are_bijective_base_52() {
        assert_eq!(short_id(0), "a");
        assert_eq!(short_id(51), "Z");
        assert_eq!(short_id(52), "aa");
        assert_eq!(short_id(53), "ab");
    }

    #[test]
    fn optimize_cleans_document() {
        let src = r##"<?xml version="1.0"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<!-- made by hand -->
<svg xmlns="http://www.w3.org/2000/svg" width="24.0" height="24" viewBox="0 0 24.333 24">
  <defs><linearGradient id="gradient-main"><stop stop-color="white"/></linearGradient></defs>
  <g id="unused"><rect x="1.005" fill="url(#gradient-main)" stroke="rgb(0,0,0)"/></g>
</svg>"##;
        let out = OptimizeSvg::new(2).optimize(src).unwrap();
        assert!(!out.contains("DOCTYPE"));
        assert!(!out.contains("made by hand"));
        assert!(!out.contains("<?xml"));
        assert!(out.contains(r#"viewBox="0 0 24.33 24""#));
        assert!(out.contains(r#"<linearGradient id="a">"#));
        assert!(out.contains(r#"fill="url(#a)""#));
        assert!(out.contains(r##"stop-color="#fff""##));
        assert!(out.contains(r##"stroke="#000""##));
        assert!(!out.contains("unused"));
        assert!(out.contains(r#"x="1""#));
    }

    #[test]
    fn optimize_is_idempotent() {
        let once = OptimizeSvg::new(2)
            .optimize(r##"<svg viewBox="0 0 10.123 10"><path id="p" d="M0 0h10"/><use href="#p"/></svg>"##)
            .unwrap();
        let twice = OptimizeSvg::new(2).optimize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn malformed_svg_is_rejected() {
        assert!(OptimizeSvg::new(2).optimize("<svg><g></svg>").is_err());
    }

    #[test]
    fn strip_dimensions_and_hide() {
        let src = r#"<svg width="10" height="20" viewBox="0 0 10 20" style="x"><svg width="1"/></svg>"#;
        let out = StripDimensions::new(false).strip(src).unwrap();
        assert_eq!(out, r#"<svg viewBox="0 0 10 20" style="x"><svg/></svg>"#);

        let out = StripDimensions::new(true).strip(src).unwrap();
        assert_eq!(
            out,
            r#"<svg viewBox="0 0 10 20" style="display: none"><svg style="display: none"/></svg>"#
        );
    }
}
