// src/transform/script.rs

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::transform::{AssetFile, Transform, TransformContext, TransformError};

const STAGE: &str = "minify-script";

/// Minify and mangle JavaScript with `oxc`. A file that fails to parse
/// rejects the whole run.
#[derive(Debug, Clone, Default)]
pub struct MinifyScript;

/// Minify one script. Browser scripts are parsed as classic scripts, so
/// top-level names stay global and untouched.
pub fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(first) = ret.errors.first() {
        let more = ret.errors.len() - 1;
        return Err(if more > 0 {
            format!("{first} (and {more} more)")
        } else {
            first.to_string()
        });
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

impl Transform for MinifyScript {
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
                let code = minify_js(file.text(STAGE)?)
                    .map_err(|msg| TransformError::rejected(STAGE, &file.source, msg))?;
                file.contents = code.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn minifies_and_is_deterministic() {
        let src = "function greet(name) {\n  // say hi\n  var message = 'hi ' + name;\n  return message;\n}\n";
        let a = minify_js(src).unwrap();
        let b = minify_js(src).unwrap();
        assert_eq!(a, b);
        assert!(a.len() < src.len());
        assert!(!a.contains("say hi"));
        assert!(a.contains("greet"));
    }

    #[test]
    fn top_level_globals_keep_their_names() {
        let src = "function openMenu(el) { el.classList.toggle('open'); }\nvar siteConfig = { speed: 300 };\n";
        let out = minify_js(src).unwrap();
        assert!(out.contains("openMenu"), "{out}");
        assert!(out.contains("siteConfig"), "{out}");
    }

    #[test]
    fn locals_are_still_mangled() {
        let src = "function total(items) { var runningTotal = 0; for (var i = 0; i < items.length; i++) { runningTotal += items[i]; } return runningTotal; }\n";
        let out = minify_js(src).unwrap();
        assert!(out.contains("total"));
        assert!(!out.contains("runningTotal"), "{out}");
    }

    #[test]
    fn parse_error_rejects_file() {
        let fs = MockFileSystem::new();
        let ctx = TransformContext { fs: &fs };
        let file = AssetFile::new("src/js/main.js", "main.js", b"function ( {".to_vec());
        let err = MinifyScript.apply(vec![file], &ctx).unwrap_err();
        assert!(matches!(err, TransformError::Rejected { stage: "minify-script", .. }));
    }
}
