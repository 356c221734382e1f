// src/transform/include.rs

use std::path::{Path, PathBuf};

use crate::transform::{normalize_path, AssetFile, Transform, TransformContext, TransformError};

const STAGE: &str = "resolve-includes";
const DIRECTIVE: &str = "//=";

/// Replace `//= path` lines with the content of the named file.
///
/// Paths are relative to the including file. Included files are expanded
/// recursively and keep the indentation of the directive line.
#[derive(Debug, Clone, Default)]
pub struct ResolveIncludes;

impl Transform for ResolveIncludes {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(
        &self,
        files: Vec<AssetFile>,
        ctx: &TransformContext<'_>,
    ) -> Result<Vec<AssetFile>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                let text = file.text(STAGE)?;
                let mut stack = vec![normalize_path(&file.source)];
                let expanded = expand(ctx, &file.source, text, &mut stack)?;
                file.contents = expanded.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

fn expand(
    ctx: &TransformContext<'_>,
    path: &Path,
    text: &str,
    stack: &mut Vec<PathBuf>,
) -> Result<String, TransformError> {
    let dir = path.parent().unwrap_or(Path::new(""));
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let indent_len = body.len() - body.trim_start().len();
        let Some(target) = body.trim_start().strip_prefix(DIRECTIVE) else {
            out.push_str(line);
            continue;
        };
        let target = target.trim();
        if target.is_empty() {
            return Err(TransformError::rejected(STAGE, path, "empty include directive"));
        }

        let include = normalize_path(&dir.join(target));
        if stack.contains(&include) {
            return Err(TransformError::rejected(
                STAGE,
                path,
                format!("include cycle through {}", include.display()),
            ));
        }
        if !ctx.fs.is_file(&include) {
            return Err(TransformError::rejected(
                STAGE,
                path,
                format!("included file not found: {}", include.display()),
            ));
        }

        let content = ctx
            .fs
            .read_to_string(&include)
            .map_err(|e| TransformError::io(STAGE, &include, e))?;

        stack.push(include.clone());
        let nested = expand(ctx, &include, &content, stack)?;
        stack.pop();

        let indent = &body[..indent_len];
        for nested_line in nested.split_inclusive('\n') {
            out.push_str(indent);
            out.push_str(nested_line);
        }
        if line.ends_with('\n') && !nested.ends_with('\n') {
            out.push('\n');
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn run(fs: &MockFileSystem, path: &str) -> Result<String, TransformError> {
        let ctx = TransformContext { fs };
        let contents = fs.snapshot()[Path::new(path)].clone();
        let out = ResolveIncludes.apply(vec![AssetFile::new(path, "index.html", contents)], &ctx)?;
        Ok(String::from_utf8(out[0].contents.clone()).unwrap())
    }

    #[test]
    fn inlines_nested_includes_with_indentation() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "src/sites/index.html",
            "<body>\n    //= ../templates/header.html\n</body>\n",
        );
        fs.add_file("src/templates/header.html", "<header>\n//= nav.html\n</header>\n");
        fs.add_file("src/templates/nav.html", "<nav></nav>");

        let out = run(&fs, "src/sites/index.html").unwrap();
        assert_eq!(
            out,
            "<body>\n    <header>\n    <nav></nav>\n    </header>\n</body>\n"
        );
    }

    #[test]
    fn missing_include_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("src/js/main.js", "//= parts/missing.js\n");
        let err = run(&fs, "src/js/main.js").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn include_cycle_is_rejected() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.js", "//= b.js\n");
        fs.add_file("src/b.js", "//= a.js\n");
        let err = run(&fs, "src/a.js").unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
