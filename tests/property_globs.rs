// tests/property_globs.rs

use proptest::prelude::*;

use sitepipe::paths::{glob_base, GlobPattern, PathsSection, PathTable};
use sitepipe::types::AssetCategory;

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn dirs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 0..4)
}

proptest! {
    #[test]
    fn negated_subtree_is_never_selected(sub in dirs(), name in segment()) {
        let pattern = GlobPattern::new(["src/img/**/*.*", "!src/img/svg/**/*.*"]).unwrap();
        let mut parts = vec!["src".to_string(), "img".to_string(), "svg".to_string()];
        parts.extend(sub);
        parts.push(format!("{name}.svg"));

        prop_assert!(!pattern.matches(&parts.join("/")));
    }

    #[test]
    fn files_outside_the_negated_subtree_are_selected(sub in dirs(), name in segment()) {
        prop_assume!(sub.first().map(String::as_str) != Some("svg"));
        let pattern = GlobPattern::new(["src/img/**/*.*", "!src/img/svg/**/*.*"]).unwrap();
        let mut parts = vec!["src".to_string(), "img".to_string()];
        parts.extend(sub);
        parts.push(format!("{name}.png"));

        prop_assert!(pattern.matches(&parts.join("/")));
    }

    #[test]
    fn glob_base_is_a_literal_prefix(prefix in dirs(), name in segment()) {
        let literal = prefix.join("/");
        let pattern = if literal.is_empty() {
            format!("**/{name}.*")
        } else {
            format!("{literal}/**/{name}.*")
        };

        prop_assert_eq!(glob_base(&pattern).to_string_lossy().replace('\\', "/"), literal);
    }

    #[test]
    fn each_source_file_belongs_to_at_most_one_buildable_category(sub in dirs(), name in segment()) {
        let table = PathTable::from_section(&PathsSection::default()).unwrap();
        for area in ["img", "img/svg", "img/svg/sprite", "js", "fonts"] {
            let mut parts = vec![format!("src/assets/{area}")];
            parts.extend(sub.clone());
            parts.push(format!("{name}.svg"));
            let path = parts.join("/");

            let owners = [
                AssetCategory::Images,
                AssetCategory::VectorGraphics,
                AssetCategory::VectorSprite,
                AssetCategory::Scripts,
                AssetCategory::Fonts,
            ]
            .into_iter()
            .filter(|c| table.source_globs(*c).matches(&path))
            .count();
            prop_assert!(owners <= 1, "{} selected by {} categories", path, owners);
        }
    }
}
