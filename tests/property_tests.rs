//! Property-based tests for rendering, annotations and migration.

use koza_refactor::prelude::{AnnotationBlock, KozaMigration, SyntaxTree};
use proptest::prelude::*;

// Identifiers that can never collide with Python keywords or the legacy API names
fn local_name() -> impl Strategy<Value = String> {
    "v_[a-z]{1,6}"
}

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

// Comment text without any label prefix
fn comment_text() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..4).prop_map(|words| words.join(" "))
}

fn comment_line() -> impl Strategy<Value = String> {
    (0..4usize, comment_text()).prop_map(|(label, text)| match label {
        0 => format!("# type: {text}"),
        1 => format!("# source: {text}"),
        2 => format!("# note: {text}"),
        _ => format!("# {text}"),
    })
}

// A legacy transform with one lookup map and a row loop
fn legacy_transform() -> impl Strategy<Value = (String, String, String, String)> {
    (local_name(), word(), word(), word()).prop_map(|(alias, ingest, map, key)| {
        let source = format!(
            "from koza.cli_utils import get_koza_app\n\
             \n\
             koza_app = get_koza_app(\"{ingest}\")\n\
             {alias} = koza_app.get_map(\"{map}\")\n\
             \n\
             while (row := koza_app.get_row()) is not None:\n\
             \x20   x = {alias}[row[\"{key}\"]]\n\
             \x20   y = {alias}.get(\"{key}\")\n\
             \x20   koza_app.write(x, y)\n"
        );
        (source, alias, map, key)
    })
}

proptest! {
    /// Property: an unedited tree renders back to its source
    #[test]
    fn prop_unedited_render_is_lossless(names in prop::collection::vec(local_name(), 1..6)) {
        let source = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("# {name}\n{name} = row[\"{i}\"]  # trailing\n"))
            .collect::<String>();
        let tree = SyntaxTree::parse(&source, "transform.py").unwrap();
        prop_assert_eq!(tree.render(), source);
    }

    /// Property: regrouping the rendered annotation lines yields the same block
    #[test]
    fn prop_annotation_regrouping_is_stable(lines in prop::collection::vec(comment_line(), 0..8)) {
        let block = AnnotationBlock::from_comment_lines(&lines);
        let regrouped = AnnotationBlock::from_comment_lines(&block.to_comment_lines());
        prop_assert_eq!(regrouped, block);
    }

    /// Property: unlabelled lines before the first label never contribute
    #[test]
    fn prop_unlabelled_prefix_is_dropped(
        prefix in prop::collection::vec(comment_text(), 0..4),
        lines in prop::collection::vec(comment_line(), 0..6),
    ) {
        let mut all: Vec<String> = prefix.iter().map(|text| format!("# {text}")).collect();
        all.extend(lines.iter().cloned());
        prop_assert_eq!(
            AnnotationBlock::from_comment_lines(&all),
            AnnotationBlock::from_comment_lines(&lines)
        );
    }

    /// Property: migration leaves no legacy API behind
    #[test]
    fn prop_migration_removes_legacy_api((source, alias, map, key) in legacy_transform()) {
        let migrated = KozaMigration::default().migrate_source(&source).unwrap();
        let expected = format!(
            "\ndef transform_record(koza: Koza, record: dict[str, Any]):\n\
             \x20   x = koza.lookup(record[\"{key}\"], \"{map}\")\n\
             \x20   y = koza.lookup(\"{key}\", \"{map}\")\n\
             \x20   koza.write(x, y)\n"
        );
        prop_assert_eq!(&migrated, &expected);
        prop_assert!(!migrated.contains("koza_app"));
        prop_assert!(!migrated.contains(&alias));
    }

    /// Property: migrating a migrated transform changes nothing
    #[test]
    fn prop_migration_is_idempotent((source, _, _, _) in legacy_transform()) {
        let migration = KozaMigration::default();
        let once = migration.migrate_source(&source).unwrap();
        let twice = migration.migrate_source(&once).unwrap();
        prop_assert_eq!(twice, once);
    }
}
