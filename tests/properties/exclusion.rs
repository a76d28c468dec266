//! Property tests for snapshot exclusion.

use std::fs;
use std::path::PathBuf;

use proptest::prelude::*;
use tempfile::tempdir;

use robodeploy::domain::ports::ProjectStager;
use robodeploy::domain::value_objects::ExclusionRuleSet;
use robodeploy::infrastructure::FileStager;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(".git".to_string()),
        Just("__pycache__".to_string()),
        Just("venv".to_string()),
        Just("ctre_sim".to_string()),
        Just(".hidden".to_string()),
        proptest::string::string_regex("[a-z][a-z0-9_-]{0,8}(\\.(py|json|pyc|whl|zip|txt))?")
            .unwrap(),
    ]
}

fn relative_path() -> impl Strategy<Value = PathBuf> {
    proptest::collection::vec(segment(), 1..=4)
        .prop_map(|segments| segments.iter().collect::<PathBuf>())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a file is staged iff no exclusion rule matches its path.
    #[test]
    fn property_staged_iff_not_excluded(rel in relative_path()) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(&rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();

        let snapshot = FileStager::new().without_ignore_file().stage(dir.path()).unwrap();
        let staged = snapshot.find(&rel).is_some();
        let excluded = ExclusionRuleSet::new().excludes_path(&rel).is_some();

        prop_assert_eq!(staged, !excluded, "path {:?}", rel);
        prop_assert!(snapshot.len() <= 1);
    }
}
