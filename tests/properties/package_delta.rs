//! Property tests for package delta computation.

use proptest::prelude::*;

use robodeploy::domain::entities::{PackageManifest, BOOTSTRAP_PACKAGE};
use robodeploy::domain::services::compute_delta;

fn package_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("pip".to_string()),
        Just("robotpy".to_string()),
        Just("numpy".to_string()),
        Just("Robotpy_Commands2".to_string()),
        proptest::string::string_regex("[a-z][a-z0-9_.-]{0,10}").unwrap(),
    ]
}

fn version() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        proptest::string::string_regex("[0-9]{1,2}\\.[0-9]{1,2}(\\.[0-9])?").unwrap(),
    ]
}

fn manifest() -> impl Strategy<Value = PackageManifest> {
    proptest::collection::vec((package_name(), version()), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: applying a delta leaves nothing to do.
    #[test]
    fn property_delta_is_idempotent(local in manifest(), remote in manifest()) {
        let delta = compute_delta(&local, &remote);
        let after = remote.apply(&delta);
        let again = compute_delta(&local, &after);
        prop_assert!(again.is_empty(), "second delta not empty: {:?}", again);
    }

    /// PROPERTY: the bootstrap package is never uninstalled.
    #[test]
    fn property_bootstrap_never_uninstalled(local in manifest(), remote in manifest()) {
        let delta = compute_delta(&local, &remote);
        prop_assert!(!delta.to_uninstall.contains(BOOTSTRAP_PACKAGE));
    }

    /// PROPERTY: every declared package is present after the delta is applied.
    #[test]
    fn property_declared_packages_present(local in manifest(), remote in manifest()) {
        let after = remote.apply(&compute_delta(&local, &remote));
        for (name, _) in local.iter() {
            prop_assert!(after.contains(name), "{} missing after apply", name);
        }
    }
}
