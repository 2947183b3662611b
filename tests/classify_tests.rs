#[cfg(test)]
mod tests {
    use pybundle::packages::{ALWAYS_UNWANTED, classify, eligible_pins};
    use pybundle::pep503::Requirement;

    fn frozen() -> Vec<Requirement> {
        [
            "myapp @ file:///C:/dev/myapp",
            "requests==2.31.0",
            "charset_normalizer==3.3.2",
            "idna==3.6",
            "pywin32==306",
            "extra-dep==2.0.0",
            "pip==24.0",
            "setuptools==69.0.3",
        ]
        .iter()
        .map(|line| Requirement::parse(line))
        .collect()
    }

    fn base_unwanted() -> Vec<String> {
        ALWAYS_UNWANTED.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn wheels_first_classification_end_to_end() {
        let unwanted = base_unwanted();
        let skip = vec!["pywin32".to_string()];

        let eligible = eligible_pins(&frozen(), &unwanted, &skip);
        assert_eq!(
            eligible.iter().map(|r| r.name()).collect::<Vec<_>>(),
            vec!["requests", "charset-normalizer", "idna", "extra-dep"]
        );

        // pip download produced wheels for all eligible pins except idna
        let wheel_files = vec![
            "requests-2.31.0-py3-none-any.whl".to_string(),
            "charset_normalizer-3.3.2-cp311-cp311-win_amd64.whl".to_string(),
            "extra_dep-2.0.0-py3-none-any.whl".to_string(),
        ];
        let result = classify(
            &frozen(),
            &unwanted,
            &skip,
            &wheel_files,
            &["Extra.Dep".to_string(), "bundled-tool".to_string()],
            true,
        );

        assert_eq!(
            result.pypi_wheels,
            vec![
                "requests==2.31.0",
                "charset_normalizer==3.3.2",
                "extra-dep==2.0.0"
            ]
        );
        // The editable install is vendored, not dropped; the extra whose
        // pin was confirmed as a wheel is not listed twice.
        assert_eq!(
            result.source_packages,
            vec!["myapp", "idna", "pywin32", "bundled-tool"]
        );
        assert_eq!(result.missing_wheels, vec!["idna==3.6"]);
        assert_eq!(result.direct_references, vec!["myapp @ file:///C:/dev/myapp"]);
    }

    #[test]
    fn source_mode_vendors_the_whole_closure() {
        let result = classify(&frozen(), &base_unwanted(), &[], &[], &[], false);
        assert!(result.pypi_wheels.is_empty());
        assert!(result.missing_wheels.is_empty());
        assert_eq!(
            result.source_packages,
            vec![
                "myapp",
                "requests",
                "charset-normalizer",
                "idna",
                "pywin32",
                "extra-dep"
            ]
        );
    }

    #[test]
    fn build_tooling_never_reaches_the_installer() {
        let result = classify(&frozen(), &base_unwanted(), &[], &[], &[], false);
        for tool in ALWAYS_UNWANTED {
            assert!(
                !result.source_packages.iter().any(|p| p == tool),
                "{tool} leaked into the installer"
            );
        }
    }
}
