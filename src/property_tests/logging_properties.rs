// Property-based tests for the logging and verbosity options.
//
// Verbosity flags map onto tracing levels around an Info default, and the
// JSON and color switches reach the tracing config unchanged whatever the
// verbosity. Every run error renders a non-empty message that carries its
// detail text.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::config::args::parse_from_args;
    use crate::types::error::S3BackupError;
    use proptest::prelude::*;

    const REQUIRED_ARGS: [&str; 7] = [
        "s3backup",
        "--bucket",
        "b",
        "--src-path",
        "gdrive:",
        "--dest-path",
        "s3:b",
    ];

    /// Verbosity flags and the level clap_verbosity_flag derives from them
    /// with an Info default.
    fn arb_verbosity_flags() -> impl Strategy<Value = (Vec<&'static str>, Option<log::Level>)> {
        prop_oneof![
            Just((vec!["-qqq"], None)),
            Just((vec!["-qq"], Some(log::Level::Error))),
            Just((vec!["-q"], Some(log::Level::Warn))),
            Just((vec![], Some(log::Level::Info))),
            Just((vec!["-v"], Some(log::Level::Debug))),
            Just((vec!["-vv"], Some(log::Level::Trace))),
        ]
    }

    fn arb_run_error() -> impl Strategy<Value = S3BackupError> {
        prop_oneof![
            ("[a-z ]{1,30}", proptest::option::of(1i32..255)).prop_map(|(message, exit_code)| {
                S3BackupError::SubprocessFailure { exit_code, message }
            }),
            "[a-z ]{1,30}".prop_map(S3BackupError::ListFailure),
            "[a-z ]{1,30}".prop_map(S3BackupError::PutFailure),
            "[a-z ]{1,30}".prop_map(S3BackupError::DeleteFailure),
            "[a-z ]{1,30}".prop_map(S3BackupError::Notification),
        ]
    }

    fn detail(error: &S3BackupError) -> &str {
        match error {
            S3BackupError::SubprocessFailure { message, .. } => message,
            S3BackupError::ListFailure(message)
            | S3BackupError::PutFailure(message)
            | S3BackupError::DeleteFailure(message)
            | S3BackupError::Notification(message)
            | S3BackupError::InvalidConfig(message) => message,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_verbosity_level_configuration(
            (flags, expected_level) in arb_verbosity_flags(),
        ) {
            let mut args: Vec<&str> = REQUIRED_ARGS.to_vec();
            args.extend(flags);

            let cli = parse_from_args(args).unwrap();
            let config = Config::try_from(cli).unwrap();

            match expected_level {
                None => prop_assert!(config.tracing_config.is_none()),
                Some(level) => {
                    let tracing_config = config.tracing_config.unwrap();
                    prop_assert_eq!(tracing_config.tracing_level, level);
                }
            }
        }

        #[test]
        fn prop_dry_run_does_not_change_verbosity(
            (flags, expected_level) in arb_verbosity_flags(),
        ) {
            let mut args: Vec<&str> = REQUIRED_ARGS.to_vec();
            args.push("--dry-run");
            args.extend(flags);

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

            prop_assert!(config.dry_run);
            prop_assert_eq!(
                config.tracing_config.map(|tracing_config| tracing_config.tracing_level),
                expected_level
            );
        }

        #[test]
        fn prop_tracing_switches_propagate(
            (flags, expected_level) in arb_verbosity_flags(),
            json_tracing in any::<bool>(),
            disable_color_tracing in any::<bool>(),
            span_events_tracing in any::<bool>(),
        ) {
            let mut args: Vec<&str> = REQUIRED_ARGS.to_vec();
            if json_tracing {
                args.push("--json-tracing");
            }
            if disable_color_tracing {
                args.push("--disable-color-tracing");
            }
            if span_events_tracing {
                args.push("--span-events-tracing");
            }
            args.extend(flags);

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

            match (config.tracing_config, expected_level) {
                (None, None) => {}
                (Some(tracing_config), Some(level)) => {
                    prop_assert_eq!(tracing_config.tracing_level, level);
                    prop_assert_eq!(tracing_config.json_tracing, json_tracing);
                    prop_assert_eq!(tracing_config.disable_color_tracing, disable_color_tracing);
                    prop_assert_eq!(tracing_config.span_events_tracing, span_events_tracing);
                    prop_assert!(!tracing_config.aws_sdk_tracing);
                }
                (actual, expected) => {
                    prop_assert!(false, "tracing config {:?} for expected level {:?}", actual, expected);
                }
            }
        }

        #[test]
        fn prop_run_error_message_carries_detail(error in arb_run_error()) {
            let rendered = error.to_string();

            prop_assert!(!rendered.is_empty());
            prop_assert!(rendered.contains(detail(&error)));
            prop_assert_eq!(error.exit_code(), 1);
        }
    }
}
