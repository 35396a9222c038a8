// Property-based tests for transfer output parsing.
//
// The parser must never fail, must report the last occurrence of a repeated
// metric, and must leave metrics it cannot find as `None`.

#[cfg(test)]
mod tests {
    use crate::parser::parse_transfer_output;
    use crate::report::{MISSING_METRIC_PLACEHOLDER, compose_report};
    use proptest::prelude::*;

    fn arb_unit() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("kB"), Just("MB"), Just("GB"), Just("TB")]
    }

    fn arb_decimal() -> impl Strategy<Value = String> {
        (0u32..100_000, 0u32..1000).prop_map(|(int, frac)| format!("{int}.{frac:03}"))
    }

    /// One summary block as older rclone releases print it.
    fn arb_summary_block() -> impl Strategy<Value = (String, String, u32, u32, u32, String)> {
        (
            arb_decimal(),
            arb_unit(),
            arb_decimal(),
            arb_unit(),
            0u32..1000,
            0u32..100_000,
            0u32..100_000,
            "[0-9]{1,2}m[0-9]{1,2}(\\.[0-9])?s",
        )
            .prop_map(|(size, size_unit, rate, rate_unit, errors, checks, objects, elapsed)| {
                let block = format!(
                    "Transferred:   {size} {size_unit}ytes ({rate} {rate_unit}ytes/s)\n\
                     Errors:        {errors}\n\
                     Checks:        {checks}\n\
                     Transferred:   {objects}\n\
                     Elapsed time:  {elapsed}\n"
                );
                (
                    block,
                    format!("{size} {size_unit}"),
                    errors,
                    checks,
                    objects,
                    format!("{rate} {rate_unit}/s"),
                )
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Arbitrary text never makes the parser panic.
        #[test]
        fn prop_parse_never_panics(output in ".{0,2000}") {
            let _ = parse_transfer_output(&output);
        }

        /// With several blocks, every metric comes from the last one.
        #[test]
        fn prop_last_block_wins(
            blocks in proptest::collection::vec(arb_summary_block(), 1..5),
        ) {
            let output: String = blocks.iter().map(|b| b.0.as_str()).collect();
            let (_, size, errors, checks, objects, rate) = blocks.last().unwrap().clone();

            let result = parse_transfer_output(&output);

            prop_assert_eq!(result.size, Some(size));
            prop_assert_eq!(result.avg_rate, Some(rate));
            prop_assert_eq!(result.errors, Some(errors.to_string()));
            prop_assert_eq!(result.checks, Some(checks.to_string()));
            prop_assert_eq!(result.num_objects, Some(objects.to_string()));
        }

        /// Lines without a metric label contribute nothing.
        #[test]
        fn prop_unlabelled_lines_yield_nothing(
            lines in proptest::collection::vec("[a-z ]{0,40}", 0..20),
        ) {
            let output = lines.join("\n");
            prop_assert!(parse_transfer_output(&output).is_empty());
        }

        /// Every missing metric is rendered with the placeholder.
        #[test]
        fn prop_report_placeholder_count(
            (block, _, _, _, _, _) in arb_summary_block(),
            keep_lines in proptest::collection::vec(proptest::bool::ANY, 5),
        ) {
            let output: String = block
                .lines()
                .zip(keep_lines.iter())
                .filter(|(_, keep)| **keep)
                .map(|(line, _)| format!("{line}\n"))
                .collect();

            let result = parse_transfer_output(&output);
            let missing = [
                &result.size,
                &result.avg_rate,
                &result.duration,
                &result.errors,
                &result.checks,
                &result.num_objects,
            ]
            .iter()
            .filter(|metric| metric.is_none())
            .count();

            let report = compose_report(&result);
            prop_assert_eq!(report.matches(MISSING_METRIC_PLACEHOLDER).count(), missing);
        }
    }
}
