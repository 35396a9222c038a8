// Property-based tests for backup naming and the retention window.

#[cfg(test)]
mod tests {
    use crate::retention::{RetentionWindow, backup_name, keep, parse_backup_date};
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        // 2000-01-01 .. roughly 2080
        (0u64..30_000).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2000, 1, 1)
                .unwrap()
                .checked_add_days(Days::new(offset))
                .unwrap()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A backup name parses back to the date it was made from, with or
        /// without the listing delimiter.
        #[test]
        fn prop_backup_name_round_trip(date in arb_date()) {
            let name = backup_name(date);
            prop_assert_eq!(parse_backup_date(&name), Some(date));
            prop_assert_eq!(parse_backup_date(&format!("{name}/")), Some(date));
        }

        /// Prefixes that don't start with the backup marker are never dates.
        #[test]
        fn prop_foreign_prefixes_are_ignored(prefix in "[a-z]{1,12}/?") {
            prop_assume!(!prefix.starts_with("backup"));
            prop_assert_eq!(parse_backup_date(&prefix), None);
        }

        /// keep(D, today, N) holds exactly when today - N <= D <= today.
        #[test]
        fn prop_keep_matches_day_difference(
            today in arb_date(),
            age in -30i64..400,
            num_days_kept in 0u32..365,
        ) {
            let date = if age >= 0 {
                today.checked_sub_days(Days::new(age as u64)).unwrap()
            } else {
                today.checked_add_days(Days::new((-age) as u64)).unwrap()
            };

            let expected = age >= 0 && age <= num_days_kept as i64;
            prop_assert_eq!(keep(date, today, num_days_kept), expected);
        }

        /// The window holds N + 1 consecutive days ending today.
        #[test]
        fn prop_window_size(today in arb_date(), num_days_kept in 0u32..100) {
            let window = RetentionWindow::new(today, num_days_kept);
            let kept = (0..=(num_days_kept as u64 + 5))
                .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
                .filter(|date| window.contains(*date))
                .count();

            prop_assert_eq!(kept, num_days_kept as usize + 1);
            prop_assert_eq!(
                window.lower_bound(),
                today.checked_sub_days(Days::new(num_days_kept as u64)).unwrap()
            );
        }
    }
}
