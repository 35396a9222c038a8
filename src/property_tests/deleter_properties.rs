// Property-based tests for prefix deletion.
//
// Whatever the number of objects and the page size, the coordinator needs
// ceil(objects / page) round trips, removes everything under the prefix and
// nothing outside it.

#[cfg(test)]
mod tests {
    use crate::deleter::PrefixDeleter;
    use crate::test_utils::MockStorage;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_round_trips_and_isolation(
            object_count in 0usize..3000,
            page_size in 50i32..=1000,
            other_count in 0usize..20,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let mock = MockStorage::new("b");
            let keys: Vec<String> = (0..object_count)
                .map(|i| format!("backup-10-Jan-2024/f-{i:05}"))
                .chain((0..other_count).map(|i| format!("backup-11-Jan-2024/f-{i:05}")))
                .collect();
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            mock.insert_objects(&refs);

            let deleter = PrefixDeleter::new(Box::new(mock.clone()), page_size);
            let stats = runtime
                .block_on(deleter.delete_prefix("backup-10-Jan-2024/"))
                .unwrap();

            let expected_round_trips = object_count.div_ceil(page_size as usize) as u64;
            prop_assert_eq!(stats.round_trips, expected_round_trips);
            prop_assert_eq!(stats.deleted_objects, object_count as u64);
            prop_assert_eq!(mock.delete_calls() as u64, expected_round_trips);
            prop_assert_eq!(mock.keys().len(), other_count);
            prop_assert!(mock.keys().iter().all(|k| k.starts_with("backup-11-Jan-2024/")));
        }
    }
}
