use proptest::prelude::*;
use sluice_runtime::TtlPolicy;

proptest! {
    #[test]
    fn aggregation_never_outlives_less_than_simple(
        table in "t_[a-z]{1,8}",
        column in "c_[a-z]{1,8}",
        hour in 0u32..24,
    ) {
        let policy = TtlPolicy::default();
        let simple = format!("SELECT {c} FROM {t} WHERE {c} = 1", c = column, t = table);
        let aggregation = format!("SELECT COUNT({}) FROM {}", column, table);
        prop_assert!(policy.ttl_at(&aggregation, hour) >= policy.ttl_at(&simple, hour));
    }

    #[test]
    fn off_hours_ttl_is_never_shorter(
        table in "t_[a-z]{1,8}",
        business in 9u32..18,
        off in prop_oneof![0u32..9, 18u32..24],
    ) {
        let policy = TtlPolicy::default();
        let sql = format!("SELECT * FROM {} ORDER BY 1", table);
        prop_assert!(policy.ttl_at(&sql, off) >= policy.ttl_at(&sql, business));
    }
}
