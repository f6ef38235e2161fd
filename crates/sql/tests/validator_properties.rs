use proptest::prelude::*;
use sluice_sql::{CommentMode, Rejection, SqlValidator, ValidatorConfig};

const SAMPLE_BLOCKED: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "TRUNCATE", "ALTER", "GRANT", "EXEC", "MERGE",
];

fn mixed_case(word: &str, mask: &[bool]) -> String {
    word.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

fn whitespace() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec![" ", "\t", "\n", "\r\n"]), 1..4)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn blocked_keywords_rejected_in_any_case(
        keyword in prop::sample::select(SAMPLE_BLOCKED.to_vec()),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        lead in whitespace(),
        gap in whitespace(),
    ) {
        let sql = format!("{}{}{}TABLE users", lead, mixed_case(keyword, &mask), gap);
        let validator = SqlValidator::default();
        prop_assert_eq!(
            validator.validate(&sql),
            Err(Rejection::BlockedKeyword(keyword.to_string()))
        );
    }

    #[test]
    fn plain_selects_are_accepted(
        column in "c_[a-z0-9_]{0,10}",
        table in "t_[a-z0-9_]{0,10}",
        value in 0u32..100_000,
        gap in whitespace(),
    ) {
        let sql = format!("SELECT {column}{gap}FROM {table} WHERE {column} = {value} LIMIT 10");
        let validator = SqlValidator::default();
        prop_assert_eq!(validator.validate(&sql), Ok(()));
        prop_assert!(validator.is_read_only(&sql));
    }

    #[test]
    fn verdict_ignores_case_and_whitespace(sql in "[ -~]{0,80}") {
        let validator = SqlValidator::default();
        let verdict = validator.validate(&sql);
        prop_assert_eq!(&verdict, &validator.validate(&sql.to_ascii_lowercase()));
        prop_assert_eq!(&verdict, &validator.validate(&sql.replace(' ', " \n\t")));
    }

    #[test]
    fn arbitrary_input_never_panics(sql in "\\PC{0,120}") {
        let validator = SqlValidator::new(ValidatorConfig {
            comment_mode: CommentMode::Loose,
            extra_blocked_keywords: vec!["copy to".to_string()],
        });
        let _ = validator.validate(&sql);
        let _ = validator.ensure_read_only(&sql);
    }

    #[test]
    fn loose_mode_never_rejects_more_than_strict(sql in "[ -~]{0,80}") {
        let validator = SqlValidator::default();
        if validator.validate_with_mode(&sql, CommentMode::Strict).is_ok() {
            prop_assert!(validator.validate_with_mode(&sql, CommentMode::Loose).is_ok());
        }
    }
}
