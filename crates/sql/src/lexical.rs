//! Keyword-level helpers shared by the validator, classifier and analyzer.
//!
//! None of this is a SQL grammar. Text is normalized and split into word tokens; keyword
//! checks compare whole tokens so `DROPPED_AT` never matches `DROP`.

/// Uppercase, collapse whitespace runs to single spaces, trim.
pub fn normalize(sql: &str) -> String {
    collapse_whitespace(&sql.to_uppercase())
}

/// Collapse whitespace runs and trim, keeping case. Used for cache keys and query ids so
/// that string literals stay distinct.
pub fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Word tokens of `text`, split on anything that cannot be part of an identifier.
pub fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Index of the first occurrence of `phrase` (a sequence of words) in `tokens`.
pub fn find_phrase(tokens: &[&str], phrase: &[&str]) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return None;
    }
    tokens
        .windows(phrase.len())
        .position(|window| window.iter().zip(phrase).all(|(a, b)| a == b))
}

/// Whole-word, case-insensitive containment of a keyword or multi-word phrase.
pub fn contains_keyword(sql: &str, keyword: &str) -> bool {
    count_keyword(sql, keyword) > 0
}

/// Non-overlapping whole-word occurrences of a keyword or phrase, case-insensitive.
pub fn count_keyword(sql: &str, keyword: &str) -> usize {
    let upper = sql.to_uppercase();
    let tokens = words(&upper);
    let keyword = keyword.to_uppercase();
    let phrase = words(&keyword);
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return 0;
    }

    let mut count = 0;
    let mut i = 0;
    while i + phrase.len() <= tokens.len() {
        if tokens[i..i + phrase.len()] == phrase[..] {
            count += 1;
            i += phrase.len();
        } else {
            i += 1;
        }
    }
    count
}

/// Append `LIMIT n` unless the statement already mentions LIMIT anywhere.
///
/// The check is a case-insensitive substring match, so a column named `limit_value`
/// also suppresses the rewrite. A trailing semicolon is dropped before appending.
pub fn with_limit(sql: &str, limit: u64) -> String {
    if sql.to_uppercase().contains("LIMIT") {
        return sql.to_string();
    }
    let body = sql.trim_end().trim_end_matches(';').trim_end();
    format!("{} LIMIT {}", body, limit)
}

/// Strip identifier quoting and trailing punctuation from a FROM/JOIN target.
pub fn clean_identifier(token: &str) -> String {
    token
        .trim_end_matches([',', ';', ')'])
        .chars()
        .filter(|c| !matches!(c, '"' | '`' | '[' | ']'))
        .collect()
}

/// Net parenthesis depth change of `token`.
pub fn paren_delta(token: &str) -> i32 {
    token.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("  select *\n\tfrom   users  "),
            "SELECT * FROM USERS"
        );
        assert_eq!(collapse_whitespace(" a \n b "), "a b");
    }

    #[test]
    fn test_words_split_on_punctuation() {
        assert_eq!(
            words("SELECT A.B,COUNT(*) FROM T;DROP"),
            vec!["SELECT", "A", "B", "COUNT", "FROM", "T", "DROP"]
        );
    }

    #[test]
    fn test_count_keyword_whole_words() {
        assert_eq!(count_keyword("select a from t join u on x join v on y", "join"), 2);
        assert_eq!(count_keyword("select dropped_at from t", "drop"), 0);
        assert_eq!(count_keyword("SELECT a FROM t GROUP  BY a", "group by"), 1);
        assert!(!contains_keyword("SELECT grouping FROM t", "group by"));
    }

    #[test]
    fn test_with_limit() {
        assert_eq!(
            with_limit("SELECT * FROM orders", 50),
            "SELECT * FROM orders LIMIT 50"
        );
        assert_eq!(
            with_limit("SELECT * FROM orders LIMIT 10", 50),
            "SELECT * FROM orders LIMIT 10"
        );
        assert_eq!(
            with_limit("select * from orders limit 10", 50),
            "select * from orders limit 10"
        );
        assert_eq!(
            with_limit("SELECT * FROM orders;  ", 5),
            "SELECT * FROM orders LIMIT 5"
        );
    }

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier("\"users\","), "users");
        assert_eq!(clean_identifier("`shop`.`orders`);"), "shop.orders");
    }
}
