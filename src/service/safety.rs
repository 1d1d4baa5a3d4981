use regex::Regex;
use std::sync::LazyLock;

/// Decides whether a generated statement may reach a live connection.
pub trait SqlGate: Send + Sync {
    fn is_safe(&self, sql: &str) -> bool;
}

static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(DELETE|UPDATE|DROP|TRUNCATE|ALTER|CREATE|REPLACE|GRANT|REVOKE)\b")
        .expect("denylist pattern must compile")
});

/// Keyword denylist plus a single-statement check.
///
/// This does not parse SQL. Keywords hidden in comments or split by
/// obfuscation, procedures that mutate when called, and dialect-specific
/// write syntax outside the word list all pass. A `;` inside a string
/// literal counts as a statement separator.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenylistGate;

impl SqlGate for DenylistGate {
    fn is_safe(&self, sql: &str) -> bool {
        if DENYLIST.is_match(sql) {
            return false;
        }
        let body = sql.trim_end();
        let body = body.strip_suffix(';').unwrap_or(body);
        body.split(';').filter(|s| !s.trim().is_empty()).count() <= 1
    }
}

/// Check `sql` with the default gate.
pub fn is_safe(sql: &str) -> bool {
    DenylistGate.is_safe(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_passes() {
        assert!(is_safe("SELECT * FROM users"));
        assert!(is_safe("select id, name from t where id = 3"));
    }

    #[test]
    fn denylisted_words_are_rejected_in_any_case() {
        for sql in [
            "DELETE FROM t",
            "update t set a = 1",
            "Drop table t",
            "TRUNCATE t",
            "alter table t add column c int",
            "CREATE TABLE x (a int)",
            "replace into t values (1)",
            "GRANT ALL ON t TO bob",
            "revoke all on t from bob",
            "SELECT * FROM t WHERE note = 'please delete me'",
        ] {
            assert!(!is_safe(sql), "{sql} should be rejected");
        }
    }

    #[test]
    fn stacked_statement_with_keyword_is_rejected() {
        assert!(!is_safe("select * from t; DROP TABLE t"));
    }

    #[test]
    fn keywords_inside_identifiers_pass() {
        assert!(is_safe("SELECT * FROM users WHERE name='DROPper'"));
        assert!(is_safe("SELECT created_at, updated_by FROM audit"));
        assert!(is_safe("SELECT deleted FROM t"));
    }

    #[test]
    fn multiple_statements_are_rejected() {
        assert!(!is_safe("SELECT 1; SELECT 2"));
        assert!(!is_safe("SELECT 1; SELECT 2;"));
        assert!(!is_safe("SELECT 1;;SELECT 2"));
    }

    #[test]
    fn trailing_separators_are_allowed() {
        assert!(is_safe("SELECT 1;"));
        assert!(is_safe("SELECT 1;  \n"));
        assert!(is_safe("SELECT 1;;"));
        assert!(is_safe("SELECT 1 AS demo;"));
    }

    #[test]
    fn gate_is_usable_as_trait_object() {
        let gate: Box<dyn SqlGate> = Box::new(DenylistGate);
        assert!(gate.is_safe("SELECT 1"));
        assert!(!gate.is_safe("DROP TABLE t"));
    }
}
