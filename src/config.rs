//! Configuration Module
//!
//! Per-method TTL tables. A table maps `path::Type::method` names to the time
//! a result of that method stays servable from cache.

use std::collections::HashMap;
use std::env::{self, VarError};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::MethodId;
use crate::error::{ConfigError, Result};

/// Environment variable holding a JSON TTL table.
pub const TTL_TABLE_ENV: &str = "MEMO_TTL_TABLE";

/// A single TTL as written in a JSON table.
///
/// Plain integers are seconds; `{ "millis": n }` gives milliseconds.
/// Negative values clamp to zero, which disables caching for the method.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TtlValue {
    Seconds(i64),
    Millis { millis: i64 },
}

impl TtlValue {
    fn into_duration(self) -> Duration {
        match self {
            TtlValue::Seconds(secs) => Duration::from_secs(secs.max(0) as u64),
            TtlValue::Millis { millis } => Duration::from_millis(millis.max(0) as u64),
        }
    }
}

// == TTL Table ==
/// Mapping from method to TTL, supplied when a service is decorated.
///
/// Keyed by `(owner, method)` so an owner path containing `::` never
/// collides with a method name that does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TtlTable {
    ttls: HashMap<(String, String), Duration>,
}

impl TtlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_ttl(mut self, method: MethodId, ttl: Duration) -> Self {
        self.insert(method, ttl);
        self
    }

    /// Sets the TTL for `method`, replacing any previous value.
    pub fn insert(&mut self, method: MethodId, ttl: Duration) {
        self.ttls.insert(table_key(method.owner(), method.name()), ttl);
    }

    /// Returns the configured TTL for `method`, if any.
    pub fn ttl_for(&self, method: &MethodId) -> Option<Duration> {
        self.ttls
            .get(&table_key(method.owner(), method.name()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.ttls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ttls.is_empty()
    }

    // == Loading ==
    /// Parses a JSON object such as `{"app::DataService::query_data": 2}`.
    ///
    /// The last `::` separates the method name from its owner path.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, TtlValue> = serde_json::from_str(json)?;

        let mut ttls = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let key = match split_method_name(&name) {
                Some((owner, method)) => table_key(owner, method),
                None => return Err(ConfigError::InvalidMethodName(name)),
            };
            ttls.insert(key, value.into_duration());
        }
        Ok(Self { ttls })
    }

    /// Loads the table from `MEMO_TTL_TABLE`.
    ///
    /// An unset variable yields an empty table.
    pub fn from_env() -> Result<Self> {
        Self::from_env_var(TTL_TABLE_ENV)
    }

    /// Loads the table from the named environment variable.
    ///
    /// Unset means empty; a value that is not valid Unicode is an error.
    pub fn from_env_var(var: &str) -> Result<Self> {
        match env::var(var) {
            Ok(json) => Self::from_json(&json),
            Err(VarError::NotPresent) => Ok(Self::new()),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
                var: var.to_string(),
            }),
        }
    }

    /// Overlays `other` on top of this table; entries in `other` win.
    pub fn merge(mut self, other: TtlTable) -> Self {
        self.ttls.extend(other.ttls);
        self
    }
}

fn table_key(owner: &str, method: &str) -> (String, String) {
    (owner.to_string(), method.to_string())
}

/// Splits `path::Type::method` into owner and method, rejecting empty segments.
fn split_method_name(name: &str) -> Option<(&str, &str)> {
    let (owner, method) = name.rsplit_once("::")?;
    let well_formed = !method.is_empty()
        && !method.contains(':')
        && owner.split("::").all(|seg| !seg.is_empty() && !seg.contains(':'));
    well_formed.then_some((owner, method))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: MethodId = MethodId::new("DataService", "query_data");

    #[test]
    fn test_table_default_is_empty() {
        let table = TtlTable::default();
        assert!(table.is_empty());
        assert_eq!(table.ttl_for(&QUERY), None);
    }

    #[test]
    fn test_with_ttl_and_lookup() {
        let table = TtlTable::new().with_ttl(QUERY, Duration::from_secs(2));

        assert_eq!(table.ttl_for(&QUERY), Some(Duration::from_secs(2)));
        assert_eq!(
            table.ttl_for(&MethodId::new("ReportService", "query_data")),
            None
        );
    }

    #[test]
    fn test_from_json_seconds_and_millis() {
        let table = TtlTable::from_json(
            r#"{"DataService::query_data": 2, "DataService::count": {"millis": 250}}"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.ttl_for(&QUERY), Some(Duration::from_secs(2)));
        assert_eq!(
            table.ttl_for(&MethodId::new("DataService", "count")),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_from_json_negative_clamps_to_zero() {
        let table = TtlTable::from_json(r#"{"DataService::query_data": -5}"#).unwrap();
        assert_eq!(table.ttl_for(&QUERY), Some(Duration::ZERO));
    }

    #[test]
    fn test_from_json_rejects_bad_method_name() {
        let result = TtlTable::from_json(r#"{"query_data": 2}"#);
        assert!(matches!(result, Err(ConfigError::InvalidMethodName(_))));

        let result = TtlTable::from_json(r#"{"a::::c": 2}"#);
        assert!(matches!(result, Err(ConfigError::InvalidMethodName(_))));

        let result = TtlTable::from_json(r#"{"Repo::": 2}"#);
        assert!(matches!(result, Err(ConfigError::InvalidMethodName(_))));
    }

    #[test]
    fn test_from_json_accepts_module_qualified_owner() {
        let table = TtlTable::from_json(r#"{"app::users::Repo::get": 5}"#).unwrap();

        assert_eq!(
            table.ttl_for(&MethodId::new("app::users::Repo", "get")),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            table.ttl_for(&MethodId::new("app::orders::Repo", "get")),
            None
        );
    }

    #[test]
    fn test_owner_and_method_split_do_not_collide() {
        let table = TtlTable::new()
            .with_ttl(MethodId::new("a::b", "c"), Duration::from_secs(9))
            .with_ttl(MethodId::new("a", "b"), Duration::from_secs(1));

        assert_eq!(
            table.ttl_for(&MethodId::new("a::b", "c")),
            Some(Duration::from_secs(9))
        );
        assert_eq!(table.ttl_for(&MethodId::new("a", "b::c")), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let result = TtlTable::from_json(r#"{"DataService::query_data": "soon"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let result = TtlTable::from_json("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_env_var_unset_is_empty() {
        env::remove_var("MEMO_TTL_TABLE_TEST_UNSET");
        let table = TtlTable::from_env_var("MEMO_TTL_TABLE_TEST_UNSET").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_env_var_set() {
        env::set_var("MEMO_TTL_TABLE_TEST_SET", r#"{"DataService::query_data": 3}"#);
        let table = TtlTable::from_env_var("MEMO_TTL_TABLE_TEST_SET").unwrap();
        assert_eq!(table.ttl_for(&QUERY), Some(Duration::from_secs(3)));
        env::remove_var("MEMO_TTL_TABLE_TEST_SET");
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_var_not_unicode_is_error() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        env::set_var(
            "MEMO_TTL_TABLE_TEST_BAD_UTF8",
            OsString::from_vec(vec![b'{', 0xff, b'}']),
        );
        let result = TtlTable::from_env_var("MEMO_TTL_TABLE_TEST_BAD_UTF8");
        env::remove_var("MEMO_TTL_TABLE_TEST_BAD_UTF8");

        match result {
            Err(ConfigError::NotUnicode { var }) => {
                assert_eq!(var, "MEMO_TTL_TABLE_TEST_BAD_UTF8")
            }
            other => panic!("expected NotUnicode, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = TtlTable::new().with_ttl(QUERY, Duration::from_secs(2));
        let overlay = TtlTable::new().with_ttl(QUERY, Duration::from_secs(9));

        let merged = base.merge(overlay);
        assert_eq!(merged.ttl_for(&QUERY), Some(Duration::from_secs(9)));
        assert_eq!(merged.len(), 1);
    }
}
