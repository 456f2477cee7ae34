//! Domain Caches
//!
//! Fixed key-prefix and TTL policies for the application's cached records:
//! customers, jobs, analytics reports and AI responses. Each domain tags its
//! entries with its own name so `invalidate_by_tag` can clear it in one call.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::service::CacheService;

// == Namespace ==
/// Key prefix, tag and default TTL shared by every entry of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: &'static str,
    pub tag: &'static str,
    pub default_ttl: u64,
}

impl Namespace {
    /// Builds the cache key for `id` in this namespace.
    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Returns `ttl`, or the namespace default when None.
    pub fn ttl(&self, ttl: Option<u64>) -> u64 {
        ttl.unwrap_or(self.default_ttl)
    }
}

pub const CUSTOMER: Namespace = Namespace {
    prefix: "customer",
    tag: "customer",
    default_ttl: 3600,
};

pub const JOB: Namespace = Namespace {
    prefix: "job",
    tag: "job",
    default_ttl: 1800,
};

/// Keys also carry the current UTC date, so reports roll over daily.
pub const ANALYTICS: Namespace = Namespace {
    prefix: "analytics",
    tag: "analytics",
    default_ttl: 900,
};

/// Keys are a hash of the prompt text.
pub const AI_RESPONSE: Namespace = Namespace {
    prefix: "ai",
    tag: "ai",
    default_ttl: 7200,
};

// == Prompt Hash ==
/// Hashes prompt text into a short base36 token.
///
/// 32-bit rolling hash (`h = h * 31 + c`) over the UTF-16 code units, rendered
/// as the base36 magnitude. Identical text always yields the same token.
pub fn hash_prompt(prompt: &str) -> String {
    let hash = prompt
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });
    to_base36(hash.unsigned_abs())
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

impl CacheService {
    /// Stores `value` under `namespace`'s key for `id`, tagged with the namespace tag.
    pub async fn cache_in<T: Serialize + ?Sized>(
        &self,
        namespace: Namespace,
        id: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.set(
            &namespace.key(id),
            value,
            Some(namespace.ttl(ttl)),
            &[namespace.tag],
        )
        .await
    }

    pub async fn get_in<T: DeserializeOwned>(&self, namespace: Namespace, id: &str) -> Option<T> {
        self.get(&namespace.key(id)).await
    }

    // == Customers ==
    pub async fn cache_customer<T: Serialize + ?Sized>(
        &self,
        customer_id: &str,
        customer: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.cache_in(CUSTOMER, customer_id, customer, ttl).await
    }

    pub async fn get_cached_customer<T: DeserializeOwned>(&self, customer_id: &str) -> Option<T> {
        self.get_in(CUSTOMER, customer_id).await
    }

    pub async fn invalidate_customer(&self, customer_id: &str) -> bool {
        self.delete(&CUSTOMER.key(customer_id)).await
    }

    // == Jobs ==
    pub async fn cache_job<T: Serialize + ?Sized>(
        &self,
        job_id: &str,
        job: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.cache_in(JOB, job_id, job, ttl).await
    }

    pub async fn get_cached_job<T: DeserializeOwned>(&self, job_id: &str) -> Option<T> {
        self.get_in(JOB, job_id).await
    }

    pub async fn invalidate_job(&self, job_id: &str) -> bool {
        self.delete(&JOB.key(job_id)).await
    }

    // == Analytics ==
    /// Caches today's report of `report_type`.
    pub async fn cache_analytics<T: Serialize + ?Sized>(
        &self,
        report_type: &str,
        report: &T,
        ttl: Option<u64>,
    ) -> bool {
        let id = self.analytics_id(report_type);
        self.cache_in(ANALYTICS, &id, report, ttl).await
    }

    /// Returns today's report of `report_type`; yesterday's never matches.
    pub async fn get_cached_analytics<T: DeserializeOwned>(&self, report_type: &str) -> Option<T> {
        let id = self.analytics_id(report_type);
        self.get_in(ANALYTICS, &id).await
    }

    fn analytics_id(&self, report_type: &str) -> String {
        format!("{}:{}", report_type, self.clock.now().format("%Y-%m-%d"))
    }

    // == AI Responses ==
    pub async fn cache_ai_response<T: Serialize + ?Sized>(
        &self,
        prompt: &str,
        response: &T,
        ttl: Option<u64>,
    ) -> bool {
        self.cache_in(AI_RESPONSE, &hash_prompt(prompt), response, ttl)
            .await
    }

    pub async fn get_cached_ai_response<T: DeserializeOwned>(&self, prompt: &str) -> Option<T> {
        self.get_in(AI_RESPONSE, &hash_prompt(prompt)).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn service_at(clock: ManualClock) -> (CacheService, Arc<ManualClock>) {
        let clock = Arc::new(clock);
        (CacheService::with_clock(Config::default(), clock.clone()), clock)
    }

    fn service() -> (CacheService, Arc<ManualClock>) {
        service_at(ManualClock::new(1_700_000_000_000))
    }

    #[test]
    fn test_namespace_keys() {
        assert_eq!(CUSTOMER.key("42"), "customer:42");
        assert_eq!(JOB.key("7"), "job:7");
        assert_eq!(CUSTOMER.ttl(None), 3600);
        assert_eq!(JOB.ttl(None), 1800);
        assert_eq!(ANALYTICS.ttl(None), 900);
        assert_eq!(AI_RESPONSE.ttl(None), 7200);
        assert_eq!(AI_RESPONSE.ttl(Some(5)), 5);
    }

    #[test]
    fn test_hash_prompt_known_values() {
        assert_eq!(hash_prompt(""), "0");
        assert_eq!(hash_prompt("a"), "2p");
        assert_eq!(hash_prompt("ab"), "2e9");
    }

    #[test]
    fn test_hash_prompt_stable_and_distinct() {
        let prompt = "Summarize today's open jobs for the Denver crew";
        assert_eq!(hash_prompt(prompt), hash_prompt(prompt));
        assert_ne!(hash_prompt(prompt), hash_prompt("Summarize yesterday's jobs"));
        assert!(hash_prompt(prompt).len() <= 7);
    }

    #[test]
    fn test_hash_prompt_overflow_wraps() {
        let long = "x".repeat(10_000);
        let token = hash_prompt(&long);
        assert!(!token.is_empty());
        assert!(token.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_customer_cache_and_tag_invalidation() {
        let (cache, _) = service();

        assert!(cache.cache_customer("42", &json!({"name": "Acme"}), None).await);
        assert_eq!(
            cache.get_cached_customer::<Value>("42").await,
            Some(json!({"name": "Acme"}))
        );

        assert_eq!(cache.invalidate_by_tag("customer").await, 1);
        assert_eq!(cache.get_cached_customer::<Value>("42").await, None);
    }

    #[tokio::test]
    async fn test_customer_default_ttl() {
        let (cache, clock) = service();
        cache.cache_customer("1", &"c", None).await;

        clock.advance_secs(3599);
        assert!(cache.get_cached_customer::<String>("1").await.is_some());
        clock.advance_secs(1);
        assert!(cache.get_cached_customer::<String>("1").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_customer() {
        let (cache, _) = service();
        cache.cache_customer("1", &"c", None).await;

        assert!(cache.invalidate_customer("1").await);
        assert!(!cache.invalidate_customer("1").await);
    }

    #[tokio::test]
    async fn test_job_cache() {
        let (cache, clock) = service();
        cache.cache_job("7", &json!({"status": "scheduled"}), None).await;
        cache.cache_customer("7", &json!({"name": "Same id"}), None).await;

        assert_eq!(cache.ttl("job:7").await, Some(1800));
        assert_eq!(cache.invalidate_by_tag("job").await, 1);
        assert!(cache.get_cached_customer::<Value>("7").await.is_some());

        cache.cache_job("8", &1, Some(10)).await;
        clock.advance_secs(10);
        assert!(cache.get_cached_job::<i32>("8").await.is_none());
        assert!(!cache.invalidate_job("8").await);
    }

    #[tokio::test]
    async fn test_analytics_rolls_over_at_midnight() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 23, 58, 0).unwrap();
        let (cache, clock) = service_at(ManualClock::at(start));

        assert!(cache.cache_analytics("revenue", &json!({"total": 1200}), None).await);
        assert!(cache.exists("analytics:revenue:2024-03-15").await);
        assert!(cache.get_cached_analytics::<Value>("revenue").await.is_some());

        // Still inside the TTL, but it's a new day
        clock.advance_secs(180);
        assert!(cache.get_cached_analytics::<Value>("revenue").await.is_none());
        assert!(cache.exists("analytics:revenue:2024-03-15").await);
    }

    #[tokio::test]
    async fn test_ai_response_cache() {
        let (cache, clock) = service();
        let prompt = "Draft a follow-up text for job 7";

        assert!(cache.cache_ai_response(prompt, "Hi! Just checking in.", None).await);
        assert_eq!(
            cache.get_cached_ai_response::<String>(prompt).await.as_deref(),
            Some("Hi! Just checking in.")
        );
        assert!(cache.exists(&format!("ai:{}", hash_prompt(prompt))).await);
        assert!(cache.get_cached_ai_response::<String>("other prompt").await.is_none());

        clock.advance_secs(7200);
        assert!(cache.get_cached_ai_response::<String>(prompt).await.is_none());
    }

    #[tokio::test]
    async fn test_stats_group_by_domain_tag() {
        let (cache, _) = service();
        cache.cache_customer("1", &1, None).await;
        cache.cache_customer("2", &2, None).await;
        cache.cache_job("1", &1, None).await;
        cache.cache_ai_response("p", &"r", None).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total_keys, 4);
        assert_eq!(stats.keys_by_tag.get("customer"), Some(&2));
        assert_eq!(stats.keys_by_tag.get("job"), Some(&1));
        assert_eq!(stats.keys_by_tag.get("ai"), Some(&1));
    }
}
