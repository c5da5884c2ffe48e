use crate::store::{CommentRecord, ContentItem};
use chrono::NaiveDateTime;

pub const VERIFY_KEY: &str = "verify-key";
pub const COMMENT_CHECK: &str = "comment-check";
pub const SUBMIT_SPAM: &str = "submit-spam";
pub const SUBMIT_HAM: &str = "submit-ham";

/// Environment fields that must never reach the wire.
pub const STRIPPED_ENVIRON_FIELDS: &[&str] = &["HTTP_COOKIE"];

/// Outcome of classifying one comment. Produced fresh per call, never
/// cached beyond the decision it informs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Spam,
    Ham,
    /// Ambiguous or unparseable protocol answer.
    Unknown,
    /// Transport failure; the service could not be asked.
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Valid,
    Invalid,
    /// Transport failure or an unparseable response. Not a statement
    /// about key validity.
    Failed,
}

/// Request-origin context captured at submission time. A fixed schema:
/// whatever extra environment pairs the host hands over ride in `environ`
/// and are filtered against [`STRIPPED_ENVIRON_FIELDS`] before encoding.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OriginContext {
    pub remote_addr: String,
    pub user_agent: String,
    pub referrer: String,
    #[serde(default)]
    pub environ: Vec<(String, String)>,
}

impl OriginContext {
    /// Origin for a stored record being re-checked: no live request
    /// exists, so address and agent come from the record and the
    /// referrer is empty.
    pub fn from_record(record: &CommentRecord) -> Self {
        OriginContext {
            remote_addr: record.author_ip.clone(),
            user_agent: record.user_agent.clone(),
            referrer: String::new(),
            environ: Vec::new(),
        }
    }
}

pub fn endpoint_path(protocol_version: &str, operation: &str) -> String {
    format!("/{protocol_version}/{operation}")
}

/// Network addresses keep digits, dots, commas and spaces; everything
/// else is dropped before transmission.
pub fn sanitize_ip(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | ' '))
        .collect()
}

/// Publish timestamp as a bare digit string (YYYYMMDDHHMMSS). Empty when
/// the content item no longer exists.
pub fn article_date(published_at: Option<NaiveDateTime>) -> String {
    match published_at {
        Some(at) => at.format("%Y%m%d%H%M%S").to_string(),
        None => String::new(),
    }
}

/// Check encoding: the full-context request used for live classification.
/// Field order is fixed so identical inputs always produce an identical
/// mapping.
pub fn check_fields(
    blog: &str,
    record: &CommentRecord,
    post: Option<&ContentItem>,
    origin: &OriginContext,
) -> Vec<(String, String)> {
    let mut fields = vec![
        ("blog".to_string(), blog.to_string()),
        ("user_ip".to_string(), sanitize_ip(&origin.remote_addr)),
        ("user_agent".to_string(), origin.user_agent.clone()),
        ("referrer".to_string(), origin.referrer.clone()),
        (
            "article_date".to_string(),
            article_date(post.map(|p| p.published_at)),
        ),
        ("comment_post_id".to_string(), record.post_id.to_string()),
        ("comment_author".to_string(), record.author.clone()),
        (
            "comment_author_email".to_string(),
            record.author_email.clone(),
        ),
        ("comment_author_url".to_string(), record.author_url.clone()),
        ("comment_content".to_string(), record.content.clone()),
        ("comment_type".to_string(), record.kind.as_str().to_string()),
    ];
    for (key, value) in &origin.environ {
        if STRIPPED_ENVIRON_FIELDS.contains(&key.as_str()) {
            continue;
        }
        fields.push((key.clone(), value.clone()));
    }
    fields
}

/// Report encoding: the narrower request used for human-confirmed
/// feedback. The full stored record, no environment dump.
pub fn report_fields(
    blog: &str,
    record: &CommentRecord,
    post: &ContentItem,
) -> Vec<(String, String)> {
    vec![
        ("blog".to_string(), blog.to_string()),
        (
            "article_date".to_string(),
            article_date(Some(post.published_at)),
        ),
        ("comment_id".to_string(), record.id.to_string()),
        ("comment_post_id".to_string(), record.post_id.to_string()),
        ("comment_author".to_string(), record.author.clone()),
        (
            "comment_author_email".to_string(),
            record.author_email.clone(),
        ),
        ("comment_author_url".to_string(), record.author_url.clone()),
        (
            "comment_author_ip".to_string(),
            sanitize_ip(&record.author_ip),
        ),
        ("comment_agent".to_string(), record.user_agent.clone()),
        (
            "comment_date".to_string(),
            record.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("comment_content".to_string(), record.content.clone()),
        ("comment_type".to_string(), record.kind.as_str().to_string()),
        (
            "comment_approved".to_string(),
            record.state.as_str().to_string(),
        ),
    ]
}

pub fn verify_fields(key: &str, blog: &str) -> Vec<(String, String)> {
    vec![
        ("key".to_string(), key.to_string()),
        ("blog".to_string(), blog.to_string()),
    ]
}

/// `comment-check` body: exactly "true" means spam, any other definite
/// content means ham, an empty body is ambiguous.
pub fn decode_check(body: &str) -> Verdict {
    let body = body.trim();
    match body {
        "true" => Verdict::Spam,
        "" => Verdict::Unknown,
        _ => Verdict::Ham,
    }
}

/// `verify-key` body: only the two exact literals are definite answers.
pub fn decode_verify(body: &str) -> KeyStatus {
    match body.trim() {
        "valid" => KeyStatus::Valid,
        "invalid" => KeyStatus::Invalid,
        _ => KeyStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sample_comment;
    use chrono::NaiveDate;

    fn noon(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 30, 45)
            .unwrap()
    }

    fn sample_post() -> ContentItem {
        ContentItem {
            id: 1,
            published_at: noon(2024, 5, 2),
            modified_at: noon(2024, 5, 3),
        }
    }

    #[test]
    fn decode_check_matrix() {
        assert_eq!(decode_check("true"), Verdict::Spam);
        assert_eq!(decode_check("true\r\n"), Verdict::Spam);
        assert_eq!(decode_check("false"), Verdict::Ham);
        assert_eq!(decode_check("anything else"), Verdict::Ham);
        assert_eq!(decode_check(""), Verdict::Unknown);
        assert_eq!(decode_check("  \r\n"), Verdict::Unknown);
    }

    #[test]
    fn decode_verify_matrix() {
        assert_eq!(decode_verify("valid"), KeyStatus::Valid);
        assert_eq!(decode_verify("invalid"), KeyStatus::Invalid);
        assert_eq!(decode_verify(""), KeyStatus::Failed);
        assert_eq!(decode_verify("<html>502</html>"), KeyStatus::Failed);
    }

    #[test]
    fn sanitize_ip_keeps_address_characters_only() {
        assert_eq!(sanitize_ip("192.0.2.1, 198.51.100.7"), "192.0.2.1, 198.51.100.7");
        assert_eq!(sanitize_ip("192.0.2.1<script>"), "192.0.2.1");
        assert_eq!(sanitize_ip("::1"), "1");
    }

    #[test]
    fn article_date_is_digits_or_empty() {
        assert_eq!(article_date(Some(noon(2024, 5, 2))), "20240502123045");
        assert_eq!(article_date(None), "");
    }

    #[test]
    fn check_fields_are_deterministic_and_ordered() {
        let record = sample_comment(7, noon(2024, 6, 1));
        let post = sample_post();
        let origin = OriginContext {
            remote_addr: "203.0.113.9".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referrer: "http://example.com/post".to_string(),
            environ: vec![(
                "HTTP_ACCEPT_LANGUAGE".to_string(),
                "en-US".to_string(),
            )],
        };

        let first = check_fields("http://example.com", &record, Some(&post), &origin);
        let second = check_fields("http://example.com", &record, Some(&post), &origin);
        assert_eq!(first, second);

        let keys: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "blog",
                "user_ip",
                "user_agent",
                "referrer",
                "article_date",
                "comment_post_id",
                "comment_author",
                "comment_author_email",
                "comment_author_url",
                "comment_content",
                "comment_type",
                "HTTP_ACCEPT_LANGUAGE",
            ]
        );
    }

    #[test]
    fn check_fields_strip_cookie_header() {
        let record = sample_comment(7, noon(2024, 6, 1));
        let origin = OriginContext {
            remote_addr: "203.0.113.9".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referrer: String::new(),
            environ: vec![
                ("HTTP_COOKIE".to_string(), "session=secret".to_string()),
                ("HTTP_HOST".to_string(), "example.com".to_string()),
            ],
        };

        let fields = check_fields("http://example.com", &record, None, &origin);
        assert!(fields.iter().all(|(k, _)| k != "HTTP_COOKIE"));
        assert!(fields.iter().any(|(k, _)| k == "HTTP_HOST"));
    }

    #[test]
    fn check_fields_with_deleted_post_have_empty_article_date() {
        let record = sample_comment(7, noon(2024, 6, 1));
        let fields = check_fields(
            "http://example.com",
            &record,
            None,
            &OriginContext::default(),
        );
        let article = fields.iter().find(|(k, _)| k == "article_date").unwrap();
        assert_eq!(article.1, "");
    }

    #[test]
    fn report_fields_carry_the_stored_record_without_environ() {
        let mut record = sample_comment(7, noon(2024, 6, 1));
        record.state = crate::store::ModerationState::Spam;
        let post = sample_post();

        let fields = report_fields("http://example.com", &record, &post);
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("comment_id"), "7");
        assert_eq!(get("comment_approved"), "spam");
        assert_eq!(get("comment_date"), "2024-06-01 12:30:45");
        assert_eq!(get("article_date"), "20240502123045");
        assert!(fields.iter().all(|(k, _)| !k.starts_with("HTTP_")));
    }

    #[test]
    fn endpoint_paths_are_version_prefixed() {
        assert_eq!(endpoint_path("1.1", COMMENT_CHECK), "/1.1/comment-check");
        assert_eq!(endpoint_path("1.1", VERIFY_KEY), "/1.1/verify-key");
    }
}
