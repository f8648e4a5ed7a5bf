//! Enrichment through the national law search open API.
//!
//! The same search is published twice: by the national law information
//! centre (credential parameter `OC`, a registered user id) and by the
//! public data portal (credential parameter `serviceKey`, a long encoded
//! key). Users rarely know which kind of credential they hold, so both are
//! tried in an order guessed from the credential itself.

use reqwest::blocking::Client;
use roxmltree::{Document, Node};
use thiserror::Error;
use url::form_urlencoded::byte_serialize;

use crate::config::{DATA_PORTAL_BASE_URL, LAW_CENTRE_SEARCH_URL};
use crate::effective::{format_compact_date, EffectiveInfo};
use crate::error::Result;
use crate::http::create_client;
use crate::types::LawRecord;
use crate::xml::{find_descendants, first_child_text, get_tag_name, get_text};

use super::{EnrichOutcome, Enricher};

/// Words in `kind` that mark an administrative rule.
const ADMIN_RULE_KEYWORDS: [&str; 7] = ["고시", "훈령", "예규", "지침", "규정", "기준", "행정규칙"];

/// Body fragments that signal a rejected credential.
const AUTH_ERROR_MARKERS: [&str; 5] = [
    "SERVICE_KEY_IS_NOT_REGISTERED",
    "SERVICE ACCESS DENIED",
    "사용자 정보 검증에 실패",
    "인증키",
    "UNREGISTERED_IP",
];

const EFFECTIVE_FIELDS: &[&str] = &["시행일자", "시행일"];
const PROMULGATION_DATE_FIELDS: &[&str] = &["공포일자", "발령일자"];
const PROMULGATION_NUMBER_FIELDS: &[&str] = &["공포번호", "발령번호"];
const CATEGORY_FIELDS: &[&str] = &["법령구분명", "행정규칙종류"];
const REVISION_TYPE_FIELDS: &[&str] = &["제개정구분명", "제개정구분"];

/// Which search the query goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiTarget {
    /// Acts, decrees and rules (법령).
    Law,
    /// Administrative rules such as notices and directives (행정규칙).
    AdminRule,
}

impl ApiTarget {
    /// Route by the record's kind.
    ///
    /// # Examples
    /// ```
    /// use ftclaw_harvester::enrich::ApiTarget;
    ///
    /// assert_eq!(ApiTarget::for_kind("공정거래위원회 고시"), ApiTarget::AdminRule);
    /// assert_eq!(ApiTarget::for_kind("법률"), ApiTarget::Law);
    /// ```
    #[must_use]
    pub fn for_kind(kind: &str) -> Self {
        if ADMIN_RULE_KEYWORDS.iter().any(|k| kind.contains(k)) {
            Self::AdminRule
        } else {
            Self::Law
        }
    }

    #[must_use]
    pub fn query_value(self) -> &'static str {
        match self {
            Self::Law => "law",
            Self::AdminRule => "admrul",
        }
    }

    fn portal_path(self) -> &'static str {
        match self {
            Self::Law => "law/lawSearchList.do",
            Self::AdminRule => "admrul/admrulSearchList.do",
        }
    }

    fn name_field(self) -> &'static str {
        match self {
            Self::Law => "법령명한글",
            Self::AdminRule => "행정규칙명",
        }
    }
}

/// Guess of what a credential string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Long encoded key issued by the public data portal.
    ServiceKey,
    /// Short id registered with the law information centre.
    RegisteredId,
}

impl CredentialKind {
    /// # Examples
    /// ```
    /// use ftclaw_harvester::enrich::CredentialKind;
    ///
    /// assert_eq!(CredentialKind::classify("myid"), CredentialKind::RegisteredId);
    /// assert_eq!(CredentialKind::classify("abc%2Bdef"), CredentialKind::ServiceKey);
    /// ```
    #[must_use]
    pub fn classify(credential: &str) -> Self {
        let encoded_chars = credential
            .chars()
            .any(|c| matches!(c, '%' | '+' | '/' | '='));
        if credential.len() >= 40 || encoded_chars {
            Self::ServiceKey
        } else {
            Self::RegisteredId
        }
    }
}

/// One endpoint plus the parameter name it expects the credential in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub name: &'static str,
    pub url: String,
    pub credential_param: &'static str,
}

/// Why a lookup produced no details.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// A configuration answered with a recognised document that had no record.
    #[error("no matching record")]
    NotFound,

    /// Every configuration failed and at least one rejected the credential.
    #[error("credential rejected: {0}")]
    AuthRejected(String),

    /// Every configuration failed.
    #[error("lookup failed: {0}")]
    Failed(String),
}

/// How a single configuration went.
enum Attempt {
    Found(EffectiveInfo),
    Empty,
    Auth(String),
    Unusable(String),
}

/// Enricher backed by the law search open API.
pub struct OpenApiEnricher {
    client: Client,
    credential: String,
    law_centre_url: String,
    portal_base_url: String,
}

impl OpenApiEnricher {
    pub fn new(credential: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            credential: credential.into().trim().to_string(),
            law_centre_url: LAW_CENTRE_SEARCH_URL.to_string(),
            portal_base_url: DATA_PORTAL_BASE_URL.to_string(),
        })
    }

    /// Override both hosts, e.g. with a mock server.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        law_centre_url: impl Into<String>,
        portal_base_url: impl Into<String>,
    ) -> Self {
        self.law_centre_url = law_centre_url.into();
        self.portal_base_url = portal_base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Configurations for `target`, preferred one first.
    #[must_use]
    pub fn endpoints(&self, target: ApiTarget) -> Vec<ApiEndpoint> {
        let law_centre = ApiEndpoint {
            name: "law.go.kr",
            url: self.law_centre_url.clone(),
            credential_param: "OC",
        };
        let portal = ApiEndpoint {
            name: "data.go.kr",
            url: format!("{}/{}", self.portal_base_url, target.portal_path()),
            credential_param: "serviceKey",
        };
        match CredentialKind::classify(&self.credential) {
            CredentialKind::ServiceKey => vec![portal, law_centre],
            CredentialKind::RegisteredId => vec![law_centre, portal],
        }
    }

    /// Look an instrument up by its exact title.
    pub fn lookup_by_name(&self, name: &str, kind: &str) -> std::result::Result<EffectiveInfo, LookupError> {
        let target = ApiTarget::for_kind(kind);
        let mut auth_failure = None;
        let mut last_failure = String::from("no endpoint configured");

        for endpoint in self.endpoints(target) {
            match self.attempt(&endpoint, target, name) {
                Attempt::Found(info) => return Ok(info),
                Attempt::Empty => return Err(LookupError::NotFound),
                Attempt::Auth(reason) => {
                    tracing::debug!(endpoint = endpoint.name, reason = %reason, "credential rejected");
                    auth_failure = Some(reason);
                }
                Attempt::Unusable(reason) => {
                    tracing::debug!(endpoint = endpoint.name, reason = %reason, "endpoint unusable");
                    last_failure = reason;
                }
            }
        }

        Err(match auth_failure {
            Some(reason) => LookupError::AuthRejected(reason),
            None => LookupError::Failed(last_failure),
        })
    }

    fn request_url(&self, endpoint: &ApiEndpoint, target: ApiTarget, name: &str) -> String {
        // Portal keys are usually handed out already percent-encoded.
        let credential = if self.credential.contains('%') {
            self.credential.clone()
        } else {
            byte_serialize(self.credential.as_bytes()).collect()
        };
        let query: String = byte_serialize(name.as_bytes()).collect();
        format!(
            "{}?{}={credential}&target={}&type=XML&query={query}",
            endpoint.url,
            endpoint.credential_param,
            target.query_value()
        )
    }

    fn attempt(&self, endpoint: &ApiEndpoint, target: ApiTarget, name: &str) -> Attempt {
        let url = self.request_url(endpoint, target, name);
        let response = match self.client.get(&url).send() {
            Ok(r) => r,
            Err(e) => return Attempt::Unusable(e.to_string()),
        };
        let status = response.status();
        let body = match response.text() {
            Ok(b) => b,
            Err(e) => return Attempt::Unusable(e.to_string()),
        };

        if let Some(marker) = AUTH_ERROR_MARKERS.iter().find(|m| body.contains(**m)) {
            return Attempt::Auth(format!("{} answered {marker}", endpoint.name));
        }
        if !status.is_success() {
            return Attempt::Unusable(format!("{} returned HTTP {}", endpoint.name, status.as_u16()));
        }

        match parse_search_response(&body, target, name) {
            Ok(Some(info)) => Attempt::Found(info),
            Ok(None) => Attempt::Empty,
            Err(reason) => Attempt::Unusable(format!("{}: {reason}", endpoint.name)),
        }
    }
}

impl Enricher for OpenApiEnricher {
    fn name(&self) -> &'static str {
        "open-api"
    }

    fn enrich(&self, record: &LawRecord) -> EnrichOutcome {
        match self.lookup_by_name(&record.title, &record.kind) {
            Ok(info) => EnrichOutcome::Enriched(info),
            Err(LookupError::NotFound) => EnrichOutcome::NotFound,
            Err(LookupError::AuthRejected(reason)) => {
                tracing::warn!(title = %record.title, reason = %reason, "open API rejected credential");
                EnrichOutcome::auth_rejected(reason)
            }
            Err(LookupError::Failed(reason)) => {
                tracing::warn!(title = %record.title, reason = %reason, "open API lookup failed");
                EnrichOutcome::api_error(reason)
            }
        }
    }
}

/// Parse a search response.
///
/// `Ok(None)` means the document was a well-formed search result without
/// any record; `Err` means it was not a search result at all.
pub fn parse_search_response(
    body: &str,
    target: ApiTarget,
    name: &str,
) -> std::result::Result<Option<EffectiveInfo>, String> {
    let doc = Document::parse(body.trim()).map_err(|e| format!("not XML: {e}"))?;
    let root = doc.root_element();

    if let Some(code) = find_descendants(root, "resultCode").next().map(get_text) {
        if code != "00" && code != "0" {
            return Err(format!("result code {code}"));
        }
    }

    let record_tag = target.query_value();
    let records: Vec<Node<'_, '_>> = find_descendants(root, record_tag).collect();

    if records.is_empty() {
        let recognised = get_tag_name(root).ends_with("Search")
            || find_descendants(root, "totalCnt").next().is_some();
        return if recognised {
            Ok(None)
        } else {
            Err(format!("unexpected root <{}>", get_tag_name(root)))
        };
    }

    let exact = records.iter().find(|r| {
        first_child_text(**r, &[target.name_field()]).is_some_and(|n| n == name.trim())
    });
    let record = exact.or(records.first()).copied();
    Ok(record.map(read_record))
}

fn read_record(node: Node<'_, '_>) -> EffectiveInfo {
    let field = |names: &[&str]| first_child_text(node, names).unwrap_or_default();

    let effective_date = format_compact_date(&field(EFFECTIVE_FIELDS));
    let revision_date = format_compact_date(&field(PROMULGATION_DATE_FIELDS));
    let category = field(CATEGORY_FIELDS);
    let number = field(PROMULGATION_NUMBER_FIELDS);
    let revision_type = field(REVISION_TYPE_FIELDS);

    let revision_info = match (category.is_empty(), number.is_empty()) {
        (_, true) => category,
        (true, false) => format!("제{number}호"),
        (false, false) => format!("{category} 제{number}호"),
    };

    EffectiveInfo::from_fields(effective_date, revision_info, revision_date, revision_type)
}
