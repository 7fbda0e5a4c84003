//! Log de clicks sobre links de referido.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Visita a `/r/<code>`. Append-only; el código no necesita resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub id: i64,
    pub referral_code: String,
    pub source: ClickSource,
    pub created_at: DateTime<Utc>,
}

/// Metadatos opcionales del origen de la visita.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickSource {
    pub source_domain: Option<String>,
    /// Hash anónimo del visitante (IP + User-Agent), 16 hex.
    pub visitor_hash: Option<String>,
}

impl ClickSource {
    pub fn from_request(host: Option<&str>, client_addr: Option<&str>, user_agent: Option<&str>) -> Self {
        let source_domain = host.map(str::to_string).unwrap_or_else(|| "direct".to_string());
        let mut hasher = Sha256::new();
        hasher.update(client_addr.unwrap_or_default().as_bytes());
        hasher.update(user_agent.unwrap_or_default().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self { source_domain: Some(source_domain),
               visitor_hash: Some(digest[..16].to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visitor_hash_is_stable_and_short() {
        let a = ClickSource::from_request(Some("fortune0.com"), Some("10.0.0.1"), Some("curl/8"));
        let b = ClickSource::from_request(Some("other.host"), Some("10.0.0.1"), Some("curl/8"));
        assert_eq!(a.visitor_hash, b.visitor_hash);
        assert_eq!(a.visitor_hash.as_deref().map(str::len), Some(16));
        assert_eq!(ClickSource::from_request(None, None, None).source_domain.as_deref(), Some("direct"));
    }
}
