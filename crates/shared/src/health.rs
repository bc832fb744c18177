//! # ヘルスチェック

use serde::{Deserialize, Serialize};

/// 稼働状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// `GET /health` のレスポンス
///
/// ```
/// use nutrilens_shared::{HealthResponse, HealthStatus};
///
/// let response = HealthResponse::healthy("nutrilens-server", "0.1.0");
/// assert_eq!(response.status, HealthStatus::Healthy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status:  HealthStatus,
    pub service: String,
    /// パッケージのバージョン
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status:  HealthStatus::Healthy,
            service: service.into(),
            version: version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_statusは小文字でシリアライズされる() {
        let json = serde_json::to_value(HealthResponse::healthy("nutrilens-server", "0.1.0")).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "status": "healthy",
                "service": "nutrilens-server",
                "version": "0.1.0"
            })
        );
    }
}
