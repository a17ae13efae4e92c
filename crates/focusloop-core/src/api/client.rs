//! HTTP client for the remote stats service.
//!
//! Speaks the four wire operations against a deployed service with the
//! user's bearer token; implements [`ProgressBackend`] so the dispatcher
//! cannot tell it apart from the local store.

use serde::de::DeserializeOwned;
use url::Url;

use crate::api::types::{DailyCount, OutcomeRequest, StatsSummary, UserSnapshot};
use crate::error::{ApiError, CoreError};
use crate::service::ProgressBackend;
use crate::storage::{ApiConfig, TaskRecord};
use crate::streak::StreakState;

/// Remote stats service client.
#[derive(Debug)]
pub struct RemoteClient {
    base_url: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl RemoteClient {
    /// Create a client against `base_url`, optionally with a bearer token.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        })
    }

    /// Build a client from the `[api]` config section.
    ///
    /// # Errors
    /// Returns [`ApiError::NotConfigured`] when no base URL is set.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.as_deref().ok_or(ApiError::NotConfigured)?;
        Self::new(base_url, config.token.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::InvalidBaseUrl {
            url: format!("{}{}", self.base_url, path),
            message: e.to_string(),
        })
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = tokio::runtime::Handle::current().block_on(async { req.send().await })?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }
        tokio::runtime::Handle::current()
            .block_on(async { resp.json::<T>().await })
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }

    /// POST the interval outcome; the service answers with the updated
    /// user object.
    pub fn post_outcome(&self, req: &OutcomeRequest) -> Result<UserSnapshot, ApiError> {
        let url = self.endpoint("/api/sessions/outcome")?;
        self.send_json(self.client.post(url).json(req))
    }

    pub fn get_summary(&self) -> Result<StatsSummary, ApiError> {
        let url = self.endpoint("/api/stats/summary")?;
        self.send_json(self.client.get(url))
    }

    pub fn get_daily_history(&self) -> Result<Vec<DailyCount>, ApiError> {
        let url = self.endpoint("/api/stats/history")?;
        self.send_json(self.client.get(url))
    }

    pub fn post_task_pomodoro(
        &self,
        task_id: &str,
        duration_min: Option<u32>,
    ) -> Result<TaskRecord, ApiError> {
        let url = self.endpoint(&format!("/api/tasks/{task_id}/pomodoro"))?;
        let body = serde_json::json!({ "duration": duration_min });
        self.send_json(self.client.post(url).json(&body))
    }
}

impl ProgressBackend for RemoteClient {
    fn record_outcome(&mut self, req: &OutcomeRequest) -> Result<StreakState, CoreError> {
        Ok(self.post_outcome(req)?.into())
    }

    fn fetch_summary(&self) -> Result<StatsSummary, CoreError> {
        Ok(self.get_summary()?)
    }

    fn daily_history(&self) -> Result<Vec<DailyCount>, CoreError> {
        Ok(self.get_daily_history()?)
    }

    fn add_task_pomodoro(
        &mut self,
        task_id: &str,
        duration_min: Option<u32>,
    ) -> Result<TaskRecord, CoreError> {
        Ok(self.post_task_pomodoro(task_id, duration_min)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = RemoteClient::new("not a url", None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn missing_base_url_is_not_configured() {
        let err = RemoteClient::from_config(&ApiConfig::default()).unwrap_err();
        assert!(matches!(err, ApiError::NotConfigured));
    }

    #[test]
    fn record_outcome_posts_and_parses_user() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/sessions/outcome")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "completed": true,
                "reward": "coffee",
                "duration": 25,
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "pomodoroStats": {
                        "completedCount": 5,
                        "skippedCount": 1,
                        "lastRewardText": "coffee"
                    },
                    "currentStreak": 3,
                    "longestStreak": 7,
                    "lastStreakUpdateDate": "2026-08-30"
                }"#,
            )
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();

        let mut client =
            RemoteClient::new(&server.url(), Some("secret".into())).unwrap();
        let req = OutcomeRequest {
            completed: true,
            reward: Some("coffee".into()),
            punishment: None,
            duration: Some(25),
            task_id: None,
        };
        let state = client.record_outcome(&req).unwrap();
        assert_eq!(state.completed_count, 5);
        assert_eq!(state.current_streak, 3);
        assert_eq!(state.longest_streak, 7);
        assert_eq!(state.last_reward.as_deref(), Some("coffee"));
        mock.assert();
    }

    #[test]
    fn summary_and_history_parse() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/stats/summary")
            .with_body(
                r#"{"daily":30,"weekly":120,"monthly":400,"allTime":2000,
                    "currentStreak":2,"longestStreak":9,"dailyGoal":25,
                    "todayFocusTime":30}"#,
            )
            .create();
        server
            .mock("GET", "/api/stats/history")
            .with_body(
                r#"[{"date":"2026-08-29","count":0},{"date":"2026-08-30","count":30}]"#,
            )
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();

        let client = RemoteClient::new(&server.url(), None).unwrap();
        let summary = client.get_summary().unwrap();
        assert_eq!(summary.weekly, 120);
        assert_eq!(summary.all_time, 2000);

        let history = client.get_daily_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].count, 30);
    }

    #[test]
    fn unauthorized_maps_to_its_own_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/stats/summary")
            .with_status(401)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();

        let client = RemoteClient::new(&server.url(), None).unwrap();
        assert!(matches!(
            client.get_summary().unwrap_err(),
            ApiError::Unauthorized
        ));
    }

    #[test]
    fn server_error_surfaces_status() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/tasks/t1/pomodoro")
            .with_status(500)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();

        let client = RemoteClient::new(&server.url(), None).unwrap();
        assert!(matches!(
            client.post_task_pomodoro("t1", Some(25)).unwrap_err(),
            ApiError::Status { status: 500 }
        ));
    }
}
