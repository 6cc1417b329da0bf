use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::retry::{send_with_retry, RetryPolicy};
use super::SourceClient;
use crate::model::source::{Repo, SourceComment, SourceIssue, SourceUser};

const ITEMS_PER_PAGE: &str = "100";

pub struct GitHubClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("issue-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            base_url: "https://api.github.com".into(),
            token,
            client,
            retry: RetryPolicy::new(timeout),
        })
    }

    /// Point at another API root (GitHub Enterprise, or a test server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(Vec<T>, Option<String>)> {
        let response = send_with_retry(&self.retry, || {
            self.client
                .get(url)
                .query(query)
                .bearer_auth(&self.token)
                .header("Accept", "application/vnd.github+json")
        })
        .await
        .with_context(|| format!("GitHub request to {url} failed"))?;

        let next = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);
        let items = response
            .json()
            .await
            .context("Failed to parse GitHub response")?;
        Ok((items, next))
    }

    /// Follow `Link: rel="next"` until the last page. The next link already
    /// carries the query string.
    async fn get_all<T: DeserializeOwned>(
        &self,
        url: String,
        query: Vec<(&str, String)>,
    ) -> Result<Vec<T>> {
        let (mut items, mut next) = self.get_page(&url, &query).await?;
        while let Some(url) = next {
            let (page, following) = self.get_page(&url, &[]).await?;
            items.extend(page);
            next = following;
        }
        Ok(items)
    }
}

/// URL tagged `rel="next"` in a GitHub `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (url, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == r#"rel="next""#)
            .then(|| url.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}

fn since_param(since: Option<DateTime<Utc>>) -> Option<(&'static str, String)> {
    since.map(|s| ("since", s.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

#[derive(Deserialize)]
struct GhIssue {
    id: i64,
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    user: Option<GhUser>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    #[serde(default)]
    comments: u64,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Deserialize)]
struct GhUser {
    login: String,
    name: Option<String>,
    #[serde(default)]
    html_url: String,
}

#[derive(Deserialize)]
struct GhComment {
    id: i64,
    body: Option<String>,
    user: Option<GhUser>,
    #[serde(default)]
    html_url: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl SourceClient for GitHubClient {
    async fn list_issues(
        &self,
        repo: &Repo,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourceIssue>> {
        let url = format!("{}/repos/{}/{}/issues", self.base_url, repo.owner, repo.name);
        let mut query = vec![
            ("state", "all".to_string()),
            ("sort", "created".to_string()),
            ("direction", "asc".to_string()),
            ("per_page", ITEMS_PER_PAGE.to_string()),
        ];
        query.extend(since_param(since));

        let raw: Vec<GhIssue> = self
            .get_all(url, query)
            .await
            .with_context(|| format!("Failed to list issues of {repo}"))?;

        let issues: Vec<SourceIssue> = raw
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| SourceIssue {
                id: issue.id,
                number: issue.number,
                title: issue.title,
                body: issue.body.unwrap_or_default(),
                state: issue.state,
                reporter: issue.user.map(|u| u.login).unwrap_or_default(),
                labels: issue.labels.into_iter().map(|l| l.name).collect(),
                comments: issue.comments,
            })
            .collect();

        debug!(repo = %repo, count = issues.len(), "collected GitHub issues");
        Ok(issues)
    }

    async fn list_comments(
        &self,
        repo: &Repo,
        issue_number: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourceComment>> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_url, repo.owner, repo.name, issue_number
        );
        let mut query = vec![
            ("sort", "created".to_string()),
            ("direction", "asc".to_string()),
            ("per_page", ITEMS_PER_PAGE.to_string()),
        ];
        query.extend(since_param(since));

        let raw: Vec<GhComment> = self
            .get_all(url, query)
            .await
            .with_context(|| format!("Failed to list comments on #{issue_number}"))?;

        Ok(raw
            .into_iter()
            .map(|c| SourceComment {
                id: c.id,
                body: c.body.unwrap_or_default(),
                author: c.user.map(|u| u.login).unwrap_or_default(),
                html_url: c.html_url,
                created_at: c.created_at,
            })
            .collect())
    }

    async fn get_user(&self, login: &str) -> Result<SourceUser> {
        debug!(login, "retrieving GitHub user");
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(login));
        let response = send_with_retry(&self.retry, || {
            self.client
                .get(&url)
                .bearer_auth(&self.token)
                .header("Accept", "application/vnd.github+json")
        })
        .await
        .with_context(|| format!("Failed to retrieve GitHub user {login}"))?;

        let user: GhUser = response
            .json()
            .await
            .context("Failed to parse GitHub user")?;
        Ok(SourceUser {
            login: user.login,
            name: user.name,
            html_url: user.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new("gh-token".into(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(&server.uri())
    }

    fn repo() -> Repo {
        Repo::parse("octo/widgets").unwrap()
    }

    #[test]
    fn parses_next_link() {
        let header = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last""#;
        assert_eq!(next_link(header).as_deref(), Some("https://api.github.com/x?page=2"));
        assert_eq!(next_link(r#"<https://a/x?page=5>; rel="last""#), None);
    }

    #[tokio::test]
    async fn list_issues_drops_pull_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/issues"))
            .and(query_param("state", "all"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 101, "number": 1, "title": "Bug", "body": null,
                    "state": "open", "user": {"login": "alice"},
                    "labels": [{"name": "good first issue"}], "comments": 2
                },
                {
                    "id": 102, "number": 2, "title": "PR", "body": "x",
                    "state": "open", "user": {"login": "bob"},
                    "labels": [], "comments": 0,
                    "pull_request": {"url": "https://api.github.com/pulls/2"}
                }
            ])))
            .mount(&server)
            .await;

        let issues = client(&server).list_issues(&repo(), None).await.unwrap();
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.id, 101);
        assert_eq!(issue.body, "");
        assert_eq!(issue.reporter, "alice");
        assert_eq!(issue.labels, vec!["good first issue".to_string()]);
        assert_eq!(issue.comments, 2);
    }

    #[tokio::test]
    async fn list_issues_follows_pagination() {
        let server = MockServer::start().await;
        let page2 = format!("{}/repos/octo/widgets/issues?page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 2, "number": 2, "title": "b", "state": "open", "user": {"login": "x"}}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/issues"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", format!(r#"<{page2}>; rel="next""#).as_str())
                    .set_body_json(json!([
                        {"id": 1, "number": 1, "title": "a", "state": "open", "user": {"login": "x"}}
                    ])),
            )
            .mount(&server)
            .await;

        let issues = client(&server).list_issues(&repo(), None).await.unwrap();
        let ids: Vec<i64> = issues.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn list_comments_passes_since() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/issues/7/comments"))
            .and(query_param("since", "2020-01-01T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 484163403, "body": "hello", "user": {"login": "bob"},
                    "html_url": "https://github.com/octo/widgets/issues/7#issuecomment-484163403",
                    "created_at": "2020-01-02T03:04:05Z"
                }
            ])))
            .mount(&server)
            .await;

        let since = "2020-01-01T00:00:00Z".parse().unwrap();
        let comments = client(&server)
            .list_comments(&repo(), 7, Some(since))
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, 484163403);
        assert_eq!(comments[0].author, "bob");
    }

    #[tokio::test]
    async fn get_user_reads_display_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/bob"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "bob", "name": "Bob Builder", "html_url": "https://github.com/bob"
            })))
            .mount(&server)
            .await;

        let user = client(&server).get_user("bob").await.unwrap();
        assert_eq!(user.display_name(), Some("Bob Builder"));
        assert_eq!(user.html_url, "https://github.com/bob");
    }
}
