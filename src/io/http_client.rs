//! Reqwest-backed account service
//!
//! `HttpAccountService` owns transport details only: endpoint URLs, bearer
//! auth, timeouts, status mapping and JSON decoding into client types.
//!
//! # Error mapping
//!
//! ```text
//! connect / timeout     → Network  ("Cannot connect to server. ...")
//! 401 / 403             → Auth     (server `detail`, or a fallback)
//! other non-2xx         → Server   (server `detail`, or "Request failed with status N")
//! 2xx that won't decode → InvalidResponse
//! committed, re-read failed → BalanceUnavailable
//! ```
//!
//! Mutations are sent exactly once and never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::core::traits::{AccountService, MovementRequest, RegistrationRequest, TransferRequest};
use crate::types::{
    AccountId, AccountSnapshot, AuthSession, AuthToken, BankingError, CounterpartySummary,
    DashboardStats, Identity, Transaction, TransactionHistoryPage, TransactionId,
    TransactionResult,
};

/// Account service that talks to the remote JSON API
#[derive(Debug, Clone)]
pub struct HttpAccountService {
    client: Client,
    base_url: Url,
}

impl HttpAccountService {
    /// Create a service rooted at `base_url`
    ///
    /// Endpoint paths are resolved relative to `base_url`, so
    /// `http://host/api/v1` and `http://host/api/v1/` are equivalent.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the URL does not parse or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BankingError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BankingError::config(format!("cannot build HTTP client ({e})")))?;
        Ok(HttpAccountService { client, base_url })
    }

    /// Create a service from the client configuration
    ///
    /// # Errors
    ///
    /// Same as [`HttpAccountService::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, BankingError> {
        Self::new(&config.base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BankingError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BankingError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let error = map_status_error(status, body.as_ref());
            debug!(status = status.as_u16(), error = %error, "Request rejected");
            return Err(error);
        }
        decode(body.as_ref())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &AuthToken,
        path: &str,
        query: &[(&str, u32)],
    ) -> Result<T, BankingError> {
        let url = self.endpoint(path)?;
        let request = self.client.get(url).bearer_auth(token.as_str()).query(query);
        self.send(request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        token: Option<&AuthToken>,
        path: &str,
        body: &B,
    ) -> Result<T, BankingError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.post(url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }
        self.send(request).await
    }

    /// Resolve the post-mutation snapshot
    ///
    /// Uses the account embedded in the response when there is one. Otherwise
    /// the account is re-read from the server; per-leg balances in the
    /// response are ignored. A failed re-read becomes `BalanceUnavailable`,
    /// since the server has already committed the transaction.
    async fn finish_mutation(
        &self,
        token: &AuthToken,
        account_id: AccountId,
        response: MutationResponseDto,
        counterparty: Option<CounterpartySummary>,
    ) -> Result<TransactionResult, BankingError> {
        let transaction_id = response.transaction_id().ok_or_else(|| {
            BankingError::invalid_response("transaction response has no transaction id")
        })?;
        let account = match response.account {
            Some(account) => account,
            None => self.fetch_account(token, account_id).await.map_err(|e| {
                warn!(transaction_id, error = %e, "Submitted, but account refresh failed");
                BankingError::balance_unavailable(transaction_id, &e)
            })?,
        };
        Ok(TransactionResult {
            transaction_id,
            account,
            counterparty,
        })
    }
}

#[async_trait]
impl AccountService for HttpAccountService {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, BankingError> {
        let body = LoginBody { email, password };
        let response: AuthResponseDto = self.post(None, "auth/login", &body).await?;
        response.into_session()
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<AuthSession, BankingError> {
        let body = RegisterBody {
            name: &request.name,
            email: &request.email,
            password: &request.password,
            initial_deposit: request.initial_deposit,
        };
        let response: AuthResponseDto = self.post(None, "auth/register", &body).await?;
        response.into_session()
    }

    async fn fetch_account(
        &self,
        token: &AuthToken,
        account_id: AccountId,
    ) -> Result<AccountSnapshot, BankingError> {
        self.get(token, &format!("accounts/{account_id}"), &[]).await
    }

    async fn fetch_history(
        &self,
        token: &AuthToken,
        account_id: AccountId,
        limit: u32,
        offset: u32,
    ) -> Result<TransactionHistoryPage, BankingError> {
        let response: HistoryResponseDto = self
            .get(
                token,
                &format!("accounts/{account_id}/history"),
                &[("limit", limit), ("offset", offset)],
            )
            .await?;
        Ok(TransactionHistoryPage::new(response.transactions, limit, offset))
    }

    async fn fetch_stats(
        &self,
        token: &AuthToken,
        account_id: AccountId,
        days: u32,
    ) -> Result<DashboardStats, BankingError> {
        self.get(token, &format!("accounts/{account_id}/stats"), &[("days", days)])
            .await
    }

    async fn deposit(
        &self,
        token: &AuthToken,
        request: &MovementRequest,
    ) -> Result<TransactionResult, BankingError> {
        let response: MutationResponseDto = self
            .post(Some(token), "transactions/deposit", &MovementBody::from(request))
            .await?;
        self.finish_mutation(token, request.account_id, response, None)
            .await
    }

    async fn withdraw(
        &self,
        token: &AuthToken,
        request: &MovementRequest,
    ) -> Result<TransactionResult, BankingError> {
        let response: MutationResponseDto = self
            .post(Some(token), "transactions/withdraw", &MovementBody::from(request))
            .await?;
        self.finish_mutation(token, request.account_id, response, None)
            .await
    }

    async fn transfer(
        &self,
        token: &AuthToken,
        request: &TransferRequest,
    ) -> Result<TransactionResult, BankingError> {
        let body = TransferBody {
            from_account_id: request.from_account_id,
            to_account_number: &request.to_account_number,
            amount: request.amount,
            description: &request.description,
        };
        let response: MutationResponseDto = self
            .post(Some(token), "transactions/transfer-by-account", &body)
            .await?;
        let counterparty = response.counterparty(request);
        self.finish_mutation(token, request.from_account_id, response, Some(counterparty))
            .await
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, BankingError> {
    serde_json::from_slice(body).map_err(|e| BankingError::invalid_response(e.to_string()))
}

/// Map a non-2xx response to the client error taxonomy
fn map_status_error(status: StatusCode, body: &[u8]) -> BankingError {
    let detail = serde_json::from_slice::<ErrorBodyDto>(body)
        .ok()
        .and_then(ErrorBodyDto::into_message);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BankingError::auth(
            detail.unwrap_or_else(|| "Authentication failed".to_string()),
        ),
        _ => BankingError::server(
            status.as_u16(),
            detail.unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
        ),
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    initial_deposit: Decimal,
}

#[derive(Serialize)]
struct MovementBody<'a> {
    account_id: AccountId,
    amount: Decimal,
    description: &'a str,
}

impl<'a> From<&'a MovementRequest> for MovementBody<'a> {
    fn from(request: &'a MovementRequest) -> Self {
        MovementBody {
            account_id: request.account_id,
            amount: request.amount,
            description: &request.description,
        }
    }
}

#[derive(Serialize)]
struct TransferBody<'a> {
    from_account_id: AccountId,
    to_account_number: &'a str,
    amount: Decimal,
    description: &'a str,
}

#[derive(Deserialize)]
struct AuthResponseDto {
    user: Identity,
    token: AuthToken,
    account: Option<AccountSnapshot>,
}

impl AuthResponseDto {
    fn into_session(self) -> Result<AuthSession, BankingError> {
        let snapshot = self
            .account
            .ok_or_else(|| BankingError::invalid_response("sign-in response has no account"))?;
        Ok(AuthSession {
            identity: self.user,
            token: self.token,
            snapshot,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponseDto {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// One side of a transfer as the server reports it
#[derive(Deserialize, Default)]
struct TransferLegDto {
    #[serde(default)]
    account_number: Option<String>,
    #[serde(default, alias = "owner_name")]
    name: Option<String>,
    #[serde(default)]
    transaction: Option<Transaction>,
}

/// Tolerant decoding of deposit / withdraw / transfer responses
#[derive(Deserialize)]
struct MutationResponseDto {
    #[serde(default)]
    transaction_id: Option<TransactionId>,
    #[serde(default)]
    transaction: Option<Transaction>,
    #[serde(default)]
    account: Option<AccountSnapshot>,
    #[serde(default)]
    from_account: Option<TransferLegDto>,
    #[serde(default)]
    to_account: Option<TransferLegDto>,
}

impl MutationResponseDto {
    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
            .or_else(|| self.transaction.as_ref().map(|t| t.id))
            .or_else(|| {
                self.from_account
                    .as_ref()
                    .and_then(|leg| leg.transaction.as_ref())
                    .map(|t| t.id)
            })
    }

    fn counterparty(&self, request: &TransferRequest) -> CounterpartySummary {
        let leg = self.to_account.as_ref();
        CounterpartySummary {
            account_number: leg
                .and_then(|l| l.account_number.clone())
                .unwrap_or_else(|| request.to_account_number.clone()),
            name: leg.and_then(|l| l.name.clone()),
            amount: request.amount,
        }
    }
}

/// FastAPI-style error body: `detail` is a string or a list of `{msg}` items
#[derive(Deserialize)]
struct ErrorBodyDto {
    detail: serde_json::Value,
}

impl ErrorBodyDto {
    fn into_message(self) -> Option<String> {
        match self.detail {
            serde_json::Value::String(message) if !message.trim().is_empty() => Some(message),
            serde_json::Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> HttpAccountService {
        HttpAccountService::new(&format!("{}/api/v1", server.uri()), Duration::from_secs(5))
            .unwrap()
    }

    fn transfer_request() -> TransferRequest {
        TransferRequest {
            from_account_id: 1,
            to_account_number: "ACC-000042".to_string(),
            amount: Decimal::new(20, 0),
            description: String::new(),
        }
    }

    async fn mount_transfer(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/api/v1/transactions/transfer-by-account"))
            .and(header("authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[rstest]
    #[case::no_slash("http://localhost:8000/api/v1")]
    #[case::trailing_slash("http://localhost:8000/api/v1/")]
    fn test_endpoints_resolve_under_base_path(#[case] base: &str) {
        let service = HttpAccountService::new(base, Duration::from_secs(5)).unwrap();

        assert_eq!(
            service.endpoint("auth/login").unwrap().as_str(),
            "http://localhost:8000/api/v1/auth/login"
        );
        assert_eq!(
            service.endpoint("accounts/42/history").unwrap().as_str(),
            "http://localhost:8000/api/v1/accounts/42/history"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpAccountService::new("localhost without scheme", Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, BankingError::Config { .. }));
    }

    #[rstest]
    #[case::login_rejected(
        StatusCode::UNAUTHORIZED,
        r#"{"detail": "Invalid email or password"}"#,
        BankingError::auth("Invalid email or password")
    )]
    #[case::forbidden_without_body(
        StatusCode::FORBIDDEN,
        "",
        BankingError::auth("Authentication failed")
    )]
    #[case::insufficient_funds(
        StatusCode::BAD_REQUEST,
        r#"{"detail": "Insufficient funds"}"#,
        BankingError::server(400, "Insufficient funds")
    )]
    #[case::validation_list(
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"detail": [{"loc": ["body", "amount"], "msg": "Input should be greater than 0"}]}"#,
        BankingError::server(422, "Input should be greater than 0")
    )]
    #[case::html_error_page(
        StatusCode::BAD_GATEWAY,
        "<html>Bad Gateway</html>",
        BankingError::server(502, "Request failed with status 502")
    )]
    #[case::blank_detail(
        StatusCode::NOT_FOUND,
        r#"{"detail": "  "}"#,
        BankingError::server(404, "Request failed with status 404")
    )]
    fn test_status_error_mapping(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: BankingError,
    ) {
        assert_eq!(map_status_error(status, body.as_bytes()), expected);
    }

    #[test]
    fn test_auth_response_decodes_into_session() {
        let body = br#"{
            "message": "Login successful!",
            "user": {"id": 7, "name": "Ada Lovelace", "email": "ada@example.com"},
            "account": {"id": 3, "account_number": "ACC-000003", "balance": 250.5},
            "token": "jwt-token"
        }"#;

        let session = decode::<AuthResponseDto>(body).unwrap().into_session().unwrap();
        assert_eq!(session.identity.id, 7);
        assert_eq!(session.token.as_str(), "jwt-token");
        assert_eq!(session.snapshot.balance, Decimal::new(2505, 1));
    }

    #[test]
    fn test_auth_response_without_account_is_invalid() {
        let body = br#"{"user": {"id": 7, "email": "ada@example.com"}, "token": "t"}"#;
        let err = decode::<AuthResponseDto>(body).unwrap().into_session().unwrap_err();
        assert!(matches!(err, BankingError::InvalidResponse { .. }));
    }

    #[test]
    fn test_undecodable_success_body_is_invalid_response() {
        let err = decode::<HistoryResponseDto>(b"not json").unwrap_err();
        assert!(matches!(err, BankingError::InvalidResponse { .. }));
    }

    #[test]
    fn test_transfer_response_counterparty_and_id() {
        let body = br#"{
            "transaction_id": 91,
            "from_account": {"new_balance": 80.0},
            "to_account": {"account_number": "ACC-000042", "owner_name": "Grace Hopper"}
        }"#;
        let response = decode::<MutationResponseDto>(body).unwrap();

        assert_eq!(response.transaction_id(), Some(91));
        let counterparty = response.counterparty(&transfer_request());
        assert_eq!(counterparty.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(counterparty.amount, Decimal::new(20, 0));
        assert!(response.account.is_none());
    }

    #[test]
    fn test_movement_response_takes_id_from_transaction() {
        let body = br#"{
            "transaction": {
                "id": 12, "account_id": 1, "transaction_type": "CREDIT", "amount": "50.00",
                "balance_after": "149.50", "created_at": "2024-03-01T10:00:00"
            },
            "account": {"id": 1, "account_number": "ACC-000001", "balance": "149.50"}
        }"#;
        let response = decode::<MutationResponseDto>(body).unwrap();

        assert_eq!(response.transaction_id(), Some(12));
        assert_eq!(
            response.account.map(|a| a.balance),
            Some(Decimal::new(14950, 2))
        );
    }

    #[test]
    fn test_request_bodies_use_wire_field_names() {
        let request = MovementRequest {
            account_id: 1,
            amount: Decimal::new(5000, 2),
            description: "Paycheck".to_string(),
        };
        let json = serde_json::to_value(MovementBody::from(&request)).unwrap();
        assert_eq!(json["account_id"], 1);
        assert_eq!(json["description"], "Paycheck");
        assert_eq!(json["amount"], "50.00");
    }

    #[tokio::test]
    async fn test_transfer_without_account_rereads_it_once() {
        let server = MockServer::start().await;
        mount_transfer(
            &server,
            json!({
                "transaction_id": 91,
                "from_account": {"new_balance": 999.0},
                "to_account": {"account_number": "ACC-000042", "owner_name": "Grace Hopper"}
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "account_number": "ACC-000001", "balance": "79.75"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = service_for(&server)
            .transfer(&AuthToken::new("jwt-token"), &transfer_request())
            .await
            .unwrap();

        assert_eq!(result.transaction_id, 91);
        assert_eq!(result.account.balance, Decimal::new(7975, 2));
        let counterparty = result.counterparty.unwrap();
        assert_eq!(counterparty.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_embedded_account_skips_reread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/transactions/deposit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transaction_id": 12,
                "account": {"id": 1, "account_number": "ACC-000001", "balance": "149.50"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let request = MovementRequest {
            account_id: 1,
            amount: Decimal::new(50, 0),
            description: String::new(),
        };

        let result = service_for(&server)
            .deposit(&AuthToken::new("jwt-token"), &request)
            .await
            .unwrap();

        assert_eq!(result.account.balance, Decimal::new(14950, 2));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reread_reports_committed_transaction() {
        let server = MockServer::start().await;
        mount_transfer(&server, json!({"transaction_id": 91, "from_account": {}})).await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = service_for(&server)
            .transfer(&AuthToken::new("jwt-token"), &transfer_request())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BankingError::balance_unavailable(
                91,
                &BankingError::server(503, "Request failed with status 503")
            )
        );
        assert!(err.is_committed());
    }

    #[tokio::test]
    async fn test_response_without_transaction_id_is_invalid() {
        let server = MockServer::start().await;
        mount_transfer(&server, json!({"from_account": {"new_balance": 80.0}})).await;

        let err = service_for(&server)
            .transfer(&AuthToken::new("jwt-token"), &transfer_request())
            .await
            .unwrap_err();

        assert!(matches!(err, BankingError::InvalidResponse { .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
