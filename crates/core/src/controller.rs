//! ControllerClient: device-type detection, authenticated HTTPS
//! session, transparent reauthentication, retry/backoff.
//!
//! The wire protocol is abstracted behind [`ControllerTransport`] so the
//! session state machine, retry discipline and reauth logic can be
//! exercised without sockets. [`ReqwestTransport`] is the
//! production implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{ControllerKind, DeviceStats, DeviceType, Event, IPSEvent};
use crate::error::{Result, ScannerError};
use crate::metrics::METRICS;
use crate::retry::BackoffPolicy;

/// HTTP method used by [`ControllerTransport::execute`]. The client only
/// ever needs GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A raw HTTP response, abstracted away from any particular HTTP client.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// `Retry-After`, in whole seconds, when present.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failure, classified uniformly so the retry loop does
/// not need to know about any particular HTTP client's error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connect error: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Other(String),
}

/// Seam between the session state machine and the wire protocol.
#[async_trait]
pub trait ControllerTransport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// Production transport: a single `reqwest::Client` with a persistent
/// cookie jar, so the session cookie captured at login is carried on
/// every subsequent request automatically.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(verify_ssl: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|e| ScannerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ControllerTransport for ReqwestTransport {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        }
        .timeout(timeout);
        if let Some(json_body) = body {
            builder = builder.json(&json_body);
        }

        let resp = builder.send().await.map_err(classify_reqwest_error)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_ascii_lowercase(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = resp.bytes().await.map_err(classify_reqwest_error)?.to_vec();
        Ok(RawResponse { status, headers, body })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Session lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Detecting,
    Authenticating,
    Ready,
    Reauthenticating,
}

/// Maintains a single authenticated HTTPS session to one controller.
pub struct ControllerClient<T: ControllerTransport> {
    transport: T,
    host: String,
    username: String,
    password: String,
    connect_timeout: Duration,
    backoff: BackoffPolicy,
    state: Mutex<SessionState>,
    kind: Mutex<Option<ControllerKind>>,
}

/// Short timeout for the device-type probe, independent of the longer
/// per-request timeout used once connected.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

impl<T: ControllerTransport> ControllerClient<T> {
    pub fn new(
        transport: T,
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        connect_timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            transport,
            host: host.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout,
            backoff: BackoffPolicy::http_default(max_retries),
            state: Mutex::new(SessionState::Disconnected),
            kind: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    pub async fn kind(&self) -> Option<ControllerKind> {
        *self.kind.lock().await
    }

    /// Probe ports 443, 8443, 11443 in that fixed order; the first to
    /// respond determines the device type.
    pub async fn detect_device_type(&self) -> Result<ControllerKind> {
        *self.state.lock().await = SessionState::Detecting;

        for &port in &[443u16, 8443, 11443] {
            let url = format!("https://{}:{}/status", self.host, port);
            match self.transport.execute(Method::Get, &url, None, PROBE_TIMEOUT).await {
                Ok(_resp) => {
                    let kind = ControllerKind::from_port(port)
                        .expect("fixed probe port set always maps to a controller kind");
                    *self.kind.lock().await = Some(kind);
                    debug!(port, ?kind, "controller responded to status probe");
                    return Ok(kind);
                }
                Err(e) => {
                    debug!(port, error = %e, "status probe failed, trying next port");
                }
            }
        }

        *self.state.lock().await = SessionState::Disconnected;
        Err(ScannerError::Connection(format!(
            "no controller port responded on {} within the probe timeout (tried 443, 8443, 11443)",
            self.host
        )))
    }

    /// Authenticate fresh. `detect_device_type` must have run
    /// first. Never logs the password; the username only at debug level.
    pub async fn authenticate(&self) -> Result<()> {
        let kind = self
            .kind()
            .await
            .ok_or_else(|| ScannerError::Connection("must detect_device_type before authenticating".into()))?;

        *self.state.lock().await = SessionState::Authenticating;
        let url = format!("https://{}:{}{}", self.host, kind.port(), kind.login_path());
        let body = serde_json::json!({ "username": self.username, "password": self.password });

        debug!(username = %self.username, ?kind, "authenticating to controller");
        match self.transport.execute(Method::Post, &url, Some(body), self.connect_timeout).await {
            Ok(resp) if (200..300).contains(&resp.status) => {
                *self.state.lock().await = SessionState::Ready;
                Ok(())
            }
            Ok(resp) => {
                *self.state.lock().await = SessionState::Disconnected;
                Err(ScannerError::Authentication {
                    message: format!("login rejected (status {})", resp.status),
                    hint: mfa_sso_hint(&resp)
                        .unwrap_or_else(|| "local account required; verify username and password".to_string()),
                })
            }
            Err(e) => {
                *self.state.lock().await = SessionState::Disconnected;
                Err(ScannerError::Connection(format!("login request failed: {e}")))
            }
        }
    }

    /// Best-effort logout.
    pub async fn logout(&self) {
        let Some(kind) = self.kind().await else { return };
        let url = format!("https://{}:{}/api/logout", self.host, kind.port());
        if let Err(e) = self.transport.execute(Method::Post, &url, None, self.connect_timeout).await {
            warn!(error = %e, "logout request failed (best effort, not propagated)");
        }
        *self.state.lock().await = SessionState::Disconnected;
    }

    fn endpoint_base(&self, kind: ControllerKind) -> String {
        format!(
            "https://{}:{}{}",
            self.host,
            kind.port(),
            if kind.proxied() { "/proxy/network" } else { "" }
        )
    }

    /// The single request primitive every read operation goes through.
    /// Applies exponential backoff on connect/read/timeout errors and
    /// 5xx; special-cases 401 (one transparent reauth, then retry once)
    /// and 429 (`Retry-After`) outside the generic backoff loop.
    async fn do_request(&self, method: Method, path: &str) -> Result<Vec<Value>> {
        let mut reauthed = false;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let kind = self
                .kind()
                .await
                .ok_or_else(|| ScannerError::Connection("not connected to a controller".into()))?;
            let url = format!("{}{}", self.endpoint_base(kind), path);

            match self.transport.execute(method, &url, None, self.connect_timeout).await {
                Ok(resp) if (200..300).contains(&resp.status) => return parse_envelope(&resp),

                Ok(resp) if resp.status == 401 && !reauthed => {
                    reauthed = true;
                    warn!("received 401, performing one transparent reauthentication");
                    *self.state.lock().await = SessionState::Reauthenticating;
                    self.authenticate().await?;
                }

                Ok(resp) if resp.status == 401 => {
                    return Err(ScannerError::Authentication {
                        message: "401 persisted after transparent reauthentication".into(),
                        hint: "session reauth did not resolve the 401; verify credentials are still valid".into(),
                    });
                }

                Ok(resp) if resp.status == 429 => {
                    if attempt >= self.backoff.max_attempts {
                        return Err(ScannerError::Api { status: 429, body: resp.body_text() });
                    }
                    let delay = resp.retry_after().unwrap_or_else(|| self.backoff.delay_for(attempt + 1));
                    tokio::time::sleep(delay).await;
                }

                Ok(resp) if (500..600).contains(&resp.status) => {
                    if attempt >= self.backoff.max_attempts {
                        return Err(ScannerError::Connection(format!(
                            "controller returned {} after {} attempts",
                            resp.status, attempt
                        )));
                    }
                    tokio::time::sleep(self.backoff.delay_for(attempt + 1)).await;
                }

                Ok(resp) => return Err(ScannerError::Api { status: resp.status, body: resp.body_text() }),

                Err(e) => {
                    if attempt >= self.backoff.max_attempts {
                        return Err(ScannerError::Connection(format!("{e} after {attempt} attempts")));
                    }
                    tokio::time::sleep(self.backoff.delay_for(attempt + 1)).await;
                }
            }
        }
    }

    pub async fn list_sites(&self) -> Result<Vec<String>> {
        let data = self.do_request(Method::Get, "/api/self/sites").await?;
        Ok(data
            .into_iter()
            .filter_map(|v| v.get("name").and_then(|n| n.as_str()).map(str::to_string))
            .collect())
    }

    pub async fn get_events(&self, site: &str) -> Result<Vec<Event>> {
        let data = self.do_request(Method::Get, &format!("/api/s/{site}/stat/event")).await?;
        Ok(parse_each(data, parse_raw_event, "event"))
    }

    pub async fn get_ips_events(&self, site: &str) -> Result<Vec<IPSEvent>> {
        let data = self.do_request(Method::Get, &format!("/api/s/{site}/stat/ips/event")).await?;
        Ok(parse_each(data, parse_raw_ips_event, "ips event"))
    }

    pub async fn get_devices(&self, site: &str) -> Result<Vec<DeviceStats>> {
        let data = self.do_request(Method::Get, &format!("/api/s/{site}/stat/device")).await?;
        Ok(parse_each(data, parse_raw_device, "device"))
    }

    /// Not modeled as a core domain type; returned as raw JSON for
    /// the caller to inspect.
    pub async fn get_alarms(&self, site: &str) -> Result<Vec<Value>> {
        self.do_request(Method::Get, &format!("/api/s/{site}/stat/alarm")).await
    }
}

fn mfa_sso_hint(resp: &RawResponse) -> Option<String> {
    let text = resp.body_text().to_ascii_lowercase();
    if text.contains("mfa") || text.contains("2fa") || text.contains("sso") || text.contains("single sign") {
        Some("this account requires MFA/SSO; the scanner needs a local account without MFA enabled".to_string())
    } else {
        None
    }
}

#[derive(Deserialize)]
struct Envelope {
    meta: EnvelopeMeta,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Deserialize)]
struct EnvelopeMeta {
    rc: String,
}

/// All controller responses are `{data: [...], meta: {rc: "ok"|...}}`;
/// `meta.rc != "ok"` is an application-level error.
fn parse_envelope(resp: &RawResponse) -> Result<Vec<Value>> {
    let envelope: Envelope = serde_json::from_slice(&resp.body)
        .map_err(|e| ScannerError::Parse(format!("invalid response envelope: {e}")))?;
    if envelope.meta.rc != "ok" {
        return Err(ScannerError::Api {
            status: resp.status,
            body: format!("meta.rc={}", envelope.meta.rc),
        });
    }
    Ok(envelope.data)
}

/// Parse each raw record with `parser`, counting a `ParseError` and
/// skipping the record (never aborting the batch) on failure.
fn parse_each<F, R>(data: Vec<Value>, parser: F, kind: &'static str) -> Vec<R>
where
    F: Fn(Value) -> std::result::Result<R, String>,
{
    data.into_iter()
        .filter_map(|v| match parser(v) {
            Ok(r) => Some(r),
            Err(reason) => {
                METRICS.inc_parse_error();
                warn!(reason, "dropped malformed {kind}");
                None
            }
        })
        .collect()
}

fn parse_raw_event(v: Value) -> std::result::Result<Event, String> {
    let obj = v.as_object().ok_or("event is not a JSON object")?;
    let event_type = obj
        .get("key")
        .and_then(|k| k.as_str())
        .ok_or("missing `key`")?
        .to_string();
    let time = obj
        .get("time")
        .and_then(|t| t.as_i64())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or("missing or invalid `time`")?;
    let device_mac = ["ap", "sw", "gw", "mac"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(|m| m.as_str()))
        .map(str::to_string);
    let device_name = ["ap_name", "sw_name", "gw_name", "name"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(|m| m.as_str()))
        .map(str::to_string);
    let message = obj.get("msg").and_then(|m| m.as_str()).map(str::to_string);
    let attrs = obj.clone().into_iter().collect();

    Ok(Event {
        event_type,
        time,
        device_mac,
        device_name,
        message,
        attrs,
    })
}

fn parse_raw_ips_event(v: Value) -> std::result::Result<IPSEvent, String> {
    let obj = v.as_object().ok_or("ips event is not a JSON object")?;
    let id = obj
        .get("_id")
        .or_else(|| obj.get("id"))
        .and_then(|x| x.as_str())
        .ok_or("missing id")?
        .to_string();
    let time = obj
        .get("time")
        .and_then(|t| t.as_i64())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or("missing or invalid time")?;
    let src_ip = obj
        .get("src_ip")
        .or_else(|| obj.get("srcIp"))
        .and_then(|x| x.as_str())
        .ok_or("missing src_ip")?
        .to_string();
    let dst_ip = obj
        .get("dst_ip")
        .or_else(|| obj.get("dstIp"))
        .and_then(|x| x.as_str())
        .ok_or("missing dst_ip")?
        .to_string();

    Ok(IPSEvent {
        id,
        time,
        src_ip,
        src_port: obj.get("src_port").and_then(|x| x.as_u64()).map(|p| p as u16),
        dst_ip,
        dst_port: obj.get("dst_port").and_then(|x| x.as_u64()).map(|p| p as u16),
        protocol: obj.get("proto").and_then(|x| x.as_str()).unwrap_or("unknown").to_string(),
        signature: obj
            .get("signature")
            .or_else(|| obj.get("msg"))
            .and_then(|x| x.as_str())
            .unwrap_or("ET UNKNOWN unspecified signature")
            .to_string(),
        signature_id: obj
            .get("signature_id")
            .or_else(|| obj.get("sid"))
            .and_then(|x| x.as_u64())
            .unwrap_or(0),
        category: obj.get("category").and_then(|x| x.as_str()).unwrap_or("UNKNOWN").to_string(),
        severity: crate::domain::ips_event::RawSeverity(
            obj.get("severity").and_then(|x| x.as_u64()).map(|s| s as u8).unwrap_or(3),
        ),
        action: obj
            .get("action")
            .and_then(|x| x.as_str())
            .unwrap_or("detected")
            .to_string(),
    })
}

fn parse_raw_device(v: Value) -> std::result::Result<DeviceStats, String> {
    let obj = v.as_object().ok_or("device is not a JSON object")?;
    let mac = obj.get("mac").and_then(|x| x.as_str()).ok_or("missing mac")?.to_string();
    let name = obj.get("name").and_then(|x| x.as_str()).unwrap_or(&mac).to_string();
    let model = obj.get("model").and_then(|x| x.as_str()).unwrap_or("unknown").to_string();
    let device_type = match obj.get("type").and_then(|x| x.as_str()).unwrap_or("") {
        "uap" => DeviceType::Ap,
        "usw" => DeviceType::Switch,
        "ugw" => DeviceType::Gateway,
        "udm" => DeviceType::Udm,
        _ => DeviceType::Unknown,
    };

    let stats = obj.get("system-stats");
    let cpu_pct = stats
        .and_then(|s| s.get("cpu"))
        .and_then(|c| c.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| obj.get("cpu_pct").and_then(|x| x.as_f64()));
    let mem_pct = stats
        .and_then(|s| s.get("mem"))
        .and_then(|c| c.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| obj.get("mem_pct").and_then(|x| x.as_f64()));

    let uptime_seconds = obj.get("uptime").and_then(|x| x.as_u64());
    let temperature_c = obj
        .get("general_temperature")
        .and_then(|x| x.as_f64())
        .or_else(|| obj.get("temperature").and_then(|x| x.as_f64()));
    let poe_budget_w = obj.get("total_max_power").and_then(|x| x.as_f64());
    let poe_used_w = obj
        .get("poe_power")
        .and_then(|x| x.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| obj.get("poe_power").and_then(|x| x.as_f64()));

    let state = match obj.get("state").and_then(|x| x.as_u64()) {
        Some(1) => "connected".to_string(),
        Some(0) => "disconnected".to_string(),
        Some(n) => format!("state_{n}"),
        None => obj.get("state").and_then(|x| x.as_str()).unwrap_or("unknown").to_string(),
    };
    let last_seen = obj
        .get("last_seen")
        .and_then(|x| x.as_i64())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    Ok(DeviceStats {
        mac,
        name,
        model,
        device_type,
        cpu_pct,
        mem_pct,
        uptime_seconds,
        temperature_c,
        poe_budget_w,
        poe_used_w,
        state,
        last_seen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// A scripted transport: returns the next response from a fixed
    /// queue on each call, recording every request it saw.
    struct MockTransport {
        responses: StdMutex<Vec<std::result::Result<RawResponse, TransportError>>>,
        calls: AtomicUsize,
        seen_urls: StdMutex<Vec<String>>,
    }

    impl MockTransport {
        fn new(responses: Vec<std::result::Result<RawResponse, TransportError>>) -> Self {
            Self {
                responses: StdMutex::new(responses),
                calls: AtomicUsize::new(0),
                seen_urls: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ControllerTransport for MockTransport {
        async fn execute(
            &self,
            _method: Method,
            url: &str,
            _body: Option<Value>,
            _timeout: Duration,
        ) -> std::result::Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_urls.lock().unwrap().push(url.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(TransportError::Other("no more scripted responses".into()));
            }
            responses.remove(0)
        }
    }

    fn ok_response(body: &str) -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 200,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    fn status_response(status: u16, body: &str) -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    fn client(transport: MockTransport) -> ControllerClient<MockTransport> {
        ControllerClient::new(transport, "unifi.example.com", "admin", "secret", Duration::from_secs(5), 3)
    }

    #[tokio::test]
    async fn detect_device_type_classifies_first_responding_port() {
        // 443 fails, 8443 responds -> self_hosted.
        let transport = MockTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
        ]);
        let c = client(transport);
        let kind = c.detect_device_type().await.unwrap();
        assert_eq!(kind, ControllerKind::SelfHosted);
    }

    #[tokio::test]
    async fn detect_device_type_fails_when_no_port_responds() {
        let transport = MockTransport::new(vec![
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Timeout),
        ]);
        let c = client(transport);
        assert!(matches!(c.detect_device_type().await, Err(ScannerError::Connection(_))));
    }

    #[tokio::test]
    async fn authenticate_succeeds_and_sets_ready_state() {
        let transport = MockTransport::new(vec![
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#), // detect on 443
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#), // login
        ]);
        let c = client(transport);
        c.detect_device_type().await.unwrap();
        c.authenticate().await.unwrap();
        assert_eq!(c.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn authenticate_surfaces_mfa_hint() {
        let transport = MockTransport::new(vec![
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            status_response(400, r#"{"error":"MFA required for this account"}"#),
        ]);
        let c = client(transport);
        c.detect_device_type().await.unwrap();
        let err = c.authenticate().await.unwrap_err();
        match err {
            ScannerError::Authentication { hint, .. } => assert!(hint.contains("MFA")),
            other => panic!("expected Authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_401_triggers_one_reauth_then_succeeds() {
        let transport = MockTransport::new(vec![
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#), // detect
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#), // initial login
            status_response(401, "unauthorized"),             // request #1 -> 401
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#), // reauth login
            ok_response(r#"{"meta":{"rc":"ok"},"data":[{"name":"default"}]}"#), // retried request
        ]);
        let c = client(transport);
        c.detect_device_type().await.unwrap();
        c.authenticate().await.unwrap();
        let sites = c.list_sites().await.unwrap();
        assert_eq!(sites, vec!["default".to_string()]);
    }

    #[tokio::test]
    async fn second_401_after_reauth_is_terminal() {
        let transport = MockTransport::new(vec![
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            status_response(401, "unauthorized"),
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#), // reauth succeeds
            status_response(401, "unauthorized"),             // still 401
        ]);
        let c = client(transport);
        c.detect_device_type().await.unwrap();
        c.authenticate().await.unwrap();
        assert!(matches!(c.list_sites().await, Err(ScannerError::Authentication { .. })));
    }

    #[tokio::test]
    async fn non_401_non_429_four_xx_is_never_retried() {
        let transport = MockTransport::new(vec![
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            status_response(403, "forbidden"),
        ]);
        let c = client(transport);
        c.detect_device_type().await.unwrap();
        c.authenticate().await.unwrap();
        assert!(matches!(c.list_sites().await, Err(ScannerError::Api { status: 403, .. })));
    }

    #[tokio::test]
    async fn application_level_rc_error_is_api_error() {
        let transport = MockTransport::new(vec![
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            ok_response(r#"{"meta":{"rc":"ok"},"data":[]}"#),
            ok_response(r#"{"meta":{"rc":"error","msg":"api.err.Invalid"},"data":[]}"#),
        ]);
        let c = client(transport);
        c.detect_device_type().await.unwrap();
        c.authenticate().await.unwrap();
        assert!(matches!(c.list_sites().await, Err(ScannerError::Api { .. })));
    }

    #[test]
    fn malformed_event_is_dropped_not_fatal() {
        let v: Value = serde_json::json!({"no_key_field": true});
        assert!(parse_raw_event(v).is_err());
    }

    #[test]
    fn well_formed_event_parses_device_identity() {
        let v: Value = serde_json::json!({
            "key": "EVT_AP_Lost_Contact",
            "time": 1_769_000_000_000i64,
            "ap": "aa:bb:cc:dd:ee:ff",
            "ap_name": "ap-lobby",
            "msg": "lost contact"
        });
        let event = parse_raw_event(v).unwrap();
        assert_eq!(event.event_type, "EVT_AP_Lost_Contact");
        assert_eq!(event.device_mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(event.device_name.as_deref(), Some("ap-lobby"));
    }

    #[test]
    fn ips_event_requires_both_ips() {
        let missing_dst = serde_json::json!({
            "id": "abc",
            "time": 1_769_000_000_000i64,
            "src_ip": "10.0.0.5"
        });
        assert!(parse_raw_ips_event(missing_dst).is_err());
    }
}
