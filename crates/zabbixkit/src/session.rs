//! Authenticated JSON-RPC session.
//!
//! A [`Session`] is created by `user.login` and ends with `user.logout`.
//! Call [`Session::logout`] to observe logout errors; a session that is
//! dropped without it still logs out, ignoring the outcome.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Host, HostUpdate, InterfaceSpec, NewHost, wire};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Largest response body read; the managed-group `host.get` is not paginated.
const MAX_RESPONSE_SIZE: u64 = 1024 * 1024 * 1024;

/// Interface fields requested with every host.
const INTERFACE_FIELDS: &[&str] = &["interfaceid", "ip", "dns", "port", "main", "type", "details"];

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Deserialize)]
struct Response<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

/// `host.get` parameters shared by every host lookup.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HostQuery<'a> {
    output: [&'static str; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    groupids: Option<[u64; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostids: Option<&'a [u64]>,
    select_interfaces: &'static [&'static str],
    select_host_groups: [&'static str; 1],
    select_parent_templates: [&'static str; 1],
}

impl<'a> HostQuery<'a> {
    fn new(group_id: Option<u64>, host_ids: Option<&'a [u64]>) -> Self {
        Self {
            output: ["hostid", "host", "name", "status"],
            groupids: group_id.map(|id| [id]),
            hostids: host_ids,
            select_interfaces: INTERFACE_FIELDS,
            select_host_groups: ["groupid"],
            select_parent_templates: ["templateid"],
        }
    }
}

#[derive(Serialize)]
struct InterfaceParams<'a> {
    #[serde(flatten)]
    owner: InterfaceOwner,
    #[serde(flatten)]
    spec: &'a InterfaceSpec,
}

#[derive(Serialize)]
enum InterfaceOwner {
    #[serde(rename = "hostid", with = "wire::id")]
    Host(u64),
    #[serde(rename = "interfaceid", with = "wire::id")]
    Interface(u64),
}

#[derive(Deserialize)]
struct HostIds {
    #[serde(rename = "hostid", with = "wire::id")]
    host_id: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedIds {
    #[serde(alias = "hostids", alias = "interfaceids")]
    ids: Vec<Id>,
}

#[derive(Debug, Deserialize)]
struct Id(#[serde(with = "wire::id")] u64);

impl CreatedIds {
    fn first(self, method: &str) -> Result<u64> {
        self.ids
            .first()
            .map(|id| id.0)
            .ok_or_else(|| Error::InvalidResponse(format!("{method} returned no ids")))
    }
}

/// Parse a JSON-RPC response body for `method`.
fn parse_response<R: DeserializeOwned>(method: &str, body: &str) -> Result<R> {
    let response: Response<R> = serde_json::from_str(body)?;
    match (response.result, response.error) {
        (_, Some(err)) => Err(Error::api(method, err.code, err.message, err.data)),
        (Some(result), None) => Ok(result),
        (None, None) => Err(Error::InvalidResponse(format!(
            "{method} returned neither result nor error"
        ))),
    }
}

/// An authenticated Zabbix API session.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use zabbixkit::backend::Backend;
/// use zabbixkit::Session;
///
/// let session = Session::login(
///     "https://zabbix.example.com/api_jsonrpc.php",
///     "Admin",
///     "zabbix",
///     Duration::from_secs(30),
/// )
/// .unwrap();
/// let hosts = session.hosts_in_group(42).unwrap();
/// println!("{} managed hosts", hosts.len());
/// session.logout().unwrap();
/// ```
pub struct Session {
    agent: ureq::Agent,
    url: String,
    token: Option<String>,
    next_id: AtomicU64,
}

impl Session {
    /// Log in as `user` and return the authenticated session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Login` if the credentials are refused and an HTTP
    /// error if the API cannot be reached.
    pub fn login(
        url: impl Into<String>,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let mut session = Self {
            agent,
            url: url.into(),
            token: None,
            next_id: AtomicU64::new(1),
        };

        let token: String = session
            .send(
                "user.login",
                json!({ "username": user, "password": password }),
                None,
            )
            .map_err(|err| match err {
                Error::Api { .. } => Error::Login {
                    user: user.to_string(),
                    message: err.detail(),
                },
                other => other,
            })?;
        session.token = Some(token);
        Ok(session)
    }

    /// Call an API method with the session token.
    pub fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
        let token = self.token.as_deref().ok_or(Error::SessionClosed)?;
        self.send(method, params, Some(token))
    }

    /// End the session.
    pub fn logout(mut self) -> Result<()> {
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        if self.token.is_none() {
            return Ok(());
        }
        let result = self.call::<_, bool>("user.logout", json!([])).map(|_| ());
        self.token = None;
        result
    }

    fn send<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
        token: Option<&str>,
    ) -> Result<R> {
        let request = Request {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let mut builder = self.agent.post(&self.url);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let body = builder
            .send_json(&request)?
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_SIZE)
            .read_to_string()?;

        parse_response(method, &body)
    }

    fn hosts(&self, group_id: Option<u64>, host_ids: Option<&[u64]>) -> Result<Vec<Host>> {
        self.call("host.get", HostQuery::new(group_id, host_ids))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl Backend for Session {
    fn hosts_in_group(&self, group_id: u64) -> Result<Vec<Host>> {
        self.hosts(Some(group_id), None)
    }

    fn hosts_by_ip(&self, ip: &str, group_id: Option<u64>) -> Result<Vec<Host>> {
        let owners: Vec<HostIds> = self.call(
            "hostinterface.get",
            json!({ "output": ["hostid"], "filter": { "ip": ip } }),
        )?;
        let host_ids: Vec<u64> = owners
            .into_iter()
            .map(|o| o.host_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if host_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.hosts(group_id, Some(&host_ids))
    }

    fn create_host(&self, host: &NewHost) -> Result<u64> {
        self.call::<_, CreatedIds>("host.create", host)?
            .first("host.create")
    }

    fn update_host(&self, update: &HostUpdate) -> Result<()> {
        self.call::<_, serde_json::Value>("host.update", update)
            .map(|_| ())
    }

    fn create_interface(&self, host_id: u64, interface: &InterfaceSpec) -> Result<u64> {
        let params = InterfaceParams {
            owner: InterfaceOwner::Host(host_id),
            spec: interface,
        };
        self.call::<_, CreatedIds>("hostinterface.create", params)?
            .first("hostinterface.create")
    }

    fn update_interface(&self, interface_id: u64, interface: &InterfaceSpec) -> Result<()> {
        let params = InterfaceParams {
            owner: InterfaceOwner::Interface(interface_id),
            spec: interface,
        };
        self.call::<_, serde_json::Value>("hostinterface.update", params)
            .map(|_| ())
    }

    fn delete_interfaces(&self, interface_ids: &[u64]) -> Result<()> {
        let ids: Vec<String> = interface_ids.iter().map(u64::to_string).collect();
        self.call::<_, serde_json::Value>("hostinterface.delete", ids)
            .map(|_| ())
    }
}
