//! Route table for proxied API calls.
//!
//! Rules are scanned in configuration order and the first rule whose prefix
//! occurs in the request path decides the request. A method missing from
//! that rule rejects the request even if a later rule would allow it.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GatewayError;

/// Methods the dispatcher knows how to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ProxyMethod {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "GET" => Some(ProxyMethod::Get),
            "POST" => Some(ProxyMethod::Post),
            "PUT" => Some(ProxyMethod::Put),
            "DELETE" => Some(ProxyMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMethod::Get => "GET",
            ProxyMethod::Post => "POST",
            ProxyMethod::Put => "PUT",
            ProxyMethod::Delete => "DELETE",
        }
    }

    /// POST and PUT forward the request body.
    pub fn carries_body(&self) -> bool {
        matches!(self, ProxyMethod::Post | ProxyMethod::Put)
    }
}

impl fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(rename = "api")]
    pub api_prefix: String,
    #[serde(default)]
    pub methods: Vec<String>,
    pub destination: String,
    #[serde(rename = "authorization", default = "default_true")]
    pub authorization_required: bool,
}

impl RouteRule {
    pub fn new(api_prefix: &str, methods: &[&str], destination: &str) -> Self {
        Self {
            api_prefix: api_prefix.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            destination: destination.to_string(),
            authorization_required: true,
        }
    }

    /// Mark the route as reachable without an authenticated session.
    pub fn public(mut self) -> Self {
        self.authorization_required = false;
        self
    }

    pub fn matches_path(&self, path: &str) -> bool {
        path.contains(&self.api_prefix)
    }

    pub fn allows(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Upstream URL: destination followed by the full request path.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let base = self.destination.trim_end_matches('/');
        match query.filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{}", base, path, query),
            None => format!("{}{}", base, path),
        }
    }
}

/// A request that passed route matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute<'a> {
    pub rule: &'a RouteRule,
    pub method: ProxyMethod,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Load rules from a JSON array. A missing file yields an empty table.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Route file not found, no routes loaded");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route file: {}", path.display()))?;
        let rules: Vec<RouteRule> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse route file: {}", path.display()))?;

        info!(count = rules.len(), "Loaded routes");
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule whose prefix occurs in `path`.
    pub fn find(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches_path(path))
    }

    /// Match a request against the table.
    ///
    /// Fails with `RouteNotFound` when no rule matches, when the first match
    /// does not list the method, or when the method cannot be forwarded.
    pub fn resolve(
        &self,
        path: &str,
        query: Option<&str>,
        method: &str,
    ) -> Result<ResolvedRoute<'_>, GatewayError> {
        let rule = self.find(path).ok_or(GatewayError::RouteNotFound)?;
        if !rule.allows(method) {
            return Err(GatewayError::RouteNotFound);
        }
        let method = ProxyMethod::parse(method).ok_or(GatewayError::RouteNotFound)?;

        Ok(ResolvedRoute {
            rule,
            method,
            url: rule.target_url(path, query),
        })
    }
}
