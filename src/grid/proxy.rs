//! [`Grid`] over the public grid proxy HTTP API.
//!
//! The proxy answers read-only capacity and twin queries. Anything that has
//! to be signed with the wallet key is reported as unsupported.

use std::time::Duration;

use facet::Facet;

use super::{CapacityNode, Grid, GridError, MachineRecord, NodeFilter, NodeStatus, Resources};
use crate::descriptor::DeploymentDescriptor;
use crate::profile::Network;

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 50;

pub fn proxy_url(network: Network) -> &'static str {
    match network {
        Network::Dev => "https://gridproxy.dev.grid.tf",
        Network::Qa => "https://gridproxy.qa.grid.tf",
        Network::Test => "https://gridproxy.test.grid.tf",
        Network::Main => "https://gridproxy.grid.tf",
    }
}

pub fn relay_url(network: Network) -> &'static str {
    match network {
        Network::Dev => "wss://relay.dev.grid.tf",
        Network::Qa => "wss://relay.qa.grid.tf",
        Network::Test => "wss://relay.test.grid.tf",
        Network::Main => "wss://relay.grid.tf",
    }
}

// ── wire types ───────────────────────────────────────────

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ProxyResources {
    #[facet(default)]
    cru: u64,
    #[facet(default)]
    mru: u64,
    #[facet(default)]
    hru: u64,
    #[facet(default)]
    sru: u64,
}

impl From<ProxyResources> for Resources {
    fn from(r: ProxyResources) -> Self {
        Resources {
            cpu: r.cru,
            memory: r.mru,
            hdd: r.hru,
            ssd: r.sru,
        }
    }
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ProxyLocation {
    #[facet(default)]
    country: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ProxyPublicConfig {
    #[facet(default)]
    ipv4: String,
    #[facet(default)]
    ipv6: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ProxyNode {
    #[facet(rename = "nodeId")]
    #[facet(default)]
    node_id: u32,
    #[facet(rename = "farmId")]
    #[facet(default)]
    farm_id: u32,
    #[facet(default)]
    total_resources: ProxyResources,
    #[facet(default)]
    used_resources: ProxyResources,
    #[facet(default)]
    healthy: bool,
    #[facet(default)]
    rentable: bool,
    #[facet(default)]
    status: String,
    #[facet(default)]
    location: ProxyLocation,
    #[facet(rename = "publicConfig")]
    #[facet(default)]
    public_config: ProxyPublicConfig,
}

impl ProxyNode {
    fn into_capacity(self) -> CapacityNode {
        CapacityNode {
            node_id: self.node_id,
            farm_id: self.farm_id,
            total: self.total_resources.into(),
            used: self.used_resources.into(),
            healthy: self.healthy,
            rentable: self.rentable,
            has_public_ipv4: !self.public_config.ipv4.is_empty(),
            has_public_ipv6: !self.public_config.ipv6.is_empty(),
            // The proxy reports unreachable nodes with assorted strings.
            status: self.status.parse().unwrap_or(NodeStatus::Down),
            country: self.location.country,
        }
    }
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct ProxyTwin {
    #[facet(rename = "twinId")]
    #[facet(default)]
    twin_id: u32,
}

// ── client ───────────────────────────────────────────────

pub struct ProxyGrid {
    client: reqwest::Client,
    base_url: String,
    twin: Option<u32>,
}

impl ProxyGrid {
    /// A session for `network`. `twin` is the twin id recorded in the
    /// profile, if any; the proxy cannot derive it from the mnemonic.
    pub fn new(network: Network, twin: Option<u32>) -> Result<Self, GridError> {
        Self::with_base_url(proxy_url(network), twin)
    }

    pub fn with_base_url(base_url: &str, twin: Option<u32>) -> Result<Self, GridError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| GridError::Request {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            twin,
        })
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, GridError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!("GET {url} {query:?}");

        let request_err = |source| GridError::Request {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        let body = response.text().await.map_err(request_err)?;
        if !status.is_success() {
            return Err(GridError::Response {
                url,
                message: format!("HTTP {status}: {}", body.trim()),
            });
        }
        Ok(body)
    }

    fn unsupported<T>(operation: &str) -> Result<T, GridError> {
        Err(GridError::Unsupported {
            operation: operation.to_string(),
        })
    }
}

impl Grid for ProxyGrid {
    async fn connect(&mut self) -> Result<(), GridError> {
        self.get_text("/ping", &[]).await?;

        if let Some(twin) = self.twin {
            let body = self
                .get_text("/twins", &[("twin_id", twin.to_string())])
                .await?;
            let twins: Vec<ProxyTwin> =
                facet_json::from_str(&body).map_err(|e| GridError::Response {
                    url: format!("{}/twins", self.base_url),
                    message: e.to_string(),
                })?;
            if !twins.iter().any(|t| t.twin_id == twin) {
                return Err(GridError::TwinNotFound);
            }
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), GridError> {
        // Plain HTTP, nothing to tear down.
        Ok(())
    }

    async fn twin_id(&self) -> Result<u32, GridError> {
        match self.twin {
            Some(id) => Ok(id),
            None => Self::unsupported("resolving the twin of a mnemonic"),
        }
    }

    async fn create_twin(&mut self, _relay: &str) -> Result<u32, GridError> {
        Self::unsupported("twin creation")
    }

    async fn balance(&self) -> Result<String, GridError> {
        Self::unsupported("balance lookup")
    }

    async fn ssh_key(&self) -> Result<Option<String>, GridError> {
        Self::unsupported("reading chain metadata")
    }

    async fn nodes(&self, filter: &NodeFilter) -> Result<Vec<CapacityNode>, GridError> {
        let mut query = vec![("size", PAGE_SIZE.to_string())];
        if let Some(status) = filter.status {
            query.push(("status", status.to_string()));
        }
        if let Some(healthy) = filter.healthy {
            query.push(("healthy", healthy.to_string()));
        }
        if let Some(rentable) = filter.rentable {
            query.push(("rentable", rentable.to_string()));
        }

        let mut nodes = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut page_query = query.clone();
            page_query.push(("page", page.to_string()));

            let body = self.get_text("/nodes", &page_query).await?;
            let batch: Vec<ProxyNode> =
                facet_json::from_str(&body).map_err(|e| GridError::Response {
                    url: format!("{}/nodes", self.base_url),
                    message: e.to_string(),
                })?;

            let last_page = batch.len() < PAGE_SIZE;
            nodes.extend(batch.into_iter().map(ProxyNode::into_capacity));
            if last_page {
                break;
            }
        }
        Ok(nodes)
    }

    async fn deploy(&mut self, _deployment: &DeploymentDescriptor) -> Result<(), GridError> {
        Self::unsupported("deployment submission")
    }

    async fn machines(&self, _deployment: &str) -> Result<Vec<MachineRecord>, GridError> {
        Self::unsupported("listing deployed machines")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_node_maps_to_capacity() {
        let body = r#"[{
            "id": "node-11",
            "nodeId": 11,
            "farmId": 1,
            "twinId": 29,
            "total_resources": {"cru": 8, "sru": 512000000000, "hru": 2000000000000, "mru": 17179869184, "ipv4u": 0},
            "used_resources": {"cru": 2, "sru": 0, "hru": 100000000000, "mru": 4294967296, "ipv4u": 0},
            "location": {"country": "Belgium", "city": "Lochristi"},
            "publicConfig": {"domain": "", "gw4": "185.206.122.1", "gw6": "", "ipv4": "185.206.122.33/24", "ipv6": ""},
            "status": "up",
            "healthy": true,
            "rentable": true,
            "rented": false
        }]"#;

        let nodes: Vec<ProxyNode> = facet_json::from_str(body).unwrap();
        let node = nodes.into_iter().next().unwrap().into_capacity();
        assert_eq!(node.node_id, 11);
        assert_eq!(node.farm_id, 1);
        assert_eq!(node.available().cpu, 6);
        assert_eq!(node.available().memory, 12884901888);
        assert!(node.has_public_ipv4);
        assert!(!node.has_public_ipv6);
        assert_eq!(node.status, NodeStatus::Up);
        assert_eq!(node.country, "Belgium");
    }

    #[test]
    fn unknown_status_counts_as_down() {
        let nodes: Vec<ProxyNode> =
            facet_json::from_str(r#"[{"nodeId": 3, "status": "offline"}]"#).unwrap();
        let node = nodes.into_iter().next().unwrap().into_capacity();
        assert_eq!(node.status, NodeStatus::Down);
        assert!(!node.healthy);
    }

    #[test]
    fn every_network_has_endpoints() {
        for network in Network::ALL {
            assert!(proxy_url(network).starts_with("https://gridproxy."));
            assert!(relay_url(network).starts_with("wss://relay."));
        }
    }

    #[tokio::test]
    async fn signing_operations_are_unsupported() {
        let mut grid = ProxyGrid::with_base_url("http://127.0.0.1:9", None).unwrap();
        assert!(matches!(
            grid.balance().await,
            Err(GridError::Unsupported { .. })
        ));
        assert!(matches!(
            grid.twin_id().await,
            Err(GridError::Unsupported { .. })
        ));
        assert!(matches!(
            grid.create_twin("wss://relay.dev.grid.tf").await,
            Err(GridError::Unsupported { .. })
        ));
    }
}
