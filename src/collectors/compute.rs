//! Compute Engine collectors: instances, networks, subnetworks, firewalls

use super::standard_columns;
use crate::gcp::ClientSet;
use crate::resource::fetcher::{fetch_all, fetch_one, json_path, json_str, ListRequest};
use crate::resource::normalize::{labels, short_name, timestamp_value, KeyValues};
use crate::resource::{Collected, Collector, Column, NameKind, Resource, RunContext, GLOBAL_REGION};
use anyhow::{Context, Result};
use serde_json::Value;

const CATEGORY: &str = "compute";

/// Elements of the array at `path`
fn array<'a>(item: &'a Value, path: &str) -> &'a [Value] {
    json_path(item, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// String field `key` of every element of the array at `path`
fn strings<'a>(item: &'a Value, path: &str, key: &str) -> Vec<&'a str> {
    array(item, path)
        .iter()
        .filter_map(|element| json_str(element, key))
        .collect()
}

fn base_resource(item: &Value, sub1: &str, region: &str) -> Resource {
    Resource::new(CATEGORY, json_str(item, "name").unwrap_or_default(), region)
        .sub1(sub1)
        .with_arn(json_str(item, "selfLink").unwrap_or_default())
}

// =============================================================================
// VM instances
// =============================================================================

pub struct InstancesCollector {
    clients: ClientSet,
}

impl InstancesCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }

    async fn instance(&self, ctx: &RunContext, region: &str, zone: &str, item: &Value) -> Resource {
        let subnet_link = json_str(item, "networkInterfaces.0.subnetwork").unwrap_or_default();
        let subnet = ctx
            .names
            .resolve_name(&ctx.cancel, NameKind::Subnetwork, region, subnet_link)
            .await;

        let nics = array(item, "networkInterfaces");
        let internal_ips: Vec<&str> = nics.iter().filter_map(|n| json_str(n, "networkIP")).collect();
        let external_ips: Vec<&str> = nics
            .iter()
            .flat_map(|n| strings(n, "accessConfigs", "natIP"))
            .collect();

        base_resource(item, "Instance", region)
            .with("Zone", zone)
            .with(
                "MachineType",
                json_str(item, "machineType").map(short_name),
            )
            .with("Status", item.get("status"))
            .with("Subnetwork", subnet)
            .with("InternalIP", internal_ips)
            .with("ExternalIP", external_ips)
            .with("ServiceAccounts", strings(item, "serviceAccounts", "email"))
            .with("NetworkTags", json_path(item, "tags.items"))
            .with("Labels", labels(item.get("labels")))
            .with("Preemptible", json_path(item, "scheduling.preemptible"))
            .with("DeletionProtection", item.get("deletionProtection"))
            .with("Created", timestamp_value(item.get("creationTimestamp")))
    }
}

#[async_trait::async_trait]
impl Collector for InstancesCollector {
    fn name(&self) -> &str {
        "compute-instances"
    }

    fn columns(&self) -> Vec<Column> {
        standard_columns(&[
            "Zone",
            "MachineType",
            "Status",
            "Subnetwork",
            "InternalIP",
            "ExternalIP",
            "ServiceAccounts",
            "NetworkTags",
            "Labels",
            "Preemptible",
            "DeletionProtection",
            "Created",
        ])
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        let client = self.clients.get(region)?;

        let region_info = fetch_one(client, &client.compute_region_url(), &ctx.cancel)
            .await
            .with_context(|| format!("Failed to describe region {}", region))?;
        let zones: Vec<String> = array(&region_info, "zones")
            .iter()
            .filter_map(Value::as_str)
            .map(short_name)
            .collect();

        let mut out = Collected::new();
        for zone in &zones {
            let request = ListRequest::new(client.compute_zonal_url(zone, "instances"), "items");
            let items = fetch_all(client, &request, &ctx.cancel)
                .await
                .with_context(|| format!("Failed to list instances in {}", zone))?;

            for item in &items {
                out.push(self.instance(ctx, region, zone, item).await);
            }
        }

        Ok(out)
    }
}

// =============================================================================
// VPC networks (global)
// =============================================================================

pub struct NetworksCollector {
    clients: ClientSet,
}

impl NetworksCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

fn subnet_mode(item: &Value) -> &'static str {
    if item.get("IPv4Range").is_some() {
        return "legacy";
    }
    match item.get("autoCreateSubnetworks").and_then(Value::as_bool) {
        Some(true) => "auto",
        _ => "custom",
    }
}

#[async_trait::async_trait]
impl Collector for NetworksCollector {
    fn name(&self) -> &str {
        "compute-networks"
    }

    fn columns(&self) -> Vec<Column> {
        standard_columns(&["SubnetMode", "RoutingMode", "Subnetworks", "MTU", "Description", "Created"])
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        if !self.clients.is_home_region(region) {
            return Ok(Collected::not_applicable());
        }
        let client = self.clients.get(region)?;

        let request = ListRequest::new(client.compute_global_url("networks"), "items");
        let items = fetch_all(client, &request, &ctx.cancel)
            .await
            .context("Failed to list networks")?;

        let resources = items
            .iter()
            .map(|item| {
                base_resource(item, "Network", GLOBAL_REGION)
                    .with("SubnetMode", subnet_mode(item))
                    .with("RoutingMode", json_path(item, "routingConfig.routingMode"))
                    .with("Subnetworks", array(item, "subnetworks").len())
                    .with("MTU", item.get("mtu"))
                    .with("Description", item.get("description"))
                    .with("Created", timestamp_value(item.get("creationTimestamp")))
            })
            .collect::<Vec<_>>();

        Ok(resources.into())
    }
}

// =============================================================================
// Subnetworks
// =============================================================================

pub struct SubnetworksCollector {
    clients: ClientSet,
}

impl SubnetworksCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

#[async_trait::async_trait]
impl Collector for SubnetworksCollector {
    fn name(&self) -> &str {
        "compute-subnetworks"
    }

    fn columns(&self) -> Vec<Column> {
        standard_columns(&[
            "Network",
            "CIDR",
            "Gateway",
            "SecondaryRanges",
            "PrivateGoogleAccess",
            "Purpose",
            "Created",
        ])
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        let client = self.clients.get(region)?;

        let request = ListRequest::new(client.compute_regional_url("subnetworks"), "items");
        let items = fetch_all(client, &request, &ctx.cancel)
            .await
            .context("Failed to list subnetworks")?;

        let mut out = Collected::new();
        for item in &items {
            let network = ctx
                .names
                .resolve_name(
                    &ctx.cancel,
                    NameKind::Network,
                    region,
                    json_str(item, "network").unwrap_or_default(),
                )
                .await;

            let secondary: KeyValues = array(item, "secondaryIpRanges")
                .iter()
                .map(|range| {
                    (
                        json_str(range, "rangeName").unwrap_or_default(),
                        json_str(range, "ipCidrRange").unwrap_or_default(),
                    )
                })
                .collect();

            out.push(
                base_resource(item, "Subnetwork", region)
                    .with("Network", network)
                    .with("CIDR", item.get("ipCidrRange"))
                    .with("Gateway", item.get("gatewayAddress"))
                    .with("SecondaryRanges", secondary)
                    .with("PrivateGoogleAccess", item.get("privateIpGoogleAccess"))
                    .with("Purpose", item.get("purpose"))
                    .with("Created", timestamp_value(item.get("creationTimestamp"))),
            );
        }

        Ok(out)
    }
}

// =============================================================================
// Firewall rules (global)
// =============================================================================

pub struct FirewallsCollector {
    clients: ClientSet,
}

impl FirewallsCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

/// Firewall action and its protocol/port entries, e.g. `tcp:22,443`
fn firewall_rules(item: &Value) -> (&'static str, Vec<String>) {
    let (action, entries) = if item.get("denied").is_some() {
        ("DENY", array(item, "denied"))
    } else {
        ("ALLOW", array(item, "allowed"))
    };

    let rules = entries
        .iter()
        .map(|entry| {
            let protocol = json_str(entry, "IPProtocol").unwrap_or("all");
            let ports: Vec<&str> = array(entry, "ports").iter().filter_map(Value::as_str).collect();
            if ports.is_empty() {
                protocol.to_string()
            } else {
                format!("{}:{}", protocol, ports.join(","))
            }
        })
        .collect();

    (action, rules)
}

#[async_trait::async_trait]
impl Collector for FirewallsCollector {
    fn name(&self) -> &str {
        "compute-firewalls"
    }

    fn columns(&self) -> Vec<Column> {
        standard_columns(&[
            "Network",
            "Direction",
            "Priority",
            "Action",
            "Rules",
            "SourceRanges",
            "TargetTags",
            "Disabled",
            "Logging",
        ])
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        if !self.clients.is_home_region(region) {
            return Ok(Collected::not_applicable());
        }
        let client = self.clients.get(region)?;

        let request = ListRequest::new(client.compute_global_url("firewalls"), "items");
        let items = fetch_all(client, &request, &ctx.cancel)
            .await
            .context("Failed to list firewalls")?;

        let mut out = Collected::new();
        for item in &items {
            let network = ctx
                .names
                .resolve_name(
                    &ctx.cancel,
                    NameKind::Network,
                    region,
                    json_str(item, "network").unwrap_or_default(),
                )
                .await;
            let (action, rules) = firewall_rules(item);

            out.push(
                base_resource(item, "Firewall", GLOBAL_REGION)
                    .with("Network", network)
                    .with("Direction", item.get("direction"))
                    .with("Priority", item.get("priority"))
                    .with("Action", action)
                    .with("Rules", rules)
                    .with("SourceRanges", item.get("sourceRanges"))
                    .with("TargetTags", item.get("targetTags"))
                    .with("Disabled", item.get("disabled"))
                    .with("Logging", json_path(item, "logConfig.enable")),
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subnet_mode() {
        assert_eq!(subnet_mode(&json!({"autoCreateSubnetworks": true})), "auto");
        assert_eq!(subnet_mode(&json!({"autoCreateSubnetworks": false})), "custom");
        assert_eq!(subnet_mode(&json!({"IPv4Range": "10.240.0.0/16"})), "legacy");
    }

    #[test]
    fn test_firewall_rules() {
        let allow = json!({
            "allowed": [
                {"IPProtocol": "tcp", "ports": ["22", "443"]},
                {"IPProtocol": "icmp"}
            ]
        });
        assert_eq!(
            firewall_rules(&allow),
            ("ALLOW", vec!["tcp:22,443".to_string(), "icmp".to_string()])
        );

        let deny = json!({"denied": [{"IPProtocol": "all"}]});
        assert_eq!(firewall_rules(&deny), ("DENY", vec!["all".to_string()]));
    }

    #[test]
    fn test_strings_skips_missing_fields() {
        let item = json!({"serviceAccounts": [{"email": "a@p.iam"}, {"scopes": []}]});
        assert_eq!(strings(&item, "serviceAccounts", "email"), vec!["a@p.iam"]);
        assert!(strings(&item, "missing", "email").is_empty());
    }
}
