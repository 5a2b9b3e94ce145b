//! DNS discovery — resolves `selfHost` to its A/AAAA records and pairs each
//! with `selfPort` (spec §4.3).
//!
//! `hickory-resolver`'s `Resolver` is async-only (its lookups are driven by a
//! `TokioConnectionProvider`); `Discovery::enumerate` is a synchronous trait
//! so that `static` discovery stays allocation-free and so the node's
//! forward step can run it on a blocking thread (`node.rs`) uniformly
//! regardless of mode. `enumerate` bridges the two with `Handle::block_on`
//! from inside that blocking thread — the pattern the tokio docs document
//! for calling async code from a dedicated blocking-pool thread, which is
//! exactly where the node runtime invokes this.
//!
//! Open question (spec §9): DNS discovery resolving `selfHost` conflates
//! "this node's bind name" with "the cluster rendezvous name". This crate
//! keeps the legacy behavior (resolve `selfHost`) as the only supported mode
//! — `Config` has no separate rendezvous-name field — per the spec's
//! "MUST default to the legacy behavior when only `selfHost` is supplied."

use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::Resolver;

use crate::error::GossipError;
use crate::peer::PeerIdentity;

use super::Discovery;

pub struct DnsDiscovery {
    host: String,
    port: u16,
    resolver: Resolver<TokioConnectionProvider>,
}

impl DnsDiscovery {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let resolver = Resolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .build();
        Self {
            host: host.into(),
            port,
            resolver,
        }
    }
}

impl Discovery for DnsDiscovery {
    fn enumerate(&self) -> Result<Vec<PeerIdentity>, GossipError> {
        let handle = tokio::runtime::Handle::current();
        let response = handle
            .block_on(self.resolver.lookup_ip(self.host.as_str()))
            .map_err(|e| GossipError::Discovery(e.to_string()))?;
        Ok(response
            .iter()
            .map(|ip| PeerIdentity::new(ip.to_string(), self.port))
            .collect())
    }
}
