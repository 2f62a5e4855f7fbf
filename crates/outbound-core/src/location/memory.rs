//! In-memory location store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{ContactEntry, FlowBinding, GruuResolution, LocationStore};
use crate::common::errors::Result;
use crate::sip::SipUri;

#[derive(Debug, Clone)]
struct Registration {
    user: String,
    contact: SipUri,
    flow: Option<FlowBinding>,
    registered_at: DateTime<Utc>,
    seq: u64,
}

/// Location store backed by concurrent maps, keyed by address-of-record
#[derive(Debug, Default)]
pub struct InMemoryLocationStore {
    bindings: DashMap<String, Vec<Registration>>,
    gruus: DashMap<String, GruuResolution>,
    seq: AtomicU64,
}

// Userless AORs (a PBX or trunk registered by host) key by the host alone
fn aor_key(uri: &SipUri) -> String {
    let host = uri.host.to_ascii_lowercase();
    match &uri.user {
        Some(user) => format!("{}@{}", user, host),
        None => host,
    }
}

fn ranked(registrations: &[Registration]) -> Vec<ContactEntry> {
    let mut sorted: Vec<&Registration> = registrations.iter().collect();
    sorted.sort_by(|a, b| (b.registered_at, b.seq).cmp(&(a.registered_at, a.seq)));
    sorted
        .into_iter()
        .enumerate()
        .map(|(rank, reg)| ContactEntry {
            user: reg.user.clone(),
            contact: reg.contact.clone(),
            rank: rank as u32,
            flow: reg.flow.clone(),
        })
        .collect()
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `contact` for `aor` now
    pub fn register(&self, user: &str, aor: &SipUri, contact: SipUri, flow: Option<FlowBinding>) {
        self.register_at(user, aor, contact, flow, Utc::now());
    }

    /// Register `contact` for `aor` with an explicit registration time.
    ///
    /// An existing registration of the same contact address is replaced as a whole,
    /// flow binding included.
    pub fn register_at(
        &self,
        user: &str,
        aor: &SipUri,
        contact: SipUri,
        flow: Option<FlowBinding>,
        registered_at: DateTime<Utc>,
    ) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        debug!("Registering {} for {} (flow: {:?})", contact, aor, flow.as_ref().map(|f| &f.flow_id));

        let mut entry = self.bindings.entry(aor_key(aor)).or_default();
        entry.retain(|reg| !reg.contact.same_address(&contact));
        entry.push(Registration {
            user: user.to_string(),
            contact,
            flow,
            registered_at,
            seq,
        });
    }

    /// Remove a contact; returns whether anything was removed
    pub fn unregister(&self, aor: &SipUri, contact: &SipUri) -> bool {
        let key = aor_key(aor);
        let removed = match self.bindings.get_mut(&key) {
            Some(mut regs) => {
                let before = regs.len();
                regs.retain(|reg| !reg.contact.same_address(contact));
                before != regs.len()
            }
            None => false,
        };
        self.bindings.remove_if(&key, |_, regs| regs.is_empty());
        removed
    }

    /// Make a GRUU resolvable
    pub fn publish_gruu(&self, gruu: &SipUri, resolution: GruuResolution) {
        self.gruus.insert(gruu.to_string(), resolution);
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn lookup_by_uri(&self, uri: &SipUri) -> Result<Vec<ContactEntry>> {
        Ok(self
            .bindings
            .get(&aor_key(uri))
            .map(|regs| ranked(&regs))
            .unwrap_or_default())
    }

    async fn lookup_by_gruu(&self, uri: &SipUri) -> Result<GruuResolution> {
        Ok(self
            .gruus
            .get(&uri.to_string())
            .map(|resolution| resolution.value().clone())
            .unwrap_or_else(|| GruuResolution::Response {
                status: 404,
                reason: "Not Found".to_string(),
            }))
    }

    async fn lookup_owner_of_contact(&self, uri: &SipUri) -> Result<Vec<ContactEntry>> {
        let mut owners: Vec<String> = self
            .bindings
            .iter()
            .filter(|item| item.value().iter().any(|reg| reg.contact.same_address(uri)))
            .map(|item| item.key().clone())
            .collect();
        owners.sort();

        Ok(owners
            .first()
            .and_then(|key| self.bindings.get(key))
            .map(|regs| ranked(&regs))
            .unwrap_or_default())
    }
}
