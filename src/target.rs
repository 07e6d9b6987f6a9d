//! Per-agent configuration: community string for v1/v2c, or discovered USM
//! credentials for v3. A target is the blueprint a message envelope is
//! populated from, and the place v3 discovery results get written back to.

use std::time::{Duration, Instant};

use crate::constants::USM_TIME_WINDOW_SECONDS;
use crate::error::{Error, Kind};
use crate::usm::{keys, AuthProtocol, PrivProtocol};

/// How a reply's source endpoint is checked against the request's peer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceCheck {
    None,
    IpOnly,
    IpAndPort,
}

/// v1/v2c target: a community string plus the reply-source-check toggle.
#[derive(Clone, Debug)]
pub struct CommunityTarget {
    pub version_is_v2c: bool,
    pub community: String,
    pub source_check: SourceCheck,
}

impl CommunityTarget {
    pub fn new(community: impl Into<String>, version_is_v2c: bool) -> Self {
        Self {
            version_is_v2c,
            community: community.into(),
            source_check: SourceCheck::IpAndPort,
        }
    }

    pub fn valid(&self) -> bool {
        !self.community.is_empty() && self.community.len() <= 50
    }
}

/// USM credentials and discovered engine state for an SNMPv3 target.
#[derive(Clone, Debug)]
pub struct SecureTarget {
    pub engine_id: Vec<u8>,
    pub engine_boots: i32,
    pub engine_time: i32,
    /// Wall-clock instant at which `engine_time` was last refreshed.
    engine_time_stamp: Option<Instant>,

    pub security_name: String,
    pub auth_protocol: AuthProtocol,
    pub auth_secret: Vec<u8>,
    pub priv_protocol: PrivProtocol,
    pub priv_secret: Vec<u8>,

    pub context_engine_id: Vec<u8>,
    pub context_name: String,

    pub max_message_size: u32,
    pub reportable: bool,

    cached_auth_key: Option<Vec<u8>>,
    cached_priv_key: Option<Vec<u8>>,
    cached_for_engine_id: Vec<u8>,
}

impl SecureTarget {
    /// A discovery-only target: no security name, no protocols, empty
    /// engine id. Used for the initial engine-discovery probe.
    pub fn for_discovery() -> Self {
        Self {
            engine_id: Vec::new(),
            engine_boots: 0,
            engine_time: 0,
            engine_time_stamp: None,
            security_name: String::new(),
            auth_protocol: AuthProtocol::None,
            auth_secret: Vec::new(),
            priv_protocol: PrivProtocol::None,
            priv_secret: Vec::new(),
            context_engine_id: Vec::new(),
            context_name: String::new(),
            max_message_size: 65_535,
            reportable: true,
            cached_auth_key: None,
            cached_priv_key: None,
            cached_for_engine_id: Vec::new(),
        }
    }

    pub fn no_auth_no_priv(security_name: impl Into<String>) -> Self {
        Self {
            security_name: security_name.into(),
            ..Self::for_discovery()
        }
    }

    pub fn auth_no_priv(security_name: impl Into<String>, auth_protocol: AuthProtocol, auth_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            security_name: security_name.into(),
            auth_protocol,
            auth_secret: auth_secret.into(),
            ..Self::for_discovery()
        }
    }

    pub fn auth_priv(
        security_name: impl Into<String>,
        auth_protocol: AuthProtocol,
        auth_secret: impl Into<Vec<u8>>,
        priv_protocol: PrivProtocol,
        priv_secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            security_name: security_name.into(),
            auth_protocol,
            auth_secret: auth_secret.into(),
            priv_protocol,
            priv_secret: priv_secret.into(),
            ..Self::for_discovery()
        }
    }

    pub fn is_discovery_probe(&self) -> bool {
        self.engine_id.is_empty()
    }

    /// The context engine id to use, falling back to the authoritative
    /// engine id when unset.
    pub fn effective_context_engine_id(&self) -> &[u8] {
        if self.context_engine_id.is_empty() {
            &self.engine_id
        } else {
            &self.context_engine_id
        }
    }

    /// Merges a discovery (or rediscovery) reply's engine values in and
    /// stamps the refresh time.
    pub fn absorb_discovery(&mut self, engine_id: Vec<u8>, engine_boots: i32, engine_time: i32) {
        if self.engine_id != engine_id {
            self.cached_auth_key = None;
            self.cached_priv_key = None;
        }
        self.engine_id = engine_id;
        self.engine_boots = engine_boots;
        self.engine_time = engine_time;
        self.engine_time_stamp = Some(Instant::now());
    }

    /// `engineTime + seconds_since(stamp) + 1`, or `0` if the freshness
    /// window has been exceeded (triggering rediscovery upstream).
    pub fn adjusted_engine_time(&self) -> i32 {
        let Some(stamp) = self.engine_time_stamp else {
            return 0;
        };
        let elapsed = Instant::now().saturating_duration_since(stamp);
        if elapsed > Duration::from_secs(USM_TIME_WINDOW_SECONDS as u64) {
            return 0;
        }
        self.engine_time.saturating_add(elapsed.as_secs() as i32).saturating_add(1)
    }

    pub fn is_fresh(&self) -> bool {
        self.engine_time_stamp.is_some() && self.adjusted_engine_time() != 0
    }

    /// Derives (and caches) the authentication and privacy keys for the
    /// current `engine_id` and secrets.
    pub fn build_cached_security_keys(&mut self) -> Result<(), Error> {
        if self.cached_for_engine_id == self.engine_id && self.cached_auth_key.is_some() {
            return Ok(());
        }
        if self.auth_protocol != AuthProtocol::None {
            self.cached_auth_key = Some(keys::localize(self.auth_protocol, &self.auth_secret, &self.engine_id)?);
        }
        if self.priv_protocol != PrivProtocol::None {
            self.cached_priv_key = Some(keys::localize_priv_key(self.auth_protocol, self.priv_protocol, &self.priv_secret, &self.engine_id)?);
        }
        self.cached_for_engine_id = self.engine_id.clone();
        Ok(())
    }

    pub fn cached_auth_key(&self) -> Option<&[u8]> {
        self.cached_auth_key.as_deref()
    }

    pub fn cached_priv_key(&self) -> Option<&[u8]> {
        self.cached_priv_key.as_deref()
    }

    pub fn valid(&self) -> Result<(), Error> {
        let needs_name = self.auth_protocol != AuthProtocol::None || self.priv_protocol != PrivProtocol::None;
        if needs_name && self.security_name.is_empty() {
            return Err(invalid("security name is required when a protocol is selected"));
        }
        if self.auth_protocol == AuthProtocol::None && self.priv_protocol != PrivProtocol::None {
            return Err(invalid("privacy without authentication is not supported"));
        }
        if self.auth_protocol != AuthProtocol::None && self.auth_secret.is_empty() {
            return Err(invalid("an authentication protocol requires a non-empty secret"));
        }
        if self.priv_protocol != PrivProtocol::None && self.priv_secret.is_empty() {
            return Err(invalid("a privacy protocol requires a non-empty secret"));
        }
        Ok(())
    }

}

fn invalid(reason: &str) -> Error {
    Kind::InvalidTargetParameters {
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_target_validity() {
        assert!(CommunityTarget::new("public", false).valid());
        assert!(!CommunityTarget::new("", false).valid());
        assert!(!CommunityTarget::new("x".repeat(51), false).valid());
    }

    #[test]
    fn priv_without_auth_is_invalid() {
        let target = SecureTarget {
            priv_protocol: PrivProtocol::Des,
            priv_secret: b"secret".to_vec(),
            security_name: "user".to_string(),
            ..SecureTarget::for_discovery()
        };
        assert!(target.valid().is_err());
    }

    #[test]
    fn discovery_probe_has_no_engine_id() {
        assert!(SecureTarget::for_discovery().is_discovery_probe());
    }

    #[test]
    fn fresh_after_discovery_stale_before() {
        let mut target = SecureTarget::for_discovery();
        assert!(!target.is_fresh());
        target.absorb_discovery(vec![1, 2, 3], 1, 100);
        assert!(target.is_fresh());
    }

    #[test]
    fn cached_keys_invalidated_on_engine_change() {
        let mut target = SecureTarget::auth_no_priv("user", AuthProtocol::Md5, b"password12345".to_vec());
        target.absorb_discovery(vec![1, 2, 3], 0, 0);
        target.build_cached_security_keys().unwrap();
        assert!(target.cached_auth_key().is_some());
        target.absorb_discovery(vec![4, 5, 6], 0, 0);
        assert!(target.cached_auth_key().is_none());
    }
}
