#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use rolegate_core::auth::verify::{address_of, challenge_digest};
use rolegate_core::{
    Address, EntityKind, GuildId, IdentityOracle, IdentityStatus, MemberId, PlatformError,
    PlatformResult, RoleId, RolePlatform,
};

/// Chat platform held in memory, recording every mutation.
#[derive(Default)]
pub struct MemoryPlatform {
    guilds: Mutex<HashMap<GuildId, GuildState>>,
    pub mutations: Mutex<Vec<Mutation>>,
    failing_removals: Mutex<HashSet<RoleId>>,
}

#[derive(Default)]
struct GuildState {
    roles: HashSet<RoleId>,
    members: HashMap<MemberId, HashSet<RoleId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add(GuildId, MemberId, RoleId),
    Remove(GuildId, MemberId, RoleId),
}

impl MemoryPlatform {
    pub fn add_guild(&self, guild: GuildId, roles: &[u64]) {
        self.guilds.lock().insert(
            guild,
            GuildState {
                roles: roles.iter().copied().map(RoleId).collect(),
                members: HashMap::new(),
            },
        );
    }

    pub fn remove_guild(&self, guild: GuildId) {
        self.guilds.lock().remove(&guild);
    }

    pub fn delete_role(&self, guild: GuildId, role: RoleId) {
        if let Some(state) = self.guilds.lock().get_mut(&guild) {
            state.roles.remove(&role);
        }
    }

    pub fn join(&self, guild: GuildId, member: MemberId, roles: &[u64]) {
        let mut guilds = self.guilds.lock();
        let state = guilds.get_mut(&guild).expect("guild added first");
        state
            .members
            .insert(member, roles.iter().copied().map(RoleId).collect());
    }

    pub fn roles_of(&self, guild: GuildId, member: MemberId) -> Vec<RoleId> {
        let guilds = self.guilds.lock();
        let mut roles: Vec<RoleId> = guilds
            .get(&guild)
            .and_then(|g| g.members.get(&member))
            .map(|r| r.iter().copied().collect())
            .unwrap_or_default();
        roles.sort();
        roles
    }

    /// Make every removal of `role` fail like a rejected API call.
    pub fn fail_removal_of(&self, role: RoleId) {
        self.failing_removals.lock().insert(role);
    }

    pub fn clear_failures(&self) {
        self.failing_removals.lock().clear();
    }

    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut *self.mutations.lock())
    }
}

#[async_trait]
impl RolePlatform for MemoryPlatform {
    async fn guild_exists(&self, guild: GuildId) -> PlatformResult<bool> {
        Ok(self.guilds.lock().contains_key(&guild))
    }

    async fn member_roles(&self, guild: GuildId, member: MemberId) -> PlatformResult<Vec<RoleId>> {
        let guilds = self.guilds.lock();
        let state = guilds
            .get(&guild)
            .ok_or(PlatformError::missing(EntityKind::Guild, guild.get()))?;
        state
            .members
            .get(&member)
            .map(|roles| roles.iter().copied().collect())
            .ok_or(PlatformError::missing(EntityKind::Member, member.get()))
    }

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool> {
        let guilds = self.guilds.lock();
        let state = guilds
            .get(&guild)
            .ok_or(PlatformError::missing(EntityKind::Guild, guild.get()))?;
        Ok(state.roles.contains(&role))
    }

    async fn add_role(&self, guild: GuildId, member: MemberId, role: RoleId) -> PlatformResult<()> {
        let mut guilds = self.guilds.lock();
        let state = guilds
            .get_mut(&guild)
            .ok_or(PlatformError::missing(EntityKind::Guild, guild.get()))?;
        if !state.roles.contains(&role) {
            return Err(PlatformError::missing(EntityKind::Role, role.get()));
        }
        let held = state
            .members
            .get_mut(&member)
            .ok_or(PlatformError::missing(EntityKind::Member, member.get()))?;
        held.insert(role);
        self.mutations.lock().push(Mutation::Add(guild, member, role));
        Ok(())
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        member: MemberId,
        role: RoleId,
    ) -> PlatformResult<()> {
        if self.failing_removals.lock().contains(&role) {
            return Err(PlatformError::Request("503 Service Unavailable".to_string()));
        }
        let mut guilds = self.guilds.lock();
        let state = guilds
            .get_mut(&guild)
            .ok_or(PlatformError::missing(EntityKind::Guild, guild.get()))?;
        let held = state
            .members
            .get_mut(&member)
            .ok_or(PlatformError::missing(EntityKind::Member, member.get()))?;
        held.remove(&role);
        self.mutations.lock().push(Mutation::Remove(guild, member, role));
        Ok(())
    }
}

/// Oracle answering from a fixed table; unknown addresses are undefined.
#[derive(Default)]
pub struct FixedOracle {
    statuses: Mutex<HashMap<Address, String>>,
}

impl FixedOracle {
    /// Set the raw status string the remote would report.
    pub fn set(&self, address: &Address, raw: &str) {
        self.statuses.lock().insert(address.clone(), raw.to_string());
    }
}

#[async_trait]
impl IdentityOracle for FixedOracle {
    async fn get_status(&self, address: &Address) -> IdentityStatus {
        self.statuses
            .lock()
            .get(address)
            .map(|raw| IdentityStatus::normalize(raw))
            .unwrap_or(IdentityStatus::Undefined)
    }
}

pub fn wallet(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

pub fn wallet_address(key: &SigningKey) -> Address {
    address_of(key.verifying_key())
}

pub fn sign_nonce(key: &SigningKey, nonce: &str) -> String {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&challenge_digest(nonce))
        .unwrap();
    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte());
    format!("0x{}", hex::encode(bytes))
}
