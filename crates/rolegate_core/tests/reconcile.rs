mod common;

use std::sync::Arc;

use common::{FixedOracle, MemoryPlatform, Mutation};
use pretty_assertions::assert_eq;
use rolegate_core::{
    Address, GuildId, GuildReport, IdentityStatus, MemberId, PlatformError, ReconcileError,
    ReconcileOutcome, Reconciler, RoleId, RolegateDb,
};
use rolegate_db::queries;

const GUILD: GuildId = GuildId(1000);

// status role ids: undefined 10, newbie 11 (R2), verified 12 (R1), human 13,
// suspended 14, zombie 15
const UNDEFINED: RoleId = RoleId(10);
const NEWBIE: RoleId = RoleId(11);
const VERIFIED: RoleId = RoleId(12);
const HUMAN: RoleId = RoleId(13);
const UNMANAGED: u64 = 99;

struct Harness {
    db: RolegateDb,
    oracle: Arc<FixedOracle>,
    platform: Arc<MemoryPlatform>,
    reconciler: Reconciler,
}

async fn harness() -> Harness {
    let db = RolegateDb::open_in_memory().await.unwrap();
    let oracle = Arc::new(FixedOracle::default());
    let platform = Arc::new(MemoryPlatform::default());
    let reconciler = Reconciler::new(db.clone(), oracle.clone(), platform.clone());

    configure(&db, GUILD).await;
    platform.add_guild(GUILD, &[10, 11, 12, 13, 14, 15, UNMANAGED]);

    Harness {
        db,
        oracle,
        platform,
        reconciler,
    }
}

async fn configure(db: &RolegateDb, guild: GuildId) {
    for (status, role) in IdentityStatus::ALL.iter().zip(10u64..) {
        queries::set_status_role(db.pool(), guild, *status, RoleId(role))
            .await
            .unwrap();
    }
}

fn addr(c: char) -> Address {
    format!("0x{}", c.to_string().repeat(40)).parse().unwrap()
}

async fn bind(h: &Harness, member: MemberId, address: &Address, status: &str) {
    queries::bind_identity(h.db.pool(), member, address, 0)
        .await
        .unwrap();
    h.oracle.set(address, status);
}

#[tokio::test]
async fn test_verified_member_ends_with_exactly_verified_role() {
    let h = harness().await;
    let member = MemberId(1);
    // held newbie, human and an unrelated role before
    h.platform.join(GUILD, member, &[11, 13, UNMANAGED]);
    bind(&h, member, &addr('a'), "Verified").await;

    let outcome = h.reconciler.reconcile_member(GUILD, member).await.unwrap();

    assert_eq!(outcome.applied_role(), Some(VERIFIED));
    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            role: VERIFIED,
            removed: vec![NEWBIE, HUMAN],
        }
    );
    assert_eq!(
        h.platform.roles_of(GUILD, member),
        vec![VERIFIED, RoleId(UNMANAGED)]
    );
}

#[tokio::test]
async fn test_second_reconcile_makes_no_mutation() {
    let h = harness().await;
    let member = MemberId(1);
    h.platform.join(GUILD, member, &[]);
    bind(&h, member, &addr('a'), "Human").await;

    h.reconciler.reconcile_member(GUILD, member).await.unwrap();
    assert_eq!(
        h.platform.take_mutations(),
        vec![Mutation::Add(GUILD, member, HUMAN)]
    );

    let outcome = h.reconciler.reconcile_member(GUILD, member).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyHeld { role: HUMAN });
    assert!(!outcome.changed_anything());
    assert_eq!(h.platform.take_mutations(), vec![]);
}

#[tokio::test]
async fn test_unbound_member_loses_every_status_role() {
    let h = harness().await;
    let member = MemberId(2);
    h.platform.join(GUILD, member, &[10, 12, 15, UNMANAGED]);

    let outcome = h.reconciler.reconcile_member(GUILD, member).await.unwrap();

    assert_eq!(outcome.applied_role(), None);
    assert!(matches!(outcome, ReconcileOutcome::Cleared { ref removed } if removed.len() == 3));
    assert_eq!(h.platform.roles_of(GUILD, member), vec![RoleId(UNMANAGED)]);
    assert!(
        h.platform
            .take_mutations()
            .iter()
            .all(|m| matches!(m, Mutation::Remove(..)))
    );
}

#[tokio::test]
async fn test_unbound_member_removal_failure_continues() {
    let h = harness().await;
    let member = MemberId(2);
    h.platform.join(GUILD, member, &[10, 11, 15, UNMANAGED]);
    h.platform.fail_removal_of(NEWBIE);

    let outcome = h.reconciler.reconcile_member(GUILD, member).await.unwrap();

    let ReconcileOutcome::Cleared { mut removed } = outcome else {
        panic!("expected Cleared, got {:?}", outcome);
    };
    removed.sort();
    assert_eq!(removed, vec![UNDEFINED, RoleId(15)]);
    assert_eq!(
        h.platform.roles_of(GUILD, member),
        vec![NEWBIE, RoleId(UNMANAGED)]
    );
}

#[tokio::test]
async fn test_failed_removal_blocks_new_status_role() {
    let h = harness().await;
    let member = MemberId(1);
    h.platform.join(GUILD, member, &[11]);
    bind(&h, member, &addr('a'), "Verified").await;
    h.platform.fail_removal_of(NEWBIE);

    let err = h.reconciler.reconcile_member(GUILD, member).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Platform(PlatformError::Request(_))
    ));
    assert!(!err.is_entity_missing());
    assert_eq!(h.platform.roles_of(GUILD, member), vec![NEWBIE]);
    assert_eq!(h.platform.take_mutations(), vec![]);

    // the next trigger converges once the platform recovers
    h.platform.clear_failures();
    let outcome = h.reconciler.reconcile_member(GUILD, member).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            role: VERIFIED,
            removed: vec![NEWBIE],
        }
    );
    assert_eq!(h.platform.roles_of(GUILD, member), vec![VERIFIED]);
}

#[tokio::test]
async fn test_unrecognized_status_gets_undefined_role() {
    let h = harness().await;
    let member = MemberId(3);
    h.platform.join(GUILD, member, &[12]);
    bind(&h, member, &addr('b'), "banned").await;

    let outcome = h.reconciler.reconcile_member(GUILD, member).await.unwrap();

    assert_eq!(outcome.applied_role(), Some(UNDEFINED));
    assert_eq!(h.platform.roles_of(GUILD, member), vec![UNDEFINED]);
}

#[tokio::test]
async fn test_missing_role_and_member_surface_as_entity_missing() {
    let h = harness().await;
    let member = MemberId(4);
    bind(&h, member, &addr('c'), "Newbie").await;

    // not in the guild
    let err = h.reconciler.reconcile_member(GUILD, member).await.unwrap_err();
    assert!(err.is_entity_missing());

    // in the guild, but the newbie role was deleted
    h.platform.join(GUILD, member, &[]);
    h.platform.delete_role(GUILD, NEWBIE);
    let err = h.reconciler.reconcile_member(GUILD, member).await.unwrap_err();
    assert!(err.is_entity_missing());
    assert_eq!(h.platform.take_mutations(), vec![]);
}

#[tokio::test]
async fn test_partially_configured_guild() {
    let h = harness().await;
    let other = GuildId(2000);
    h.platform.add_guild(other, &[12]);
    queries::set_status_role(h.db.pool(), other, IdentityStatus::Verified, VERIFIED)
        .await
        .unwrap();

    let member = MemberId(5);
    h.platform.join(other, member, &[]);
    bind(&h, member, &addr('d'), "Human").await;

    let err = h.reconciler.reconcile_member(other, member).await.unwrap_err();
    assert!(matches!(err, ReconcileError::GuildNotConfigured { guild } if guild == other));

    let report = h.reconciler.reconcile_guild(other).await.unwrap();
    assert_eq!(
        report,
        GuildReport {
            skipped: true,
            ..GuildReport::default()
        }
    );
}

#[tokio::test]
async fn test_guild_pass_isolates_members() {
    let h = harness().await;

    // updated
    h.platform.join(GUILD, MemberId(1), &[10]);
    bind(&h, MemberId(1), &addr('1'), "Verified").await;
    // unchanged
    h.platform.join(GUILD, MemberId(2), &[13]);
    bind(&h, MemberId(2), &addr('2'), "human").await;
    // bound but not in this guild
    bind(&h, MemberId(3), &addr('3'), "Zombie").await;

    let report = h.reconciler.reconcile_guild(GUILD).await.unwrap();
    assert_eq!(
        report,
        GuildReport {
            updated: 1,
            unchanged: 1,
            cleared: 0,
            missing: 1,
            failed: 0,
            skipped: false,
        }
    );

    let all = h.reconciler.reconcile_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].1.unchanged, 2);
}

#[tokio::test]
async fn test_vanished_guild_is_skipped() {
    let h = harness().await;
    h.platform.remove_guild(GUILD);

    let report = h.reconciler.reconcile_guild(GUILD).await.unwrap();
    assert!(report.skipped);
}

#[tokio::test]
async fn test_member_reconciled_in_every_guild() {
    let h = harness().await;
    let second = GuildId(2000);
    let third = GuildId(3000);
    configure(&h.db, second).await;
    configure(&h.db, third).await;
    h.platform.add_guild(second, &[10, 11, 12, 13, 14, 15]);
    h.platform.add_guild(third, &[10, 11, 12, 13, 14, 15]);

    let member = MemberId(7);
    h.platform.join(GUILD, member, &[]);
    h.platform.join(second, member, &[10]);
    bind(&h, member, &addr('e'), "Newbie").await;

    let mut outcomes = h
        .reconciler
        .reconcile_member_everywhere(member)
        .await
        .unwrap();
    outcomes.sort_by_key(|(guild, _)| *guild);

    // the third guild does not have this member
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|(_, o)| o.applied_role() == Some(NEWBIE)));
    assert_eq!(h.platform.roles_of(second, member), vec![NEWBIE]);

    // after logout every status role goes
    queries::delete_bound_identity(h.db.pool(), member)
        .await
        .unwrap();
    h.reconciler
        .reconcile_member_everywhere(member)
        .await
        .unwrap();
    assert_eq!(h.platform.roles_of(GUILD, member), vec![]);
    assert_eq!(h.platform.roles_of(second, member), vec![]);
}
