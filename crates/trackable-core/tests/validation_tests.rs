#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{category_with_products, family};
use trackable_core::rules::invariants::{find_detached_members, find_untracked_children};
use trackable_core::rules::{check_invariants, validate_context};
use trackable_core::{ChangeTrackingSession, CommitOutcome, TrackingError, TrackingState};

#[test]
fn test_tracked_family_is_valid() {
    let (mut ctx, family) = family();
    ctx.set_state(family.parent, TrackingState::Added).unwrap();

    assert!(validate_context(&ctx).is_ok());
    assert!(check_invariants(&ctx).is_empty());
}

#[test]
fn test_committed_delete_keeps_context_valid() {
    // GIVEN a persisted category whose product was deleted and committed
    let (mut ctx, category, products) = category_with_products(2);
    let product = products[0];
    ctx.set_state(category, TrackingState::Unchanged).unwrap();
    ctx.set_state(product, TrackingState::Deleted).unwrap();
    ChangeTrackingSession::new()
        .on_commit_succeeded(&mut ctx, CommitOutcome::new([category]))
        .unwrap();

    // THEN the detached product may stay referenced by the category
    assert_eq!(ctx.state_of(product), TrackingState::Detached);
    assert!(find_untracked_children(&ctx).is_empty());
    assert!(validate_context(&ctx).is_ok());

    // WHEN the category is modified in the next cycle
    ctx.set_state(category, TrackingState::Modified).unwrap();

    // THEN the context is still valid and the product still detached
    assert!(validate_context(&ctx).is_ok());
    assert_eq!(ctx.state_of(product), TrackingState::Detached);
}

#[test]
fn test_child_linked_after_attach_is_reported() {
    let (mut ctx, category, _) = category_with_products(1);
    ctx.set_state(category, TrackingState::Unchanged).unwrap();
    let late = ctx.graph_mut().create("Product").unwrap();
    ctx.graph_mut().add_child(category, "Products", late).unwrap();

    assert!(matches!(
        validate_context(&ctx),
        Err(TrackingError::UntrackedChild { parent, child }) if parent == category && child == late
    ));
}

#[test]
fn test_collections_never_hold_detached_members() {
    let (mut ctx, category, products) = category_with_products(3);
    let collection = ctx.create_collection("Product").unwrap();
    ctx.set_state(category, TrackingState::Unchanged).unwrap();
    for product in &products {
        ctx.collection_add(collection, *product).unwrap();
    }

    ctx.set_state(products[1], TrackingState::Deleted).unwrap();
    ChangeTrackingSession::new()
        .on_commit_succeeded(&mut ctx, CommitOutcome::new([products[1]]))
        .unwrap();

    assert!(find_detached_members(&ctx).is_empty());
    assert_eq!(ctx.collection(collection).unwrap().len(), 2);
}

#[test]
fn test_non_tracking_collections_drop_committed_deletes() {
    let (mut ctx, category, products) = category_with_products(2);
    let collection = ctx.create_collection("Product").unwrap();
    ctx.set_state(category, TrackingState::Unchanged).unwrap();
    for product in &products {
        ctx.collection_add(collection, *product).unwrap();
    }
    ctx.collection_remove(collection, products[0]).unwrap();
    ctx.set_tracking(collection, false).unwrap();

    ChangeTrackingSession::new()
        .on_commit_succeeded(&mut ctx, CommitOutcome::new([category]))
        .unwrap();

    assert!(check_invariants(&ctx).is_empty());
    assert!(!ctx.collection(collection).unwrap().holds(products[0]));
}
