use crate::collection::CollectionId;
use crate::context::TrackingContext;
use crate::model::EntityRef;

/// Find collection members that are no longer attached
///
/// Detaching removes an entity from every collection, so a detached member
/// that was once tracked means the membership and state tables disagree.
/// Collections with tracking off may still hold never-tracked members
/// loaded in bulk; those are not reported.
///
/// Returns list of (collection, entity) tuples
pub fn find_detached_members(ctx: &TrackingContext) -> Vec<(CollectionId, EntityRef)> {
    ctx.collections()
        .flat_map(|(id, collection)| {
            let tracking = collection.is_tracking();
            collection
                .iter_all()
                .filter(move |entity| {
                    !ctx.is_tracked(*entity) && (tracking || ctx.is_known(*entity))
                })
                .map(move |entity| (id, entity))
        })
        .collect()
}

/// Find navigation targets that are missing from the graph
///
/// Returns list of (entity, navigation, target) tuples, sorted
pub fn find_dangling_references(ctx: &TrackingContext) -> Vec<(EntityRef, String, EntityRef)> {
    let graph = ctx.graph();
    let mut dangling = Vec::new();

    for entity in graph.entities() {
        for (name, value) in &entity.navigations {
            for target in value.targets() {
                if !graph.contains(*target) {
                    dangling.push((entity.id, name.clone(), *target));
                }
            }
        }
    }

    dangling.sort();
    dangling
}

/// Find tracked entities whose direct children were never tracked
///
/// Happens when children are linked into an attached graph after the fact.
/// A detached child that was tracked before (a committed delete still
/// referenced by its parent) is left alone. Dangling children are reported
/// by `find_dangling_references` instead.
///
/// Returns list of (parent, child) tuples, sorted
pub fn find_untracked_children(ctx: &TrackingContext) -> Vec<(EntityRef, EntityRef)> {
    let graph = ctx.graph();
    let mut untracked = Vec::new();

    for parent in ctx.tracked_entities() {
        let children = match graph.children(parent) {
            Ok(children) => children,
            Err(_) => continue,
        };
        untracked.extend(
            children
                .into_iter()
                .filter(|child| graph.contains(*child) && !ctx.is_known(*child))
                .map(|child| (parent, child)),
        );
    }

    untracked.sort();
    untracked.dedup();
    untracked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, ModelRegistry, NavigationDescriptor, NavigationValue, TrackingState};
    use crate::ops::EntityGraph;

    fn context() -> (TrackingContext, EntityRef, EntityRef) {
        let registry = ModelRegistry::new()
            .with_type(
                EntityType::new("Category")
                    .with_navigation(NavigationDescriptor::children("Products", "Product")),
            )
            .unwrap()
            .with_type(EntityType::new("Product"))
            .unwrap();
        let mut graph = EntityGraph::new(registry);
        let category = graph.create("Category").unwrap();
        let product = graph.create("Product").unwrap();
        (TrackingContext::new(graph), category, product)
    }

    #[test]
    fn test_clean_context_has_no_violations() {
        let (mut ctx, category, product) = context();
        ctx.graph_mut().add_child(category, "Products", product).unwrap();
        ctx.set_state(category, TrackingState::Added).unwrap();

        assert!(find_detached_members(&ctx).is_empty());
        assert!(find_dangling_references(&ctx).is_empty());
        assert!(find_untracked_children(&ctx).is_empty());
    }

    #[test]
    fn test_child_linked_after_attach_is_untracked() {
        let (mut ctx, category, product) = context();
        ctx.set_state(category, TrackingState::Unchanged).unwrap();
        ctx.graph_mut().add_child(category, "Products", product).unwrap();

        assert_eq!(find_untracked_children(&ctx), vec![(category, product)]);
    }

    #[test]
    fn test_previously_tracked_child_is_not_reported() {
        let (mut ctx, category, product) = context();
        ctx.graph_mut().add_child(category, "Products", product).unwrap();
        ctx.set_state(category, TrackingState::Unchanged).unwrap();
        ctx.set_state(product, TrackingState::Detached).unwrap();

        assert!(find_untracked_children(&ctx).is_empty());
    }

    #[test]
    fn test_dangling_reference() {
        let (mut ctx, category, _) = context();
        let missing = EntityRef::new();
        ctx.graph_mut()
            .get_mut(category)
            .unwrap()
            .navigations
            .insert("Products".to_string(), NavigationValue::Collection(vec![missing]));

        assert_eq!(
            find_dangling_references(&ctx),
            vec![(category, "Products".to_string(), missing)]
        );
    }
}
