use trackable_core::{
    EntityGraph, EntityRef, EntityType, ModelRegistry, NavigationDescriptor, TrackingContext,
};

/// Registry for the category/product model
///
/// `Category.Products` is a child collection, `Product.Category` its
/// back-reference.
#[allow(dead_code)]
pub fn northwind_registry() -> ModelRegistry {
    ModelRegistry::new()
        .with_type(
            EntityType::new("Category")
                .with_navigation(NavigationDescriptor::children("Products", "Product")),
        )
        .unwrap()
        .with_type(
            EntityType::new("Product")
                .with_navigation(NavigationDescriptor::parent("Category", "Category")),
        )
        .unwrap()
}

/// A category with `products` new products linked both ways
///
/// Returns the context and (category, products).
#[allow(dead_code)]
pub fn category_with_products(products: usize) -> (TrackingContext, EntityRef, Vec<EntityRef>) {
    let mut graph = EntityGraph::new(northwind_registry());
    let category = graph.create("Category").unwrap();

    let mut ids = Vec::with_capacity(products);
    for _ in 0..products {
        let product = graph.create("Product").unwrap();
        graph.add_child(category, "Products", product).unwrap();
        graph.set_parent(product, "Category", category).unwrap();
        ids.push(product);
    }

    (TrackingContext::new(graph), category, ids)
}

/// Registry for the three-level family model
#[allow(dead_code)]
pub fn family_registry() -> ModelRegistry {
    ModelRegistry::new()
        .with_type(
            EntityType::new("Parent")
                .with_navigation(NavigationDescriptor::children("Children", "Child")),
        )
        .unwrap()
        .with_type(
            EntityType::new("Child")
                .with_navigation(NavigationDescriptor::children("Children", "GrandChild"))
                .with_navigation(NavigationDescriptor::parent("Parent", "Parent")),
        )
        .unwrap()
        .with_type(
            EntityType::new("GrandChild")
                .with_navigation(NavigationDescriptor::children(
                    "Children",
                    "GrandGrandChild",
                ))
                .with_navigation(NavigationDescriptor::parent("Parent", "Child")),
        )
        .unwrap()
        .with_type(
            EntityType::new("GrandGrandChild")
                .with_navigation(NavigationDescriptor::parent("Parent", "GrandChild")),
        )
        .unwrap()
}

/// Entities of a generated family, level by level
#[allow(dead_code)]
pub struct Family {
    pub parent: EntityRef,
    pub children: Vec<EntityRef>,
    pub grand_children: Vec<EntityRef>,
    pub grand_grand_children: Vec<EntityRef>,
}

#[allow(dead_code)]
impl Family {
    /// Every entity below the parent
    pub fn descendants(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.children
            .iter()
            .chain(&self.grand_children)
            .chain(&self.grand_grand_children)
            .copied()
    }
}

/// Parent with three children, each with three grandchildren, each with
/// three great-grandchildren
#[allow(dead_code)]
pub fn family() -> (TrackingContext, Family) {
    family_with_fanout(3)
}

#[allow(dead_code)]
pub fn family_with_fanout(fanout: usize) -> (TrackingContext, Family) {
    let mut graph = EntityGraph::new(family_registry());
    let parent = graph.create("Parent").unwrap();
    let mut family = Family {
        parent,
        children: Vec::new(),
        grand_children: Vec::new(),
        grand_grand_children: Vec::new(),
    };

    for _ in 0..fanout {
        let child = graph.create("Child").unwrap();
        graph.add_child(parent, "Children", child).unwrap();
        graph.set_parent(child, "Parent", parent).unwrap();
        family.children.push(child);

        for _ in 0..fanout {
            let grand_child = graph.create("GrandChild").unwrap();
            graph.add_child(child, "Children", grand_child).unwrap();
            graph.set_parent(grand_child, "Parent", child).unwrap();
            family.grand_children.push(grand_child);

            for _ in 0..fanout {
                let grand_grand_child = graph.create("GrandGrandChild").unwrap();
                graph
                    .add_child(grand_child, "Children", grand_grand_child)
                    .unwrap();
                graph
                    .set_parent(grand_grand_child, "Parent", grand_child)
                    .unwrap();
                family.grand_grand_children.push(grand_grand_child);
            }
        }
    }

    (TrackingContext::new(graph), family)
}
