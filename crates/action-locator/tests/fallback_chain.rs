use action_locator::{
    CandidateKind, ElementResolver, KeywordRule, KeywordTable, LocatorError, LocatorTier,
    TieredResolver,
};
use surface_driver::{MemoryElement, MemorySurface, Query};

fn start_page() -> (MemorySurface, usize, usize) {
    let surface = MemorySurface::new();
    let main = surface.add(MemoryElement::new("main"));
    let start = surface.add_child(main, MemoryElement::new("button").text("Start"));
    let form = surface.add_child(main, MemoryElement::new("form"));
    surface.add_child(form, MemoryElement::new("input").attr("type", "hidden").attr("name", "csrf"));
    let name = surface.add_child(form, MemoryElement::new("input").attr("type", "text"));
    (surface, start, name)
}

#[tokio::test]
async fn missing_selector_falls_back_to_textual_tiers() {
    let (surface, start, _) = start_page();
    let resolver = TieredResolver::default();
    let resolution = resolver
        .resolve(&surface, "#start", CandidateKind::Clickable)
        .await
        .unwrap();
    assert_eq!(resolution.element.handle, MemorySurface::handle(start));
    assert_ne!(resolution.tier, LocatorTier::LiteralSelector);
}

#[tokio::test]
async fn resolution_is_idempotent_on_unchanged_surface() {
    let (surface, _, _) = start_page();
    let resolver = TieredResolver::default();
    let first = resolver
        .resolve(&surface, "Start", CandidateKind::Clickable)
        .await
        .unwrap();
    let second = resolver
        .resolve(&surface, "Start", CandidateKind::Clickable)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn fillable_falls_back_to_first_generic_input() {
    let (surface, _, name) = start_page();
    let resolver = TieredResolver::default();
    let resolution = resolver
        .resolve(&surface, "#name", CandidateKind::Fillable)
        .await
        .unwrap();
    assert_eq!(resolution.tier, LocatorTier::FirstGenericInput);
    assert_eq!(resolution.element.handle, MemorySurface::handle(name));
}

#[tokio::test]
async fn literal_selector_wins_when_present() {
    let surface = MemorySurface::new();
    let decoy = surface.add(MemoryElement::new("button").text("Login"));
    let real = surface.add(MemoryElement::new("input").id("login-button").attr("type", "submit"));
    let resolver = TieredResolver::default();
    let resolution = resolver
        .resolve(&surface, "#login-button", CandidateKind::Clickable)
        .await
        .unwrap();
    assert_eq!(resolution.tier, LocatorTier::LiteralSelector);
    assert_eq!(resolution.element.handle, MemorySurface::handle(real));
    assert_ne!(resolution.element.handle, MemorySurface::handle(decoy));
}

#[tokio::test]
async fn placeholder_tier_for_fillable_text_targets() {
    let surface = MemorySurface::new();
    surface.add(MemoryElement::new("input").attr("placeholder", "Search"));
    let username = surface.add(MemoryElement::new("input").attr("placeholder", "Username"));
    let resolver = TieredResolver::default();
    let resolution = resolver
        .resolve(&surface, "username", CandidateKind::Fillable)
        .await
        .unwrap();
    // attribute-contains covers placeholder first
    assert_eq!(resolution.tier, LocatorTier::AttributeContains);
    assert_eq!(resolution.element.handle, MemorySurface::handle(username));
}

#[tokio::test]
async fn keyword_table_is_the_last_clickable_tier() {
    let surface = MemorySurface::new();
    let cart = surface.add(MemoryElement::new("a").class("shopping_cart_link"));
    let resolver = TieredResolver::default();
    let resolution = resolver
        .resolve(&surface, "open the cart", CandidateKind::Clickable)
        .await
        .unwrap();
    assert_eq!(resolution.tier, LocatorTier::KeywordTable);
    assert_eq!(resolution.element.handle, MemorySurface::handle(cart));
}

#[tokio::test]
async fn custom_keyword_rules_are_injected() {
    let surface = MemorySurface::new();
    let checkout = surface.add(MemoryElement::new("div").id("checkout-cta"));
    let resolver = TieredResolver::new(KeywordTable::new(vec![KeywordRule::new(
        "checkout",
        Query::css("#checkout-cta"),
    )]));
    let resolution = resolver
        .resolve(&surface, "Proceed to CHECKOUT", CandidateKind::Clickable)
        .await
        .unwrap();
    assert_eq!(resolution.element.handle, MemorySurface::handle(checkout));
}

#[tokio::test]
async fn no_match_anywhere_is_not_found() {
    let surface = MemorySurface::new();
    surface.add(MemoryElement::new("p").text("Nothing to fill here"));
    let resolver = TieredResolver::default();
    let err = resolver
        .resolve(&surface, "#missing-field", CandidateKind::Fillable)
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::ElementNotFound { .. }));
}

#[tokio::test]
async fn has_text_target_clicks_the_named_button() {
    let surface = MemorySurface::new();
    surface.add(
        MemoryElement::new("input")
            .attr("type", "submit")
            .attr("value", "Purchase"),
    );
    let cancel = surface.add(MemoryElement::new("button").text("Cancel"));
    let resolver = TieredResolver::default();
    let resolution = resolver
        .resolve(&surface, "button:has-text(\"Cancel\")", CandidateKind::Clickable)
        .await
        .unwrap();
    assert_eq!(resolution.element.handle, MemorySurface::handle(cancel));
    assert_eq!(resolution.tier, LocatorTier::LiteralSelector);
    assert_eq!(resolution.query, Query::text_within("button", "Cancel"));
}

#[tokio::test]
async fn has_text_target_without_match_does_not_click_a_stranger() {
    let surface = MemorySurface::new();
    surface.add(
        MemoryElement::new("input")
            .attr("type", "submit")
            .attr("value", "Purchase"),
    );
    let resolver = TieredResolver::default();
    let err = resolver
        .resolve(&surface, "button:has-text(\"Cancel\")", CandidateKind::Clickable)
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::ElementNotFound { .. }), "{err:?}");
}
